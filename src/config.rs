//! Configuration document — deserializes the JSON document named in §6/§6A
//! and converts it into a runtime `Topology` through a single fallible
//! `build()` step, performing every §7 validation before any simulation runs.
//!
//! Grounded on `config/pregel_config.rs`'s hand-written
//! `PregelConfigBuilder::build() -> Result<PregelConfig, ConfigError>`: the
//! DTO tree is plain data (`#[derive(Deserialize)]`), and the builder pattern
//! is hand-rolled rather than derived because validation needs cross-field
//! checks (stage id sequencing, node id uniqueness) a mechanical derive
//! builder cannot express (see SPEC_FULL §9 ambient design notes).

use std::collections::HashSet;

use rand::Rng;
use serde::Deserialize;

use crate::aggregator::AggregatorState;
use crate::error::ConfigError;
use crate::keygen::{Distribution as RuntimeDistribution, KeygenConfig as RuntimeKeygenConfig};
use crate::operation::Operation;
use crate::stage::{Node, PartitionerNode, Stage};
use crate::strategy::{SharedRouting, Strategy, StrategyKind};
use crate::topology::Topology;
use crate::worker::WorkerState;

#[derive(Debug, Deserialize)]
pub struct SimulationConfigDto {
    pub keygen: KeygenConfigDto,
    pub topology: TopologyConfigDto,
}

#[derive(Debug, Deserialize)]
pub struct KeygenConfigDto {
    pub distribution: DistributionDto,
    pub streams: usize,
    pub steps: usize,
    pub keys_per_step: (usize, usize),
    pub alphabet_size: usize,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum DistributionDto {
    Uniform { low: f64, high: f64 },
    Normal { mean: f64, std_dev: f64 },
}

#[derive(Debug, Deserialize)]
pub struct TopologyConfigDto {
    pub stages: Vec<StageConfigDto>,
}

#[derive(Debug, Deserialize)]
pub struct StageConfigDto {
    pub id: usize,
    #[serde(rename = "type")]
    pub stage_type: String,
    #[serde(default)]
    pub key_splitting: bool,
    pub nodes: Vec<NodeConfigDto>,
}

#[derive(Debug, Deserialize)]
pub struct NodeConfigDto {
    pub id: String,
    #[serde(rename = "type")]
    pub node_type: String,
    pub strategy: Option<StrategyConfigDto>,
    pub throughput: Option<u64>,
    pub operation_type: Option<String>,
    pub window_size: Option<u64>,
    pub slide: Option<u64>,
}

#[derive(Debug, Deserialize)]
pub struct StrategyConfigDto {
    pub name: String,
    pub prefix_length: Option<usize>,
}

impl SimulationConfigDto {
    /// Parses and validates the JSON document, then builds the runtime
    /// `Topology` and `KeygenConfig`. Every configuration error named in §7
    /// is checked here, before any node is constructed.
    pub fn build(self) -> Result<(Topology, RuntimeKeygenConfig), ConfigError> {
        let keygen = self.keygen.build()?;
        let topology = self.topology.build()?;
        Ok((topology, keygen))
    }
}

impl KeygenConfigDto {
    fn build(self) -> Result<RuntimeKeygenConfig, ConfigError> {
        if self.streams == 0 {
            return Err(ConfigError::OutOfRange {
                field: "keygen.streams".into(),
                value: "0".into(),
            });
        }
        if self.alphabet_size == 0 {
            return Err(ConfigError::OutOfRange {
                field: "keygen.alphabet_size".into(),
                value: "0".into(),
            });
        }
        if self.keys_per_step.0 > self.keys_per_step.1 {
            return Err(ConfigError::OutOfRange {
                field: "keygen.keys_per_step".into(),
                value: format!("{:?}", self.keys_per_step),
            });
        }
        let distribution = match self.distribution {
            DistributionDto::Uniform { low, high } if low > high => {
                return Err(ConfigError::OutOfRange {
                    field: "keygen.distribution".into(),
                    value: format!("low={low} > high={high}"),
                });
            }
            DistributionDto::Uniform { low, high } => RuntimeDistribution::Uniform { low, high },
            DistributionDto::Normal { mean, std_dev } if std_dev <= 0.0 => {
                return Err(ConfigError::OutOfRange {
                    field: "keygen.distribution.std_dev".into(),
                    value: std_dev.to_string(),
                });
            }
            DistributionDto::Normal { mean, std_dev } => {
                RuntimeDistribution::Normal { mean, std_dev }
            }
        };
        Ok(RuntimeKeygenConfig {
            distribution,
            streams: self.streams,
            steps: self.steps,
            keys_per_step: self.keys_per_step,
            alphabet_size: self.alphabet_size,
        })
    }
}

impl TopologyConfigDto {
    fn build(self) -> Result<Topology, ConfigError> {
        if self.stages.is_empty() {
            return Err(ConfigError::MissingStageZero);
        }
        if self.stages[0].id != 0 {
            return Err(ConfigError::MissingStageZero);
        }

        let mut seen_node_ids: HashSet<String> = HashSet::new();
        let mut stages = Vec::with_capacity(self.stages.len());
        let stage_count = self.stages.len();

        for (expected, stage_dto) in self.stages.into_iter().enumerate() {
            if stage_dto.id != expected {
                return Err(ConfigError::NonSequentialStageId {
                    expected,
                    found: stage_dto.id,
                });
            }
            for node in &stage_dto.nodes {
                if !seen_node_ids.insert(node.id.clone()) {
                    return Err(ConfigError::DuplicateNodeId(node.id.clone()));
                }
            }
            stages.push(stage_dto.build(expected, expected + 1 == stage_count)?);
        }

        Ok(Topology::new(stages))
    }
}

impl StageConfigDto {
    fn build(self, stage_id: usize, _is_last: bool) -> Result<Stage, ConfigError> {
        let uses_hashing = self
            .nodes
            .iter()
            .any(|n| matches!(n.strategy.as_ref().map(|s| s.name.as_str()), Some("hashing")));
        let hash_seed = if uses_hashing {
            rand::thread_rng().gen::<u64>()
        } else {
            0
        };
        let shared = SharedRouting::new(hash_seed);

        let mut nodes = Vec::with_capacity(self.nodes.len());
        let mut worker_count = 0usize;
        for (stage_node_id, node_dto) in self.nodes.into_iter().enumerate() {
            let node = node_dto.build(&self.stage_type, stage_id, stage_node_id)?;
            if matches!(node, Node::Worker(_)) {
                worker_count += 1;
            }
            nodes.push(node);
        }

        let aggregator = if self.key_splitting {
            let (window_size, slide) = nodes
                .iter()
                .find_map(|n| match n {
                    Node::Worker(w) => Some((w.window_size, w.slide)),
                    _ => None,
                })
                .ok_or(ConfigError::KeySplittingRequiresWorker(stage_id))?;
            Some(AggregatorState::new(worker_count, window_size, slide))
        } else {
            None
        };

        Ok(Stage {
            id: stage_id,
            shared,
            key_splitting: self.key_splitting,
            aggregator,
            nodes,
        })
    }
}

impl NodeConfigDto {
    fn build(self, stage_type: &str, stage_id: usize, stage_node_id: usize) -> Result<Node, ConfigError> {
        if self.node_type != stage_type {
            return Err(ConfigError::MismatchedNodeType {
                stage_id,
                stage_type: stage_type.to_string(),
                node_id: self.id.clone(),
                node_type: self.node_type.clone(),
            });
        }

        match self.node_type.as_str() {
            "partitioner" => {
                let strategy_dto = self.strategy.ok_or_else(|| {
                    ConfigError::MissingField(format!("nodes[{}].strategy", self.id))
                })?;
                let kind = StrategyKind::parse_or_err(&strategy_dto.name)?;
                let strategy = match kind {
                    StrategyKind::Shuffle => Strategy::Shuffle { cursor: 0 },
                    StrategyKind::Hashing => Strategy::Hashing,
                    StrategyKind::KeyGrouping => {
                        let prefix_length = strategy_dto.prefix_length.ok_or_else(|| {
                            ConfigError::MissingField(format!(
                                "nodes[{}].strategy.prefix_length",
                                self.id
                            ))
                        })?;
                        Strategy::KeyGrouping { prefix_length }
                    }
                    StrategyKind::Potc => Strategy::Potc,
                    StrategyKind::Pkg => Strategy::Pkg,
                };
                Ok(Node::Partitioner(PartitionerNode { id: self.id, strategy }))
            }
            "worker" => {
                let throughput = self
                    .throughput
                    .ok_or_else(|| ConfigError::MissingField(format!("nodes[{}].throughput", self.id)))?;
                let operation_type = self.operation_type.ok_or_else(|| {
                    ConfigError::MissingField(format!("nodes[{}].operation_type", self.id))
                })?;
                let operation = Operation::parse(&operation_type).ok_or_else(|| {
                    ConfigError::UnknownEnumValue {
                        field: format!("nodes[{}].operation_type", self.id),
                        value: operation_type.clone(),
                    }
                })?;
                let window_size = self
                    .window_size
                    .ok_or_else(|| ConfigError::MissingField(format!("nodes[{}].window_size", self.id)))?;
                let slide = self
                    .slide
                    .ok_or_else(|| ConfigError::MissingField(format!("nodes[{}].slide", self.id)))?;
                if slide == 0 || slide > window_size {
                    return Err(ConfigError::OutOfRange {
                        field: format!("nodes[{}].slide", self.id),
                        value: slide.to_string(),
                    });
                }
                Ok(Node::Worker(WorkerState::new(
                    stage_id,
                    stage_node_id,
                    throughput,
                    operation,
                    window_size,
                    slide,
                )))
            }
            other => Err(ConfigError::UnknownEnumValue {
                field: format!("nodes[{}].type", self.id),
                value: other.to_string(),
            }),
        }
    }
}

impl StrategyKind {
    fn parse_or_err(name: &str) -> Result<Self, ConfigError> {
        Strategy::parse(name).ok_or_else(|| ConfigError::UnknownEnumValue {
            field: "strategy.name".into(),
            value: name.to_string(),
        })
    }
}
