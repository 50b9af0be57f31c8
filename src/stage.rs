//! Stage and node — the routing fabric keys travel through.
//!
//! Grounded on `original_source/src/topology/stage/Stage.py` (node
//! construction, shared per-stage maps, `hash_seed`) and
//! `original_source/src/topology/node/KeyPartitioner.py` /
//! `WorkerNode.py` / `AggregatorNode.py` for the `receive_and_process`
//! dispatch rules: a partitioner always forwards to every downstream index
//! with a `step_update` marker appended (§4.6); a non-key-splitting worker
//! forwards its flattened emissions to `next_stage.nodes[self.stage_node_id]`
//! (same index); a key-splitting worker reshapes its emissions into
//! `(key, count)` partials and routes them to the stage's own aggregator,
//! which in turn always forwards to `next_stage.nodes[0]`.

use std::collections::HashMap;

use crate::aggregator::AggregatorState;
use crate::logging::{format_step_line, LogSink};
use crate::strategy::{SharedRouting, Strategy};
use crate::worker::WorkerState;
use crate::{Key, FINISHED, STEP_UPDATE};

#[derive(Debug)]
pub struct PartitionerNode {
    pub id: String,
    pub strategy: Strategy,
}

#[derive(Debug)]
pub enum Node {
    Partitioner(PartitionerNode),
    Worker(WorkerState),
}

impl Node {
    /// Load consulted by the load-aware strategies: zero for a partitioner,
    /// since only worker nodes are ever a strategy's downstream target.
    pub fn active_key_count(&self) -> usize {
        match self {
            Node::Partitioner(_) => 0,
            Node::Worker(w) => w.active_key_count(),
        }
    }
}

#[derive(Debug)]
pub struct Stage {
    pub id: usize,
    pub shared: SharedRouting,
    pub key_splitting: bool,
    pub aggregator: Option<AggregatorState>,
    pub nodes: Vec<Node>,
}

impl Stage {
    fn reshape_for_aggregator(emission_keys: Vec<Key>) -> (Vec<(Key, u64)>, bool) {
        let mut counts: HashMap<Key, u64> = HashMap::new();
        let mut finished = false;
        for key in emission_keys {
            if key == FINISHED {
                finished = true;
            } else {
                *counts.entry(key).or_insert(0) += 1;
            }
        }
        (counts.into_iter().collect(), finished)
    }
}

/// Recursively delivers `keys` to `stages[0].nodes[node_idx]` at `step`, then
/// (per the node's kind) fans the result out to the remaining stages.
/// Recursion depth equals topology depth, matching §4.6's ordering contract.
pub fn dispatch(stages: &mut [Stage], node_idx: usize, keys: Vec<Key>, step: u64, sink: &mut dyn LogSink) {
    let (current, rest) = match stages.split_first_mut() {
        Some(pair) => pair,
        None => return,
    };
    let terminal = rest.is_empty();

    match &mut current.nodes[node_idx] {
        Node::Partitioner(partitioner) => {
            if terminal {
                return;
            }
            let next_stage = &mut rest[0];
            let downstream_loads: Vec<usize> =
                next_stage.nodes.iter().map(Node::active_key_count).collect();
            let mut buffers: Vec<Vec<Key>> = vec![Vec::new(); next_stage.nodes.len()];
            partitioner
                .strategy
                .partition(&keys, &downstream_loads, &current.shared, &mut buffers);

            for (downstream_idx, mut buffer) in buffers.into_iter().enumerate() {
                buffer.push(STEP_UPDATE.to_string());
                dispatch(rest, downstream_idx, buffer, step, sink);
            }
        }
        Node::Worker(worker) => {
            let (emissions, report) = worker.update(&keys, step, terminal);
            let line = format_step_line(
                worker.current_step(),
                report.processed,
                report.cycles,
                worker.throughput,
                report.overdue,
                report.expired,
            );
            sink.log_node(&worker.id, &line);

            if current.key_splitting {
                let sender_id = worker.stage_node_id;
                let partials: Vec<_> = emissions
                    .into_iter()
                    .map(|emission| {
                        let (counts, finished) = Stage::reshape_for_aggregator(emission.keys);
                        crate::aggregator::WindowPartial {
                            start_step: emission.start_step,
                            counts,
                            finished,
                        }
                    })
                    .collect();

                let aggregator = current
                    .aggregator
                    .as_mut()
                    .expect("key_splitting stage always has an aggregator");
                let agg_emissions = aggregator.receive(&partials, step, sender_id);

                if !terminal {
                    for emission in agg_emissions {
                        dispatch(rest, 0, emission.keys, step, sink);
                    }
                }
            } else if !terminal {
                for emission in emissions {
                    dispatch(rest, node_idx, emission.keys, step, sink);
                }
            }
        }
    }
}
