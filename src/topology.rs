//! Topology — an ordered sequence of stages, stage `i+1` implicitly being
//! stage `i`'s `next_stage`.
//!
//! Grounded on `original_source/src/topology/stage/Stage.py`'s linked-list
//! wiring, translated into an owned `Vec<Stage>` with downward-only,
//! non-owning navigation (design note 9's "cyclic references → downward
//! borrows" guidance) rather than back-pointers.

use crate::logging::LogSink;
use crate::stage::{dispatch, Stage};
use crate::Key;

#[derive(Debug)]
pub struct Topology {
    pub stages: Vec<Stage>,
}

impl Topology {
    pub fn new(stages: Vec<Stage>) -> Self {
        Self { stages }
    }

    /// Feeds one step's batch to the root partitioner (stage 0, node 0) and
    /// lets it recursively fan out through every downstream stage. Recursion
    /// depth equals topology depth, per §4.6.
    pub fn run_step(&mut self, batch: &[Key], step: u64, sink: &mut dyn LogSink) {
        if self.stages.is_empty() {
            return;
        }
        dispatch(&mut self.stages, 0, batch.to_vec(), step, sink);
    }

    /// A final structural report: one line per stage naming its kind and
    /// node count, per §4.7's "final string/structural report" requirement.
    pub fn report(&self) -> String {
        let mut lines = Vec::with_capacity(self.stages.len());
        for stage in &self.stages {
            let kind = if stage.key_splitting {
                "worker(key-splitting)"
            } else if stage.aggregator.is_some() {
                "worker(aggregator)"
            } else {
                match stage.nodes.first() {
                    Some(crate::stage::Node::Partitioner(_)) => "partitioner",
                    Some(crate::stage::Node::Worker(_)) => "worker",
                    None => "empty",
                }
            };
            lines.push(format!(
                "stage {}: {kind}, {} node(s)",
                stage.id,
                stage.nodes.len()
            ));
        }
        lines.join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logging::MemoryLogSink;
    use crate::operation::Operation;
    use crate::stage::{Node, PartitionerNode};
    use crate::strategy::{SharedRouting, Strategy};
    use crate::worker::WorkerState;

    fn k(s: &str) -> Key {
        s.to_string()
    }

    #[test]
    fn s1_single_hashing_partitioner_to_single_worker() {
        let partitioner_stage = Stage {
            id: 0,
            shared: SharedRouting::new(0),
            key_splitting: false,
            aggregator: None,
            nodes: vec![Node::Partitioner(PartitionerNode {
                id: "0-0".into(),
                strategy: Strategy::Hashing,
            })],
        };
        let worker_stage = Stage {
            id: 1,
            shared: SharedRouting::new(0),
            key_splitting: false,
            aggregator: None,
            nodes: vec![Node::Worker(WorkerState::new(1, 0, 100, Operation::Linear, 5, 5))],
        };

        let mut topology = Topology::new(vec![partitioner_stage, worker_stage]);
        let mut sink = MemoryLogSink::default();

        for step in 0..6u64 {
            let batch = if step < 5 { vec![k("a"), k("a"), k("b")] } else { vec![] };
            topology.run_step(&batch, step, &mut sink);
        }

        let last_line = &sink.node_lines.last().expect("worker logged at least once").1;
        assert!(last_line.contains("Processed 15 keys using 15 cycles"));
        assert!(last_line.contains("Node load 15.0%"));
    }

    #[test]
    fn report_lists_every_stage() {
        let topology = Topology::new(vec![Stage {
            id: 0,
            shared: SharedRouting::new(0),
            key_splitting: false,
            aggregator: None,
            nodes: vec![Node::Partitioner(PartitionerNode {
                id: "0-0".into(),
                strategy: Strategy::Shuffle { cursor: 0 },
            })],
        }]);
        assert!(topology.report().contains("stage 0"));
    }
}
