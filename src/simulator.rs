//! Simulator driver — feeds a `KeySource`'s per-step batches to the topology
//! until the source is exhausted, then produces a final structural report.
//!
//! Grounded on `original_source/src/simulator/Simulator.py` and `main.py`'s
//! step loop (`for t, batch in enumerate(steps_data): root.receive_and_process(
//! batch, t)`), translated one-to-one into `Topology::run_step` calls. The
//! default-stream/key-stats lifecycle lines are grounded on
//! `original_source/src/utils/Logging.py`'s `log_default_info`/
//! `log_key_statistics` calls around that same loop.

use crate::keygen::KeySource;
use crate::logging::LogSink;
use crate::stats::KeyStatsTracker;
use crate::topology::Topology;

pub struct Simulator {
    topology: Topology,
    stats: KeyStatsTracker,
}

impl Simulator {
    pub fn new(topology: Topology) -> Self {
        Self {
            topology,
            stats: KeyStatsTracker::new(),
        }
    }

    /// Runs every batch `source` yields, in order, against the topology, then
    /// returns the final structural report (§4.7).
    pub fn run(&mut self, source: &mut dyn KeySource, sink: &mut dyn LogSink) -> String {
        sink.log_info(
            "simulator",
            &format!("starting run on {} logical cpus", num_cpus::get()),
        );

        let mut step = 0u64;
        while let Some(batch) = source.next_batch() {
            let stats_line = self.stats.observe(&batch);
            sink.log_key_statistics(step, &stats_line);
            self.topology.run_step(&batch, step, sink);
            step += 1;
        }

        sink.log_info("simulator", &format!("run complete after {step} step(s)"));
        self.topology.report()
    }

    pub fn topology(&self) -> &Topology {
        &self.topology
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logging::MemoryLogSink;
    use crate::operation::Operation;
    use crate::stage::{Node, PartitionerNode, Stage};
    use crate::strategy::{SharedRouting, Strategy};
    use crate::worker::WorkerState;

    struct VecSource {
        batches: std::vec::IntoIter<Vec<String>>,
    }

    impl VecSource {
        fn new(batches: Vec<Vec<String>>) -> Self {
            Self { batches: batches.into_iter() }
        }
    }

    impl KeySource for VecSource {
        fn next_batch(&mut self) -> Option<Vec<String>> {
            self.batches.next()
        }
    }

    #[test]
    fn runs_every_batch_and_reports_topology_shape() {
        let topology = Topology::new(vec![
            Stage {
                id: 0,
                shared: SharedRouting::new(0),
                key_splitting: false,
                aggregator: None,
                nodes: vec![Node::Partitioner(PartitionerNode {
                    id: "0-0".into(),
                    strategy: Strategy::Shuffle { cursor: 0 },
                })],
            },
            Stage {
                id: 1,
                shared: SharedRouting::new(0),
                key_splitting: false,
                aggregator: None,
                nodes: vec![Node::Worker(WorkerState::new(1, 0, 100, Operation::Constant, 2, 2))],
            },
        ]);

        let mut simulator = Simulator::new(topology);
        let mut source = VecSource::new(vec![vec!["a".into()], vec!["b".into()], vec![]]);
        let mut sink = MemoryLogSink::default();

        let report = simulator.run(&mut source, &mut sink);
        assert!(report.contains("stage 0"));
        assert!(report.contains("stage 1"));
        assert!(!sink.node_lines.is_empty());
        assert_eq!(sink.key_stats_lines.len(), 3);
        assert!(sink.default_lines.iter().any(|l| l.contains("starting run")));
        assert!(sink.default_lines.iter().any(|l| l.contains("run complete")));
    }
}
