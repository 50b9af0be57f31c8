//! Aggregator state — reconciles partial-key-grouped windows from two or more
//! sibling workers into one merged result before forwarding downstream.
//!
//! Grounded on `original_source/src/topology/node/state/AggregatorState.py`: a
//! per-window finished-bitmap (one bit per peer worker), a merged window that
//! accumulates `(key, count)` partials, and a fixed internal cycle budget of
//! 1000 using the `Linear` operation — the Python original's `Aggregation`
//! cost function is `calculate_cycles(n) = n`, which is exactly `Linear`.

use std::collections::BTreeMap;

use crate::operation::Operation;
use crate::window::Window;
use crate::worker::WindowEmission;
use crate::Key;

const AGGREGATOR_THROUGHPUT: u64 = 1000;
const AGGREGATOR_OPERATION: Operation = Operation::Linear;

/// What one worker reported for one window this step, already reshaped by the
/// stage dispatch layer (see `crate::stage`) from the worker's raw emission.
#[derive(Debug, Clone)]
pub struct WindowPartial {
    pub start_step: u64,
    pub counts: Vec<(Key, u64)>,
    pub finished: bool,
}

#[derive(Debug)]
pub struct AggregatorState {
    num_workers: usize,
    window_size: u64,
    slide: u64,
    windows: BTreeMap<u64, (Window, Vec<bool>)>,
    pub total_processed: u64,
    pub total_cycles: u64,
}

impl AggregatorState {
    pub fn new(num_workers: usize, window_size: u64, slide: u64) -> Self {
        Self {
            num_workers,
            window_size,
            slide,
            windows: BTreeMap::new(),
            total_processed: 0,
            total_cycles: 0,
        }
    }

    pub fn receive(
        &mut self,
        partials: &[WindowPartial],
        step: u64,
        sender_id: usize,
    ) -> Vec<WindowEmission> {
        for partial in partials {
            let num_workers = self.num_workers;
            let window_size = self.window_size;
            let slide = self.slide;
            let (window, finished_bits) = self.windows.entry(partial.start_step).or_insert_with(|| {
                (
                    Window::new(partial.start_step, window_size, slide),
                    vec![false; num_workers],
                )
            });

            if partial.finished {
                finished_bits[sender_id] = true;
            }

            if !window.is_expired(step) {
                for (key, count) in &partial.counts {
                    for _ in 0..*count {
                        window.add_key(key.clone());
                    }
                }
            }
        }

        let ready_starts: Vec<u64> = self
            .windows
            .iter()
            .filter(|(_, (window, bits))| bits.iter().all(|b| *b) || window.is_expired(step))
            .map(|(start, _)| *start)
            .collect();

        let mut emissions = Vec::new();
        for start in ready_starts {
            if let Some((mut window, _)) = self.windows.remove(&start) {
                let (processed, cycles, counts) =
                    window.process(AGGREGATOR_THROUGHPUT, AGGREGATOR_OPERATION, 0);
                self.total_processed += processed;
                self.total_cycles += cycles;
                let keys: Vec<Key> = counts.into_iter().map(|(k, _)| k).collect();
                emissions.push(WindowEmission {
                    start_step: start,
                    keys,
                });
            }
        }
        emissions
    }
}
