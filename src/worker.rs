//! Worker state machine — owns the active windows for one worker node.
//!
//! Grounded directly on `original_source/src/topology/node/state/WorkerState.py`:
//! the same five-step `update` order (reset step cycles on step advance, drain
//! processable windows before admitting new keys, admit, then expire), the same
//! per-step diagnostic line assembled from the same counters, and the same
//! `finished` sentinel appended to a window's emission once it is drained.
//! Windows are kept in a `BTreeMap` keyed by `start_step` rather than Python's
//! insertion-ordered `dict`, which gives the same ascending-order iteration the
//! spec requires without relying on incidental insertion order.

use std::collections::BTreeMap;

use crate::operation::Operation;
use crate::window::Window;
use crate::{Key, FINISHED, STEP_UPDATE};

/// Everything a window emitted this step, still grouped by window so a
/// key-splitting worker can convert it into per-window `(key, count)` partials.
#[derive(Debug, Clone)]
pub struct WindowEmission {
    pub start_step: u64,
    pub keys: Vec<Key>,
}

/// Per-step counters used to assemble the per-node diagnostic line (see
/// `crate::logging`).
#[derive(Debug, Clone, Copy, Default)]
pub struct StepReport {
    pub processed: u64,
    pub cycles: u64,
    pub overdue: u64,
    pub expired: u64,
}

#[derive(Debug)]
pub struct WorkerState {
    pub id: String,
    pub stage_id: usize,
    pub stage_node_id: usize,
    pub throughput: u64,
    pub operation: Operation,
    pub window_size: u64,
    pub slide: u64,

    windows: BTreeMap<u64, Window>,
    current_step: u64,
    minimum_step: u64,
    step_cycles: u64,

    pub total_admitted: u64,
    pub total_processed: u64,
    pub total_expired: u64,
    pub total_cycles: u64,
}

impl WorkerState {
    pub fn new(
        stage_id: usize,
        stage_node_id: usize,
        throughput: u64,
        operation: Operation,
        window_size: u64,
        slide: u64,
    ) -> Self {
        Self {
            id: format!("{stage_id}-{stage_node_id}"),
            stage_id,
            stage_node_id,
            throughput,
            operation,
            window_size,
            slide,
            windows: BTreeMap::new(),
            current_step: 0,
            minimum_step: 0,
            step_cycles: 0,
            total_admitted: 0,
            total_processed: 0,
            total_expired: 0,
            total_cycles: 0,
        }
    }

    pub fn current_step(&self) -> u64 {
        self.current_step
    }

    /// Active-window key count plus whatever is already queued for this step —
    /// the "load" consumed by the power-of-two-choices / partial-key-grouping
    /// strategies (see `crate::strategy`).
    pub fn active_key_count(&self) -> usize {
        self.windows.values().map(Window::len).sum()
    }

    pub fn update(&mut self, keys: &[Key], step: u64, terminal: bool) -> (Vec<WindowEmission>, StepReport) {
        if step > self.current_step {
            self.step_cycles = 0;
        }
        self.current_step = self.current_step.max(step);
        self.minimum_step = (self.current_step + 1).saturating_sub(self.window_size);

        let mut report = StepReport::default();
        let mut emissions = Vec::new();

        // 2. Process processable windows first, ascending start_step.
        let processable_starts: Vec<u64> = self
            .windows
            .iter()
            .filter(|(_, w)| w.is_processable(self.current_step))
            .map(|(start, _)| *start)
            .collect();

        for start in processable_starts {
            let window = self.windows.get_mut(&start).expect("window present");
            let (processed, cycles, counts) =
                window.process(self.throughput, self.operation, self.step_cycles);

            self.step_cycles += cycles;
            self.total_cycles += cycles;
            self.total_processed += processed;
            report.processed += processed;
            report.cycles = self.step_cycles;

            let overdue = window.len() as u64;
            if overdue > 0 {
                report.overdue += overdue;
            }

            let mut materialized: Vec<Key> = if self.operation.is_materializing() {
                counts
                    .into_iter()
                    .flat_map(|(k, c)| std::iter::repeat(k).take(c as usize))
                    .collect()
            } else {
                counts.into_iter().map(|(k, _)| k).collect()
            };

            let drained = window.is_empty();
            if !terminal {
                if drained {
                    materialized.push(FINISHED.to_string());
                }
                emissions.push(WindowEmission {
                    start_step: start,
                    keys: materialized,
                });
            }

            if drained {
                self.windows.remove(&start);
            }
        }

        // 3. Admit new keys into every still-admitting active window.
        if step >= self.minimum_step {
            let anchor = (self.current_step / self.slide) * self.slide;
            for key in keys {
                if key == STEP_UPDATE {
                    continue;
                }
                self.total_admitted += 1;
                self.windows
                    .entry(anchor)
                    .or_insert_with(|| Window::new(anchor, self.window_size, self.slide));
                for window in self.windows.values_mut() {
                    if !window.is_expired(step) && !window.is_processable(step) {
                        window.add_key(key.clone());
                    }
                }
            }
        }

        // 4. Expire windows.
        let expired_starts: Vec<u64> = self
            .windows
            .iter()
            .filter(|(_, w)| w.is_expired(self.current_step))
            .map(|(start, _)| *start)
            .collect();
        for start in expired_starts {
            if let Some(window) = self.windows.remove(&start) {
                let count = window.len() as u64;
                self.total_expired += count;
                report.expired += count;
            }
        }

        (emissions, report)
    }
}
