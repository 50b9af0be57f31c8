//! Key-occurrence statistics collected across a run, surfaced through the
//! key-statistics log sink (§6's third logging stream).
//!
//! Grounded on `procedure/core/result/centrality.rs`'s `centrality_summary`
//! (min/max/mean/p99 pulled from an `hdrhistogram::Histogram`), applied here
//! to per-step batch sizes instead of per-node centrality scores, plus a
//! running per-key occurrence tally mirroring `original_source/src/utils/
//! Logging.py::log_key_statistics`'s "dictionary with key occurrence counts".

use std::collections::HashMap;

use hdrhistogram::Histogram;

use crate::{Key, STEP_UPDATE};

const HISTOGRAM_PRECISION: u8 = 3;
const TOP_N: usize = 5;

pub struct KeyStatsTracker {
    batch_size: Histogram<u64>,
    occurrences: HashMap<Key, u64>,
}

impl KeyStatsTracker {
    pub fn new() -> Self {
        Self {
            batch_size: Histogram::new(HISTOGRAM_PRECISION).expect("fixed precision is valid"),
            occurrences: HashMap::new(),
        }
    }

    /// Records one step's batch and returns the line to hand to
    /// `LogSink::log_key_statistics`.
    pub fn observe(&mut self, batch: &[Key]) -> String {
        let _ = self.batch_size.record(batch.len() as u64);
        for key in batch {
            if key != STEP_UPDATE {
                *self.occurrences.entry(key.clone()).or_insert(0) += 1;
            }
        }

        let mut ranked: Vec<(&Key, &u64)> = self.occurrences.iter().collect();
        ranked.sort_by(|a, b| b.1.cmp(a.1).then(a.0.cmp(b.0)));
        let top: Vec<String> = ranked.iter().take(TOP_N).map(|(k, c)| format!("{k}={c}")).collect();

        format!(
            "batch_size[min={}, max={}, mean={:.2}, p99={}] top_keys=[{}]",
            self.batch_size.min(),
            self.batch_size.max(),
            self.batch_size.mean(),
            self.batch_size.value_at_quantile(0.99),
            top.join(", ")
        )
    }
}

impl Default for KeyStatsTracker {
    fn default() -> Self {
        Self::new()
    }
}
