//! Logging sinks — the per-node diagnostic line format the log-parser
//! collaborator depends on (§6), plus the default and key-statistics streams.
//!
//! Grounded on the §9 design note ("Define a small sink trait/interface...
//! default implementation writes the line format... Tests substitute an
//! in-memory sink") and on the exact message template in
//! `original_source/src/topology/node/state/WorkerState.py::update` and the
//! three-file layout in `original_source/src/utils/Logging.py`
//! (`log_default.log`, `log_node{id}.log`, `log_key_stats.log` under a
//! timestamped `logs/log_<timestamp>/` directory).

use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

/// Assembles the exact per-step diagnostic line a worker or aggregator emits.
pub fn format_step_line(
    current_step: u64,
    processed: u64,
    cycles: u64,
    throughput: u64,
    overdue: u64,
    expired: u64,
) -> String {
    let load = if throughput == 0 {
        0.0
    } else {
        (cycles as f64 * 100.0) / throughput as f64
    };
    let mut line = format!(
        "Step {current_step} - Processed {processed} keys using {cycles} cycles - Node load {}%",
        format_load(load)
    );
    if overdue > 0 {
        line.push_str(&format!(" - Overdue keys: {overdue}"));
    }
    if expired > 0 {
        line.push_str(&format!(" - Expired keys: {expired}"));
    }
    line
}

// Mirrors Python's float repr closely enough for the line-format contract:
// whole-valued loads print with one decimal place; fractional loads keep
// Rust's full (unrounded) shortest representation.
fn format_load(load: f64) -> String {
    if load.fract() == 0.0 {
        format!("{load:.1}")
    } else {
        load.to_string()
    }
}

/// The sink interface every node writes its diagnostics through. A default
/// implementation writes three files; tests substitute `MemoryLogSink`.
pub trait LogSink {
    fn log_info(&mut self, target: &str, message: &str);
    fn log_node(&mut self, node_uid: &str, message: &str);
    fn log_key_statistics(&mut self, step: u64, stats: &str);
}

/// Writes the three streams named in §6 to files under a run directory.
pub struct FileLogSink {
    default_log: File,
    node_logs: std::collections::HashMap<String, File>,
    key_stats_log: File,
    dir: PathBuf,
}

impl FileLogSink {
    pub fn new(run_dir: impl AsRef<Path>) -> io::Result<Self> {
        let dir = run_dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir)?;
        let default_log = File::create(dir.join("log_default.log"))?;
        let key_stats_log = File::create(dir.join("log_key_stats.log"))?;
        Ok(Self {
            default_log,
            node_logs: std::collections::HashMap::new(),
            key_stats_log,
            dir,
        })
    }

    fn node_file(&mut self, node_uid: &str) -> &mut File {
        let dir = &self.dir;
        self.node_logs.entry(node_uid.to_string()).or_insert_with(|| {
            File::create(dir.join(format!("log_node_{node_uid}.log")))
                .expect("node log file is writable")
        })
    }
}

impl LogSink for FileLogSink {
    fn log_info(&mut self, target: &str, message: &str) {
        let _ = writeln!(self.default_log, "{target} - {message}");
    }

    fn log_node(&mut self, node_uid: &str, message: &str) {
        let file = self.node_file(node_uid);
        let _ = writeln!(file, "{message}");
    }

    fn log_key_statistics(&mut self, step: u64, stats: &str) {
        let _ = writeln!(self.key_stats_log, "Key statistics for step {step}: {stats}");
    }
}

/// In-memory test double — no filesystem I/O, per SPEC_FULL §6A test tooling.
#[derive(Default)]
pub struct MemoryLogSink {
    pub default_lines: Vec<String>,
    pub node_lines: Vec<(String, String)>,
    pub key_stats_lines: Vec<(u64, String)>,
}

impl LogSink for MemoryLogSink {
    fn log_info(&mut self, target: &str, message: &str) {
        self.default_lines.push(format!("{target} - {message}"));
    }

    fn log_node(&mut self, node_uid: &str, message: &str) {
        self.node_lines.push((node_uid.to_string(), message.to_string()));
    }

    fn log_key_statistics(&mut self, step: u64, stats: &str) {
        self.key_stats_lines.push((step, stats.to_string()));
    }
}
