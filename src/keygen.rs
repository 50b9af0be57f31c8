//! Key-stream generation and file-backed reading — the `--key-gen` /
//! `--stream` collaborators named in SPEC_FULL §6A.
//!
//! Grounded on `original_source/keygen/simgen.py` / `src/keygen/KeyGenerator.py`
//! (distribution-parameterized per-step batch synthesis), using the same
//! `rand`/`rand_chacha` pairing `rust_gds`'s `types/random` module relies on
//! for deterministic, seeded sampling.

use std::fs::File;
use std::io::{self, BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

use rand::distributions::{Distribution as _, Uniform};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use crate::Key;

#[derive(Debug, Clone, Copy)]
pub enum Distribution {
    Uniform { low: f64, high: f64 },
    Normal { mean: f64, std_dev: f64 },
}

#[derive(Debug, Clone)]
pub struct KeygenConfig {
    pub distribution: Distribution,
    pub streams: usize,
    pub steps: usize,
    pub keys_per_step: (usize, usize),
    pub alphabet_size: usize,
}

/// Anything that can hand the driver a step's worth of keys. The simulator
/// core depends only on this trait, never on the concrete distribution math.
pub trait KeySource {
    fn next_batch(&mut self) -> Option<Vec<Key>>;
}

fn alphabet(size: usize) -> Vec<Key> {
    (0..size).map(|i| format!("k{i}")).collect()
}

/// Samples alphabet indices under the configured distribution. `Normal`
/// shapes a skew toward the alphabet's center; out-of-range samples are
/// clamped and rounded to the nearest valid index (see `DESIGN.md`'s
/// open-question decision).
pub struct Generator {
    config: KeygenConfig,
    rng: ChaCha8Rng,
    alphabet: Vec<Key>,
    step: usize,
}

impl Generator {
    pub fn new(config: KeygenConfig, seed: u64) -> Self {
        let alphabet = alphabet(config.alphabet_size);
        Self {
            config,
            rng: ChaCha8Rng::seed_from_u64(seed),
            alphabet,
            step: 0,
        }
    }

    fn sample_index(&mut self) -> usize {
        let n = self.alphabet.len();
        match self.config.distribution {
            Distribution::Uniform { low, high } => {
                let dist = Uniform::new_inclusive(low, high);
                let v = dist.sample(&mut self.rng);
                (v.round() as i64).clamp(0, n as i64 - 1) as usize
            }
            Distribution::Normal { mean, std_dev } => {
                // Box-Muller: no extra crate needed for a single normal draw.
                let u1: f64 = self.rng.gen_range(f64::EPSILON..1.0);
                let u2: f64 = self.rng.gen_range(0.0..1.0);
                let z = (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos();
                let v = mean + std_dev * z;
                (v.round() as i64).clamp(0, n as i64 - 1) as usize
            }
        }
    }
}

impl KeySource for Generator {
    fn next_batch(&mut self) -> Option<Vec<Key>> {
        if self.step >= self.config.steps {
            return None;
        }
        self.step += 1;
        let (low, high) = self.config.keys_per_step;
        let count = if low == high {
            low
        } else {
            self.rng.gen_range(low..=high)
        };
        let indices: Vec<usize> = (0..count).map(|_| self.sample_index()).collect();
        Some(indices.into_iter().map(|i| self.alphabet[i].clone()).collect())
    }
}

/// Writes `config.streams` sibling files under `base_path`, each holding
/// `config.steps` lines of space-separated keys (the wire format from §6).
/// Each stream is generated from its own seeded RNG and written to its own
/// file, so the `config.streams` iterations are independent; `rayon` fans
/// them out across its default thread pool rather than writing them one at
/// a time.
pub fn write_streams(base_path: impl AsRef<Path>, config: &KeygenConfig, seed: u64) -> io::Result<Vec<PathBuf>> {
    use rayon::prelude::*;

    let base = base_path.as_ref();
    let stream_path = |stream_idx: usize| -> PathBuf {
        if config.streams == 1 {
            base.to_path_buf()
        } else {
            base.with_file_name(format!(
                "{}_{stream_idx}",
                base.file_name().and_then(|n| n.to_str()).unwrap_or("stream")
            ))
        }
    };

    (0..config.streams)
        .into_par_iter()
        .map(|stream_idx| -> io::Result<PathBuf> {
            let path = stream_path(stream_idx);
            let mut generator = Generator::new(config.clone(), seed.wrapping_add(stream_idx as u64));
            let mut file = File::create(&path)?;
            while let Some(batch) = generator.next_batch() {
                writeln!(file, "{}", batch.join(" "))?;
            }
            Ok(path)
        })
        .collect()
}

/// Reads a pre-existing key-stream file line by line (the `--stream` path).
pub struct FileKeySource {
    lines: std::iter::Peekable<std::io::Lines<BufReader<File>>>,
}

impl FileKeySource {
    pub fn open(path: impl AsRef<Path>) -> io::Result<Self> {
        let file = File::open(path)?;
        Ok(Self {
            lines: BufReader::new(file).lines().peekable(),
        })
    }
}

impl KeySource for FileKeySource {
    fn next_batch(&mut self) -> Option<Vec<Key>> {
        let line = self.lines.next()?.ok()?;
        Some(
            line.split_whitespace()
                .map(|s| s.to_string())
                .collect(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generator_is_deterministic_for_a_fixed_seed() {
        let config = KeygenConfig {
            distribution: Distribution::Uniform { low: 0.0, high: 9.0 },
            streams: 1,
            steps: 20,
            keys_per_step: (1, 5),
            alphabet_size: 10,
        };
        let mut a = Generator::new(config.clone(), 42);
        let mut b = Generator::new(config, 42);
        for _ in 0..20 {
            assert_eq!(a.next_batch(), b.next_batch());
        }
    }

    #[test]
    fn generator_stops_after_configured_steps() {
        let config = KeygenConfig {
            distribution: Distribution::Uniform { low: 0.0, high: 1.0 },
            streams: 1,
            steps: 3,
            keys_per_step: (1, 1),
            alphabet_size: 2,
        };
        let mut gen = Generator::new(config, 1);
        assert!(gen.next_batch().is_some());
        assert!(gen.next_batch().is_some());
        assert!(gen.next_batch().is_some());
        assert!(gen.next_batch().is_none());
    }

    #[test]
    fn file_key_source_splits_on_whitespace() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("stream.txt");
        std::fs::write(&path, "a a b\n\nc\n").unwrap();
        let mut source = FileKeySource::open(&path).unwrap();
        assert_eq!(source.next_batch(), Some(vec!["a".into(), "a".into(), "b".into()]));
        assert_eq!(source.next_batch(), Some(vec![]));
        assert_eq!(source.next_batch(), Some(vec!["c".into()]));
        assert_eq!(source.next_batch(), None);
    }
}
