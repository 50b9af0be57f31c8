//! Partitioning strategies — decide which downstream node index a key is
//! routed to.
//!
//! One variant per `original_source/src/partitioning_strategies/*.py` file
//! (`ShuffleGrouping.py`, `Hashing.py`, `KeyGrouping.py`, `PowerOfTwoChoices.py`,
//! `PartialKeyGrouping.py`), following design note 9's "closed set, not trait
//! object" guidance. `H` is a self-contained 64-bit FNV-1a hash — none of the
//! five example repos needed a string hash primitive, so this is hand-written
//! rather than pulled from a crate, chosen only for stability across runs.

use std::collections::HashMap;

use parking_lot::Mutex;

use crate::Key;

/// 64-bit FNV-1a over a key's UTF-8 bytes. Deterministic, seedless, no
/// cryptographic requirement — just stable across runs and across siblings.
pub fn fnv1a_hash(bytes: &[u8]) -> u64 {
    const OFFSET_BASIS: u64 = 0xcbf2_9ce4_8422_2325;
    const PRIME: u64 = 0x0000_0100_0000_01b3;
    let mut hash = OFFSET_BASIS;
    for &byte in bytes {
        hash ^= u64::from(byte);
        hash = hash.wrapping_mul(PRIME);
    }
    hash
}

fn two_candidates(key: &str, n: usize) -> (usize, usize) {
    let h1 = (fnv1a_hash(key.as_bytes()) % n as u64) as usize;
    if n <= 1 {
        return (h1, h1);
    }
    let mut salt = 1u64;
    let mut h2 = loop {
        let salted = format!("{key}\u{0}{salt}");
        let candidate = (fnv1a_hash(salted.as_bytes()) % n as u64) as usize;
        if candidate != h1 || salt >= 8 {
            break candidate;
        }
        salt += 1;
    };
    if h2 == h1 {
        h2 = (h1 + 1) % n;
    }
    (h1, h2)
}

/// State shared by every strategy instance within one stage — mutated the
/// first time a key is observed, then read-only for that key afterward.
#[derive(Default, Debug)]
pub struct SharedRouting {
    pub hash_seed: u64,
    key_node_map: Mutex<HashMap<Key, usize>>,
    key_candidates: Mutex<HashMap<Key, (usize, usize)>>,
}

impl SharedRouting {
    pub fn new(hash_seed: u64) -> Self {
        Self {
            hash_seed,
            key_node_map: Mutex::new(HashMap::new()),
            key_candidates: Mutex::new(HashMap::new()),
        }
    }
}

#[derive(Debug)]
pub enum Strategy {
    Shuffle { cursor: usize },
    Hashing,
    KeyGrouping { prefix_length: usize },
    Potc,
    Pkg,
}

impl Strategy {
    /// Routes every key in `keys` into `buffers[index]`, one vec per
    /// downstream node. `downstream_loads[i]` is node `i`'s active-window key
    /// count *before* this call; buffered-this-step load is tracked locally
    /// as keys are appended.
    pub fn partition(
        &mut self,
        keys: &[Key],
        downstream_loads: &[usize],
        shared: &SharedRouting,
        buffers: &mut [Vec<Key>],
    ) {
        let n = buffers.len();
        if n == 0 {
            return;
        }
        let mut buffered_this_step = vec![0usize; n];
        // Load-aware strategies decide once per distinct key per batch: an
        // "appearance" is a key showing up in this step's batch, not each
        // individual duplicate within it, so a key repeated many times in one
        // delivery rides a single routing decision (see S5).
        let mut decided_this_batch: HashMap<&Key, usize> = HashMap::new();

        for key in keys {
            let index = if let Some(&cached) = decided_this_batch.get(key) {
                cached
            } else {
                let decision = match self {
                    Strategy::Shuffle { cursor } => {
                        let idx = *cursor % n;
                        *cursor = (*cursor + 1) % n;
                        idx
                    }
                    Strategy::Hashing => {
                        ((fnv1a_hash(key.as_bytes()) ^ shared.hash_seed) % n as u64) as usize
                    }
                    Strategy::KeyGrouping { prefix_length } => {
                        let cut = (*prefix_length).min(key.len());
                        let group = &key[..cut];
                        (fnv1a_hash(group.as_bytes()) % n as u64) as usize
                    }
                    Strategy::Potc => {
                        let mut map = shared.key_node_map.lock();
                        if let Some(&assigned) = map.get(key) {
                            assigned
                        } else {
                            let (c1, c2) = two_candidates(key, n);
                            let load1 = downstream_loads[c1] + buffered_this_step[c1];
                            let load2 = downstream_loads[c2] + buffered_this_step[c2];
                            let chosen = if load2 < load1 { c2 } else { c1 };
                            map.insert(key.clone(), chosen);
                            chosen
                        }
                    }
                    Strategy::Pkg => {
                        let mut candidates = shared.key_candidates.lock();
                        let (c1, c2) = *candidates
                            .entry(key.clone())
                            .or_insert_with(|| two_candidates(key, n));
                        let load1 = downstream_loads[c1] + buffered_this_step[c1];
                        let load2 = downstream_loads[c2] + buffered_this_step[c2];
                        if load2 < load1 {
                            c2
                        } else {
                            c1
                        }
                    }
                };
                decided_this_batch.insert(key, decision);
                decision
            };

            buffers[index].push(key.clone());
            buffered_this_step[index] += 1;
        }
    }

    pub fn parse(name: &str) -> Option<StrategyKind> {
        match name {
            "shuffle" => Some(StrategyKind::Shuffle),
            "hashing" => Some(StrategyKind::Hashing),
            "key_grouping" => Some(StrategyKind::KeyGrouping),
            "potc" => Some(StrategyKind::Potc),
            "pkg" => Some(StrategyKind::Pkg),
            _ => None,
        }
    }
}

/// Tag-only form used by `crate::config` to validate a strategy name before
/// strategy-specific parameters (e.g. `prefix_length`) are checked.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StrategyKind {
    Shuffle,
    Hashing,
    KeyGrouping,
    Potc,
    Pkg,
}
