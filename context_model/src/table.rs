//! An open-addressed table from fixed-length contexts to next-base counts.
//! Keys are short DNA substrings of a configured length `k`. Each entry
//! keeps one counter per base and a running total, so a lookup answers
//! "how often did `next` follow this context" and "how often was this
//! context seen at all" in one probe.
use std::fmt;

/// Initial number of slots. Must be a power of two: the probe sequence
/// below only visits every slot under a power-of-two capacity.
const INITIAL_CAPACITY: usize = 2048;
/// Occupancy threshold checked before every insert.
const LOAD_FACTOR: f64 = 0.6;
const GROWTH_FACTOR: usize = 2;
const HASH_MULTIPLIER: u64 = 31;
/// A large prime below 2^32.
const HASH_PRIME: u64 = 4_294_967_029;

/// Map a base to its position in the per-context count array.
/// Panics on a byte outside ACGT: such a byte means the upstream filter
/// was bypassed.
pub fn base_index(base: u8) -> usize {
    match base {
        b'A' => 0,
        b'C' => 1,
        b'G' => 2,
        b'T' => 3,
        _ => panic!("invalid base {}({})", base as char, base),
    }
}

// Multiplicative rolling hash over the raw bytes, with one extra round to
// scramble the tail.
fn context_hash(context: &[u8]) -> u64 {
    let mut hash: u64 = 0;
    for &base in context {
        hash = (hash * HASH_MULTIPLIER + u64::from(base)) % HASH_PRIME;
    }
    (hash * HASH_MULTIPLIER + hash) % HASH_PRIME
}

/// Counts of the bases observed right after one context.
#[derive(Clone)]
pub struct ContextEntry {
    context: Vec<u8>,
    hash: u64,
    counts: [u32; 4],
    total: u32,
}

impl ContextEntry {
    fn new(context: &[u8], hash: u64) -> Self {
        Self {
            context: context.to_vec(),
            hash,
            counts: [0; 4],
            total: 0,
        }
    }
    // Equality is bounded by the stored context length. Trailing bytes of
    // `context` beyond it never take part.
    fn matches(&self, hash: u64, context: &[u8]) -> bool {
        self.hash == hash && self.context[..] == context[..self.context.len()]
    }
    pub fn total(&self) -> u32 {
        self.total
    }
    pub fn count(&self, base: u8) -> u32 {
        self.counts[base_index(base)]
    }
}

impl fmt::Debug for ContextEntry {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "{}\tACGT:{:?}\ttotal:{}",
            String::from_utf8_lossy(&self.context),
            self.counts,
            self.total
        )
    }
}

/// The table itself. Collisions are resolved by probing with an
/// incrementing step (+1, +2, +3, ...); the capacity doubles whenever the
/// occupancy would pass [LOAD_FACTOR], so probes always hit an empty slot
/// eventually.
#[derive(Debug, Clone)]
pub struct ContextTable {
    slots: Vec<Option<ContextEntry>>,
    k: usize,
    size: usize,
}

impl ContextTable {
    pub fn new(k: usize) -> Self {
        Self::with_capacity(k, INITIAL_CAPACITY)
    }
    /// Start from a non-default capacity. Useful to force or avoid
    /// resizes; the counts a table reports do not depend on it.
    pub fn with_capacity(k: usize, capacity: usize) -> Self {
        assert!(capacity.is_power_of_two(), "capacity must be a power of two");
        Self {
            slots: vec![None; capacity],
            k,
            size: 0,
        }
    }
    pub fn context_length(&self) -> usize {
        self.k
    }
    /// Number of distinct contexts stored so far.
    pub fn len(&self) -> usize {
        self.size
    }
    pub fn is_empty(&self) -> bool {
        self.size == 0
    }
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }
    pub fn entries(&self) -> impl Iterator<Item = &ContextEntry> {
        self.slots.iter().flatten()
    }
    /// Record one observation of `next` right after `context`. Only the
    /// first `k` bytes of `context` take part in the lookup.
    pub fn increment(&mut self, context: &[u8], next: u8) {
        if self.size as f64 >= self.slots.len() as f64 * LOAD_FACTOR {
            self.resize();
        }
        let hash = context_hash(&context[..self.k]);
        let index = self.probe(hash, context);
        if self.slots[index].is_none() {
            self.slots[index] = Some(ContextEntry::new(&context[..self.k], hash));
            self.size += 1;
        }
        if let Some(entry) = self.slots[index].as_mut() {
            entry.counts[base_index(next)] += 1;
            entry.total += 1;
        }
    }
    /// How many times `next` followed `context`, and how many times the
    /// context was seen at all. `(0, 0)` for a context never seen.
    pub fn get(&self, context: &[u8], next: u8) -> (u32, u32) {
        let hash = context_hash(&context[..self.k]);
        match &self.slots[self.probe(hash, context)] {
            Some(entry) => (entry.counts[base_index(next)], entry.total),
            None => (0, 0),
        }
    }
    // Index of the first slot that is empty or already holds `context`.
    // A slot counts as a match only if both the stored hash and the first
    // `k` bytes agree.
    fn probe(&self, hash: u64, context: &[u8]) -> usize {
        let capacity = self.slots.len();
        let mut index = hash as usize % capacity;
        let mut step = 1;
        while let Some(entry) = &self.slots[index] {
            if entry.matches(hash, context) {
                break;
            }
            index = (index + step) % capacity;
            step += 1;
        }
        index
    }
    // Double the capacity and reinsert every entry under its stored hash.
    // Stored contexts are pairwise distinct, so reinsertion only needs an
    // empty slot, never an equality check.
    fn resize(&mut self) {
        let capacity = self.slots.len() * GROWTH_FACTOR;
        let mut slots: Vec<Option<ContextEntry>> = vec![None; capacity];
        for entry in self.slots.drain(..).flatten() {
            let mut index = entry.hash as usize % capacity;
            let mut step = 1;
            while slots[index].is_some() {
                index = (index + step) % capacity;
                step += 1;
            }
            slots[index] = Some(entry);
        }
        self.slots = slots;
    }
}
