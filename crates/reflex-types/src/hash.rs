//! Combination hashing for composite cache keys
//!
//! The algorithms here must never change once published: registries compare
//! keys built from them for the whole lifetime of the process. Add a new
//! function instead of altering an existing one.

use crate::value::Value;

/// Hash of an empty component list
pub const NO_PARAM_KEY: i64 = i64::MIN;

/// Component hash used for `Null`
pub const NULL_PARAM_KEY: i64 = 53;

const SEED: i64 = 17;
const MULTIPLIER: i64 = 31;
const DJB2_SEED: i64 = 5381;

/// Deterministic combination hash over a list of values
///
/// Equal value lists always hash identically. Objects contribute their
/// identity, so two lists are only equal when they name the same objects.
pub fn deep_hash(values: &[Value]) -> i64 {
    if values.is_empty() {
        return NO_PARAM_KEY;
    }
    let mut hasher = CompositeHasher::new();
    for value in values {
        hasher.add_value(value);
    }
    hasher.finish()
}

/// DJB2 hash over the trimmed text; empty text hashes to the seed
pub fn djb2_hash(text: &str) -> i64 {
    text.trim().encode_utf16().fold(DJB2_SEED, |hash, unit| {
        (hash << 5).wrapping_add(hash).wrapping_add(unit as i64)
    })
}

/// Incremental form of [`deep_hash`] for heterogeneous components
///
/// Uses the same recurrence as `deep_hash`, so a hasher fed the components of
/// a value list produces the list's deep hash.
#[derive(Debug, Clone, Copy)]
pub struct CompositeHasher {
    hash: i64,
}

impl CompositeHasher {
    /// Start a new combination
    pub fn new() -> Self {
        Self { hash: SEED }
    }

    /// Mix a raw component
    #[inline]
    pub fn add_raw(&mut self, component: i64) -> &mut Self {
        self.hash = self.hash.wrapping_mul(MULTIPLIER).wrapping_add(component);
        self
    }

    /// Mix a value component
    pub fn add_value(&mut self, value: &Value) -> &mut Self {
        let component = if value.is_null() {
            NULL_PARAM_KEY
        } else {
            value.hash_code() as i64
        };
        self.add_raw(component)
    }

    /// Mix a string component via [`djb2_hash`]
    pub fn add_str(&mut self, text: &str) -> &mut Self {
        self.add_raw(djb2_hash(text))
    }

    /// Mix an unsigned identity component
    pub fn add_u64(&mut self, id: u64) -> &mut Self {
        self.add_raw(id as i64)
    }

    /// Finished hash
    pub fn finish(&self) -> i64 {
        self.hash
    }
}

impl Default for CompositeHasher {
    fn default() -> Self {
        Self::new()
    }
}
