//! Utility functions for getting hashes
use std::hash::{DefaultHasher, Hash, Hasher};

pub(crate) fn calculate_hash<T: Hash + ?Sized>(t: &T) -> u64 {
    let mut s = DefaultHasher::new();
    t.hash(&mut s);
    s.finish()
}

/// Hexadecimal hash, used to build auxiliary variable ids that can't collide with model ids
pub(crate) fn hash_as_hex_string<T: Hash + ?Sized>(t: &T) -> String {
    format!("{:x}", calculate_hash(t))
}

/// Id of an auxiliary variable or constraint tied to `id`, `{id}_{role}_{hash of id}`
pub(crate) fn auxiliary_id(id: &str, role: &str) -> String {
    format!("{}_{}_{}", id, role, hash_as_hex_string(id))
}
