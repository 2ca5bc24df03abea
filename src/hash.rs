//! Stable 64-bit id derivation for `(uri, graph)` pairs.
//!
//! The upstream service hashed with Python's ambient `hash()`, which is
//! salted per-process and not stable across restarts. This spec fixes
//! FNV-1a 64 over the UTF-8 concatenation `uri ++ "\0" ++ graph`.

use fnv::FnvHasher;
use std::hash::Hasher;

pub fn index_id(uri: &str, graph: &str) -> u64 {
    let mut hasher = FnvHasher::default();
    hasher.write(uri.as_bytes());
    hasher.write_u8(0);
    hasher.write(graph.as_bytes());
    hasher.finish()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deterministic() {
        let a = index_id("http://example.org/foo", "http://example.org/g1");
        let b = index_id("http://example.org/foo", "http://example.org/g1");
        assert_eq!(a, b);
    }

    #[test]
    fn nul_separator_prevents_ambiguity() {
        let a = index_id("foo", "bargraph");
        let b = index_id("foobar", "graph");
        assert_ne!(a, b);
    }

    #[test]
    fn different_graph_different_id() {
        let a = index_id("http://example.org/foo", "http://example.org/g1");
        let b = index_id("http://example.org/foo", "http://example.org/g2");
        assert_ne!(a, b);
    }
}
