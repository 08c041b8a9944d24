//! In-memory incremental co-occurrence counter.
//!
//! Specifies what the persistent store's `IncPair`/`UpsertTokenDf` must
//! converge to when driven correctly by a caller on reingest. The store
//! exposes those two sides separately to allow batched and decoupled
//! maintenance (see design notes), but this counter models the combined
//! invariant directly.

use std::collections::HashMap;

/// Canonicalizes a token pair so the first element is lexicographically
/// smaller. Centralized here because breaking this invariant corrupts every
/// downstream pair lookup.
pub fn canon_pair(a: &str, b: &str) -> (String, String) {
    if a < b {
        (a.to_string(), b.to_string())
    } else {
        (b.to_string(), a.to_string())
    }
}

#[derive(Debug, Default)]
pub struct CooccurrenceCounter {
    total_docs: u64,
    df: HashMap<String, u64>,
    pairs: HashMap<(String, String), u64>,
}

impl CooccurrenceCounter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers one document's unique token set. Increments `N`
    /// unconditionally — empty documents still count. Complexity
    /// `O(k log k + k^2)` where `k = tokens.len()`.
    pub fn add_document(&mut self, tokens: &[String]) {
        self.total_docs += 1;

        for t in tokens {
            *self.df.entry(t.clone()).or_insert(0) += 1;
        }

        let mut sorted: Vec<&String> = tokens.iter().collect();
        sorted.sort();

        for i in 0..sorted.len() {
            for j in (i + 1)..sorted.len() {
                let pair = canon_pair(sorted[i], sorted[j]);
                *self.pairs.entry(pair).or_insert(0) += 1;
            }
        }
    }

    pub fn token_count(&self, token: &str) -> u64 {
        self.df.get(token).copied().unwrap_or(0)
    }

    pub fn pair_count(&self, a: &str, b: &str) -> u64 {
        let pair = canon_pair(a, b);
        self.pairs.get(&pair).copied().unwrap_or(0)
    }

    pub fn unique_tokens(&self) -> usize {
        self.df.len()
    }

    pub fn unique_pairs(&self) -> usize {
        self.pairs.len()
    }

    pub fn total_docs(&self) -> u64 {
        self.total_docs
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn toks(words: &[&str]) -> Vec<String> {
        words.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn canon_pair_orders_lexicographically() {
        assert_eq!(canon_pair("b", "a"), ("a".to_string(), "b".to_string()));
        assert_eq!(canon_pair("a", "b"), ("a".to_string(), "b".to_string()));
    }

    #[test]
    fn scenario_s2_counter_arithmetic() {
        let mut c = CooccurrenceCounter::new();
        c.add_document(&toks(&["a", "b"]));
        c.add_document(&toks(&["a", "c"]));
        c.add_document(&toks(&["b", "c"]));
        c.add_document(&toks(&["a", "b", "c"]));

        assert_eq!(c.total_docs(), 4);
        assert_eq!(c.token_count("a"), 3);
        assert_eq!(c.token_count("b"), 3);
        assert_eq!(c.token_count("c"), 3);
        assert_eq!(c.pair_count("a", "b"), 2);
        assert_eq!(c.pair_count("a", "c"), 2);
        assert_eq!(c.pair_count("b", "c"), 2);
        // Order-insensitive lookup.
        assert_eq!(c.pair_count("b", "a"), 2);
    }

    #[test]
    fn empty_document_still_counts() {
        let mut c = CooccurrenceCounter::new();
        c.add_document(&[]);
        assert_eq!(c.total_docs(), 1);
        assert_eq!(c.unique_tokens(), 0);
    }

    #[test]
    fn unknown_pair_is_zero() {
        let c = CooccurrenceCounter::new();
        assert_eq!(c.pair_count("x", "y"), 0);
    }
}
