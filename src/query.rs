//! Query layer: thin wrappers over [`Store`] document retrieval and
//! neighbor ranking.

use crate::error::Result;
use crate::store::{CancellationToken, Document, Neighbor, Store};

/// Documents containing at least one of `tokens`, newest-first.
pub fn docs_by_tokens(
    store: &dyn Store,
    tokens: &[String],
    limit: i64,
    cancel: &CancellationToken,
) -> Result<Vec<Document>> {
    store.get_docs_by_tokens(tokens, limit, cancel)
}

/// `token`'s top-`k` neighbors by PMI score, descending, with neighbors
/// below the store's configured `min_df` already excluded.
pub fn top_neighbors(
    store: &dyn Store,
    token: &str,
    k: i64,
    cancel: &CancellationToken,
) -> Result<Vec<Neighbor>> {
    store.top_neighbors(token, k, cancel)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::StoreConfig;
    use crate::store::memory::MemStore;
    use crate::store::{Entity, NewDocument};
    use chrono::{Duration, Utc};
    use std::collections::BTreeSet;

    fn doc(url: &str, tokens: &[&str], published_at: chrono::DateTime<Utc>) -> NewDocument {
        NewDocument {
            url: url.to_string(),
            title: String::new(),
            outlet: String::new(),
            published_at,
            links_out: 0,
            tokens: tokens.iter().map(|s| s.to_string()).collect(),
            cats: BTreeSet::new(),
            ents: BTreeSet::<Entity>::new(),
        }
    }

    #[test]
    fn scenario_s6_docs_ordered_newest_first() {
        let store = MemStore::new(StoreConfig::default());
        let cancel = CancellationToken::new();
        let now = Utc::now();

        store
            .upsert_doc(doc("/a", &["learning"], now - Duration::hours(2)), &cancel)
            .unwrap();
        store
            .upsert_doc(doc("/b", &["learning"], now - Duration::hours(1)), &cancel)
            .unwrap();
        store
            .upsert_doc(doc("/c", &["learning"], now), &cancel)
            .unwrap();

        let results = docs_by_tokens(&store, &["learning".to_string()], 10, &cancel).unwrap();
        let urls: Vec<&str> = results.iter().map(|d| d.url.as_str()).collect();
        assert_eq!(urls, vec!["/c", "/b", "/a"]);
    }

    #[test]
    fn scenario_s5_top_neighbors_ranking() {
        let store = MemStore::new(StoreConfig::default());
        let cancel = CancellationToken::new();

        for _ in 0..20 {
            store
                .upsert_doc(
                    doc(&uuid_like(), &["placeholder"], Utc::now()),
                    &cancel,
                )
                .unwrap();
        }
        store.upsert_token_df("machine", 10, &cancel).unwrap();
        store.upsert_token_df("learning", 8, &cancel).unwrap();
        store.upsert_token_df("deep", 5, &cancel).unwrap();
        for _ in 0..10 {
            store.inc_pair("machine", "learning", &cancel).unwrap();
        }
        for _ in 0..5 {
            store.inc_pair("machine", "deep", &cancel).unwrap();
        }

        let neighbors = top_neighbors(&store, "machine", 10, &cancel).unwrap();
        assert_eq!(neighbors.len(), 2);
        assert_eq!(neighbors[0].token, "learning");
    }

    fn uuid_like() -> String {
        use std::sync::atomic::{AtomicU64, Ordering};
        static COUNTER: AtomicU64 = AtomicU64::new(0);
        format!("/doc-{}", COUNTER.fetch_add(1, Ordering::SeqCst))
    }
}
