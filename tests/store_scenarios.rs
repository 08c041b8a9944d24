//! End-to-end scenarios run against a real temp-file-backed `SqliteStore`,
//! not the in-memory stand-in used by the unit tests alongside each module.

use std::collections::BTreeSet;

use chrono::{Duration, Utc};
use korel_core::config::StoreConfig;
use korel_core::store::sqlite::SqliteStore;
use korel_core::store::{CancellationToken, Entity, NewDocument, Store};

fn open_temp() -> (tempfile::TempDir, SqliteStore) {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("store.db");
    let store = SqliteStore::open(&path, StoreConfig::default()).unwrap();
    (dir, store)
}

#[test]
fn scenario_s1_basic_crud() {
    let (_dir, store) = open_temp();
    let cancel = CancellationToken::new();

    let doc = NewDocument {
        url: "/a".to_string(),
        title: "T".to_string(),
        outlet: String::new(),
        published_at: Utc::now(),
        links_out: 0,
        tokens: ["x", "y", "x"].iter().map(|s| s.to_string()).collect(),
        cats: BTreeSet::from(["c".to_string()]),
        ents: BTreeSet::from([Entity {
            entity_type: "company".to_string(),
            value: "OpenAI".to_string(),
        }]),
    };

    store.upsert_doc(doc, &cancel).unwrap();

    let fetched = store.get_doc_by_url("/a", &cancel).unwrap().unwrap();
    assert_eq!(fetched.tokens, BTreeSet::from(["x".to_string(), "y".to_string()]));
    assert_eq!(fetched.cats, BTreeSet::from(["c".to_string()]));
    assert_eq!(fetched.ents.len(), 1);
}

#[test]
fn scenario_s6_retrieval_recency_on_disk() {
    let (_dir, store) = open_temp();
    let cancel = CancellationToken::new();
    let now = Utc::now();

    for (url, offset) in [("/a", 2), ("/b", 1), ("/c", 0)] {
        let doc = NewDocument {
            url: url.to_string(),
            title: String::new(),
            outlet: String::new(),
            published_at: now - Duration::hours(offset),
            links_out: 0,
            tokens: BTreeSet::from(["learning".to_string()]),
            cats: BTreeSet::new(),
            ents: BTreeSet::new(),
        };
        store.upsert_doc(doc, &cancel).unwrap();
    }

    let docs = store
        .get_docs_by_tokens(&["learning".to_string()], 10, &cancel)
        .unwrap();
    let urls: Vec<&str> = docs.iter().map(|d| d.url.as_str()).collect();
    assert_eq!(urls, vec!["/c", "/b", "/a"]);
}

#[test]
fn opening_existing_wal_file_twice_does_not_duplicate_rows() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("store.db");
    let cancel = CancellationToken::new();

    {
        let store = SqliteStore::open(&path, StoreConfig::default()).unwrap();
        store
            .upsert_doc(
                NewDocument {
                    url: "/a".to_string(),
                    title: String::new(),
                    outlet: String::new(),
                    published_at: Utc::now(),
                    links_out: 0,
                    tokens: BTreeSet::new(),
                    cats: BTreeSet::new(),
                    ents: BTreeSet::new(),
                },
                &cancel,
            )
            .unwrap();
    }

    let store = SqliteStore::open(&path, StoreConfig::default()).unwrap();
    let reopened = SqliteStore::open(&path, StoreConfig::default()).unwrap();

    assert!(store.get_doc_by_url("/a", &cancel).unwrap().is_some());
    assert!(reopened.get_doc_by_url("/a", &cancel).unwrap().is_some());
}
