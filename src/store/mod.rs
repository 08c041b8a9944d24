//! Persistent document store: the transactional core of the index.
//!
//! Two realizations exist — [`sqlite::SqliteStore`], backed by a WAL-mode
//! SQLite file via `rusqlite`, and [`memory::MemStore`], a pure in-memory
//! stand-in used for tests. Both implement [`Store`] and are
//! observationally indistinguishable except for durability.

pub mod memory;
pub mod sqlite;

use std::collections::BTreeSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::overlay::{Dictionary, Stoplist, Taxonomy};

/// A document's entity tag: `{type, value}`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Entity {
    pub entity_type: String,
    pub value: String,
}

/// The document record. Identity is `id` (assigned) plus the unique
/// natural key `url`. Multi-valued attributes are deduplicated sets; empty
/// strings and entities with an empty `type` or `value` are dropped.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub id: i64,
    pub url: String,
    pub title: String,
    pub outlet: String,
    pub published_at: DateTime<Utc>,
    pub links_out: i64,
    pub tokens: BTreeSet<String>,
    pub cats: BTreeSet<String>,
    pub ents: BTreeSet<Entity>,
}

/// Input shape for an upsert: same as [`Document`] minus the assigned `id`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewDocument {
    pub url: String,
    pub title: String,
    pub outlet: String,
    pub published_at: DateTime<Utc>,
    pub links_out: i64,
    pub tokens: BTreeSet<String>,
    pub cats: BTreeSet<String>,
    pub ents: BTreeSet<Entity>,
}

impl NewDocument {
    /// Dedupes multi-valued fields and drops empties, per the document
    /// invariants. Tokens/cats come in as any iterable; entities are
    /// dropped if either field is empty.
    pub fn normalize(mut self) -> Self {
        self.tokens.retain(|t| !t.is_empty());
        self.cats.retain(|c| !c.is_empty());
        self.ents
            .retain(|e| !e.entity_type.is_empty() && !e.value.is_empty());
        self
    }
}

/// A ranked neighbor of a token, produced by `top_neighbors`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Neighbor {
    pub token: String,
    pub score: f64,
}

/// A summary card keyed by opaque id, grouped by `period`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Card {
    pub id: String,
    pub title: String,
    pub bullets: Vec<String>,
    pub sources: Vec<String>,
    pub score_json: String,
    pub period: String,
}

/// A cooperative cancellation signal. Every [`Store`] method checks it
/// before starting work and again before committing, returning
/// [`Error::Cancelled`] without partial effect if it has been set.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    pub(crate) fn check(&self) -> Result<()> {
        if self.is_cancelled() {
            Err(Error::Cancelled)
        } else {
            Ok(())
        }
    }
}

/// Never-cancelled convenience token for call sites that don't need
/// cancellation (e.g. the admin CLI).
pub fn no_cancel() -> CancellationToken {
    CancellationToken::new()
}

/// The public store contract. Every mutation runs under an ACID
/// transaction; readers see a consistent snapshot at statement start.
pub trait Store {
    // --- documents ---

    fn upsert_doc(&self, doc: NewDocument, cancel: &CancellationToken) -> Result<Document>;
    fn get_doc(&self, id: i64, cancel: &CancellationToken) -> Result<Option<Document>>;
    fn get_doc_by_url(&self, url: &str, cancel: &CancellationToken) -> Result<Option<Document>>;
    fn get_docs_by_tokens(
        &self,
        tokens: &[String],
        limit: i64,
        cancel: &CancellationToken,
    ) -> Result<Vec<Document>>;

    // --- counts ---

    fn upsert_token_df(&self, token: &str, df: i64, cancel: &CancellationToken) -> Result<()>;
    fn get_token_df(&self, token: &str, cancel: &CancellationToken) -> Result<i64>;
    fn inc_pair(&self, t1: &str, t2: &str, cancel: &CancellationToken) -> Result<()>;
    fn dec_pair(&self, t1: &str, t2: &str, cancel: &CancellationToken) -> Result<()>;

    // --- scoring ---

    fn get_pmi(&self, t1: &str, t2: &str, cancel: &CancellationToken) -> Result<Option<f64>>;
    fn top_neighbors(
        &self,
        token: &str,
        k: i64,
        cancel: &CancellationToken,
    ) -> Result<Vec<Neighbor>>;

    // --- cards ---

    fn upsert_card(&self, card: Card, cancel: &CancellationToken) -> Result<()>;
    fn get_cards_by_period(
        &self,
        period: &str,
        k: i64,
        cancel: &CancellationToken,
    ) -> Result<Vec<Card>>;

    // --- overlay persistence ---

    fn upsert_stoplist(&self, tokens: &[String], cancel: &CancellationToken) -> Result<()>;
    fn upsert_dict_entry(
        &self,
        phrase: &str,
        canonical: &str,
        category: &str,
        cancel: &CancellationToken,
    ) -> Result<()>;
    fn add_sector_keyword(&self, name: &str, keyword: &str, cancel: &CancellationToken)
        -> Result<()>;
    fn add_event_keyword(&self, name: &str, keyword: &str, cancel: &CancellationToken)
        -> Result<()>;
    fn add_region_keyword(&self, name: &str, keyword: &str, cancel: &CancellationToken)
        -> Result<()>;
    fn add_entity_keyword(
        &self,
        entity_type: &str,
        name: &str,
        keyword: &str,
        cancel: &CancellationToken,
    ) -> Result<()>;

    /// `None` when the stoplist has never been configured.
    fn stoplist(&self, cancel: &CancellationToken) -> Result<Option<Stoplist>>;
    /// `None` when the dictionary has never been configured.
    fn dictionary(&self, cancel: &CancellationToken) -> Result<Option<Dictionary>>;
    /// `None` when the taxonomy has never been configured.
    fn taxonomy(&self, cancel: &CancellationToken) -> Result<Option<Taxonomy>>;

    fn close(self: Box<Self>) -> Result<()>;
}
