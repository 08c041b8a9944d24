//! Co-occurrence index, PMI scoring, and persistence for a short-document
//! retrieval corpus: incremental token/pair counting, pluggable overlay
//! views (stoplist, dictionary, taxonomy), and a `Store` trait with
//! durable (SQLite) and in-memory realizations.

pub mod autotune;
pub mod config;
pub mod cooccurrence;
pub mod error;
pub mod overlay;
pub mod pmi;
pub mod query;
pub mod store;

pub use error::{Error, Result};
pub use store::{CancellationToken, Store};
