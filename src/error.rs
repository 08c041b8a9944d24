use thiserror::Error;

/// Crate-wide error type.
///
/// Not-found conditions are never represented here — `GetDocByUrl`,
/// `GetTokenDf`, and `GetPmi` return three-valued or zero-valued results
/// instead, per the store's failure-semantics contract.
#[derive(Debug, Error)]
pub enum Error {
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("operation cancelled")]
    Cancelled,

    #[error("store is closed")]
    Closed,
}

pub type Result<T> = std::result::Result<T, Error>;
