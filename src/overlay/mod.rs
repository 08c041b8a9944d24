//! Overlay views: stopword set, phrase dictionary, keyword taxonomy.
//!
//! Each is consulted through a snapshot struct the store hands back by
//! value. Callers interpret the absence of a view (`None`) as "overlay
//! disabled"; once any entry has been written the store always returns
//! `Some`.

pub mod dictionary;
pub mod stoplist;
pub mod taxonomy;

pub use dictionary::Dictionary;
pub use stoplist::Stoplist;
pub use taxonomy::Taxonomy;
