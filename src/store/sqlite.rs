//! Rusqlite-backed persistent [`Store`] implementation.
//!
//! Schema (§6 of the spec) is initialized with `CREATE TABLE IF NOT EXISTS`
//! so opening an existing file — complete or partially migrated — is
//! idempotent. WAL journaling and foreign-key enforcement are set at open
//! time.

use std::path::Path;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use rusqlite::{params, Connection, OptionalExtension};
use tracing::{info, instrument};

use crate::config::StoreConfig;
use crate::cooccurrence::canon_pair;
use crate::error::{Error, Result};
use crate::overlay::{Dictionary, Stoplist, Taxonomy};
use crate::pmi::{self, PmiConfig};

use super::{CancellationToken, Card, Document, Entity, NewDocument, Neighbor, Store};

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS docs (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    url TEXT NOT NULL UNIQUE,
    title TEXT NOT NULL DEFAULT '',
    outlet TEXT NOT NULL DEFAULT '',
    published_at TEXT NOT NULL DEFAULT '',
    links_out INTEGER NOT NULL DEFAULT 0
);

CREATE TABLE IF NOT EXISTS doc_tokens (
    doc_id INTEGER NOT NULL REFERENCES docs(id) ON DELETE CASCADE,
    token TEXT NOT NULL,
    PRIMARY KEY (doc_id, token)
);

CREATE TABLE IF NOT EXISTS doc_cats (
    doc_id INTEGER NOT NULL REFERENCES docs(id) ON DELETE CASCADE,
    category TEXT NOT NULL,
    PRIMARY KEY (doc_id, category)
);

CREATE TABLE IF NOT EXISTS doc_entities (
    doc_id INTEGER NOT NULL REFERENCES docs(id) ON DELETE CASCADE,
    type TEXT NOT NULL,
    value TEXT NOT NULL,
    PRIMARY KEY (doc_id, type, value)
);

CREATE INDEX IF NOT EXISTS idx_doc_tokens_token ON doc_tokens(token);

CREATE TABLE IF NOT EXISTS token_df (
    token TEXT PRIMARY KEY,
    df INTEGER NOT NULL DEFAULT 0
);

CREATE TABLE IF NOT EXISTS token_pairs (
    t1 TEXT NOT NULL,
    t2 TEXT NOT NULL,
    count INTEGER NOT NULL,
    PRIMARY KEY (t1, t2)
);

CREATE TABLE IF NOT EXISTS cards (
    id TEXT PRIMARY KEY,
    title TEXT NOT NULL DEFAULT '',
    bullets TEXT NOT NULL DEFAULT '[]',
    sources TEXT NOT NULL DEFAULT '[]',
    score_json TEXT NOT NULL DEFAULT '',
    period TEXT NOT NULL DEFAULT ''
);

CREATE INDEX IF NOT EXISTS idx_cards_period_id ON cards(period, id DESC);

CREATE TABLE IF NOT EXISTS stoplist (
    token TEXT PRIMARY KEY
);

CREATE TABLE IF NOT EXISTS dict_entries (
    phrase TEXT PRIMARY KEY,
    canonical TEXT NOT NULL,
    category TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS taxonomy_sectors (
    name TEXT NOT NULL,
    keyword TEXT NOT NULL,
    PRIMARY KEY (name, keyword)
);

CREATE TABLE IF NOT EXISTS taxonomy_events (
    name TEXT NOT NULL,
    keyword TEXT NOT NULL,
    PRIMARY KEY (name, keyword)
);

CREATE TABLE IF NOT EXISTS taxonomy_regions (
    name TEXT NOT NULL,
    keyword TEXT NOT NULL,
    PRIMARY KEY (name, keyword)
);

CREATE TABLE IF NOT EXISTS taxonomy_entities (
    type TEXT NOT NULL,
    name TEXT NOT NULL,
    keyword TEXT NOT NULL,
    PRIMARY KEY (type, name, keyword)
);
"#;

pub struct SqliteStore {
    conn: Arc<Mutex<Option<Connection>>>,
    config: StoreConfig,
    pmi_config: PmiConfig,
}

impl SqliteStore {
    #[instrument(skip(config))]
    pub fn open<P: AsRef<Path>>(path: P, config: StoreConfig) -> Result<Self> {
        let conn = Connection::open(path.as_ref())?;
        conn.pragma_update(None, "journal_mode", "WAL")?;
        conn.pragma_update(None, "foreign_keys", "ON")?;
        conn.execute_batch(SCHEMA)?;
        info!(path = %path.as_ref().display(), "store schema initialized");

        Ok(SqliteStore {
            conn: Arc::new(Mutex::new(Some(conn))),
            config,
            pmi_config: PmiConfig::new(config.epsilon),
        })
    }

    pub fn open_in_memory(config: StoreConfig) -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.pragma_update(None, "foreign_keys", "ON")?;
        conn.execute_batch(SCHEMA)?;

        Ok(SqliteStore {
            conn: Arc::new(Mutex::new(Some(conn))),
            config,
            pmi_config: PmiConfig::new(config.epsilon),
        })
    }

    fn with_conn<T>(&self, f: impl FnOnce(&Connection) -> Result<T>) -> Result<T> {
        let guard = self.conn.lock();
        match guard.as_ref() {
            Some(conn) => f(conn),
            None => Err(Error::Closed),
        }
    }

    fn with_conn_mut<T>(&self, f: impl FnOnce(&mut Connection) -> Result<T>) -> Result<T> {
        let mut guard = self.conn.lock();
        match guard.as_mut() {
            Some(conn) => f(conn),
            None => Err(Error::Closed),
        }
    }

    fn total_docs(conn: &Connection) -> Result<i64> {
        Ok(conn.query_row("SELECT COUNT(*) FROM docs", [], |r| r.get(0))?)
    }

    fn load_doc(conn: &Connection, id: i64) -> Result<Option<Document>> {
        let row = conn
            .query_row(
                "SELECT id, url, title, outlet, published_at, links_out FROM docs WHERE id = ?1",
                params![id],
                |r| {
                    Ok((
                        r.get::<_, i64>(0)?,
                        r.get::<_, String>(1)?,
                        r.get::<_, String>(2)?,
                        r.get::<_, String>(3)?,
                        r.get::<_, String>(4)?,
                        r.get::<_, i64>(5)?,
                    ))
                },
            )
            .optional()?;

        let (id, url, title, outlet, published_at_raw, links_out) = match row {
            Some(v) => v,
            None => return Ok(None),
        };

        let published_at = DateTime::parse_from_rfc3339(&published_at_raw)
            .map(|dt| dt.with_timezone(&Utc))
            .unwrap_or_else(|_| DateTime::<Utc>::from_timestamp(0, 0).unwrap());

        let mut tokens = std::collections::BTreeSet::new();
        let mut stmt = conn.prepare("SELECT token FROM doc_tokens WHERE doc_id = ?1")?;
        let rows = stmt.query_map(params![id], |r| r.get::<_, String>(0))?;
        for r in rows {
            tokens.insert(r?);
        }

        let mut cats = std::collections::BTreeSet::new();
        let mut stmt = conn.prepare("SELECT category FROM doc_cats WHERE doc_id = ?1")?;
        let rows = stmt.query_map(params![id], |r| r.get::<_, String>(0))?;
        for r in rows {
            cats.insert(r?);
        }

        let mut ents = std::collections::BTreeSet::new();
        let mut stmt = conn.prepare("SELECT type, value FROM doc_entities WHERE doc_id = ?1")?;
        let rows = stmt.query_map(params![id], |r| {
            Ok((r.get::<_, String>(0)?, r.get::<_, String>(1)?))
        })?;
        for r in rows {
            let (entity_type, value) = r?;
            ents.insert(Entity { entity_type, value });
        }

        Ok(Some(Document {
            id,
            url,
            title,
            outlet,
            published_at,
            links_out,
            tokens,
            cats,
            ents,
        }))
    }
}

impl Store for SqliteStore {
    #[instrument(skip(self, doc, cancel))]
    fn upsert_doc(&self, doc: NewDocument, cancel: &CancellationToken) -> Result<Document> {
        cancel.check()?;
        let doc = doc.normalize();

        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;

            tx.execute(
                "INSERT INTO docs (url, title, outlet, published_at, links_out)
                 VALUES (?1, ?2, ?3, ?4, ?5)
                 ON CONFLICT(url) DO UPDATE SET
                    title = excluded.title,
                    outlet = excluded.outlet,
                    published_at = excluded.published_at,
                    links_out = excluded.links_out",
                params![
                    doc.url,
                    doc.title,
                    doc.outlet,
                    doc.published_at.to_rfc3339(),
                    doc.links_out
                ],
            )?;

            let id: i64 = tx.query_row(
                "SELECT id FROM docs WHERE url = ?1",
                params![doc.url],
                |r| r.get(0),
            )?;

            tx.execute("DELETE FROM doc_tokens WHERE doc_id = ?1", params![id])?;
            tx.execute("DELETE FROM doc_cats WHERE doc_id = ?1", params![id])?;
            tx.execute("DELETE FROM doc_entities WHERE doc_id = ?1", params![id])?;

            for token in &doc.tokens {
                tx.execute(
                    "INSERT INTO doc_tokens (doc_id, token) VALUES (?1, ?2)",
                    params![id, token],
                )?;
            }
            for cat in &doc.cats {
                tx.execute(
                    "INSERT INTO doc_cats (doc_id, category) VALUES (?1, ?2)",
                    params![id, cat],
                )?;
            }
            for ent in &doc.ents {
                tx.execute(
                    "INSERT INTO doc_entities (doc_id, type, value) VALUES (?1, ?2, ?3)",
                    params![id, ent.entity_type, ent.value],
                )?;
            }

            cancel.check()?;
            tx.commit()?;

            Ok(Document {
                id,
                url: doc.url,
                title: doc.title,
                outlet: doc.outlet,
                published_at: doc.published_at,
                links_out: doc.links_out,
                tokens: doc.tokens,
                cats: doc.cats,
                ents: doc.ents,
            })
        })
    }

    fn get_doc(&self, id: i64, cancel: &CancellationToken) -> Result<Option<Document>> {
        cancel.check()?;
        self.with_conn(|conn| Self::load_doc(conn, id))
    }

    fn get_doc_by_url(&self, url: &str, cancel: &CancellationToken) -> Result<Option<Document>> {
        cancel.check()?;
        self.with_conn(|conn| {
            let id: Option<i64> = conn
                .query_row("SELECT id FROM docs WHERE url = ?1", params![url], |r| {
                    r.get(0)
                })
                .optional()?;
            match id {
                Some(id) => Self::load_doc(conn, id),
                None => Ok(None),
            }
        })
    }

    fn get_docs_by_tokens(
        &self,
        tokens: &[String],
        limit: i64,
        cancel: &CancellationToken,
    ) -> Result<Vec<Document>> {
        cancel.check()?;
        let mut dedup: Vec<&String> = Vec::new();
        for t in tokens {
            if !dedup.contains(&t) {
                dedup.push(t);
            }
        }
        if dedup.is_empty() {
            return Ok(Vec::new());
        }
        let limit = if limit <= 0 { 20 } else { limit };

        self.with_conn(|conn| {
            let placeholders = dedup.iter().map(|_| "?").collect::<Vec<_>>().join(", ");
            let sql = format!(
                "SELECT DISTINCT dt.doc_id FROM doc_tokens dt
                 JOIN docs d ON d.id = dt.doc_id
                 WHERE dt.token IN ({placeholders})
                 ORDER BY d.published_at DESC
                 LIMIT ?"
            );
            let mut stmt = conn.prepare(&sql)?;
            let mut rusqlite_params: Vec<&dyn rusqlite::ToSql> =
                dedup.iter().map(|t| *t as &dyn rusqlite::ToSql).collect();
            rusqlite_params.push(&limit);

            let ids: Vec<i64> = stmt
                .query_map(rusqlite_params.as_slice(), |r| r.get(0))?
                .collect::<std::result::Result<_, _>>()?;

            cancel.check()?;

            let mut docs = Vec::with_capacity(ids.len());
            for id in ids {
                if let Some(doc) = Self::load_doc(conn, id)? {
                    docs.push(doc);
                }
            }
            docs.sort_by(|a, b| b.published_at.cmp(&a.published_at));
            Ok(docs)
        })
    }

    fn upsert_token_df(&self, token: &str, df: i64, cancel: &CancellationToken) -> Result<()> {
        cancel.check()?;
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO token_df (token, df) VALUES (?1, ?2)
                 ON CONFLICT(token) DO UPDATE SET df = excluded.df",
                params![token, df],
            )?;
            Ok(())
        })
    }

    fn get_token_df(&self, token: &str, cancel: &CancellationToken) -> Result<i64> {
        cancel.check()?;
        self.with_conn(|conn| {
            let df: Option<i64> = conn
                .query_row(
                    "SELECT df FROM token_df WHERE token = ?1",
                    params![token],
                    |r| r.get(0),
                )
                .optional()?;
            Ok(df.unwrap_or(0))
        })
    }

    fn inc_pair(&self, t1: &str, t2: &str, cancel: &CancellationToken) -> Result<()> {
        cancel.check()?;
        if t1 == t2 {
            return Ok(());
        }
        let (a, b) = canon_pair(t1, t2);
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO token_pairs (t1, t2, count) VALUES (?1, ?2, 1)
                 ON CONFLICT(t1, t2) DO UPDATE SET count = count + 1",
                params![a, b],
            )?;
            Ok(())
        })
    }

    fn dec_pair(&self, t1: &str, t2: &str, cancel: &CancellationToken) -> Result<()> {
        cancel.check()?;
        if t1 == t2 {
            return Ok(());
        }
        let (a, b) = canon_pair(t1, t2);
        self.with_conn(|conn| {
            conn.execute(
                "UPDATE token_pairs SET count = count - 1 WHERE t1 = ?1 AND t2 = ?2 AND count > 0",
                params![a, b],
            )?;
            conn.execute(
                "DELETE FROM token_pairs WHERE t1 = ?1 AND t2 = ?2 AND count <= 0",
                params![a, b],
            )?;
            Ok(())
        })
    }

    fn get_pmi(&self, t1: &str, t2: &str, cancel: &CancellationToken) -> Result<Option<f64>> {
        cancel.check()?;
        if t1 == t2 {
            return Ok(None);
        }
        let (a, b) = canon_pair(t1, t2);

        self.with_conn(|conn| {
            let n = Self::total_docs(conn)?;
            if n == 0 {
                return Ok(None);
            }

            let count: Option<i64> = conn
                .query_row(
                    "SELECT count FROM token_pairs WHERE t1 = ?1 AND t2 = ?2",
                    params![a, b],
                    |r| r.get(0),
                )
                .optional()?;
            let count = match count {
                Some(c) => c,
                None => return Ok(None),
            };

            // Arguments passed to the scorer in their *original* (possibly
            // unsorted) order; PMI's symmetry makes this safe.
            let df_t1: i64 = conn
                .query_row(
                    "SELECT df FROM token_df WHERE token = ?1",
                    params![t1],
                    |r| r.get(0),
                )
                .optional()?
                .unwrap_or(0);
            let df_t2: i64 = conn
                .query_row(
                    "SELECT df FROM token_df WHERE token = ?1",
                    params![t2],
                    |r| r.get(0),
                )
                .optional()?
                .unwrap_or(0);

            let score = pmi::score(
                count as u64,
                df_t1 as u64,
                df_t2 as u64,
                n as u64,
                self.config.use_npmi,
                self.pmi_config,
            );
            Ok(Some(score))
        })
    }

    fn top_neighbors(
        &self,
        token: &str,
        k: i64,
        cancel: &CancellationToken,
    ) -> Result<Vec<Neighbor>> {
        cancel.check()?;
        let k = if k <= 0 { 10 } else { k };

        self.with_conn(|conn| {
            let n = Self::total_docs(conn)?;
            let df_token: i64 = conn
                .query_row(
                    "SELECT df FROM token_df WHERE token = ?1",
                    params![token],
                    |r| r.get(0),
                )
                .optional()?
                .unwrap_or(0);

            if df_token == 0 || n == 0 {
                return Ok(Vec::new());
            }

            let mut stmt = conn.prepare(
                "SELECT t1, t2, count FROM token_pairs WHERE t1 = ?1 OR t2 = ?1",
            )?;
            let rows = stmt.query_map(params![token], |r| {
                Ok((
                    r.get::<_, String>(0)?,
                    r.get::<_, String>(1)?,
                    r.get::<_, i64>(2)?,
                ))
            })?;

            cancel.check()?;

            let mut scored = Vec::new();
            for row in rows {
                let (t1, t2, count) = row?;
                let neighbor = if t1 == token { t2 } else { t1 };

                let df_neighbor: i64 = conn
                    .query_row(
                        "SELECT df FROM token_df WHERE token = ?1",
                        params![neighbor],
                        |r| r.get(0),
                    )
                    .optional()?
                    .unwrap_or(0);

                if df_neighbor < self.config.min_df {
                    continue;
                }

                let score = pmi::score(
                    count as u64,
                    df_token as u64,
                    df_neighbor as u64,
                    n as u64,
                    self.config.use_npmi,
                    self.pmi_config,
                );
                scored.push(Neighbor {
                    token: neighbor,
                    score,
                });
            }

            scored.sort_by(|a, b| {
                b.score
                    .partial_cmp(&a.score)
                    .unwrap_or(std::cmp::Ordering::Equal)
                    .then_with(|| a.token.cmp(&b.token))
            });
            scored.truncate(k as usize);
            Ok(scored)
        })
    }

    fn upsert_card(&self, card: Card, cancel: &CancellationToken) -> Result<()> {
        cancel.check()?;
        let bullets = serde_json::to_string(&card.bullets)?;
        let sources = serde_json::to_string(&card.sources)?;

        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO cards (id, title, bullets, sources, score_json, period)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                 ON CONFLICT(id) DO UPDATE SET
                    title = excluded.title,
                    bullets = excluded.bullets,
                    sources = excluded.sources,
                    score_json = excluded.score_json,
                    period = excluded.period",
                params![
                    card.id,
                    card.title,
                    bullets,
                    sources,
                    card.score_json,
                    card.period
                ],
            )?;
            Ok(())
        })
    }

    fn get_cards_by_period(
        &self,
        period: &str,
        k: i64,
        cancel: &CancellationToken,
    ) -> Result<Vec<Card>> {
        cancel.check()?;
        let k = if k <= 0 { 20 } else { k };

        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, title, bullets, sources, score_json, period
                 FROM cards WHERE period = ?1 ORDER BY id DESC LIMIT ?2",
            )?;
            let rows = stmt.query_map(params![period, k], |r| {
                Ok((
                    r.get::<_, String>(0)?,
                    r.get::<_, String>(1)?,
                    r.get::<_, String>(2)?,
                    r.get::<_, String>(3)?,
                    r.get::<_, String>(4)?,
                    r.get::<_, String>(5)?,
                ))
            })?;

            let mut cards = Vec::new();
            for row in rows {
                let (id, title, bullets_json, sources_json, score_json, period) = row?;
                let bullets: Vec<String> = serde_json::from_str(&bullets_json)?;
                let sources: Vec<String> = serde_json::from_str(&sources_json)?;
                cards.push(Card {
                    id,
                    title,
                    bullets,
                    sources,
                    score_json,
                    period,
                });
            }
            Ok(cards)
        })
    }

    fn upsert_stoplist(&self, tokens: &[String], cancel: &CancellationToken) -> Result<()> {
        cancel.check()?;
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;
            tx.execute("DELETE FROM stoplist", [])?;
            for token in tokens {
                if token.is_empty() {
                    continue;
                }
                tx.execute(
                    "INSERT OR IGNORE INTO stoplist (token) VALUES (?1)",
                    params![token],
                )?;
            }
            tx.commit()?;
            Ok(())
        })
    }

    fn upsert_dict_entry(
        &self,
        phrase: &str,
        canonical: &str,
        category: &str,
        cancel: &CancellationToken,
    ) -> Result<()> {
        cancel.check()?;
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO dict_entries (phrase, canonical, category) VALUES (?1, ?2, ?3)
                 ON CONFLICT(phrase) DO UPDATE SET
                    canonical = excluded.canonical,
                    category = excluded.category",
                params![phrase, canonical, category],
            )?;
            Ok(())
        })
    }

    fn add_sector_keyword(
        &self,
        name: &str,
        keyword: &str,
        cancel: &CancellationToken,
    ) -> Result<()> {
        cancel.check()?;
        let keyword = keyword.to_lowercase();
        self.with_conn(|conn| {
            conn.execute(
                "INSERT OR IGNORE INTO taxonomy_sectors (name, keyword) VALUES (?1, ?2)",
                params![name, keyword],
            )?;
            Ok(())
        })
    }

    fn add_event_keyword(
        &self,
        name: &str,
        keyword: &str,
        cancel: &CancellationToken,
    ) -> Result<()> {
        cancel.check()?;
        let keyword = keyword.to_lowercase();
        self.with_conn(|conn| {
            conn.execute(
                "INSERT OR IGNORE INTO taxonomy_events (name, keyword) VALUES (?1, ?2)",
                params![name, keyword],
            )?;
            Ok(())
        })
    }

    fn add_region_keyword(
        &self,
        name: &str,
        keyword: &str,
        cancel: &CancellationToken,
    ) -> Result<()> {
        cancel.check()?;
        let keyword = keyword.to_lowercase();
        self.with_conn(|conn| {
            conn.execute(
                "INSERT OR IGNORE INTO taxonomy_regions (name, keyword) VALUES (?1, ?2)",
                params![name, keyword],
            )?;
            Ok(())
        })
    }

    fn add_entity_keyword(
        &self,
        entity_type: &str,
        name: &str,
        keyword: &str,
        cancel: &CancellationToken,
    ) -> Result<()> {
        cancel.check()?;
        let keyword = keyword.to_lowercase();
        self.with_conn(|conn| {
            conn.execute(
                "INSERT OR IGNORE INTO taxonomy_entities (type, name, keyword) VALUES (?1, ?2, ?3)",
                params![entity_type, name, keyword],
            )?;
            Ok(())
        })
    }

    fn stoplist(&self, cancel: &CancellationToken) -> Result<Option<Stoplist>> {
        cancel.check()?;
        self.with_conn(|conn| {
            let mut stmt = conn.prepare("SELECT token FROM stoplist")?;
            let tokens: Vec<String> = stmt
                .query_map([], |r| r.get(0))?
                .collect::<std::result::Result<_, _>>()?;
            if tokens.is_empty() {
                Ok(None)
            } else {
                Ok(Some(Stoplist::from_tokens(tokens)))
            }
        })
    }

    fn dictionary(&self, cancel: &CancellationToken) -> Result<Option<Dictionary>> {
        cancel.check()?;
        self.with_conn(|conn| {
            let mut stmt = conn.prepare("SELECT phrase, canonical, category FROM dict_entries")?;
            let entries: Vec<(String, String, String)> = stmt
                .query_map([], |r| Ok((r.get(0)?, r.get(1)?, r.get(2)?)))?
                .collect::<std::result::Result<_, _>>()?;
            if entries.is_empty() {
                Ok(None)
            } else {
                Ok(Some(Dictionary::from_entries(entries)))
            }
        })
    }

    fn taxonomy(&self, cancel: &CancellationToken) -> Result<Option<Taxonomy>> {
        cancel.check()?;
        self.with_conn(|conn| {
            let mut taxonomy = Taxonomy::new();
            let mut any = false;

            let mut stmt = conn.prepare("SELECT name, keyword FROM taxonomy_sectors")?;
            for row in stmt.query_map([], |r| Ok((r.get::<_, String>(0)?, r.get::<_, String>(1)?)))? {
                let (name, keyword) = row?;
                taxonomy.add_sector_keyword(&name, &keyword);
                any = true;
            }

            let mut stmt = conn.prepare("SELECT name, keyword FROM taxonomy_events")?;
            for row in stmt.query_map([], |r| Ok((r.get::<_, String>(0)?, r.get::<_, String>(1)?)))? {
                let (name, keyword) = row?;
                taxonomy.add_event_keyword(&name, &keyword);
                any = true;
            }

            let mut stmt = conn.prepare("SELECT name, keyword FROM taxonomy_regions")?;
            for row in stmt.query_map([], |r| Ok((r.get::<_, String>(0)?, r.get::<_, String>(1)?)))? {
                let (name, keyword) = row?;
                taxonomy.add_region_keyword(&name, &keyword);
                any = true;
            }

            let mut stmt = conn.prepare("SELECT type, name, keyword FROM taxonomy_entities")?;
            for row in stmt.query_map([], |r| {
                Ok((r.get::<_, String>(0)?, r.get::<_, String>(1)?, r.get::<_, String>(2)?))
            })? {
                let (entity_type, name, keyword) = row?;
                taxonomy.add_entity_keyword(&entity_type, &name, &keyword);
                any = true;
            }

            if any {
                Ok(Some(taxonomy))
            } else {
                Ok(None)
            }
        })
    }

    fn close(self: Box<Self>) -> Result<()> {
        let mut guard = self.conn.lock();
        *guard = None;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;

    fn doc(url: &str) -> NewDocument {
        NewDocument {
            url: url.to_string(),
            title: "Title".to_string(),
            outlet: "Outlet".to_string(),
            published_at: Utc::now(),
            links_out: 3,
            tokens: BTreeSet::from(["alpha".to_string(), "beta".to_string()]),
            cats: BTreeSet::new(),
            ents: BTreeSet::new(),
        }
    }

    #[test]
    fn scenario_s1_upsert_then_get_by_url_round_trips() {
        let store = SqliteStore::open_in_memory(StoreConfig::default()).unwrap();
        let cancel = CancellationToken::new();

        let inserted = store.upsert_doc(doc("/a"), &cancel).unwrap();
        let fetched = store.get_doc_by_url("/a", &cancel).unwrap().unwrap();
        assert_eq!(inserted, fetched);
        assert!(fetched.tokens.contains("alpha"));
    }

    #[test]
    fn upsert_is_idempotent_on_url() {
        let store = SqliteStore::open_in_memory(StoreConfig::default()).unwrap();
        let cancel = CancellationToken::new();

        let first = store.upsert_doc(doc("/a"), &cancel).unwrap();
        let second = store.upsert_doc(doc("/a"), &cancel).unwrap();
        assert_eq!(first.id, second.id);
    }

    #[test]
    fn opening_existing_file_twice_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("store.db");

        let store1 = SqliteStore::open(&path, StoreConfig::default()).unwrap();
        store1.upsert_doc(doc("/a"), &CancellationToken::new()).unwrap();
        Box::new(store1).close().unwrap();

        let store2 = SqliteStore::open(&path, StoreConfig::default()).unwrap();
        let fetched = store2
            .get_doc_by_url("/a", &CancellationToken::new())
            .unwrap();
        assert!(fetched.is_some());
    }

    #[test]
    fn closed_store_errors_on_further_calls() {
        let store = SqliteStore::open_in_memory(StoreConfig::default()).unwrap();
        let shared_conn = Arc::clone(&store.conn);
        let outstanding = SqliteStore {
            conn: shared_conn,
            config: store.config,
            pmi_config: store.pmi_config,
        };

        Box::new(store).close().unwrap();

        let result = outstanding.get_doc_by_url("/a", &CancellationToken::new());
        assert!(matches!(result, Err(Error::Closed)));
    }

    #[test]
    fn cancellation_aborts_before_commit() {
        let store = SqliteStore::open_in_memory(StoreConfig::default()).unwrap();
        let cancel = CancellationToken::new();
        cancel.cancel();

        let result = store.upsert_doc(doc("/a"), &cancel);
        assert!(matches!(result, Err(Error::Cancelled)));

        let fetched = store
            .get_doc_by_url("/a", &CancellationToken::new())
            .unwrap();
        assert!(fetched.is_none());
    }

    #[test]
    fn pmi_none_when_pair_unseen() {
        let store = SqliteStore::open_in_memory(StoreConfig::default()).unwrap();
        let cancel = CancellationToken::new();
        store.upsert_doc(doc("/a"), &cancel).unwrap();
        store.upsert_token_df("alpha", 1, &cancel).unwrap();
        store.upsert_token_df("beta", 1, &cancel).unwrap();

        assert!(store.get_pmi("alpha", "beta", &cancel).unwrap().is_none());

        store.inc_pair("alpha", "beta", &cancel).unwrap();
        assert!(store.get_pmi("alpha", "beta", &cancel).unwrap().is_some());
    }
}
