//! Pure in-memory [`Store`] implementation — no file I/O. Used for tests
//! and for embedding in processes that don't want durability.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use parking_lot::Mutex;

use crate::config::StoreConfig;
use crate::cooccurrence::canon_pair;
use crate::error::Result;
use crate::overlay::{Dictionary, Stoplist, Taxonomy};
use crate::pmi::{self, PmiConfig};

use super::{CancellationToken, Card, Document, NewDocument, Neighbor, Store};

#[derive(Default)]
struct State {
    next_id: i64,
    docs_by_id: BTreeMap<i64, Document>,
    id_by_url: HashMap<String, i64>,
    token_df: HashMap<String, i64>,
    token_pairs: HashMap<(String, String), i64>,
    cards: HashMap<String, Card>,
    stoplist: BTreeSet<String>,
    dict_entries: BTreeMap<String, (String, String)>,
    taxonomy: Taxonomy,
    closed: bool,
}

pub struct MemStore {
    state: Mutex<State>,
    config: StoreConfig,
    pmi_config: PmiConfig,
}

impl MemStore {
    pub fn new(config: StoreConfig) -> Self {
        MemStore {
            state: Mutex::new(State::default()),
            config,
            pmi_config: PmiConfig::new(config.epsilon),
        }
    }
}

impl Store for MemStore {
    fn upsert_doc(&self, doc: NewDocument, cancel: &CancellationToken) -> Result<Document> {
        cancel.check()?;
        let doc = doc.normalize();
        let mut state = self.state.lock();
        if state.closed {
            return Err(crate::error::Error::Closed);
        }

        let id = if let Some(&id) = state.id_by_url.get(&doc.url) {
            id
        } else {
            state.next_id += 1;
            state.next_id
        };

        cancel.check()?;

        let record = Document {
            id,
            url: doc.url.clone(),
            title: doc.title,
            outlet: doc.outlet,
            published_at: doc.published_at,
            links_out: doc.links_out,
            tokens: doc.tokens,
            cats: doc.cats,
            ents: doc.ents,
        };

        state.id_by_url.insert(doc.url, id);
        state.docs_by_id.insert(id, record.clone());

        Ok(record)
    }

    fn get_doc(&self, id: i64, cancel: &CancellationToken) -> Result<Option<Document>> {
        cancel.check()?;
        Ok(self.state.lock().docs_by_id.get(&id).cloned())
    }

    fn get_doc_by_url(&self, url: &str, cancel: &CancellationToken) -> Result<Option<Document>> {
        cancel.check()?;
        let state = self.state.lock();
        Ok(state
            .id_by_url
            .get(url)
            .and_then(|id| state.docs_by_id.get(id))
            .cloned())
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

        let state = self.state.lock();
        let mut docs: Vec<Document> = state
            .docs_by_id
            .values()
            .filter(|d| dedup.iter().any(|t| d.tokens.contains(*t)))
            .cloned()
            .collect();
        docs.sort_by(|a, b| b.published_at.cmp(&a.published_at));
        docs.truncate(limit as usize);
        Ok(docs)
    }

    fn upsert_token_df(&self, token: &str, df: i64, cancel: &CancellationToken) -> Result<()> {
        cancel.check()?;
        self.state.lock().token_df.insert(token.to_string(), df);
        Ok(())
    }

    fn get_token_df(&self, token: &str, cancel: &CancellationToken) -> Result<i64> {
        cancel.check()?;
        Ok(self.state.lock().token_df.get(token).copied().unwrap_or(0))
    }

    fn inc_pair(&self, t1: &str, t2: &str, cancel: &CancellationToken) -> Result<()> {
        cancel.check()?;
        if t1 == t2 {
            return Ok(());
        }
        let pair = canon_pair(t1, t2);
        *self.state.lock().token_pairs.entry(pair).or_insert(0) += 1;
        Ok(())
    }

    fn dec_pair(&self, t1: &str, t2: &str, cancel: &CancellationToken) -> Result<()> {
        cancel.check()?;
        if t1 == t2 {
            return Ok(());
        }
        let pair = canon_pair(t1, t2);
        let mut state = self.state.lock();
        if let Some(count) = state.token_pairs.get_mut(&pair) {
            *count -= 1;
            if *count <= 0 {
                state.token_pairs.remove(&pair);
            }
        }
        Ok(())
    }

    fn get_pmi(&self, t1: &str, t2: &str, cancel: &CancellationToken) -> Result<Option<f64>> {
        cancel.check()?;
        if t1 == t2 {
            return Ok(None);
        }
        let pair = canon_pair(t1, t2);
        let state = self.state.lock();
        let n = state.docs_by_id.len() as u64;
        if n == 0 {
            return Ok(None);
        }
        let count = match state.token_pairs.get(&pair) {
            Some(&c) => c as u64,
            None => return Ok(None),
        };

        let df_t1 = state.token_df.get(t1).copied().unwrap_or(0) as u64;
        let df_t2 = state.token_df.get(t2).copied().unwrap_or(0) as u64;

        Ok(Some(pmi::score(
            count,
            df_t1,
            df_t2,
            n,
            self.config.use_npmi,
            self.pmi_config,
        )))
    }

    fn top_neighbors(
        &self,
        token: &str,
        k: i64,
        cancel: &CancellationToken,
    ) -> Result<Vec<Neighbor>> {
        cancel.check()?;
        let k = if k <= 0 { 10 } else { k };

        let state = self.state.lock();
        let n = state.docs_by_id.len() as u64;
        let df_token = state.token_df.get(token).copied().unwrap_or(0) as u64;
        if df_token == 0 || n == 0 {
            return Ok(Vec::new());
        }

        let mut scored = Vec::new();
        for ((a, b), &count) in state.token_pairs.iter() {
            let neighbor = if a == token {
                Some(b)
            } else if b == token {
                Some(a)
            } else {
                None
            };
            let neighbor = match neighbor {
                Some(n) => n,
                None => continue,
            };

            let df_neighbor = state.token_df.get(neighbor).copied().unwrap_or(0) as u64;
            if (df_neighbor as i64) < self.config.min_df {
                continue;
            }

            let score = pmi::score(
                count as u64,
                df_token,
                df_neighbor,
                n,
                self.config.use_npmi,
                self.pmi_config,
            );
            scored.push(Neighbor {
                token: neighbor.clone(),
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
    }

    fn upsert_card(&self, card: Card, cancel: &CancellationToken) -> Result<()> {
        cancel.check()?;
        self.state.lock().cards.insert(card.id.clone(), card);
        Ok(())
    }

    fn get_cards_by_period(
        &self,
        period: &str,
        k: i64,
        cancel: &CancellationToken,
    ) -> Result<Vec<Card>> {
        cancel.check()?;
        let k = if k <= 0 { 20 } else { k };
        let state = self.state.lock();
        let mut cards: Vec<Card> = state
            .cards
            .values()
            .filter(|c| c.period == period)
            .cloned()
            .collect();
        cards.sort_by(|a, b| b.id.cmp(&a.id));
        cards.truncate(k as usize);
        Ok(cards)
    }

    fn upsert_stoplist(&self, tokens: &[String], cancel: &CancellationToken) -> Result<()> {
        cancel.check()?;
        let mut state = self.state.lock();
        state.stoplist.clear();
        for t in tokens {
            if !t.is_empty() {
                state.stoplist.insert(t.clone());
            }
        }
        Ok(())
    }

    fn upsert_dict_entry(
        &self,
        phrase: &str,
        canonical: &str,
        category: &str,
        cancel: &CancellationToken,
    ) -> Result<()> {
        cancel.check()?;
        self.state
            .lock()
            .dict_entries
            .insert(phrase.to_string(), (canonical.to_string(), category.to_string()));
        Ok(())
    }

    fn add_sector_keyword(
        &self,
        name: &str,
        keyword: &str,
        cancel: &CancellationToken,
    ) -> Result<()> {
        cancel.check()?;
        self.state.lock().taxonomy.add_sector_keyword(name, keyword);
        Ok(())
    }

    fn add_event_keyword(
        &self,
        name: &str,
        keyword: &str,
        cancel: &CancellationToken,
    ) -> Result<()> {
        cancel.check()?;
        self.state.lock().taxonomy.add_event_keyword(name, keyword);
        Ok(())
    }

    fn add_region_keyword(
        &self,
        name: &str,
        keyword: &str,
        cancel: &CancellationToken,
    ) -> Result<()> {
        cancel.check()?;
        self.state.lock().taxonomy.add_region_keyword(name, keyword);
        Ok(())
    }

    fn add_entity_keyword(
        &self,
        entity_type: &str,
        name: &str,
        keyword: &str,
        cancel: &CancellationToken,
    ) -> Result<()> {
        cancel.check()?;
        self.state
            .lock()
            .taxonomy
            .add_entity_keyword(entity_type, name, keyword);
        Ok(())
    }

    fn stoplist(&self, cancel: &CancellationToken) -> Result<Option<Stoplist>> {
        cancel.check()?;
        let state = self.state.lock();
        if state.stoplist.is_empty() {
            Ok(None)
        } else {
            Ok(Some(Stoplist::from_tokens(state.stoplist.iter().cloned())))
        }
    }

    fn dictionary(&self, cancel: &CancellationToken) -> Result<Option<Dictionary>> {
        cancel.check()?;
        let state = self.state.lock();
        if state.dict_entries.is_empty() {
            Ok(None)
        } else {
            Ok(Some(Dictionary::from_entries(
                state
                    .dict_entries
                    .iter()
                    .map(|(p, (c, cat))| (p.clone(), c.clone(), cat.clone())),
            )))
        }
    }

    fn taxonomy(&self, cancel: &CancellationToken) -> Result<Option<Taxonomy>> {
        cancel.check()?;
        let state = self.state.lock();
        if state.taxonomy.is_empty() {
            Ok(None)
        } else {
            Ok(Some(state.taxonomy.clone()))
        }
    }

    fn close(self: Box<Self>) -> Result<()> {
        self.state.lock().closed = true;
        Ok(())
    }
}
