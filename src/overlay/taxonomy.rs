use std::collections::{BTreeSet, HashMap};

/// An extracted entity: a `(type, name)` pair found in some text.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ExtractedEntity {
    pub entity_type: String,
    pub name: String,
}

/// Snapshot view over the keyword taxonomy: sectors/events/regions
/// (`name -> keywords`) and entities (`type -> name -> keywords`). Keyword
/// matching is case-insensitive throughout.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Taxonomy {
    sectors: HashMap<String, BTreeSet<String>>,
    events: HashMap<String, BTreeSet<String>>,
    regions: HashMap<String, BTreeSet<String>>,
    entities: HashMap<String, HashMap<String, BTreeSet<String>>>,
}

impl Taxonomy {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_sector_keyword(&mut self, name: &str, keyword: &str) {
        self.sectors
            .entry(name.to_string())
            .or_default()
            .insert(keyword.to_lowercase());
    }

    pub fn add_event_keyword(&mut self, name: &str, keyword: &str) {
        self.events
            .entry(name.to_string())
            .or_default()
            .insert(keyword.to_lowercase());
    }

    pub fn add_region_keyword(&mut self, name: &str, keyword: &str) {
        self.regions
            .entry(name.to_string())
            .or_default()
            .insert(keyword.to_lowercase());
    }

    pub fn add_entity_keyword(&mut self, entity_type: &str, name: &str, keyword: &str) {
        self.entities
            .entry(entity_type.to_string())
            .or_default()
            .entry(name.to_string())
            .or_default()
            .insert(keyword.to_lowercase());
    }

    pub fn is_empty(&self) -> bool {
        self.sectors.is_empty()
            && self.events.is_empty()
            && self.regions.is_empty()
            && self.entities.is_empty()
    }

    /// Case-insensitive equality join of the lowercased token against the
    /// keyword column of sectors/events/regions; returns the distinct set
    /// of matching `name`s.
    pub fn categories_for_token(&self, token: &str) -> BTreeSet<String> {
        let lower = token.to_lowercase();
        let mut out = BTreeSet::new();
        for relation in [&self.sectors, &self.events, &self.regions] {
            for (name, keywords) in relation {
                if keywords.contains(&lower) {
                    out.insert(name.clone());
                }
            }
        }
        out
    }

    /// Lowercases `text` once; for every `(type, name, keyword)` row checks
    /// substring containment. Emits one entity per `(type, name)` on first
    /// hit and suppresses further hits for that pair.
    pub fn entities_in_text(&self, text: &str) -> Vec<ExtractedEntity> {
        let lower = text.to_lowercase();
        let mut out = Vec::new();
        for (entity_type, names) in &self.entities {
            for (name, keywords) in names {
                if keywords.iter().any(|kw| lower.contains(kw.as_str())) {
                    out.push(ExtractedEntity {
                        entity_type: entity_type.clone(),
                        name: name.clone(),
                    });
                }
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn categories_for_token_case_insensitive() {
        let mut t = Taxonomy::new();
        t.add_sector_keyword("Technology", "Cloud");
        assert_eq!(
            t.categories_for_token("CLOUD"),
            BTreeSet::from(["Technology".to_string()])
        );
    }

    #[test]
    fn entities_in_text_suppresses_duplicate_hits() {
        let mut t = Taxonomy::new();
        t.add_entity_keyword("company", "OpenAI", "openai");
        t.add_entity_keyword("company", "OpenAI", "gpt");
        let hits = t.entities_in_text("openai shipped gpt-5 today, openai again");
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].entity_type, "company");
        assert_eq!(hits[0].name, "OpenAI");
    }

    #[test]
    fn empty_taxonomy_reports_empty() {
        assert!(Taxonomy::new().is_empty());
    }
}
