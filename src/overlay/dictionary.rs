use std::collections::BTreeMap;

/// Snapshot view over the phrase dictionary: `phrase -> (canonical, category)`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Dictionary {
    entries: BTreeMap<String, (String, String)>,
}

impl Dictionary {
    pub fn from_entries<I: IntoIterator<Item = (String, String, String)>>(entries: I) -> Self {
        let mut map = BTreeMap::new();
        for (phrase, canonical, category) in entries {
            map.insert(phrase, (canonical, category));
        }
        Dictionary { entries: map }
    }

    /// Returns `(canonical, category)` if `phrase` is a known key.
    pub fn lookup(&self, phrase: &str) -> Option<(&str, &str)> {
        self.entries
            .get(phrase)
            .map(|(canonical, category)| (canonical.as_str(), category.as_str()))
    }

    /// All entries, sorted by phrase.
    pub fn all_entries(&self) -> Vec<(String, String, String)> {
        self.entries
            .iter()
            .map(|(phrase, (canonical, category))| {
                (phrase.clone(), canonical.clone(), category.clone())
            })
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_returns_canonical_and_category() {
        let d = Dictionary::from_entries([(
            "ai".to_string(),
            "artificial intelligence".to_string(),
            "tech".to_string(),
        )]);
        assert_eq!(d.lookup("ai"), Some(("artificial intelligence", "tech")));
        assert_eq!(d.lookup("missing"), None);
    }

    #[test]
    fn all_entries_sorted_by_phrase() {
        let d = Dictionary::from_entries([
            ("zeta".to_string(), "z".to_string(), "c".to_string()),
            ("alpha".to_string(), "a".to_string(), "c".to_string()),
        ]);
        let entries = d.all_entries();
        assert_eq!(entries[0].0, "alpha");
        assert_eq!(entries[1].0, "zeta");
    }
}
