use std::collections::BTreeSet;

/// Snapshot view over the stopword set. Membership is case-sensitive, exact
/// match — the store does no case folding before storing a stopword.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Stoplist {
    tokens: BTreeSet<String>,
}

impl Stoplist {
    pub fn from_tokens<I: IntoIterator<Item = String>>(tokens: I) -> Self {
        Stoplist {
            tokens: tokens.into_iter().filter(|t| !t.is_empty()).collect(),
        }
    }

    pub fn is_stop(&self, token: &str) -> bool {
        self.tokens.contains(token)
    }

    /// All stopwords, sorted ascending.
    pub fn all_stops(&self) -> Vec<String> {
        self.tokens.iter().cloned().collect()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exact_match_is_case_sensitive() {
        let s = Stoplist::from_tokens(["the".to_string()]);
        assert!(s.is_stop("the"));
        assert!(!s.is_stop("The"));
    }

    #[test]
    fn all_stops_sorted_ascending() {
        let s = Stoplist::from_tokens(["the".to_string(), "a".to_string(), "an".to_string()]);
        assert_eq!(s.all_stops(), vec!["a", "an", "the"]);
    }

    #[test]
    fn empty_strings_dropped() {
        let s = Stoplist::from_tokens(["".to_string(), "ok".to_string()]);
        assert_eq!(s.all_stops(), vec!["ok"]);
    }
}
