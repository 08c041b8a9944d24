//! Entity autotuner: a threshold-gated suggestion producer with an
//! optional reviewer gate. Consumes a [`StatsProvider`] of per-entity
//! mention statistics and proposes taxonomy entries worth adding.

use tracing::{debug, info};

use crate::error::Result;

/// Mention statistics for one candidate entity, as surfaced by whatever
/// upstream mention-mining process feeds the autotuner.
#[derive(Debug, Clone, PartialEq)]
pub struct MentionStats {
    pub entity_type: String,
    pub name: String,
    pub variant: String,
    pub occurrences: u32,
    pub confidence: f64,
}

/// A proposed taxonomy addition.
#[derive(Debug, Clone, PartialEq)]
pub struct Suggestion {
    pub entity_type: String,
    pub name: String,
    pub variant: String,
    pub occurrences: u32,
    pub confidence: f64,
}

/// Supplies the stream of candidate mentions to evaluate.
pub trait StatsProvider {
    fn stats(&self) -> Result<Vec<MentionStats>>;
}

/// Optional human/automated review gate. Returning `Ok(false)` drops the
/// suggestion; returning `Err` aborts the whole run.
pub trait Reviewer {
    fn review(&self, suggestion: &Suggestion) -> Result<bool>;
}

/// Thresholds applied to candidate stats. A zero value in either field
/// means "use the default" rather than "require zero".
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AutotuneConfig {
    pub min_occurrences: u32,
    pub min_confidence: f64,
}

impl Default for AutotuneConfig {
    fn default() -> Self {
        AutotuneConfig {
            min_occurrences: 3,
            min_confidence: 0.6,
        }
    }
}

impl AutotuneConfig {
    fn effective_min_occurrences(&self) -> u32 {
        if self.min_occurrences == 0 {
            AutotuneConfig::default().min_occurrences
        } else {
            self.min_occurrences
        }
    }

    fn effective_min_confidence(&self) -> f64 {
        if self.min_confidence == 0.0 {
            AutotuneConfig::default().min_confidence
        } else {
            self.min_confidence
        }
    }
}

pub struct EntityAutotuner<'a> {
    config: AutotuneConfig,
    reviewer: Option<&'a dyn Reviewer>,
}

impl<'a> EntityAutotuner<'a> {
    pub fn new(config: AutotuneConfig) -> Self {
        EntityAutotuner {
            config,
            reviewer: None,
        }
    }

    pub fn with_reviewer(mut self, reviewer: &'a dyn Reviewer) -> Self {
        self.reviewer = Some(reviewer);
        self
    }

    /// Emits a suggestion for every stat meeting both thresholds. If a
    /// reviewer is attached, each suggestion is routed through it; the
    /// reviewer returning `false` drops it, returning an error aborts the
    /// run. With no reviewer, suggestions flow through unfiltered.
    pub fn run(&self, provider: &dyn StatsProvider) -> Result<Vec<Suggestion>> {
        let min_occ = self.config.effective_min_occurrences();
        let min_conf = self.config.effective_min_confidence();

        let mut out = Vec::new();
        for stat in provider.stats()? {
            if stat.occurrences < min_occ || stat.confidence < min_conf {
                continue;
            }

            let suggestion = Suggestion {
                entity_type: stat.entity_type,
                name: stat.name,
                variant: stat.variant,
                occurrences: stat.occurrences,
                confidence: stat.confidence,
            };

            if let Some(reviewer) = self.reviewer {
                if !reviewer.review(&suggestion)? {
                    debug!(
                        entity_type = %suggestion.entity_type,
                        name = %suggestion.name,
                        "suggestion rejected by reviewer"
                    );
                    continue;
                }
            }

            info!(
                entity_type = %suggestion.entity_type,
                name = %suggestion.name,
                occurrences = suggestion.occurrences,
                "entity suggestion emitted"
            );
            out.push(suggestion);
        }

        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FixedStats(Vec<MentionStats>);
    impl StatsProvider for FixedStats {
        fn stats(&self) -> Result<Vec<MentionStats>> {
            Ok(self.0.clone())
        }
    }

    struct RejectAll;
    impl Reviewer for RejectAll {
        fn review(&self, _s: &Suggestion) -> Result<bool> {
            Ok(false)
        }
    }

    fn stat(occurrences: u32, confidence: f64) -> MentionStats {
        MentionStats {
            entity_type: "company".to_string(),
            name: "Acme".to_string(),
            variant: "ACME".to_string(),
            occurrences,
            confidence,
        }
    }

    #[test]
    fn both_thresholds_must_pass() {
        let tuner = EntityAutotuner::new(AutotuneConfig::default());
        let provider = FixedStats(vec![stat(5, 0.9), stat(2, 0.9), stat(5, 0.1)]);
        let suggestions = tuner.run(&provider).unwrap();
        assert_eq!(suggestions.len(), 1);
    }

    #[test]
    fn zero_fields_use_defaults() {
        let tuner = EntityAutotuner::new(AutotuneConfig {
            min_occurrences: 0,
            min_confidence: 0.0,
        });
        let provider = FixedStats(vec![stat(3, 0.6), stat(2, 0.6)]);
        let suggestions = tuner.run(&provider).unwrap();
        assert_eq!(suggestions.len(), 1);
    }

    #[test]
    fn reviewer_can_reject_all() {
        let reviewer = RejectAll;
        let tuner = EntityAutotuner::new(AutotuneConfig::default()).with_reviewer(&reviewer);
        let provider = FixedStats(vec![stat(10, 0.9)]);
        let suggestions = tuner.run(&provider).unwrap();
        assert!(suggestions.is_empty());
    }
}
