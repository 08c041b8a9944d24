//! Store and scoring configuration.

/// Configuration surface exposed at store construction.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StoreConfig {
    pub use_npmi: bool,
    pub min_df: i64,
    pub epsilon: f64,
}

impl Default for StoreConfig {
    fn default() -> Self {
        StoreConfig {
            use_npmi: false,
            min_df: 1,
            epsilon: 1.0,
        }
    }
}

impl StoreConfig {
    /// Reads overrides from `COREL_USE_NPMI` / `COREL_MIN_DF` / `COREL_EPSILON`,
    /// falling back to `Default` for anything unset or unparseable.
    pub fn from_env() -> Self {
        let mut cfg = StoreConfig::default();

        if let Ok(v) = std::env::var("COREL_USE_NPMI") {
            if let Ok(b) = v.parse() {
                cfg.use_npmi = b;
            }
        }
        if let Ok(v) = std::env::var("COREL_MIN_DF") {
            if let Ok(n) = v.parse() {
                cfg.min_df = n;
            }
        }
        if let Ok(v) = std::env::var("COREL_EPSILON") {
            if let Ok(e) = v.parse() {
                cfg.epsilon = e;
            }
        }

        cfg
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let cfg = StoreConfig::default();
        assert!(!cfg.use_npmi);
        assert_eq!(cfg.min_df, 1);
        assert_eq!(cfg.epsilon, 1.0);
    }

    #[test]
    fn from_env_falls_back_on_missing_vars() {
        std::env::remove_var("COREL_USE_NPMI");
        std::env::remove_var("COREL_MIN_DF");
        std::env::remove_var("COREL_EPSILON");
        let cfg = StoreConfig::from_env();
        assert_eq!(cfg, StoreConfig::default());
    }
}
