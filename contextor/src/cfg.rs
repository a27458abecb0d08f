//! Runtime configuration loaded from environment variables.

use crate::error::ContextorError;

/// Granular (sub-state) terms; any of them makes a query narrow.
pub const DEFAULT_GRANULAR_TERMS: &[&str] = &[
    "block", "blocks", "district", "districts", "taluk", "taluks", "taluka", "talukas", "tehsil",
    "tehsils", "mandal", "mandals",
];

/// Overview terms; any of them (or a short query) makes a query broad.
pub const DEFAULT_OVERVIEW_TERMS: &[&str] = &[
    "overview", "summary", "summarize", "summarise", "overall", "total", "aggregate", "statewide",
    "entire", "whole",
];

/// Source categories queried by broad retrieval, in priority order.
pub const DEFAULT_BROAD_CATEGORIES: &[&str] = &[
    "attribute_summary",
    "annexure_3a",
    "annexure_3e",
    "state_report",
    "central_report",
];

/// Query classifier thresholds.
#[derive(Clone, Debug, PartialEq)]
pub struct ClassifierConfig {
    pub granular_terms: Vec<String>,
    pub overview_terms: Vec<String>,
    /// Queries with at most this many whitespace-separated tokens count as broad.
    pub max_broad_tokens: usize,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            granular_terms: DEFAULT_GRANULAR_TERMS.iter().map(|s| s.to_string()).collect(),
            overview_terms: DEFAULT_OVERVIEW_TERMS.iter().map(|s| s.to_string()).collect(),
            max_broad_tokens: 6,
        }
    }
}

/// Fan-out used for broad (state-level) questions.
#[derive(Clone, Debug, PartialEq)]
pub struct BroadConfig {
    pub categories: Vec<String>,
    pub per_category: usize,
    /// Results kept after merging all categories.
    pub limit: usize,
}

impl Default for BroadConfig {
    fn default() -> Self {
        Self {
            categories: DEFAULT_BROAD_CATEGORIES.iter().map(|s| s.to_string()).collect(),
            per_category: 2,
            limit: 8,
        }
    }
}

/// Config bag for the pipeline. All fields have defaults.
#[derive(Clone, Debug, PartialEq)]
pub struct ContextorConfig {
    pub classifier: ClassifierConfig,
    pub broad: BroadConfig,
    pub default_top_k: usize,
    pub max_top_k: usize,
    pub max_history: usize,
    pub suggestion_count: usize,
}

impl Default for ContextorConfig {
    fn default() -> Self {
        Self {
            classifier: ClassifierConfig::default(),
            broad: BroadConfig::default(),
            default_top_k: 5,
            max_top_k: 20,
            max_history: 6,
            suggestion_count: 3,
        }
    }
}

impl ContextorConfig {
    pub fn from_env() -> Result<Self, ContextorError> {
        Self::from_lookup(|k| std::env::var(k).ok())
    }

    /// Reads `RAG_TOP_K`, `RAG_MAX_TOP_K`, `BROAD_MAX_TOKENS`, `BROAD_CATEGORIES`,
    /// `BROAD_PER_CATEGORY`, `BROAD_LIMIT`, `MAX_HISTORY`, `SUGGESTION_COUNT`.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ContextorError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let d = Self::default();
        let get = |k: &str| lookup(k).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let categories = match get("BROAD_CATEGORIES") {
            Some(list) => list
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect(),
            None => d.broad.categories,
        };

        let cfg = Self {
            classifier: ClassifierConfig {
                max_broad_tokens: parse(&get, "BROAD_MAX_TOKENS", d.classifier.max_broad_tokens)?,
                ..d.classifier
            },
            broad: BroadConfig {
                categories,
                per_category: parse(&get, "BROAD_PER_CATEGORY", d.broad.per_category)?,
                limit: parse(&get, "BROAD_LIMIT", d.broad.limit)?,
            },
            default_top_k: parse(&get, "RAG_TOP_K", d.default_top_k)?,
            max_top_k: parse(&get, "RAG_MAX_TOP_K", d.max_top_k)?,
            max_history: parse(&get, "MAX_HISTORY", d.max_history)?,
            suggestion_count: parse(&get, "SUGGESTION_COUNT", d.suggestion_count)?,
        };
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<(), ContextorError> {
        if self.default_top_k == 0 || self.max_top_k < self.default_top_k {
            return Err(ContextorError::Config(
                "RAG_TOP_K must be > 0 and <= RAG_MAX_TOP_K".into(),
            ));
        }
        if self.broad.categories.is_empty() || self.broad.per_category == 0 || self.broad.limit == 0 {
            return Err(ContextorError::Config(
                "broad retrieval needs categories, a per-category cap and a limit".into(),
            ));
        }
        Ok(())
    }

    /// Effective `top_k` for a request hint.
    pub fn top_k(&self, hint: Option<usize>) -> usize {
        hint.unwrap_or(self.default_top_k).clamp(1, self.max_top_k)
    }
}

fn parse<G>(get: &G, key: &str, dflt: usize) -> Result<usize, ContextorError>
where
    G: Fn(&str) -> Option<String>,
{
    match get(key) {
        Some(v) => v
            .parse()
            .map_err(|_| ContextorError::Config(format!("{key} `{v}` is not a number"))),
        None => Ok(dflt),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let cfg = ContextorConfig::from_lookup(|_| None).unwrap();
        assert_eq!(cfg.default_top_k, 5);
        assert_eq!(cfg.classifier.max_broad_tokens, 6);
        assert_eq!(cfg.broad.per_category, 2);
        assert_eq!(cfg.broad.limit, 8);
        assert_eq!(cfg.broad.categories[0], "attribute_summary");
        assert_eq!(cfg.max_history, 6);
        assert_eq!(cfg.suggestion_count, 3);
    }

    #[test]
    fn categories_and_thresholds_are_overridable() {
        let cfg = ContextorConfig::from_lookup(|k| match k {
            "BROAD_CATEGORIES" => Some("state_report, annexure_1 ,".into()),
            "BROAD_MAX_TOKENS" => Some("4".into()),
            _ => None,
        })
        .unwrap();
        assert_eq!(cfg.broad.categories, vec!["state_report", "annexure_1"]);
        assert_eq!(cfg.classifier.max_broad_tokens, 4);
    }

    #[test]
    fn bad_numbers_are_config_errors() {
        let res = ContextorConfig::from_lookup(|k| (k == "RAG_TOP_K").then(|| "five".into()));
        assert!(matches!(res, Err(ContextorError::Config(_))));
    }

    #[test]
    fn top_k_hint_is_clamped() {
        let cfg = ContextorConfig::default();
        assert_eq!(cfg.top_k(None), 5);
        assert_eq!(cfg.top_k(Some(0)), 1);
        assert_eq!(cfg.top_k(Some(500)), 20);
    }
}
