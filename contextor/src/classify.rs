//! Broad vs. targeted query classification.
//!
//! A query is **broad** (state-level overview) when it carries no sub-state
//! scope and either contains an overview term or is short. Terms match as
//! whole words, case-insensitively: "blocks" is granular, "blockchain" is not.

use regex::{Regex, RegexBuilder};
use tracing::debug;

use crate::api_types::QueryFilters;
use crate::cfg::ClassifierConfig;
use crate::error::ContextorError;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Classification {
    pub broad: bool,
}

/// Compiled classifier; build once and share.
#[derive(Clone, Debug)]
pub struct Classifier {
    granular: Option<Regex>,
    overview: Option<Regex>,
    max_broad_tokens: usize,
}

impl Classifier {
    pub fn new(cfg: &ClassifierConfig) -> Result<Self, ContextorError> {
        Ok(Self {
            granular: word_set(&cfg.granular_terms)?,
            overview: word_set(&cfg.overview_terms)?,
            max_broad_tokens: cfg.max_broad_tokens,
        })
    }

    /// Pure function of `(query, filters)`.
    pub fn classify(&self, query: &str, filters: &QueryFilters) -> Classification {
        let granular = filters.has_sub_state_scope()
            || self.granular.as_ref().is_some_and(|re| re.is_match(query));
        let broad = !granular
            && (self.overview.as_ref().is_some_and(|re| re.is_match(query))
                || query.split_whitespace().count() <= self.max_broad_tokens);
        debug!(target: "contextor::classify", broad, granular, "classified query");
        Classification { broad }
    }
}

/// `\b(?:t1|t2|..)\b`, or `None` for an empty list.
fn word_set(terms: &[String]) -> Result<Option<Regex>, ContextorError> {
    let alts: Vec<String> = terms
        .iter()
        .map(|t| t.trim())
        .filter(|t| !t.is_empty())
        .map(regex::escape)
        .collect();
    if alts.is_empty() {
        return Ok(None);
    }
    RegexBuilder::new(&format!(r"\b(?:{})\b", alts.join("|")))
        .case_insensitive(true)
        .build()
        .map(Some)
        .map_err(|e| ContextorError::Config(format!("classifier terms: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn classifier() -> Classifier {
        Classifier::new(&ClassifierConfig::default()).unwrap()
    }

    fn no_filters() -> QueryFilters {
        QueryFilters::default()
    }

    #[test]
    fn overview_term_makes_long_query_broad() {
        let q = "Give me an overview of groundwater extraction trends across the state this year";
        assert!(classifier().classify(q, &no_filters()).broad);
    }

    #[test]
    fn short_query_is_broad() {
        assert!(classifier().classify("Tell me about Rajasthan", &no_filters()).broad);
    }

    #[test]
    fn granular_term_wins_over_overview() {
        let q = "Summary of over-exploited blocks in Punjab";
        assert!(!classifier().classify(q, &no_filters()).broad);
    }

    #[test]
    fn granular_terms_match_whole_words_only() {
        let q = "blockchain";
        assert!(classifier().classify(q, &no_filters()).broad);
        assert!(!classifier().classify("Which DISTRICT is worst?", &no_filters()).broad);
    }

    #[test]
    fn district_or_block_filter_forces_targeted() {
        let f = QueryFilters {
            district: Some("Jaipur".into()),
            ..Default::default()
        };
        assert!(!classifier().classify("Rajasthan", &f).broad);
    }

    #[test]
    fn long_query_without_overview_terms_is_targeted() {
        let q = "What is the annual extractable groundwater resource reported for Gujarat in 2023";
        assert!(!classifier().classify(q, &no_filters()).broad);
    }

    #[test]
    fn token_threshold_is_inclusive() {
        let c = classifier();
        assert!(c.classify("one two three four five six", &no_filters()).broad);
        assert!(!c.classify("one two three four five six seven", &no_filters()).broad);
    }
}
