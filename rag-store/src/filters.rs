//! Metadata filter clauses and their conversion to Qdrant `Filter`.
//!
//! Only exact equality and conjunction are expressible, so a filter can only
//! ever narrow a result set. The Qdrant form nests a `should` per equality
//! to cover both numeric and keyword payloads for the same value.

use qdrant_client::qdrant::{Condition, Filter, Range};
use tracing::debug;

use crate::record::{MetaValue, Metadata};

#[derive(Clone, Debug, PartialEq)]
pub enum MetaFilter {
    Eq { key: String, value: MetaValue },
    And(Vec<MetaFilter>),
}

impl MetaFilter {
    pub fn eq(key: impl Into<String>, value: impl Into<MetaValue>) -> Self {
        MetaFilter::Eq {
            key: key.into(),
            value: value.into(),
        }
    }

    /// Combines conditions: none → `None`, one → that condition unwrapped,
    /// several → `And`.
    pub fn all(mut conds: Vec<MetaFilter>) -> Option<Self> {
        match conds.len() {
            0 => None,
            1 => conds.pop(),
            _ => Some(MetaFilter::And(conds)),
        }
    }

    /// Flattened list of equality conditions.
    pub fn conditions(&self) -> Vec<(&str, &MetaValue)> {
        match self {
            MetaFilter::Eq { key, value } => vec![(key.as_str(), value)],
            MetaFilter::And(items) => items.iter().flat_map(|f| f.conditions()).collect(),
        }
    }

    /// Evaluates the filter against stored metadata (missing key → no match).
    pub fn matches(&self, md: &Metadata) -> bool {
        match self {
            MetaFilter::Eq { key, value } => md.get(key).is_some_and(|v| v.loosely_eq(value)),
            MetaFilter::And(items) => items.iter().all(|f| f.matches(md)),
        }
    }
}

/// Converts [`MetaFilter`] to a Qdrant [`Filter`] with one `must` entry per equality.
///
/// Payload types follow what ingestion stored, so each equality accepts the
/// same representations as [`MetaValue::loosely_eq`]:
/// - `Bool` → boolean match
/// - `Num` → nested `should` of an exact range and its decimal keyword
/// - numeric `Str` → nested `should` of the keyword and an exact range
/// - other `Str` → keyword match
pub fn to_qdrant_filter(f: &MetaFilter) -> Filter {
    let conds = f.conditions();
    debug!(target: "rag_store::filters", conditions = conds.len(), "to_qdrant_filter");

    let must: Vec<Condition> = conds
        .into_iter()
        .map(|(key, value)| match value {
            MetaValue::Bool(b) => Condition::matches(key, *b),
            MetaValue::Num(n) => match n.as_f64() {
                Some(x) => either(key, x, n.to_string()),
                None => Condition::matches(key, n.to_string()),
            },
            MetaValue::Str(s) => match numeric(s) {
                Some(x) => either(key, x, s.clone()),
                None => Condition::matches(key, s.clone()),
            },
        })
        .collect();

    Filter::must(must)
}

fn numeric(s: &str) -> Option<f64> {
    s.trim().parse::<f64>().ok().filter(|x| x.is_finite())
}

/// `key` equal to `x` as a number, or to `keyword` as a string.
fn either(key: &str, x: f64, keyword: String) -> Condition {
    let exact = Range {
        gte: Some(x),
        lte: Some(x),
        ..Default::default()
    };
    Filter::should([Condition::range(key, exact), Condition::matches(key, keyword)]).into()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn md(pairs: &[(&str, MetaValue)]) -> Metadata {
        pairs.iter().map(|(k, v)| (k.to_string(), v.clone())).collect()
    }

    #[test]
    fn single_condition_is_unwrapped() {
        let f = MetaFilter::all(vec![MetaFilter::eq("state", "Rajasthan")]).unwrap();
        assert!(matches!(f, MetaFilter::Eq { .. }));
        assert!(MetaFilter::all(vec![]).is_none());
    }

    #[test]
    fn conjunction_requires_every_condition() {
        let f = MetaFilter::all(vec![
            MetaFilter::eq("state", "Rajasthan"),
            MetaFilter::eq("year", "2023"),
        ])
        .unwrap();
        let hit = md(&[("state", "Rajasthan".into()), ("year", 2023.into())]);
        let miss = md(&[("state", "Rajasthan".into()), ("year", 2022.into())]);
        let missing = md(&[("state", "Rajasthan".into())]);
        assert!(f.matches(&hit));
        assert!(!f.matches(&miss));
        assert!(!f.matches(&missing));
    }

    #[test]
    fn qdrant_filter_uses_must_only() {
        let f = MetaFilter::all(vec![
            MetaFilter::eq("state", "Rajasthan"),
            MetaFilter::eq("source_type", "annexure_3a"),
            MetaFilter::eq("year", 2023),
        ])
        .unwrap();
        let q = to_qdrant_filter(&f);
        assert_eq!(q.must.len(), 3);
        assert!(q.should.is_empty());
    }
}
