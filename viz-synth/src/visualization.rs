//! Visualization descriptors shipped to clients.
//!
//! Every variant carries primitives only; `Collapsible` and `DataContainer`
//! nest further visualizations.

use serde::{Serialize, Serializer};

use crate::category::{CategoryBadge, Tone};

/// Marker emitted in place of an absent number.
pub const MISSING_MARKER: &str = "N/A";

/// A cell or metric value. `Missing` serializes as [`MISSING_MARKER`], never `0`.
#[derive(Clone, Debug, PartialEq)]
pub enum DataValue {
    Number(f64),
    Text(String),
    Missing,
}

impl DataValue {
    pub fn is_missing(&self) -> bool {
        matches!(self, DataValue::Missing)
    }
}

impl From<Option<f64>> for DataValue {
    fn from(v: Option<f64>) -> Self {
        match v {
            Some(n) if n.is_finite() => DataValue::Number(n),
            _ => DataValue::Missing,
        }
    }
}

impl From<f64> for DataValue {
    fn from(v: f64) -> Self {
        Some(v).into()
    }
}

impl From<&str> for DataValue {
    fn from(v: &str) -> Self {
        DataValue::Text(v.to_string())
    }
}

impl From<String> for DataValue {
    fn from(v: String) -> Self {
        DataValue::Text(v)
    }
}

impl Serialize for DataValue {
    fn serialize<S: Serializer>(&self, s: S) -> Result<S::Ok, S::Error> {
        match self {
            DataValue::Number(n) => s.serialize_f64(*n),
            DataValue::Text(t) => s.serialize_str(t),
            DataValue::Missing => s.serialize_str(MISSING_MARKER),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ChartKind {
    Bar,
    Line,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ChartPoint {
    pub label: String,
    pub value: DataValue,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<&'static str>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Series {
    pub name: String,
    pub points: Vec<ChartPoint>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Chart {
    pub kind: ChartKind,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub x_label: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub y_label: Option<String>,
    pub series: Vec<Series>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Column {
    pub key: String,
    pub label: String,
}

impl Column {
    pub fn new(key: &str, label: &str) -> Self {
        Self {
            key: key.to_string(),
            label: label.to_string(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct TableRow {
    /// One value per column, in column order.
    pub cells: Vec<DataValue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub badge: Option<CategoryBadge>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Table {
    pub title: String,
    pub columns: Vec<Column>,
    pub rows: Vec<TableRow>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct StatItem {
    pub label: String,
    pub value: DataValue,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tone: Option<Tone>,
}

impl StatItem {
    pub fn new(label: &str, value: impl Into<DataValue>, unit: Option<&str>) -> Self {
        Self {
            label: label.to_string(),
            value: value.into(),
            unit: unit.map(str::to_string),
            tone: None,
        }
    }

    pub fn with_tone(mut self, tone: Tone) -> Self {
        self.tone = Some(tone);
        self
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Stats {
    pub title: String,
    pub items: Vec<StatItem>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Collapsible {
    pub title: String,
    pub default_open: bool,
    pub children: Vec<Visualization>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct DataContainer {
    pub title: String,
    pub children: Vec<Visualization>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Visualization {
    Chart(Chart),
    Table(Table),
    Stats(Stats),
    Collapsible(Collapsible),
    DataContainer(DataContainer),
}

impl Visualization {
    pub fn kind(&self) -> &'static str {
        match self {
            Visualization::Chart(_) => "chart",
            Visualization::Table(_) => "table",
            Visualization::Stats(_) => "stats",
            Visualization::Collapsible(_) => "collapsible",
            Visualization::DataContainer(_) => "data_container",
        }
    }

    /// Depth-first walk over this node and all nested children.
    pub fn walk<'a>(&'a self, out: &mut Vec<&'a Visualization>) {
        out.push(self);
        match self {
            Visualization::Collapsible(c) => c.children.iter().for_each(|v| v.walk(out)),
            Visualization::DataContainer(d) => d.children.iter().for_each(|v| v.walk(out)),
            Visualization::Chart(_) | Visualization::Table(_) | Visualization::Stats(_) => {}
        }
    }
}

/// One headline number in a [`TextSummary`].
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct KeyMetric {
    pub label: String,
    pub value: DataValue,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
}

/// Short textual frame around the visualizations.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TextSummary {
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subtitle: Option<String>,
    pub key_metrics: Vec<KeyMetric>,
    pub insights: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn missing_value_serializes_as_marker() {
        let item = StatItem::new("Recharge", None::<f64>, Some("ham"));
        let v = serde_json::to_value(&item).unwrap();
        assert_eq!(v["value"], json!("N/A"));
        assert_eq!(serde_json::to_value(DataValue::from(f64::NAN)).unwrap(), json!("N/A"));
    }

    #[test]
    fn numbers_pass_through_unchanged() {
        let v = serde_json::to_value(DataValue::from(148.123456)).unwrap();
        assert_eq!(v, json!(148.123456));
    }

    #[test]
    fn visualization_is_tagged_by_type() {
        let viz = Visualization::DataContainer(DataContainer {
            title: "t".into(),
            children: vec![Visualization::Stats(Stats {
                title: "s".into(),
                items: vec![],
                message: Some("m".into()),
            })],
        });
        let v = serde_json::to_value(&viz).unwrap();
        assert_eq!(v["type"], "data_container");
        assert_eq!(v["children"][0]["type"], "stats");

        let mut all = Vec::new();
        viz.walk(&mut all);
        assert_eq!(all.len(), 2);
    }

    #[test]
    fn summary_uses_camel_case_keys() {
        let v = serde_json::to_value(TextSummary {
            title: "t".into(),
            ..Default::default()
        })
        .unwrap();
        assert!(v.get("keyMetrics").is_some());
        assert!(v.get("subtitle").is_none());
    }
}
