//! Typed results of the groundwater data tools.
//!
//! Each tool has exactly one result type; payloads are decoded strictly per
//! tool so a malformed result is rejected instead of half-rendered.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::category::Category;
use crate::error::SynthError;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolName {
    SearchLocation,
    CompareLocations,
    GetHistoricalData,
    GetTopLocations,
    ListLocations,
}

impl ToolName {
    pub const ALL: [ToolName; 5] = [
        ToolName::SearchLocation,
        ToolName::CompareLocations,
        ToolName::GetHistoricalData,
        ToolName::GetTopLocations,
        ToolName::ListLocations,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ToolName::SearchLocation => "search_location",
            ToolName::CompareLocations => "compare_locations",
            ToolName::GetHistoricalData => "get_historical_data",
            ToolName::GetTopLocations => "get_top_locations",
            ToolName::ListLocations => "list_locations",
        }
    }
}

impl fmt::Display for ToolName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ToolName {
    type Err = SynthError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        ToolName::ALL
            .into_iter()
            .find(|t| t.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| SynthError::UnknownTool(s.to_string()))
    }
}

/// Core assessment figures. Units: rainfall in mm, volumes in ham
/// (hectare-metres), stage in percent.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Metrics {
    #[serde(default)]
    pub rainfall_mm: Option<f64>,
    #[serde(default)]
    pub annual_recharge_ham: Option<f64>,
    #[serde(default)]
    pub extractable_resource_ham: Option<f64>,
    #[serde(default)]
    pub total_extraction_ham: Option<f64>,
    #[serde(default)]
    pub stage_of_extraction_pct: Option<f64>,
}

/// Metric selector used by rankings.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MetricKey {
    RainfallMm,
    AnnualRechargeHam,
    ExtractableResourceHam,
    TotalExtractionHam,
    StageOfExtractionPct,
}

impl MetricKey {
    pub const ALL: [MetricKey; 5] = [
        MetricKey::RainfallMm,
        MetricKey::AnnualRechargeHam,
        MetricKey::ExtractableResourceHam,
        MetricKey::TotalExtractionHam,
        MetricKey::StageOfExtractionPct,
    ];

    pub fn label(self) -> &'static str {
        match self {
            MetricKey::RainfallMm => "Rainfall",
            MetricKey::AnnualRechargeHam => "Annual Recharge",
            MetricKey::ExtractableResourceHam => "Extractable Resource",
            MetricKey::TotalExtractionHam => "Total Extraction",
            MetricKey::StageOfExtractionPct => "Stage of Extraction",
        }
    }

    pub fn unit(self) -> &'static str {
        match self {
            MetricKey::RainfallMm => "mm",
            MetricKey::StageOfExtractionPct => "%",
            _ => "ham",
        }
    }

    pub fn get(self, m: &Metrics) -> Option<f64> {
        match self {
            MetricKey::RainfallMm => m.rainfall_mm,
            MetricKey::AnnualRechargeHam => m.annual_recharge_ham,
            MetricKey::ExtractableResourceHam => m.extractable_resource_ham,
            MetricKey::TotalExtractionHam => m.total_extraction_ham,
            MetricKey::StageOfExtractionPct => m.stage_of_extraction_pct,
        }
    }
}

/// A state, district or block with its latest assessment.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LocationRecord {
    pub name: String,
    #[serde(default)]
    pub level: Option<String>,
    #[serde(default)]
    pub state: Option<String>,
    #[serde(default)]
    pub year: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub metrics: Metrics,
}

impl LocationRecord {
    pub fn category(&self) -> Category {
        self.category.as_deref().map_or(Category::NoData, Category::parse)
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SearchLocationResult {
    pub found: bool,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub location: Option<LocationRecord>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CompareLocationsResult {
    pub found: bool,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub locations: Vec<LocationRecord>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct YearPoint {
    pub year: String,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub metrics: Metrics,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct HistoricalDataResult {
    pub found: bool,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    /// Chronological as returned by the tool.
    #[serde(default)]
    pub series: Vec<YearPoint>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RankedLocation {
    pub rank: u32,
    pub name: String,
    #[serde(default)]
    pub state: Option<String>,
    #[serde(default)]
    pub value: Option<f64>,
    #[serde(default)]
    pub category: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TopLocationsResult {
    pub found: bool,
    #[serde(default)]
    pub message: Option<String>,
    /// Absent on most not-found payloads.
    #[serde(default)]
    pub metric: Option<MetricKey>,
    #[serde(default)]
    pub level: Option<String>,
    #[serde(default)]
    pub year: Option<String>,
    /// Rank order as produced by the tool; never re-sorted.
    #[serde(default)]
    pub items: Vec<RankedLocation>,
}

impl TopLocationsResult {
    /// Ranked metric, stage of extraction when the tool omitted it.
    pub fn metric(&self) -> MetricKey {
        self.metric.unwrap_or(MetricKey::StageOfExtractionPct)
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ListedLocation {
    pub name: String,
    #[serde(default)]
    pub category: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ListLocationsResult {
    pub found: bool,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub level: Option<String>,
    #[serde(default)]
    pub parent: Option<String>,
    #[serde(default)]
    pub locations: Vec<ListedLocation>,
}

/// A decoded tool result, one variant per tool.
#[derive(Clone, Debug, PartialEq)]
pub enum ToolOutput {
    SearchLocation(SearchLocationResult),
    CompareLocations(CompareLocationsResult),
    GetHistoricalData(HistoricalDataResult),
    GetTopLocations(TopLocationsResult),
    ListLocations(ListLocationsResult),
}

impl ToolOutput {
    /// Decodes `result` with the schema of `tool`.
    pub fn decode(tool: ToolName, result: Value) -> Result<Self, SynthError> {
        let err = |source| SynthError::Decode {
            tool: tool.as_str(),
            source,
        };
        Ok(match tool {
            ToolName::SearchLocation => ToolOutput::SearchLocation(serde_json::from_value(result).map_err(err)?),
            ToolName::CompareLocations => ToolOutput::CompareLocations(serde_json::from_value(result).map_err(err)?),
            ToolName::GetHistoricalData => ToolOutput::GetHistoricalData(serde_json::from_value(result).map_err(err)?),
            ToolName::GetTopLocations => ToolOutput::GetTopLocations(serde_json::from_value(result).map_err(err)?),
            ToolName::ListLocations => ToolOutput::ListLocations(serde_json::from_value(result).map_err(err)?),
        })
    }

    pub fn tool(&self) -> ToolName {
        match self {
            ToolOutput::SearchLocation(_) => ToolName::SearchLocation,
            ToolOutput::CompareLocations(_) => ToolName::CompareLocations,
            ToolOutput::GetHistoricalData(_) => ToolName::GetHistoricalData,
            ToolOutput::GetTopLocations(_) => ToolName::GetTopLocations,
            ToolOutput::ListLocations(_) => ToolName::ListLocations,
        }
    }

    pub fn found(&self) -> bool {
        match self {
            ToolOutput::SearchLocation(r) => r.found,
            ToolOutput::CompareLocations(r) => r.found,
            ToolOutput::GetHistoricalData(r) => r.found,
            ToolOutput::GetTopLocations(r) => r.found,
            ToolOutput::ListLocations(r) => r.found,
        }
    }

    pub fn message(&self) -> Option<&str> {
        match self {
            ToolOutput::SearchLocation(r) => r.message.as_deref(),
            ToolOutput::CompareLocations(r) => r.message.as_deref(),
            ToolOutput::GetHistoricalData(r) => r.message.as_deref(),
            ToolOutput::GetTopLocations(r) => r.message.as_deref(),
            ToolOutput::ListLocations(r) => r.message.as_deref(),
        }
    }

    /// The result re-encoded as JSON (for `tool_result` events).
    pub fn to_value(&self) -> Value {
        let v = match self {
            ToolOutput::SearchLocation(r) => serde_json::to_value(r),
            ToolOutput::CompareLocations(r) => serde_json::to_value(r),
            ToolOutput::GetHistoricalData(r) => serde_json::to_value(r),
            ToolOutput::GetTopLocations(r) => serde_json::to_value(r),
            ToolOutput::ListLocations(r) => serde_json::to_value(r),
        };
        v.unwrap_or(Value::Null)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn tool_names_parse_case_insensitively() {
        assert_eq!("Get_Top_Locations".parse::<ToolName>().unwrap(), ToolName::GetTopLocations);
        assert!(matches!(
            "drop_tables".parse::<ToolName>(),
            Err(SynthError::UnknownTool(_))
        ));
    }

    #[test]
    fn decode_keeps_null_numbers_as_none() {
        let out = ToolOutput::decode(
            ToolName::SearchLocation,
            json!({
                "found": true,
                "location": {
                    "name": "Jaipur",
                    "category": "Over-Exploited",
                    "metrics": {"stage_of_extraction_pct": 221.5, "annual_recharge_ham": null}
                }
            }),
        )
        .unwrap();
        let ToolOutput::SearchLocation(r) = out else {
            panic!("wrong variant");
        };
        let loc = r.location.unwrap();
        assert_eq!(loc.metrics.stage_of_extraction_pct, Some(221.5));
        assert_eq!(loc.metrics.annual_recharge_ham, None);
        assert_eq!(loc.category(), Category::OverExploited);
    }

    #[test]
    fn malformed_payload_is_rejected() {
        let res = ToolOutput::decode(ToolName::GetTopLocations, json!({"found": true, "items": []}));
        assert!(matches!(res, Err(SynthError::Decode { tool: "get_top_locations", .. })));

        let res = ToolOutput::decode(ToolName::CompareLocations, json!({"locations": []}));
        assert!(res.is_err(), "`found` is required");
    }
}
