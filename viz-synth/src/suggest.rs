//! Template follow-up questions for the tool path. No model involved.

use crate::tools::{MetricKey, ToolOutput};

/// Upper bound on suggestions returned per result.
pub const MAX_FOLLOW_UPS: usize = 3;

pub fn follow_ups(output: &ToolOutput) -> Vec<String> {
    let mut out: Vec<String> = match output {
        _ if !output.found() => vec![
            "Which states have data for the latest assessment year?".to_string(),
            "List the districts of a state you are interested in".to_string(),
        ],
        ToolOutput::SearchLocation(r) => match &r.location {
            Some(loc) => vec![
                format!("How has groundwater extraction in {} changed over time?", loc.name),
                format!("Compare {} with a neighbouring area", loc.name),
                match &loc.state {
                    Some(state) if !state.eq_ignore_ascii_case(&loc.name) => {
                        format!("Which districts in {state} are over-exploited?")
                    }
                    _ => format!("Which districts in {} are over-exploited?", loc.name),
                },
            ],
            None => Vec::new(),
        },
        ToolOutput::CompareLocations(r) => {
            let mut v: Vec<String> = r
                .locations
                .iter()
                .take(2)
                .map(|l| format!("Show the historical trend for {}", l.name))
                .collect();
            v.push("Which locations have the highest stage of extraction?".to_string());
            v
        }
        ToolOutput::GetHistoricalData(r) => {
            let name = r.location.as_deref().unwrap_or("this location");
            vec![
                format!("What is the current categorization of {name}?"),
                format!("Compare {name} with the national average"),
            ]
        }
        ToolOutput::GetTopLocations(r) => {
            let mut v: Vec<String> = r
                .items
                .first()
                .map(|top| format!("Tell me more about {}", top.name))
                .into_iter()
                .collect();
            let other = if r.metric() == MetricKey::StageOfExtractionPct {
                MetricKey::AnnualRechargeHam
            } else {
                MetricKey::StageOfExtractionPct
            };
            v.push(format!("Which locations have the highest {}?", other.label().to_lowercase()));
            v
        }
        ToolOutput::ListLocations(r) => r
            .locations
            .first()
            .map(|l| format!("Show groundwater details for {}", l.name))
            .into_iter()
            .chain(r.parent.as_ref().map(|p| format!("How has {p} changed over recent assessments?")))
            .collect(),
    };
    out.truncate(MAX_FOLLOW_UPS);
    out
}
