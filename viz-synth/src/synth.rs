//! Deterministic mapping from tool results to visualizations.

use serde::Serialize;
use tracing::debug;

use crate::category::{Category, CategoryBadge};
use crate::tools::{
    CompareLocationsResult, HistoricalDataResult, ListLocationsResult, LocationRecord, MetricKey,
    Metrics, SearchLocationResult, ToolOutput, TopLocationsResult, YearPoint,
};
use crate::visualization::{
    Chart, ChartKind, ChartPoint, Collapsible, Column, DataContainer, DataValue, KeyMetric, Series,
    StatItem, Stats, Table, TableRow, TextSummary, Visualization,
};

/// Visualizations plus an optional summary for one tool result.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct Synthesis {
    pub visualizations: Vec<Visualization>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<TextSummary>,
    /// `true` when the tool found nothing; only a message is rendered.
    #[serde(skip)]
    pub skipped: bool,
}

pub fn synthesize(output: &ToolOutput) -> Synthesis {
    if !output.found() {
        debug!(target: "viz_synth", tool = %output.tool(), "nothing found; rendering message only");
        return not_found(output);
    }
    match output {
        ToolOutput::SearchLocation(r) => search_location(r),
        ToolOutput::CompareLocations(r) => compare_locations(r),
        ToolOutput::GetHistoricalData(r) => historical(r),
        ToolOutput::GetTopLocations(r) => top_locations(r),
        ToolOutput::ListLocations(r) => list_locations(r),
    }
}

fn not_found(output: &ToolOutput) -> Synthesis {
    let message = output
        .message()
        .map(str::to_string)
        .unwrap_or_else(|| "No matching groundwater data was found.".to_string());
    Synthesis {
        visualizations: vec![Visualization::Stats(Stats {
            title: "No data".to_string(),
            items: Vec::new(),
            message: Some(message),
        })],
        summary: None,
        skipped: true,
    }
}

fn metric_items(m: &Metrics) -> Vec<StatItem> {
    MetricKey::ALL
        .into_iter()
        .map(|k| StatItem::new(k.label(), k.get(m), Some(k.unit())))
        .collect()
}

fn key_metrics(m: &Metrics, keys: &[MetricKey]) -> Vec<KeyMetric> {
    keys.iter()
        .map(|k| KeyMetric {
            label: k.label().to_string(),
            value: k.get(m).into(),
            unit: Some(k.unit().to_string()),
        })
        .collect()
}

fn location_title(loc: &LocationRecord) -> String {
    match &loc.state {
        Some(state) if !state.eq_ignore_ascii_case(&loc.name) => format!("{}, {}", loc.name, state),
        _ => loc.name.clone(),
    }
}

fn stage_insight(name: &str, m: &Metrics, cat: Category) -> Option<String> {
    m.stage_of_extraction_pct
        .map(|s| format!("{name} extracts {s}% of its annual extractable groundwater ({}).", cat.label()))
}

fn search_location(r: &SearchLocationResult) -> Synthesis {
    let Some(loc) = &r.location else {
        return not_found(&ToolOutput::SearchLocation(r.clone()));
    };
    let cat = loc.category();
    let mut stats = metric_items(&loc.metrics);
    stats.push(StatItem::new("Category", cat.label(), None).with_tone(cat.tone()));

    let chart = Visualization::Chart(Chart {
        kind: ChartKind::Bar,
        title: "Recharge vs. extraction".to_string(),
        x_label: None,
        y_label: Some("ham".to_string()),
        series: vec![Series {
            name: location_title(loc),
            points: [
                MetricKey::AnnualRechargeHam,
                MetricKey::ExtractableResourceHam,
                MetricKey::TotalExtractionHam,
            ]
            .into_iter()
            .map(|k| ChartPoint {
                label: k.label().to_string(),
                value: k.get(&loc.metrics).into(),
                color: None,
            })
            .collect(),
        }],
    });

    let insights = stage_insight(&loc.name, &loc.metrics, cat).into_iter().collect();
    Synthesis {
        visualizations: vec![
            Visualization::Stats(Stats {
                title: location_title(loc),
                items: stats,
                message: None,
            }),
            chart,
        ],
        summary: Some(TextSummary {
            title: location_title(loc),
            subtitle: loc.year.as_ref().map(|y| format!("Assessment year {y}")),
            key_metrics: key_metrics(
                &loc.metrics,
                &[MetricKey::StageOfExtractionPct, MetricKey::AnnualRechargeHam],
            ),
            insights,
        }),
        skipped: false,
    }
}

fn compare_locations(r: &CompareLocationsResult) -> Synthesis {
    let columns = std::iter::once(Column::new("name", "Location"))
        .chain(MetricKey::ALL.into_iter().map(|k| Column::new(key_of(k), k.label())))
        .chain(std::iter::once(Column::new("category", "Category")))
        .collect();
    let rows = r
        .locations
        .iter()
        .map(|loc| {
            let cat = loc.category();
            let mut cells = vec![DataValue::from(location_title(loc))];
            cells.extend(MetricKey::ALL.into_iter().map(|k| DataValue::from(k.get(&loc.metrics))));
            cells.push(cat.label().into());
            TableRow {
                cells,
                badge: Some(CategoryBadge::from(cat)),
            }
        })
        .collect();

    let chart = Visualization::Chart(Chart {
        kind: ChartKind::Bar,
        title: "Stage of extraction".to_string(),
        x_label: None,
        y_label: Some("%".to_string()),
        series: vec![Series {
            name: MetricKey::StageOfExtractionPct.label().to_string(),
            points: r
                .locations
                .iter()
                .map(|loc| ChartPoint {
                    label: loc.name.clone(),
                    value: loc.metrics.stage_of_extraction_pct.into(),
                    color: Some(loc.category().color()),
                })
                .collect(),
        }],
    });

    let insights = r
        .locations
        .iter()
        .filter_map(|loc| stage_insight(&loc.name, &loc.metrics, loc.category()))
        .collect();
    let names: Vec<&str> = r.locations.iter().map(|l| l.name.as_str()).collect();
    Synthesis {
        visualizations: vec![
            chart,
            Visualization::Table(Table {
                title: "Comparison".to_string(),
                columns,
                rows,
            }),
        ],
        summary: Some(TextSummary {
            title: format!("Comparing {}", names.join(" vs. ")),
            subtitle: None,
            key_metrics: Vec::new(),
            insights,
        }),
        skipped: false,
    }
}

fn historical(r: &HistoricalDataResult) -> Synthesis {
    let name = r.location.clone().unwrap_or_else(|| "Selected location".to_string());
    let line = |k: MetricKey| Series {
        name: k.label().to_string(),
        points: r
            .series
            .iter()
            .map(|p| ChartPoint {
                label: p.year.clone(),
                value: k.get(&p.metrics).into(),
                color: None,
            })
            .collect(),
    };
    let chart = Visualization::Chart(Chart {
        kind: ChartKind::Line,
        title: format!("{name}: recharge and extraction over time"),
        x_label: Some("Year".to_string()),
        y_label: Some("ham".to_string()),
        series: vec![
            line(MetricKey::AnnualRechargeHam),
            line(MetricKey::TotalExtractionHam),
        ],
    });
    let stage_chart = Visualization::Chart(Chart {
        kind: ChartKind::Line,
        title: format!("{name}: stage of extraction"),
        x_label: Some("Year".to_string()),
        y_label: Some("%".to_string()),
        series: vec![line(MetricKey::StageOfExtractionPct)],
    });

    let per_year = r
        .series
        .iter()
        .map(|p| {
            let cat = p.category.as_deref().map_or(Category::NoData, Category::parse);
            let mut items = metric_items(&p.metrics);
            items.push(StatItem::new("Category", cat.label(), None).with_tone(cat.tone()));
            Visualization::Stats(Stats {
                title: p.year.clone(),
                items,
                message: None,
            })
        })
        .collect();

    let first = r.series.first();
    let last = r.series.last();
    let insights = match (first, last) {
        (Some(a), Some(b)) if r.series.len() > 1 => trend_insight(a, b).into_iter().collect(),
        _ => Vec::new(),
    };

    Synthesis {
        visualizations: vec![
            chart,
            stage_chart,
            Visualization::Collapsible(Collapsible {
                title: "Year-by-year figures".to_string(),
                default_open: false,
                children: per_year,
            }),
        ],
        summary: Some(TextSummary {
            title: format!("{name}: historical trend"),
            subtitle: match (first, last) {
                (Some(a), Some(b)) => Some(format!("{} to {}", a.year, b.year)),
                _ => None,
            },
            key_metrics: last
                .map(|p| key_metrics(&p.metrics, &[MetricKey::StageOfExtractionPct]))
                .unwrap_or_default(),
            insights,
        }),
        skipped: false,
    }
}

fn trend_insight(a: &YearPoint, b: &YearPoint) -> Option<String> {
    let x = a.metrics.stage_of_extraction_pct?;
    let y = b.metrics.stage_of_extraction_pct?;
    let dir = if y > x {
        "rose"
    } else if y < x {
        "fell"
    } else {
        "held steady"
    };
    Some(format!(
        "Stage of extraction {dir} from {x}% in {} to {y}% in {}.",
        a.year, b.year
    ))
}

fn top_locations(r: &TopLocationsResult) -> Synthesis {
    let metric = r.metric();
    let chart = Visualization::Chart(Chart {
        kind: ChartKind::Bar,
        title: format!("Top locations by {}", metric.label().to_lowercase()),
        x_label: None,
        y_label: Some(metric.unit().to_string()),
        series: vec![Series {
            name: metric.label().to_string(),
            points: r
                .items
                .iter()
                .map(|it| ChartPoint {
                    label: it.name.clone(),
                    value: it.value.into(),
                    color: it.category.as_deref().map(|c| Category::parse(c).color()),
                })
                .collect(),
        }],
    });
    let table = Visualization::Table(Table {
        title: "Ranking".to_string(),
        columns: vec![
            Column::new("rank", "Rank"),
            Column::new("name", "Location"),
            Column::new("state", "State"),
            Column::new(key_of(metric), metric.label()),
        ],
        rows: r
            .items
            .iter()
            .map(|it| TableRow {
                cells: vec![
                    DataValue::from(f64::from(it.rank)),
                    it.name.as_str().into(),
                    it.state.as_deref().map_or(DataValue::Missing, DataValue::from),
                    it.value.into(),
                ],
                badge: it.category.as_deref().map(|c| CategoryBadge::from(Category::parse(c))),
            })
            .collect(),
    });

    let insights = r
        .items
        .first()
        .map(|top| match top.value {
            Some(v) => format!("{} ranks first at {v} {}.", top.name, metric.unit()),
            None => format!("{} ranks first.", top.name),
        })
        .into_iter()
        .collect();
    Synthesis {
        visualizations: vec![Visualization::DataContainer(DataContainer {
            title: format!("Top {} by {}", r.items.len(), metric.label().to_lowercase()),
            children: vec![chart, table],
        })],
        summary: Some(TextSummary {
            title: format!("Highest {}", metric.label().to_lowercase()),
            subtitle: r.year.as_ref().map(|y| format!("Assessment year {y}")),
            key_metrics: Vec::new(),
            insights,
        }),
        skipped: false,
    }
}

fn list_locations(r: &ListLocationsResult) -> Synthesis {
    let level = r.level.as_deref().unwrap_or("location");
    let title = match &r.parent {
        Some(p) => format!("{}s in {p}", capitalize(level)),
        None => format!("{}s", capitalize(level)),
    };

    // category counts in vocabulary order
    let counts: Vec<(Category, usize)> = Category::ALL
        .into_iter()
        .map(|c| {
            let n = r
                .locations
                .iter()
                .filter(|l| l.category.as_deref().map_or(Category::NoData, Category::parse) == c)
                .count();
            (c, n)
        })
        .filter(|(_, n)| *n > 0)
        .collect();

    let stats = Visualization::Stats(Stats {
        title: "By category".to_string(),
        items: counts
            .iter()
            .map(|(c, n)| StatItem::new(c.label(), *n as f64, None).with_tone(c.tone()))
            .collect(),
        message: None,
    });
    let table = Visualization::Table(Table {
        title: title.clone(),
        columns: vec![Column::new("name", "Name"), Column::new("category", "Category")],
        rows: r
            .locations
            .iter()
            .map(|l| {
                let cat = l.category.as_deref().map(Category::parse);
                TableRow {
                    cells: vec![
                        l.name.as_str().into(),
                        cat.map_or(DataValue::Missing, |c| c.label().into()),
                    ],
                    badge: cat.map(CategoryBadge::from),
                }
            })
            .collect(),
    });

    Synthesis {
        visualizations: vec![stats, table],
        summary: Some(TextSummary {
            title,
            subtitle: None,
            key_metrics: vec![KeyMetric {
                label: "Count".to_string(),
                value: (r.locations.len() as f64).into(),
                unit: None,
            }],
            insights: Vec::new(),
        }),
        skipped: false,
    }
}

fn key_of(k: MetricKey) -> &'static str {
    match k {
        MetricKey::RainfallMm => "rainfall_mm",
        MetricKey::AnnualRechargeHam => "annual_recharge_ham",
        MetricKey::ExtractableResourceHam => "extractable_resource_ham",
        MetricKey::TotalExtractionHam => "total_extraction_ham",
        MetricKey::StageOfExtractionPct => "stage_of_extraction_pct",
    }
}

fn capitalize(s: &str) -> String {
    let mut c = s.chars();
    match c.next() {
        Some(f) => f.to_uppercase().chain(c).collect(),
        None => String::new(),
    }
}
