//! Structured-response synthesis for groundwater data tools.
//!
//! Tool results are decoded into closed types ([`ToolOutput`]) and mapped to
//! [`Visualization`] descriptors plus an optional [`TextSummary`] by
//! [`synthesize`]. Nothing here calls a language model: numbers reach the
//! client exactly as the tool produced them, and absent numbers are marked
//! [`MISSING_MARKER`].

mod category;
mod error;
mod executor;
mod suggest;
mod synth;
mod tools;
mod visualization;

pub use category::{Category, CategoryBadge, Tone};
pub use error::SynthError;
pub use executor::{HttpToolExecutor, ToolExecutor, resolve};
pub use suggest::{MAX_FOLLOW_UPS, follow_ups};
pub use synth::{Synthesis, synthesize};
pub use tools::{
    CompareLocationsResult, HistoricalDataResult, ListLocationsResult, ListedLocation,
    LocationRecord, MetricKey, Metrics, RankedLocation, SearchLocationResult, ToolName, ToolOutput,
    TopLocationsResult, YearPoint,
};
pub use visualization::{
    Chart, ChartKind, ChartPoint, Collapsible, Column, DataContainer, DataValue, KeyMetric,
    MISSING_MARKER, Series, StatItem, Stats, Table, TableRow, TextSummary, Visualization,
};
