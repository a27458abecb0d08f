//! Groundwater categorization vocabulary with fixed colors and tones.

use serde::{Serialize, Serializer};

/// Semantic tone attached to a category or metric.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Tone {
    Positive,
    Caution,
    Warning,
    Danger,
    Info,
    Neutral,
}

/// Assessment-unit category. Anything unrecognized lands in [`Category::Unknown`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Category {
    Safe,
    SemiCritical,
    Critical,
    OverExploited,
    Salinity,
    HillyArea,
    NoData,
    Unknown,
}

impl Category {
    pub const ALL: [Category; 8] = [
        Category::Safe,
        Category::SemiCritical,
        Category::Critical,
        Category::OverExploited,
        Category::Salinity,
        Category::HillyArea,
        Category::NoData,
        Category::Unknown,
    ];

    /// Accepts report spellings: `Semi-Critical`, `over exploited`, `OVER_EXPLOITED`, ...
    pub fn parse(raw: &str) -> Self {
        let key: String = raw
            .trim()
            .chars()
            .map(|c| match c {
                ' ' | '-' => '_',
                c => c.to_ascii_lowercase(),
            })
            .collect();
        match key.as_str() {
            "safe" => Category::Safe,
            "semi_critical" | "semicritical" => Category::SemiCritical,
            "critical" => Category::Critical,
            "over_exploited" | "overexploited" => Category::OverExploited,
            "salinity" | "saline" => Category::Salinity,
            "hilly_area" | "hilly" => Category::HillyArea,
            "no_data" | "nodata" | "na" => Category::NoData,
            _ => Category::Unknown,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Category::Safe => "safe",
            Category::SemiCritical => "semi_critical",
            Category::Critical => "critical",
            Category::OverExploited => "over_exploited",
            Category::Salinity => "salinity",
            Category::HillyArea => "hilly_area",
            Category::NoData => "no_data",
            Category::Unknown => "unknown",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Category::Safe => "Safe",
            Category::SemiCritical => "Semi-Critical",
            Category::Critical => "Critical",
            Category::OverExploited => "Over-Exploited",
            Category::Salinity => "Saline",
            Category::HillyArea => "Hilly Area",
            Category::NoData => "No Data",
            Category::Unknown => "Uncategorized",
        }
    }

    pub fn color(self) -> &'static str {
        match self {
            Category::Safe => "#22c55e",
            Category::SemiCritical => "#eab308",
            Category::Critical => "#f97316",
            Category::OverExploited => "#ef4444",
            Category::Salinity => "#8b5cf6",
            Category::HillyArea => "#0ea5e9",
            Category::NoData => "#9ca3af",
            Category::Unknown => "#6b7280",
        }
    }

    pub fn tone(self) -> Tone {
        match self {
            Category::Safe => Tone::Positive,
            Category::SemiCritical => Tone::Caution,
            Category::Critical => Tone::Warning,
            Category::OverExploited => Tone::Danger,
            Category::Salinity | Category::HillyArea => Tone::Info,
            Category::NoData | Category::Unknown => Tone::Neutral,
        }
    }
}

impl Serialize for Category {
    fn serialize<S: Serializer>(&self, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(self.as_str())
    }
}

/// Category badge as shipped inside visualizations.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct CategoryBadge {
    pub category: Category,
    pub label: &'static str,
    pub color: &'static str,
    pub tone: Tone,
}

impl From<Category> for CategoryBadge {
    fn from(c: Category) -> Self {
        Self {
            category: c,
            label: c.label(),
            color: c.color(),
            tone: c.tone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn report_spellings_normalize() {
        assert_eq!(Category::parse("Semi-Critical"), Category::SemiCritical);
        assert_eq!(Category::parse("over exploited"), Category::OverExploited);
        assert_eq!(Category::parse(" SAFE "), Category::Safe);
        assert_eq!(Category::parse("hilly_area"), Category::HillyArea);
    }

    #[test]
    fn unknown_falls_into_neutral_bucket() {
        let c = Category::parse("partially contaminated");
        assert_eq!(c, Category::Unknown);
        assert_eq!(c.tone(), Tone::Neutral);
    }

    #[test]
    fn every_category_has_distinct_color() {
        let mut colors: Vec<_> = Category::ALL.iter().map(|c| c.color()).collect();
        colors.sort();
        colors.dedup();
        assert_eq!(colors.len(), Category::ALL.len());
    }
}
