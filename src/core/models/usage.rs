use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Token counters reported alongside a cost. Not used by the analyzer but kept
/// so JSON output round-trips what the backend sent.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TokenCounts {
    pub input_tokens: f64,
    pub output_tokens: f64,
    pub cache_creation_tokens: f64,
    pub cache_read_tokens: f64,
    pub total_tokens: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DailyRecord {
    /// Calendar day as `YYYY-MM-DD`. May be empty when the backend has no date.
    #[serde(default)]
    pub date: String,
    #[serde(default)]
    pub cost: Option<f64>,
    #[serde(rename = "modelsUsed", default)]
    pub models_used: Vec<String>,
    #[serde(flatten)]
    pub tokens: TokenCounts,
}

impl DailyRecord {
    pub fn new(date: impl Into<String>, cost: f64) -> Self {
        Self {
            date: date.into(),
            cost: Some(cost),
            ..Self::default()
        }
    }

    /// Cost if present and numeric.
    pub fn valid_cost(&self) -> Option<f64> {
        self.cost.filter(|c| !c.is_nan())
    }

    /// Cost used for display and chart heights: missing or NaN counts as 0.
    pub fn cost_or_zero(&self) -> f64 {
        self.valid_cost().unwrap_or(0.0)
    }

    pub fn calendar_date(&self) -> Option<NaiveDate> {
        parse_calendar_date(&self.date)
    }
}

/// Parse a `YYYY-MM-DD` string component-wise into a calendar date.
/// No timezone is involved, so the result never shifts by a day.
pub fn parse_calendar_date(date: &str) -> Option<NaiveDate> {
    let mut parts = date.trim().splitn(3, '-');
    let year: i32 = parts.next()?.parse().ok()?;
    let month: u32 = parts.next()?.parse().ok()?;
    let day: u32 = parts.next()?.parse().ok()?;
    NaiveDate::from_ymd_opt(year, month, day)
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionData {
    pub id: Option<String>,
    pub cost: f64,
    #[serde(default)]
    pub is_active: bool,
    pub start_time: Option<String>,
    pub end_time: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TotalsSummary {
    /// All-time cost
    #[serde(default)]
    pub cost: Option<f64>,
    #[serde(default)]
    pub weekly_cost: Option<f64>,
    #[serde(default)]
    pub monthly_cost: Option<f64>,
    /// Older backends only send `totalCost` for the all-time figure
    #[serde(rename = "totalCost", default, skip_serializing_if = "Option::is_none")]
    pub total_cost: Option<f64>,
    #[serde(flatten)]
    pub tokens: TokenCounts,
}

impl TotalsSummary {
    pub fn all_time(&self) -> f64 {
        or_zero(self.cost.or(self.total_cost))
    }

    pub fn weekly(&self) -> f64 {
        or_zero(self.weekly_cost)
    }

    pub fn monthly(&self) -> f64 {
        or_zero(self.monthly_cost)
    }
}

fn or_zero(value: Option<f64>) -> f64 {
    value.filter(|v| !v.is_nan()).unwrap_or(0.0)
}

/// One full usage payload from the backend. Each snapshot replaces the
/// previous one wholesale.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UsageSnapshot {
    pub today: DailyRecord,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session: Option<SessionData>,
    /// Recent daily records in backend order. Neither sorted nor deduplicated.
    #[serde(default)]
    pub recent: Vec<DailyRecord>,
    #[serde(default)]
    pub totals: TotalsSummary,
    #[serde(rename = "lastUpdated", default)]
    pub last_updated: String,
    #[serde(default)]
    pub mode: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}
