use serde::Serialize;

use crate::core::models::usage::{DailyRecord, UsageSnapshot};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TrendDirection {
    Up,
    Down,
    Neutral,
}

impl std::fmt::Display for TrendDirection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Up => write!(f, "up"),
            Self::Down => write!(f, "down"),
            Self::Neutral => write!(f, "neutral"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrendSummary {
    pub average_cost: f64,
    pub total_cost: f64,
    pub max_cost: f64,
    pub min_cost: f64,
    pub percent_change: f64,
    pub direction: TrendDirection,
}

/// Present, numeric costs of `recent` in their original order.
pub fn valid_costs(recent: &[DailyRecord]) -> Vec<f64> {
    recent.iter().filter_map(DailyRecord::valid_cost).collect()
}

/// Compares the first three costs by list position, not by date:
/// `v0 > v1 > v2` is up and `v0 < v1 < v2` is down.
pub fn trend_direction(costs: &[f64]) -> TrendDirection {
    match costs {
        [a, b, c, ..] if a > b && b > c => TrendDirection::Up,
        [a, b, c, ..] if a < b && b < c => TrendDirection::Down,
        _ => TrendDirection::Neutral,
    }
}

/// Change of today's cost against the most recent earlier day with usage.
/// Dates compare as strings, which orders zero-padded ISO dates correctly.
///
/// Returns 0 when there is no such day, so the baseline is never zero.
pub fn percent_change(snapshot: &UsageSnapshot) -> f64 {
    let today_cost = snapshot.today.cost_or_zero();
    let today_date = snapshot.today.date.as_str();
    if today_date.is_empty() {
        return 0.0;
    }

    let yesterday_cost = snapshot
        .recent
        .iter()
        .filter(|d| d.date != today_date && d.valid_cost().is_some_and(|c| c > 0.0))
        .min_by(|a, b| b.date.cmp(&a.date))
        .map(DailyRecord::cost_or_zero)
        .unwrap_or(0.0);

    if yesterday_cost > 0.0 {
        (today_cost - yesterday_cost) / yesterday_cost * 100.0
    } else {
        0.0
    }
}

pub fn trend_summary(snapshot: &UsageSnapshot) -> TrendSummary {
    let costs = valid_costs(&snapshot.recent);
    let total_cost: f64 = costs.iter().sum();
    let (average_cost, max_cost, min_cost) = if costs.is_empty() {
        (0.0, 0.0, 0.0)
    } else {
        (
            total_cost / costs.len() as f64,
            costs.iter().copied().fold(f64::NEG_INFINITY, f64::max),
            costs.iter().copied().fold(f64::INFINITY, f64::min),
        )
    };

    TrendSummary {
        average_cost,
        total_cost,
        max_cost,
        min_cost,
        percent_change: percent_change(snapshot),
        direction: trend_direction(&costs),
    }
}
