//! Derived views of a usage snapshot: the gap-filled 7-day chart and the
//! trend summary. Everything here is a pure function of its inputs.

pub mod series;
pub mod trend;

use chrono::{Local, NaiveDate};
use serde::Serialize;

use crate::core::models::usage::UsageSnapshot;
use series::{BarColor, SevenDayPoint};
use trend::TrendSummary;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartBar {
    #[serde(flatten)]
    pub point: SevenDayPoint,
    /// Height in chart units, see [`series::BAR_MAX_HEIGHT`].
    pub height: f64,
    pub color: BarColor,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Analysis {
    pub today: NaiveDate,
    pub chart: Vec<ChartBar>,
    pub chart_max_cost: f64,
    pub trend: TrendSummary,
}

/// Analyze a snapshot. `system_today` is only used when the snapshot's own
/// `today` record has no date.
pub fn analyze(snapshot: &UsageSnapshot, system_today: NaiveDate) -> Analysis {
    let points = series::seven_day_series(snapshot, system_today);
    let chart_max_cost = series::chart_max_cost(&points);
    let chart = points
        .into_iter()
        .map(|point| ChartBar {
            height: series::bar_height(point.cost, chart_max_cost),
            color: series::bar_color(&point, chart_max_cost),
            point,
        })
        .collect();

    Analysis {
        today: series::resolve_today(snapshot, system_today),
        chart,
        chart_max_cost,
        trend: trend::trend_summary(snapshot),
    }
}

/// The local calendar date right now.
pub fn system_today() -> NaiveDate {
    Local::now().date_naive()
}
