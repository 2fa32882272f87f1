use chrono::{Duration, NaiveDate};
use serde::Serialize;

use crate::core::models::usage::{DailyRecord, UsageSnapshot};

/// Number of days in the chart, ending today.
pub const SERIES_DAYS: i64 = 7;
/// Tallest bar, in chart units.
pub const BAR_MAX_HEIGHT: f64 = 65.0;
/// Height of a zero-cost bar, so every day stays visible.
pub const BAR_FLOOR_HEIGHT: f64 = 2.0;
/// Smallest height of a bar with any usage.
pub const BAR_MIN_ACTIVE_HEIGHT: f64 = 4.0;

const HIGH_USAGE_RATIO: f64 = 0.7;
const MEDIUM_USAGE_RATIO: f64 = 0.4;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SevenDayPoint {
    pub date: NaiveDate,
    pub cost: f64,
    pub is_today: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BarColor {
    Today,
    NoUsage,
    High,
    Medium,
    Low,
}

impl BarColor {
    pub fn hex(&self) -> &'static str {
        match self {
            Self::Today => "#007AFF",
            Self::NoUsage => "#E5E5E7",
            Self::High => "#FF3B30",
            Self::Medium => "#FF9500",
            Self::Low => "#34C759",
        }
    }
}

/// The day the series ends on: the snapshot's own date when it has one,
/// otherwise `system_today`.
pub fn resolve_today(snapshot: &UsageSnapshot, system_today: NaiveDate) -> NaiveDate {
    snapshot.today.calendar_date().unwrap_or(system_today)
}

/// Build the gap-filled series covering `today - 6 ..= today`, oldest first.
///
/// Today's cost always comes from `snapshot.today`. Other days use the first
/// record in `snapshot.recent` with a matching date; days without a record
/// become zero-cost placeholders.
pub fn seven_day_series(snapshot: &UsageSnapshot, system_today: NaiveDate) -> Vec<SevenDayPoint> {
    let today = resolve_today(snapshot, system_today);

    (0..SERIES_DAYS)
        .rev()
        .map(|offset| {
            let date = today - Duration::days(offset);
            if date == today {
                return SevenDayPoint {
                    date,
                    cost: snapshot.today.cost_or_zero(),
                    is_today: true,
                };
            }
            let key = date.format("%Y-%m-%d").to_string();
            let cost = snapshot
                .recent
                .iter()
                .find(|r| r.date == key)
                .map(DailyRecord::cost_or_zero)
                .unwrap_or(0.0);
            SevenDayPoint {
                date,
                cost,
                is_today: false,
            }
        })
        .collect()
}

/// Largest cost in the series, 0 when every day is zero.
pub fn chart_max_cost(points: &[SevenDayPoint]) -> f64 {
    points.iter().map(|p| p.cost).fold(0.0, f64::max)
}

/// Bar height in chart units, capped at [`BAR_MAX_HEIGHT`].
pub fn bar_height(cost: f64, max_cost: f64) -> f64 {
    if cost > 0.0 && max_cost > 0.0 {
        ((cost / max_cost).min(1.0) * BAR_MAX_HEIGHT).max(BAR_MIN_ACTIVE_HEIGHT)
    } else {
        BAR_FLOOR_HEIGHT
    }
}

/// First match wins: today, no usage, high, medium, low.
pub fn bar_color(point: &SevenDayPoint, max_cost: f64) -> BarColor {
    if point.is_today {
        BarColor::Today
    } else if point.cost == 0.0 {
        BarColor::NoUsage
    } else if point.cost >= max_cost * HIGH_USAGE_RATIO {
        BarColor::High
    } else if point.cost >= max_cost * MEDIUM_USAGE_RATIO {
        BarColor::Medium
    } else {
        BarColor::Low
    }
}
