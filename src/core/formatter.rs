use chrono::{DateTime, Local, NaiveDateTime, TimeZone};

use crate::core::models::usage::{parse_calendar_date, UsageSnapshot};

/// Returns "$12.35". Missing or NaN amounts render as "$0.00".
pub fn format_currency(amount: Option<f64>) -> String {
    let amount = amount.filter(|a| !a.is_nan()).unwrap_or(0.0);
    format!("${}", fixed_two(amount))
}

/// Two decimal places with halves rounded away from zero.
///
/// `{:.2}` rounds exact ties to even (0.125 -> "0.12"), so exact half-cent
/// values are rounded explicitly. Only multiples of 1/8 can be exact ties.
fn fixed_two(amount: f64) -> String {
    let cents = amount * 100.0;
    if (amount * 8.0).fract() == 0.0 && cents.fract().abs() == 0.5 {
        return format!("{:.2}", cents.round() / 100.0);
    }
    format!("{:.2}", amount)
}

/// Returns "Sep 17" for "2025-09-17". The date is read component-wise so the
/// label is the same in every timezone. Unparsable input is returned as-is.
pub fn format_date(date: &str) -> String {
    match parse_calendar_date(date) {
        Some(d) => d.format("%b %-d").to_string(),
        None => date.to_string(),
    }
}

/// Returns the local time of a timestamp as "03:07 PM", or "Unknown".
pub fn format_time(timestamp: &str) -> String {
    format_time_in(timestamp, &Local)
}

/// Same as [`format_time`] but renders in the given timezone.
/// Timestamps without an offset are interpreted as wall-clock time in `tz`.
pub fn format_time_in<Tz: TimeZone>(timestamp: &str, tz: &Tz) -> String
where
    Tz::Offset: std::fmt::Display,
{
    let timestamp = timestamp.trim();
    if timestamp.is_empty() {
        return "Unknown".to_string();
    }

    let parsed = DateTime::parse_from_rfc3339(timestamp)
        .map(|dt| dt.with_timezone(tz))
        .ok()
        .or_else(|| {
            ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M"]
                .iter()
                .find_map(|fmt| NaiveDateTime::parse_from_str(timestamp, fmt).ok())
                .and_then(|naive| tz.from_local_datetime(&naive).earliest())
        });

    match parsed {
        Some(dt) => dt.format("%I:%M %p").to_string(),
        None => "Unknown".to_string(),
    }
}

/// Returns "+12.5%" or "-3.0%". Zero is shown with a plus sign.
pub fn format_percent_change(percent: f64) -> String {
    let sign = if percent >= 0.0 { "+" } else { "" };
    format!("{}{:.1}%", sign, percent)
}

/// One-line summary for status bars and the watch footer, e.g.
/// `Today: $3.20 | Session: $1.10 (Active)` or `Today: $3.20 | Mode: daily`.
pub fn status_line(snapshot: &UsageSnapshot) -> String {
    let today = format_currency(snapshot.today.cost);
    match &snapshot.session {
        Some(session) if session.is_active => format!(
            "Today: {} | Session: {} (Active)",
            today,
            format_currency(Some(session.cost))
        ),
        Some(session) => format!(
            "Today: {} | Session: {}",
            today,
            format_currency(Some(session.cost))
        ),
        None => format!("Today: {} | Mode: {}", today, snapshot.mode),
    }
}
