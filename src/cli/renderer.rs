use colored::{control, ColoredString, Colorize};

use crate::core::analyzer::series::{BarColor, BAR_MAX_HEIGHT};
use crate::core::analyzer::trend::TrendDirection;
use crate::core::analyzer::Analysis;
use crate::core::app_state::{AppState, Tab, View};
use crate::core::formatter::{format_currency, format_date, format_percent_change, format_time};
use crate::core::models::settings::{AppSettings, PollingFrequency};
use crate::core::models::usage::UsageSnapshot;
use crate::core::settings_state::SettingsEditor;

/// Character cells for a bar of [`BAR_MAX_HEIGHT`].
const CHART_WIDTH: f64 = 24.0;

/// `#RRGGBB` to channels. Anything else renders black.
fn hex_rgb(hex: &str) -> (u8, u8, u8) {
    let parsed = hex
        .strip_prefix('#')
        .filter(|digits| digits.len() == 6)
        .and_then(|digits| {
            let channel = |i: usize| {
                digits
                    .get(i..i + 2)
                    .and_then(|c| u8::from_str_radix(c, 16).ok())
            };
            Some((channel(0)?, channel(2)?, channel(4)?))
        });
    parsed.unwrap_or((0, 0, 0))
}

fn frequency_badge(freq: PollingFrequency) -> ColoredString {
    let (r, g, b) = hex_rgb(freq.color());
    format!("● {}", freq.label()).truecolor(r, g, b)
}

fn bar_cells(height: f64, color: BarColor) -> ColoredString {
    // The 2-unit floor of an empty day still deserves one cell
    let cells = ((height / BAR_MAX_HEIGHT) * CHART_WIDTH).round().max(1.0) as usize;
    let glyph = if color == BarColor::NoUsage { "░" } else { "█" };
    let (r, g, b) = hex_rgb(color.hex());
    glyph.repeat(cells).truecolor(r, g, b)
}

/// Render the dashboard tab.
///
/// Layout:
/// ```text
///  Today's Usage
///   Sep 17    $12.35
///   Session   $1.20 (active)
///
///  Total Usage
///   This Week   $40.00
///   This Month  $120.50
///   All Time    $300.00
///
///  Recent 7 Days
///   Sep 11    $0.00
///   ...
///
///   Last updated: 03:07 PM  ● 5 Minutes
/// ```
pub fn render_dashboard(
    snapshot: &UsageSnapshot,
    analysis: &Analysis,
    frequency: Option<PollingFrequency>,
    loading: bool,
) -> String {
    let mut lines: Vec<String> = Vec::new();

    lines.push(" Today's Usage".bold().to_string());
    lines.push(format!(
        "  {:<8}  {}",
        format_date(&snapshot.today.date).cyan(),
        format_currency(snapshot.today.cost).bold()
    ));
    if let Some(session) = &snapshot.session {
        let active = if session.is_active { " (active)" } else { "" };
        lines.push(format!(
            "  {}   {}{}",
            "Session".cyan(),
            format_currency(Some(session.cost)),
            active
        ));
    }
    if let Some(error) = &snapshot.error {
        lines.push(format!("  {}", error.red()));
    }

    lines.push(String::new());
    lines.push(" Total Usage".bold().to_string());
    let totals = [
        ("This Week", snapshot.totals.weekly()),
        ("This Month", snapshot.totals.monthly()),
        ("All Time", snapshot.totals.all_time()),
    ];
    for (label, amount) in totals {
        lines.push(format!(
            "  {}  {}",
            format!("{:<10}", label).cyan(),
            format_currency(Some(amount))
        ));
    }

    lines.push(String::new());
    lines.push(" Recent 7 Days".bold().to_string());
    for bar in &analysis.chart {
        let marker = if bar.point.is_today { " (today)" } else { "" };
        lines.push(format!(
            "  {}  {}{}",
            format!("{:<8}", format_date(&bar.point.date.to_string())).cyan(),
            format_currency(Some(bar.point.cost)),
            marker.dimmed()
        ));
    }

    lines.push(String::new());
    let mut status = format!("  Last updated: {}", format_time(&snapshot.last_updated));
    if loading {
        status.push_str("  Updating...");
    }
    if let Some(freq) = frequency {
        status.push_str(&format!("  {}", frequency_badge(freq)));
    }
    lines.push(status.dimmed().to_string());

    lines.join("\n")
}

/// Render the trends tab: summary statistics and the 7-day chart.
pub fn render_trends(analysis: &Analysis) -> String {
    let trend = &analysis.trend;
    let mut lines: Vec<String> = Vec::new();

    lines.push(" Summary".bold().to_string());
    lines.push(format!(
        "  {}  {}",
        "Daily Average".cyan(),
        format_currency(Some(trend.average_cost))
    ));
    lines.push(format!(
        "  {}     {}",
        "Week Total".cyan(),
        format_currency(Some(trend.total_cost))
    ));
    lines.push(format!(
        "  {}    {}",
        "Highest Day".cyan(),
        format_currency(Some(trend.max_cost))
    ));
    lines.push(format!(
        "  {}     {}",
        "Lowest Day".cyan(),
        format_currency(Some(trend.min_cost))
    ));

    let change = format_percent_change(trend.percent_change);
    let change = if trend.percent_change >= 0.0 {
        change.green()
    } else {
        change.red()
    };
    lines.push(format!("  {}   {}", "Daily Change".cyan(), change));

    let arrow = match trend.direction {
        TrendDirection::Up => "↑",
        TrendDirection::Down => "↓",
        TrendDirection::Neutral => "→",
    };
    lines.push(format!(
        "  {}          {} {}",
        "Trend".cyan(),
        arrow,
        trend.direction
    ));

    lines.push(String::new());
    lines.push(" 7-Day Chart".bold().to_string());
    for bar in &analysis.chart {
        lines.push(format!(
            "  {:<6}  {} {}",
            format_date(&bar.point.date.to_string()),
            bar_cells(bar.height, bar.color),
            format_currency(Some(bar.point.cost))
        ));
    }
    lines.push(format!(
        "  {} Today  {} No usage  {} High  {} Medium  {} Low",
        bar_cells(0.0, BarColor::Today),
        bar_cells(0.0, BarColor::NoUsage),
        bar_cells(0.0, BarColor::High),
        bar_cells(0.0, BarColor::Medium),
        bar_cells(0.0, BarColor::Low),
    ));

    lines.join("\n")
}

/// Render the settings panel. `cursor` highlights a row in the interactive
/// editor: rows 0-2 are the frequencies, row 3 is auto start.
pub fn render_settings(editor: &SettingsEditor, cursor: Option<usize>) -> String {
    let local = editor.local();
    let mut lines: Vec<String> = Vec::new();

    lines.push(" Polling Frequency".bold().to_string());
    lines.push("  Choose how often to refresh your Claude usage data".dimmed().to_string());
    for (i, freq) in PollingFrequency::all().iter().enumerate() {
        let selected = local.polling_frequency == freq.id();
        let radio = if selected { "(•)" } else { "( )" };
        let pointer = if cursor == Some(i) { ">" } else { " " };
        let row = format!("{} {} {}", pointer, radio, frequency_badge(*freq));
        let row = if cursor == Some(i) {
            row.reversed().to_string()
        } else {
            row
        };
        lines.push(format!(" {}", row));
        lines.push(format!("       {}", freq.description().dimmed()));
    }

    lines.push(String::new());
    lines.push(" Startup".bold().to_string());
    let check = if local.auto_start { "[x]" } else { "[ ]" };
    let pointer = if cursor == Some(3) { ">" } else { " " };
    let row = format!("{} {} Start at login", pointer, check);
    let row = if cursor == Some(3) {
        row.reversed().to_string()
    } else {
        row
    };
    lines.push(format!(" {}", row));
    lines.push("       Launch the app automatically when you log in".dimmed().to_string());

    if editor.is_dirty() {
        lines.push(String::new());
        lines.push(format!("  {}", "Unsaved changes".yellow()));
    }

    lines.join("\n")
}

/// One-line summary of saved settings, for `settings show`.
pub fn render_settings_summary(settings: &AppSettings) -> String {
    let freq = settings.frequency();
    format!(
        "  {}  {} ({}s)\n  {}      {}",
        "Polling".cyan(),
        frequency_badge(freq),
        freq.interval().as_secs(),
        "Start".cyan(),
        if settings.auto_start { "at login" } else { "manually" }
    )
}

/// Render the whole screen for the current state and tab. `settings_cursor`
/// is forwarded to [`render_settings`].
pub fn render_app(
    state: &AppState,
    analysis: Option<&Analysis>,
    settings_cursor: Option<usize>,
    use_color: bool,
) -> String {
    control::set_override(use_color);

    let body = match state.view() {
        View::Loading => "  Loading Claude usage data...".dimmed().to_string(),
        View::Failed(error) => format!(
            " {}\n  {}\n\n  Press r to retry",
            "Error".red().bold(),
            error
        ),
        View::Ready { snapshot, banner } => {
            let mut out = String::new();
            if let Some(banner) = banner {
                out.push_str(&format!("  {}\n\n", banner.red()));
            }
            let tab = match (state.tab, analysis) {
                (Tab::Dashboard, Some(a)) => {
                    render_dashboard(snapshot, a, state.polling_frequency(), state.is_loading())
                }
                (Tab::Trends, Some(a)) => render_trends(a),
                (Tab::Settings, _) => match state.settings() {
                    Some(editor) => render_settings(editor, settings_cursor),
                    None => "  Loading settings...".dimmed().to_string(),
                },
                (_, None) => "  No usage data available".dimmed().to_string(),
            };
            out.push_str(&tab);
            out
        }
    };

    let tabs: Vec<String> = [Tab::Dashboard, Tab::Trends, Tab::Settings]
        .iter()
        .enumerate()
        .map(|(i, tab)| {
            let label = format!("{} {}", i + 1, tab.title());
            if *tab == state.tab {
                label.bold().underline().to_string()
            } else {
                label.dimmed().to_string()
            }
        })
        .collect();

    format!(" {}\n\n{}", tabs.join("   "), body)
}
