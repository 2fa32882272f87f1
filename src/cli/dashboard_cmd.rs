use anyhow::Result;
use serde::Serialize;

use crate::cli::output::{OutputFormat, OutputOptions};
use crate::cli::renderer;
use crate::core::analyzer::{self, Analysis};
use crate::core::app_state::{AppState, Tab, View};
use crate::core::backend::ccusage::CcusageBackend;
use crate::core::formatter::{format_currency, status_line};
use crate::core::models::settings::AppSettings;
use crate::core::models::usage::UsageSnapshot;

#[derive(Serialize)]
struct DashboardPayload<'a> {
    usage: &'a UsageSnapshot,
    analysis: &'a Analysis,
    #[serde(skip_serializing_if = "Option::is_none")]
    settings: Option<&'a AppSettings>,
}

/// One-shot render of the dashboard or trends tab.
pub async fn run(tab: Tab, opts: &OutputOptions) -> Result<()> {
    let backend = CcusageBackend::from_default_config();
    let mut state = AppState::default();
    state.tab = tab;

    let show_spinner = matches!(opts.format, OutputFormat::Text);
    let spinner = if show_spinner {
        Some(tokio::spawn(async move {
            let frames = ['⠋', '⠙', '⠹', '⠸', '⠼', '⠴', '⠦', '⠧', '⠇', '⠏'];
            let mut i = 0usize;
            loop {
                eprint!("\r {} Loading Claude usage data...", frames[i % frames.len()]);
                i = i.wrapping_add(1);
                tokio::time::sleep(std::time::Duration::from_millis(80)).await;
            }
        }))
    } else {
        None
    };

    state.initialize(&backend).await;

    if let Some(s) = spinner {
        s.abort();
        eprint!("\r\x1b[2K");
    }

    let analysis = state.analysis(analyzer::system_today());

    match opts.format {
        OutputFormat::Text => {
            let screen = renderer::render_app(&state, analysis.as_ref(), None, opts.use_color);
            println!("{}", screen);
        }
        OutputFormat::Json => match (state.snapshot(), analysis.as_ref(), state.error()) {
            (Some(snapshot), Some(analysis), _) => {
                let payload = DashboardPayload {
                    usage: snapshot,
                    analysis,
                    settings: state.settings().map(|e| e.confirmed()),
                };
                println!("{}", opts.to_json(&payload)?);
            }
            (_, _, Some(error)) => {
                println!("{}", opts.to_json(&serde_json::json!({ "error": error }))?);
            }
            _ => {}
        },
    }

    if matches!(state.view(), View::Failed(_)) {
        if opts.format == OutputFormat::Text {
            eprintln!("Check `umon settings check` for the configured source.");
        }
        std::process::exit(1);
    }

    Ok(())
}

#[derive(Serialize)]
struct StatusPayload {
    title: String,
    status: String,
}

/// One line for status bars, mirroring the tray tooltip.
pub async fn status(opts: &OutputOptions) -> Result<()> {
    let backend = CcusageBackend::from_default_config();
    let mut state = AppState::default();
    state.initialize(&backend).await;

    let Some(snapshot) = state.snapshot() else {
        let error = state.error().unwrap_or("Failed to load usage data");
        match opts.format {
            OutputFormat::Text => eprintln!("{}", error),
            OutputFormat::Json => {
                println!("{}", opts.to_json(&serde_json::json!({ "error": error }))?)
            }
        }
        std::process::exit(1);
    };

    let line = status_line(snapshot);
    match opts.format {
        OutputFormat::Text => println!("{}", line),
        OutputFormat::Json => {
            let payload = StatusPayload {
                title: format_currency(snapshot.today.cost),
                status: line,
            };
            println!("{}", opts.to_json(&payload)?);
        }
    }
    Ok(())
}
