mod cli;
mod core;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use crate::core::app_state::Tab;

#[derive(Parser)]
#[command(name = "umon", about = "Claude usage and cost dashboard", version)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Output format
    #[arg(short, long, global = true)]
    format: Option<String>,

    /// Shorthand for --format json
    #[arg(short = 'j', long = "json", global = true)]
    json: bool,

    /// Pretty-print JSON output
    #[arg(long, global = true)]
    pretty: bool,

    /// Disable ANSI colors
    #[arg(long, global = true)]
    no_color: bool,

    /// Verbose logging to stderr
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Show today's usage, totals and the last 7 days
    Dashboard,
    /// Show trend statistics and the 7-day chart
    Trends,
    /// One-line status for status bars
    Status,
    /// Live dashboard that refreshes on the configured polling frequency
    Watch,
    /// Manage settings
    Settings {
        #[command(subcommand)]
        action: SettingsAction,
    },
}

#[derive(Subcommand)]
enum SettingsAction {
    /// Print the current settings
    Show,
    /// Edit settings interactively
    Edit,
    /// Change settings from the command line
    Set {
        /// Polling frequency (1min|5min|10min)
        #[arg(long)]
        frequency: Option<String>,

        /// Start at login
        #[arg(long)]
        auto_start: Option<bool>,
    },
    /// Validate config file
    Check,
    /// Generate default config file
    Init,
}

fn init_logging(verbose: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(if verbose { "umon=debug" } else { "warn" })
    });
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let output_opts = cli::output::OutputOptions {
        format: if cli.json {
            cli::output::OutputFormat::Json
        } else {
            match cli.format.as_deref() {
                Some("json") => cli::output::OutputFormat::Json,
                _ => cli::output::OutputFormat::Text,
            }
        },
        pretty: cli.pretty,
        use_color: cli::output::detect_color(!cli.no_color),
    };

    match cli.command {
        None | Some(Commands::Dashboard) => {
            cli::dashboard_cmd::run(Tab::Dashboard, &output_opts).await?
        }
        Some(Commands::Trends) => cli::dashboard_cmd::run(Tab::Trends, &output_opts).await?,
        Some(Commands::Status) => cli::dashboard_cmd::status(&output_opts).await?,
        Some(Commands::Watch) => cli::watch_cmd::run(&output_opts).await?,
        Some(Commands::Settings { action }) => match action {
            SettingsAction::Show => cli::settings_cmd::show(&output_opts).await?,
            SettingsAction::Edit => cli::settings_cmd::edit(&output_opts).await?,
            SettingsAction::Set {
                frequency,
                auto_start,
            } => cli::settings_cmd::set(frequency, auto_start, &output_opts).await?,
            SettingsAction::Check => cli::settings_cmd::check(&output_opts)?,
            SettingsAction::Init => cli::settings_cmd::init(&output_opts)?,
        },
    }

    Ok(())
}
