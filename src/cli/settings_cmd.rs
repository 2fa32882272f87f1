use anyhow::Result;
use colored::Colorize;

use crate::cli::output::{OutputFormat, OutputOptions};
use crate::cli::renderer;
use crate::cli::settings_panel::{self, PanelAction};
use crate::core::backend::ccusage::CcusageBackend;
use crate::core::backend::UsageBackend;
use crate::core::config::AppConfig;
use crate::core::models::settings::{AppSettings, PollingFrequency};
use crate::core::process;
use crate::core::settings_state::SettingsEditor;

fn print_settings(settings: &AppSettings, opts: &OutputOptions) -> Result<()> {
    colored::control::set_override(opts.use_color);
    match opts.format {
        OutputFormat::Json => println!("{}", opts.to_json(settings)?),
        OutputFormat::Text => {
            println!("{}", " Settings".bold());
            println!("{}", renderer::render_settings_summary(settings));
        }
    }
    Ok(())
}

/// Persist the editor's pending changes through the backend.
async fn save(backend: &dyn UsageBackend, editor: &mut SettingsEditor) -> Result<bool> {
    let Some(pending) = editor.begin_save() else {
        return Ok(false);
    };
    backend.update_settings(pending.clone()).await?;
    editor.confirm_saved(pending);
    Ok(true)
}

pub async fn show(opts: &OutputOptions) -> Result<()> {
    let backend = CcusageBackend::from_default_config();
    let settings = backend.get_settings().await?;
    print_settings(&settings, opts)
}

pub async fn edit(opts: &OutputOptions) -> Result<()> {
    let backend = CcusageBackend::from_default_config();
    let mut editor = SettingsEditor::new(backend.get_settings().await?);

    match settings_panel::interactive_edit(&mut editor)? {
        Some(PanelAction::Save) => {}
        Some(_) => {
            eprintln!("Settings edit cancelled.");
            return Ok(());
        }
        None => {
            eprintln!(
                "Not a terminal. Use `umon settings set` or edit {}",
                AppConfig::config_path().display()
            );
            return Ok(());
        }
    }

    match save(&backend, &mut editor).await {
        Ok(true) => print_settings(editor.confirmed(), opts),
        Ok(false) => {
            println!("No changes.");
            Ok(())
        }
        Err(e) => {
            eprintln!("{:#}", e);
            std::process::exit(1);
        }
    }
}

pub async fn set(
    frequency: Option<String>,
    auto_start: Option<bool>,
    opts: &OutputOptions,
) -> Result<()> {
    if frequency.is_none() && auto_start.is_none() {
        eprintln!("Nothing to set. Pass --frequency and/or --auto-start.");
        std::process::exit(1);
    }

    let backend = CcusageBackend::from_default_config();
    let mut editor = SettingsEditor::new(backend.get_settings().await?);

    if let Some(id) = frequency {
        match PollingFrequency::from_id(&id) {
            Some(freq) => editor.set_polling_frequency(freq),
            None => {
                let known: Vec<_> = PollingFrequency::all().iter().map(|f| f.id()).collect();
                eprintln!(
                    "Unknown polling frequency: '{}' (expected one of {})",
                    id,
                    known.join(", ")
                );
                std::process::exit(1);
            }
        }
    }
    if let Some(auto_start) = auto_start {
        editor.set_auto_start(auto_start);
    }

    if let Err(e) = save(&backend, &mut editor).await {
        eprintln!("{:#}", e);
        std::process::exit(1);
    }
    print_settings(editor.confirmed(), opts)
}

pub fn init(_opts: &OutputOptions) -> Result<()> {
    let path = AppConfig::config_path();
    if path.exists() {
        eprintln!("Config file already exists at {}", path.display());
        eprintln!("Remove it first if you want to regenerate.");
        return Ok(());
    }

    match AppConfig::default().save() {
        Ok(path) => println!("Generated config at {}", path.display()),
        Err(e) => {
            eprintln!("Failed to generate config: {}", e);
            std::process::exit(1);
        }
    }
    Ok(())
}

pub fn check(_opts: &OutputOptions) -> Result<()> {
    let path = AppConfig::config_path();
    if !path.exists() {
        eprintln!("No config file found at {}", path.display());
        eprintln!("Run `umon settings init` to create one.");
        return Ok(());
    }

    let config = match AppConfig::load() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to load config: {}", e);
            std::process::exit(1);
        }
    };

    let issues = config.validate();
    if !issues.is_empty() {
        eprintln!("Config issues found in {}:", path.display());
        for issue in &issues {
            eprintln!("  - {}", issue);
        }
        std::process::exit(1);
    }

    println!("Config is valid: {}", path.display());
    if let Some(program) = config.source.command.first() {
        match process::which(program) {
            Some(found) => println!("  Source: {} ({})", config.source.command.join(" "), found.display()),
            None => println!("  Source: {} ({} not found on PATH)", config.source.command.join(" "), program),
        }
    }
    Ok(())
}
