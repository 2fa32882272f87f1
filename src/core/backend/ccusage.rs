use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Local, SecondsFormat};
use serde::Deserialize;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::{broadcast, RwLock};
use tracing::{debug, warn};

use crate::core::backend::{BackendError, UsageBackend};
use crate::core::config::{AppConfig, ConfigError, SourceConfig};
use crate::core::models::settings::AppSettings;
use crate::core::models::usage::{DailyRecord, TokenCounts, TotalsSummary, UsageSnapshot};
use crate::core::process;

/// How many trailing daily entries make up `recent`.
const RECENT_DAYS: usize = 7;
const UPDATE_CHANNEL_CAPACITY: usize = 16;

// ── ccusage JSON ──────────────────────────────────────────────────────

#[derive(Deserialize)]
struct CcusageDay {
    #[serde(default)]
    date: String,
    #[serde(rename = "totalCost")]
    total_cost: Option<f64>,
    cost: Option<f64>,
    #[serde(rename = "modelsUsed", default)]
    models_used: Vec<String>,
    #[serde(flatten)]
    tokens: TokenCounts,
}

impl From<CcusageDay> for DailyRecord {
    fn from(day: CcusageDay) -> Self {
        let nonzero = |c: &f64| *c != 0.0 && !c.is_nan();
        let cost = day
            .total_cost
            .filter(nonzero)
            .or(day.cost.filter(nonzero))
            .unwrap_or(0.0);
        DailyRecord {
            date: day.date,
            cost: Some(cost),
            models_used: day.models_used,
            tokens: day.tokens,
        }
    }
}

/// Parse ccusage output: either a bare array of days or `{ "daily": [...] }`.
pub fn parse_daily(stdout: &str) -> Result<Vec<DailyRecord>> {
    let stdout = stdout.trim();
    if stdout.is_empty() {
        anyhow::bail!("ccusage returned empty output");
    }

    let value: serde_json::Value =
        serde_json::from_str(stdout).context("ccusage returned invalid JSON")?;
    let daily = match value {
        serde_json::Value::Array(days) => days,
        serde_json::Value::Object(mut map) => match map.remove("daily") {
            Some(serde_json::Value::Array(days)) => days,
            _ => invalid_structure(&serde_json::Value::Object(map))?,
        },
        other => invalid_structure(&other)?,
    };

    let days: Vec<CcusageDay> = serde_json::from_value(serde_json::Value::Array(daily))
        .context("Failed to parse ccusage daily entries")?;
    Ok(days.into_iter().map(DailyRecord::from).collect())
}

fn invalid_structure(value: &serde_json::Value) -> Result<Vec<serde_json::Value>> {
    let preview: String = value.to_string().chars().take(200).collect();
    anyhow::bail!("ccusage returned invalid data structure: {}", preview)
}

fn total_cost<'a>(days: impl Iterator<Item = &'a DailyRecord>) -> f64 {
    days.map(DailyRecord::cost_or_zero).sum()
}

/// Assemble a snapshot from the full daily history as seen at `now`.
pub fn build_snapshot(daily: Vec<DailyRecord>, now: DateTime<Local>) -> UsageSnapshot {
    let today_key = now.format("%Y-%m-%d").to_string();
    let month_key = now.format("%Y-%m").to_string();

    let today = daily
        .iter()
        .find(|d| d.date == today_key)
        .cloned()
        .unwrap_or_else(|| DailyRecord::new(today_key.clone(), 0.0));
    let recent: Vec<DailyRecord> = daily[daily.len().saturating_sub(RECENT_DAYS)..].to_vec();

    let all_time = total_cost(daily.iter());
    let weekly = total_cost(recent.iter());
    let monthly = total_cost(daily.iter().filter(|d| d.date.starts_with(&month_key)));

    let tokens = daily.iter().fold(TokenCounts::default(), |mut acc, d| {
        acc.input_tokens += d.tokens.input_tokens;
        acc.output_tokens += d.tokens.output_tokens;
        acc.cache_creation_tokens += d.tokens.cache_creation_tokens;
        acc.cache_read_tokens += d.tokens.cache_read_tokens;
        acc.total_tokens += d.tokens.total_tokens;
        acc
    });

    UsageSnapshot {
        today,
        session: None,
        recent,
        totals: TotalsSummary {
            cost: Some(all_time),
            weekly_cost: Some(weekly),
            monthly_cost: Some(monthly),
            total_cost: Some(all_time),
            tokens,
        },
        last_updated: now.to_rfc3339_opts(SecondsFormat::Millis, false),
        mode: "daily".to_string(),
        error: None,
    }
}

// ── Backend ───────────────────────────────────────────────────────────

/// Backend that runs the ccusage CLI and persists settings in the config file.
pub struct CcusageBackend {
    source: SourceConfig,
    config_path: PathBuf,
    settings: RwLock<AppSettings>,
    visible: AtomicBool,
    updates: broadcast::Sender<UsageSnapshot>,
}

impl CcusageBackend {
    pub fn new(config: AppConfig, config_path: PathBuf) -> Self {
        let (updates, _) = broadcast::channel(UPDATE_CHANNEL_CAPACITY);
        Self {
            source: config.source,
            config_path,
            settings: RwLock::new(config.settings),
            visible: AtomicBool::new(true),
            updates,
        }
    }

    /// Backend for the config at the default path. An unreadable file is
    /// replaced by defaults for fetching only; settings calls keep reporting
    /// it and saving will not overwrite it.
    pub fn from_default_config() -> Self {
        let config = AppConfig::load().unwrap_or_else(|e| {
            warn!("{}; using defaults", e);
            AppConfig::default()
        });
        Self::new(config, AppConfig::config_path())
    }

    /// The config file as it is now, or `None` when it does not exist yet.
    fn read_config_file(&self) -> Result<Option<AppConfig>, ConfigError> {
        if !self.config_path.exists() {
            return Ok(None);
        }
        AppConfig::load_from(&self.config_path).map(Some)
    }

    pub async fn current_settings(&self) -> AppSettings {
        self.settings.read().await.clone()
    }

    async fn fetch(&self) -> Result<UsageSnapshot> {
        let stdout = process::run_command(&self.source.command, self.source.timeout()).await?;
        let daily = parse_daily(&stdout)?;
        debug!(days = daily.len(), "parsed ccusage output");
        Ok(build_snapshot(daily, Local::now()))
    }

    /// Fetch a snapshot and announce it to subscribers.
    pub async fn refresh_and_publish(&self) -> Result<UsageSnapshot, BackendError> {
        let snapshot = self.get_usage_data().await?;
        // No subscribers is fine
        let _ = self.updates.send(snapshot.clone());
        Ok(snapshot)
    }
}

#[async_trait]
impl UsageBackend for CcusageBackend {
    async fn get_usage_data(&self) -> Result<UsageSnapshot, BackendError> {
        self.fetch()
            .await
            .map_err(|e| BackendError::Usage(format!("{:#}", e)))
    }

    async fn get_settings(&self) -> Result<AppSettings, BackendError> {
        let on_disk = self
            .read_config_file()
            .map_err(|e| BackendError::Settings(e.to_string()))?;
        if let Some(config) = on_disk {
            *self.settings.write().await = config.settings;
        }
        Ok(self.current_settings().await)
    }

    async fn update_settings(&self, settings: AppSettings) -> Result<(), BackendError> {
        let issues = settings.validate();
        if !issues.is_empty() {
            return Err(BackendError::UpdateSettings(issues.join("; ")));
        }

        // Only the settings table is replaced; the rest of the file stays as
        // the user wrote it
        let mut config = self
            .read_config_file()
            .map_err(|e| {
                BackendError::UpdateSettings(format!(
                    "{} is unreadable, not overwriting it ({})",
                    self.config_path.display(),
                    e
                ))
            })?
            .unwrap_or_else(|| AppConfig {
                settings: AppSettings::default(),
                source: self.source.clone(),
            });
        config.settings = settings.clone();
        config
            .save_to(&self.config_path)
            .map_err(|e| BackendError::UpdateSettings(e.to_string()))?;
        debug!(path = %self.config_path.display(), "saved settings");

        // The monitor reads the settings each iteration, so nothing to restart
        *self.settings.write().await = settings;
        Ok(())
    }

    async fn show_window(&self) -> Result<(), BackendError> {
        self.visible.store(true, Ordering::SeqCst);
        Ok(())
    }

    async fn hide_window(&self) -> Result<(), BackendError> {
        self.visible.store(false, Ordering::SeqCst);
        Ok(())
    }

    fn is_window_visible(&self) -> bool {
        self.visible.load(Ordering::SeqCst)
    }

    fn subscribe(&self) -> Result<broadcast::Receiver<UsageSnapshot>, BackendError> {
        Ok(self.updates.subscribe())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(y: i32, m: u32, d: u32) -> DateTime<Local> {
        Local.with_ymd_and_hms(y, m, d, 12, 0, 0).unwrap()
    }

    fn temp_config_path(name: &str) -> PathBuf {
        std::env::temp_dir()
            .join(format!("umon-{}-{}", name, std::process::id()))
            .join("config.toml")
    }

    fn echo_backend(json: &str, name: &str) -> CcusageBackend {
        let config = AppConfig {
            settings: AppSettings::default(),
            source: SourceConfig {
                command: vec!["echo".into(), json.into()],
                timeout_secs: 5,
            },
        };
        CcusageBackend::new(config, temp_config_path(name))
    }

    #[test]
    fn parse_daily_array_format() {
        let json = r#"[
            { "date": "2025-09-16", "totalCost": 3.5, "inputTokens": 10 },
            { "date": "2025-09-17", "cost": 1.25, "modelsUsed": ["claude-opus-4"] }
        ]"#;
        let days = parse_daily(json).unwrap();
        assert_eq!(days.len(), 2);
        assert_eq!(days[0].cost, Some(3.5));
        assert_eq!(days[0].tokens.input_tokens, 10.0);
        assert_eq!(days[1].cost, Some(1.25));
        assert_eq!(days[1].models_used, vec!["claude-opus-4".to_string()]);
    }

    #[test]
    fn parse_daily_object_format() {
        let json = r#"{ "daily": [ { "date": "2025-09-17", "totalCost": 2.0 } ], "totals": {} }"#;
        let days = parse_daily(json).unwrap();
        assert_eq!(days.len(), 1);
        assert_eq!(days[0].cost, Some(2.0));
    }

    #[test]
    fn parse_daily_zero_total_cost_falls_back_to_cost() {
        let days = parse_daily(r#"[{ "date": "2025-09-17", "totalCost": 0, "cost": 4.0 }]"#).unwrap();
        assert_eq!(days[0].cost, Some(4.0));
        let days = parse_daily(r#"[{ "date": "2025-09-17" }]"#).unwrap();
        assert_eq!(days[0].cost, Some(0.0));
    }

    #[test]
    fn parse_daily_rejects_empty_and_unknown_shapes() {
        assert!(parse_daily("  ").unwrap_err().to_string().contains("empty output"));
        let err = parse_daily(r#"{ "weekly": [] }"#).unwrap_err();
        assert!(err.to_string().contains("invalid data structure"));
        assert!(parse_daily("not json").is_err());
    }

    #[test]
    fn build_snapshot_picks_today_and_totals() {
        let daily = vec![
            DailyRecord::new("2025-08-30", 10.0),
            DailyRecord::new("2025-09-01", 1.0),
            DailyRecord::new("2025-09-16", 2.0),
            DailyRecord::new("2025-09-17", 3.0),
        ];
        let snapshot = build_snapshot(daily, at(2025, 9, 17));
        assert_eq!(snapshot.today.date, "2025-09-17");
        assert_eq!(snapshot.today.cost, Some(3.0));
        assert_eq!(snapshot.recent.len(), 4);
        assert_eq!(snapshot.totals.all_time(), 16.0);
        assert_eq!(snapshot.totals.weekly(), 16.0);
        assert_eq!(snapshot.totals.monthly(), 6.0);
        assert_eq!(snapshot.mode, "daily");
        assert!(snapshot.last_updated.starts_with("2025-09-17T12:00:00"));
    }

    #[test]
    fn build_snapshot_keeps_last_seven_days() {
        let daily: Vec<DailyRecord> = (1..=10)
            .map(|d| DailyRecord::new(format!("2025-09-{:02}", d), d as f64))
            .collect();
        let snapshot = build_snapshot(daily, at(2025, 9, 10));
        assert_eq!(snapshot.recent.len(), 7);
        assert_eq!(snapshot.recent[0].date, "2025-09-04");
        assert_eq!(snapshot.totals.weekly(), (4..=10).sum::<i32>() as f64);
        assert_eq!(snapshot.totals.all_time(), 55.0);
    }

    #[test]
    fn build_snapshot_without_today_entry() {
        let snapshot = build_snapshot(vec![DailyRecord::new("2025-09-15", 2.0)], at(2025, 9, 17));
        assert_eq!(snapshot.today.date, "2025-09-17");
        assert_eq!(snapshot.today.cost, Some(0.0));
    }

    #[tokio::test]
    async fn get_usage_data_runs_command() {
        let today = Local::now().format("%Y-%m-%d").to_string();
        let json = format!(r#"[{{ "date": "{}", "totalCost": 7.5 }}]"#, today);
        let backend = echo_backend(&json, "fetch");
        let snapshot = backend.get_usage_data().await.unwrap();
        assert_eq!(snapshot.today.cost, Some(7.5));
        assert_eq!(snapshot.recent.len(), 1);
    }

    #[tokio::test]
    async fn get_usage_data_error_is_prefixed() {
        let backend = echo_backend("", "empty");
        let err = backend.get_usage_data().await.unwrap_err();
        assert!(err.to_string().starts_with("Failed to get usage data:"));
        assert!(err.to_string().contains("empty output"));
    }

    #[tokio::test]
    async fn refresh_and_publish_notifies_subscribers() {
        let backend = echo_backend(r#"[{ "date": "2025-09-17", "totalCost": 1.0 }]"#, "publish");
        let mut rx = backend.subscribe().unwrap();
        let snapshot = backend.refresh_and_publish().await.unwrap();
        assert_eq!(rx.recv().await.unwrap(), snapshot);
    }

    #[tokio::test]
    async fn update_settings_persists_to_config() {
        let backend = echo_backend("[]", "settings");
        let settings = AppSettings {
            polling_frequency: "10min".to_string(),
            auto_start: false,
        };
        backend.update_settings(settings.clone()).await.unwrap();
        assert_eq!(backend.get_settings().await.unwrap(), settings);

        let saved = AppConfig::load_from(&backend.config_path).unwrap();
        assert_eq!(saved.settings, settings);
        assert_eq!(saved.source.command[0], "echo");
        let _ = std::fs::remove_dir_all(backend.config_path.parent().unwrap());
    }

    #[tokio::test]
    async fn update_settings_rejects_unknown_frequency() {
        let backend = echo_backend("[]", "invalid");
        let err = backend
            .update_settings(AppSettings {
                polling_frequency: "2min".to_string(),
                auto_start: true,
            })
            .await
            .unwrap_err();
        assert!(matches!(err, BackendError::UpdateSettings(_)));
        assert_eq!(backend.get_settings().await.unwrap(), AppSettings::default());
    }

    #[tokio::test]
    async fn window_visibility_toggles() {
        let backend = echo_backend("[]", "window");
        assert!(backend.is_window_visible());
        backend.hide_window().await.unwrap();
        assert!(!backend.is_window_visible());
        backend.show_window().await.unwrap();
        assert!(backend.is_window_visible());
    }

    #[tokio::test]
    async fn update_settings_keeps_user_source() {
        let path = temp_config_path("keep-source");
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(
            &path,
            "[source]\ncommand = [\"npx\", \"ccusage@latest\", \"daily\", \"--json\"]\ntimeout_secs = 90\n",
        )
        .unwrap();
        let backend = CcusageBackend::new(AppConfig::default(), path.clone());

        backend
            .update_settings(AppSettings {
                polling_frequency: "10min".to_string(),
                auto_start: true,
            })
            .await
            .unwrap();

        let saved = AppConfig::load_from(&path).unwrap();
        assert_eq!(saved.settings.polling_frequency, "10min");
        assert_eq!(saved.source.command, vec!["npx", "ccusage@latest", "daily", "--json"]);
        assert_eq!(saved.source.timeout_secs, 90);
        let _ = std::fs::remove_dir_all(path.parent().unwrap());
    }

    #[tokio::test]
    async fn unreadable_config_is_never_overwritten() {
        let path = temp_config_path("unreadable");
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        let original = "[settings]\nauto_start = \"yes\"\n\n[source]\ncommand = [\"npx\", \"ccusage@latest\"]\n";
        std::fs::write(&path, original).unwrap();
        let backend = CcusageBackend::new(AppConfig::default(), path.clone());

        let err = backend.get_settings().await.unwrap_err();
        assert!(matches!(err, BackendError::Settings(_)));

        let err = backend
            .update_settings(AppSettings {
                polling_frequency: "10min".to_string(),
                auto_start: true,
            })
            .await
            .unwrap_err();
        assert!(matches!(err, BackendError::UpdateSettings(ref m) if m.contains("unreadable")));
        assert_eq!(std::fs::read_to_string(&path).unwrap(), original);
        assert_eq!(backend.current_settings().await, AppSettings::default());
        let _ = std::fs::remove_dir_all(path.parent().unwrap());
    }

    #[tokio::test]
    async fn get_settings_picks_up_file_edits() {
        let backend = echo_backend("[]", "reload");
        std::fs::create_dir_all(backend.config_path.parent().unwrap()).unwrap();
        std::fs::write(&backend.config_path, "[settings]\npolling_frequency = \"1min\"\n").unwrap();
        let settings = backend.get_settings().await.unwrap();
        assert_eq!(settings.polling_frequency, "1min");
        assert_eq!(backend.current_settings().await, settings);
        let _ = std::fs::remove_dir_all(backend.config_path.parent().unwrap());
    }
}
