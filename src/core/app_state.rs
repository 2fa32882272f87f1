use chrono::NaiveDate;
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

use crate::core::analyzer::{self, Analysis};
use crate::core::backend::{BackendError, UsageBackend};
use crate::core::models::settings::{AppSettings, PollingFrequency};
use crate::core::models::usage::UsageSnapshot;
use crate::core::settings_state::SettingsEditor;

const INIT_FALLBACK: &str = "Failed to initialize app";
const REFRESH_FALLBACK: &str = "Failed to refresh data";
const UPDATE_SETTINGS_FALLBACK: &str = "Failed to update settings";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Tab {
    #[default]
    Dashboard,
    Settings,
    Trends,
}

impl Tab {
    pub fn title(&self) -> &'static str {
        match self {
            Self::Dashboard => "Dashboard",
            Self::Settings => "Settings",
            Self::Trends => "Trends",
        }
    }
}

/// What the presentation layer should show.
#[derive(Debug, Clone, PartialEq)]
pub enum View<'a> {
    /// First load still in flight
    Loading,
    /// Nothing to show and the last attempt failed; offer a retry
    Failed(&'a str),
    /// A snapshot is available. `banner` carries a non-blocking error.
    Ready {
        snapshot: &'a UsageSnapshot,
        banner: Option<&'a str>,
    },
}

/// Application state owned by the presentation layer. All mutation happens on
/// the UI task; push updates and refresh responses overwrite the snapshot in
/// whatever order they complete.
#[derive(Debug, Default)]
pub struct AppState {
    pub tab: Tab,
    loading: bool,
    snapshot: Option<UsageSnapshot>,
    settings: Option<SettingsEditor>,
    error: Option<String>,
}

fn message_or(err: &BackendError, fallback: &str) -> String {
    let message = err.to_string();
    if message.trim().is_empty() {
        fallback.to_string()
    } else {
        message
    }
}

/// Settings and first snapshot, fetched without touching [`AppState`] so the
/// work can run on another task.
#[derive(Debug)]
pub struct InitialLoad {
    settings: Result<AppSettings, BackendError>,
    usage: Option<Result<UsageSnapshot, BackendError>>,
}

impl InitialLoad {
    /// Usage is only requested once settings have loaded.
    pub async fn fetch(backend: &dyn UsageBackend) -> Self {
        let settings = backend.get_settings().await;
        let usage = if settings.is_ok() {
            Some(backend.get_usage_data().await)
        } else {
            None
        };
        Self { settings, usage }
    }
}

impl AppState {
    /// Load settings, then the first snapshot. A failure leaves the app in
    /// the blocking error view until [`initialize`](Self::initialize) is
    /// retried.
    pub async fn initialize(&mut self, backend: &dyn UsageBackend) {
        self.begin_initialize();
        let load = InitialLoad::fetch(backend).await;
        self.finish_initialize(load);
    }

    pub fn begin_initialize(&mut self) {
        info!("initializing");
        self.loading = true;
    }

    pub fn finish_initialize(&mut self, load: InitialLoad) {
        self.loading = false;
        match self.apply_initial(load) {
            Ok(()) => {
                self.error = None;
                debug!("initialization complete");
            }
            Err(e) => {
                warn!("initialization failed: {}", e);
                self.error = Some(message_or(&e, INIT_FALLBACK));
            }
        }
    }

    fn apply_initial(&mut self, load: InitialLoad) -> Result<(), BackendError> {
        let settings = load.settings?;
        match self.settings.as_mut() {
            Some(editor) => editor.reset(settings),
            None => self.settings = Some(SettingsEditor::new(settings)),
        }
        if let Some(usage) = load.usage {
            self.snapshot = Some(usage?);
        }
        Ok(())
    }

    /// Mark a refresh as in flight. Returns `false` before settings have
    /// loaded, in which case no fetch should be started. The result goes to
    /// [`finish_refresh`](Self::finish_refresh): on failure the previous
    /// snapshot stays on screen and the error is shown as a banner.
    pub fn begin_refresh(&mut self) -> bool {
        if self.settings.is_none() {
            return false;
        }
        self.loading = true;
        self.error = None;
        true
    }

    pub fn finish_refresh(&mut self, result: Result<UsageSnapshot, BackendError>) {
        match result {
            Ok(snapshot) => self.snapshot = Some(snapshot),
            Err(e) => {
                warn!("refresh failed: {}", e);
                self.error = Some(message_or(&e, REFRESH_FALLBACK));
            }
        }
        self.loading = false;
    }

    /// True until settings and a first snapshot have both loaded; a retry
    /// should initialize rather than refresh.
    pub fn needs_initialize(&self) -> bool {
        self.snapshot.is_none() || self.settings.is_none()
    }

    /// Replace the snapshot with one delivered by a push notification.
    pub fn apply_push(&mut self, snapshot: UsageSnapshot) {
        self.snapshot = Some(snapshot);
    }

    /// Settings to persist, or `None` when there are no edits.
    pub fn pending_settings(&self) -> Option<AppSettings> {
        self.settings.as_ref().and_then(SettingsEditor::begin_save)
    }

    /// Apply the outcome of persisting `saved`. Returns `true` when the save
    /// went through and a refresh should follow. On failure the edits are
    /// kept so the save can be retried.
    pub fn finish_save(&mut self, saved: AppSettings, result: Result<(), BackendError>) -> bool {
        match result {
            Ok(()) => {
                if let Some(editor) = self.settings.as_mut() {
                    editor.confirm_saved(saved);
                }
                true
            }
            Err(e) => {
                warn!("settings update failed: {}", e);
                self.error = Some(message_or(&e, UPDATE_SETTINGS_FALLBACK));
                false
            }
        }
    }

    pub fn cancel_settings(&mut self) {
        if let Some(editor) = self.settings.as_mut() {
            editor.cancel();
        }
    }

    pub fn view(&self) -> View<'_> {
        match (&self.snapshot, &self.error) {
            (None, _) if self.loading => View::Loading,
            (None, Some(error)) => View::Failed(error),
            (None, None) => View::Loading,
            (Some(snapshot), banner) => View::Ready {
                snapshot,
                banner: banner.as_deref(),
            },
        }
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn snapshot(&self) -> Option<&UsageSnapshot> {
        self.snapshot.as_ref()
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn settings(&self) -> Option<&SettingsEditor> {
        self.settings.as_ref()
    }

    pub fn settings_mut(&mut self) -> Option<&mut SettingsEditor> {
        self.settings.as_mut()
    }

    /// Polling frequency from the confirmed settings.
    pub fn polling_frequency(&self) -> Option<PollingFrequency> {
        self.settings.as_ref().map(|e| e.confirmed().frequency())
    }

    pub fn analysis(&self, system_today: NaiveDate) -> Option<Analysis> {
        self.snapshot
            .as_ref()
            .map(|s| analyzer::analyze(s, system_today))
    }
}

/// Subscribe to push updates. Failure is logged and the app continues in
/// pull-only mode.
pub fn listen_for_usage_updates(
    backend: &dyn UsageBackend,
) -> Option<broadcast::Receiver<UsageSnapshot>> {
    match backend.subscribe() {
        Ok(rx) => Some(rx),
        Err(e) => {
            warn!("usage update listener setup failed: {}", e);
            None
        }
    }
}
