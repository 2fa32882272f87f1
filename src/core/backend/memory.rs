//! In-memory backend for driving the UI state in tests.

use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;
use tokio::sync::broadcast;

use crate::core::backend::{BackendError, UsageBackend};
use crate::core::models::settings::AppSettings;
use crate::core::models::usage::UsageSnapshot;

pub struct InMemoryBackend {
    snapshot: Mutex<UsageSnapshot>,
    settings: Mutex<AppSettings>,
    usage_error: Mutex<Option<BackendError>>,
    settings_error: Mutex<Option<BackendError>>,
    update_error: Mutex<Option<BackendError>>,
    subscribe_error: Mutex<Option<BackendError>>,
    usage_calls: AtomicUsize,
    visible: AtomicBool,
    updates: broadcast::Sender<UsageSnapshot>,
}

impl InMemoryBackend {
    pub fn new(snapshot: UsageSnapshot, settings: AppSettings) -> Self {
        let (updates, _) = broadcast::channel(8);
        Self {
            snapshot: Mutex::new(snapshot),
            settings: Mutex::new(settings),
            usage_error: Mutex::new(None),
            settings_error: Mutex::new(None),
            update_error: Mutex::new(None),
            subscribe_error: Mutex::new(None),
            usage_calls: AtomicUsize::new(0),
            visible: AtomicBool::new(true),
            updates,
        }
    }

    pub fn set_snapshot(&self, snapshot: UsageSnapshot) {
        *self.snapshot.lock().unwrap() = snapshot;
    }

    pub fn fail_usage(&self, error: Option<BackendError>) {
        *self.usage_error.lock().unwrap() = error;
    }

    pub fn fail_settings(&self, error: Option<BackendError>) {
        *self.settings_error.lock().unwrap() = error;
    }

    pub fn fail_update(&self, error: Option<BackendError>) {
        *self.update_error.lock().unwrap() = error;
    }

    pub fn fail_subscribe(&self, error: Option<BackendError>) {
        *self.subscribe_error.lock().unwrap() = error;
    }

    pub fn usage_calls(&self) -> usize {
        self.usage_calls.load(Ordering::SeqCst)
    }

    pub fn stored_settings(&self) -> AppSettings {
        self.settings.lock().unwrap().clone()
    }

    /// Deliver a push notification to every subscriber.
    pub fn push(&self, snapshot: UsageSnapshot) {
        let _ = self.updates.send(snapshot);
    }
}

#[async_trait]
impl UsageBackend for InMemoryBackend {
    async fn get_usage_data(&self) -> Result<UsageSnapshot, BackendError> {
        self.usage_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(e) = self.usage_error.lock().unwrap().clone() {
            return Err(e);
        }
        Ok(self.snapshot.lock().unwrap().clone())
    }

    async fn get_settings(&self) -> Result<AppSettings, BackendError> {
        if let Some(e) = self.settings_error.lock().unwrap().clone() {
            return Err(e);
        }
        Ok(self.stored_settings())
    }

    async fn update_settings(&self, settings: AppSettings) -> Result<(), BackendError> {
        if let Some(e) = self.update_error.lock().unwrap().clone() {
            return Err(e);
        }
        *self.settings.lock().unwrap() = settings;
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
        if let Some(e) = self.subscribe_error.lock().unwrap().clone() {
            return Err(e);
        }
        Ok(self.updates.subscribe())
    }
}
