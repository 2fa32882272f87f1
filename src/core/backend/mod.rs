//! The boundary to whatever measures usage. The UI only talks to
//! [`UsageBackend`], so it can run against the real ccusage adapter or the
//! in-memory fake used in tests.

pub mod ccusage;
#[cfg(test)]
pub mod memory;
pub mod monitor;

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::broadcast;

use crate::core::models::settings::AppSettings;
use crate::core::models::usage::UsageSnapshot;

/// Name of the push notification carrying a fresh snapshot.
pub const USAGE_UPDATED: &str = "usage-updated";

#[derive(Error, Debug, Clone, PartialEq)]
pub enum BackendError {
    #[error("Failed to get usage data: {0}")]
    Usage(String),
    #[error("Failed to get settings: {0}")]
    Settings(String),
    #[error("Failed to update settings: {0}")]
    UpdateSettings(String),
}

#[async_trait]
pub trait UsageBackend: Send + Sync {
    async fn get_usage_data(&self) -> Result<UsageSnapshot, BackendError>;

    async fn get_settings(&self) -> Result<AppSettings, BackendError>;

    async fn update_settings(&self, settings: AppSettings) -> Result<(), BackendError>;

    async fn show_window(&self) -> Result<(), BackendError>;

    async fn hide_window(&self) -> Result<(), BackendError>;

    fn is_window_visible(&self) -> bool;

    /// Subscribe to [`USAGE_UPDATED`] notifications.
    fn subscribe(&self) -> Result<broadcast::Receiver<UsageSnapshot>, BackendError>;
}
