use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PollingFrequency {
    OneMinute,
    FiveMinutes,
    TenMinutes,
}

impl PollingFrequency {
    pub fn from_id(id: &str) -> Option<Self> {
        match id {
            "1min" => Some(Self::OneMinute),
            "5min" => Some(Self::FiveMinutes),
            "10min" => Some(Self::TenMinutes),
            _ => None,
        }
    }

    pub fn id(&self) -> &'static str {
        match self {
            Self::OneMinute => "1min",
            Self::FiveMinutes => "5min",
            Self::TenMinutes => "10min",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::OneMinute => "1 Minute",
            Self::FiveMinutes => "5 Minutes",
            Self::TenMinutes => "10 Minutes",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            Self::OneMinute => {
                "Fast updates - best for active development and real-time monitoring"
            }
            Self::FiveMinutes => "Balanced updates - good for regular usage monitoring",
            Self::TenMinutes => {
                "Slower updates - conserves resources for background monitoring"
            }
        }
    }

    pub fn interval(&self) -> Duration {
        match self {
            Self::OneMinute => Duration::from_secs(60),
            Self::FiveMinutes => Duration::from_secs(300),
            Self::TenMinutes => Duration::from_secs(600),
        }
    }

    /// Badge color as `#RRGGBB`.
    pub fn color(&self) -> &'static str {
        match self {
            Self::OneMinute => "#FF3B30",
            Self::FiveMinutes => "#FF9500",
            Self::TenMinutes => "#34C759",
        }
    }

    pub fn all() -> &'static [PollingFrequency] {
        &[Self::OneMinute, Self::FiveMinutes, Self::TenMinutes]
    }
}

impl std::fmt::Display for PollingFrequency {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.id())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppSettings {
    #[serde(default = "default_polling_frequency")]
    pub polling_frequency: String,
    #[serde(default = "default_auto_start")]
    pub auto_start: bool,
}

fn default_polling_frequency() -> String {
    PollingFrequency::FiveMinutes.id().to_string()
}
fn default_auto_start() -> bool {
    true
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            polling_frequency: default_polling_frequency(),
            auto_start: default_auto_start(),
        }
    }
}

impl AppSettings {
    /// The configured frequency, or 5 minutes when the stored value is unknown.
    pub fn frequency(&self) -> PollingFrequency {
        PollingFrequency::from_id(&self.polling_frequency).unwrap_or(PollingFrequency::FiveMinutes)
    }

    pub fn validate(&self) -> Vec<String> {
        let mut issues = Vec::new();
        if PollingFrequency::from_id(&self.polling_frequency).is_none() {
            issues.push(format!(
                "Invalid polling_frequency: '{}' (must be 1min, 5min, or 10min)",
                self.polling_frequency
            ));
        }
        issues
    }
}
