use crate::core::models::settings::{AppSettings, PollingFrequency};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditState {
    /// Local settings mirror the last confirmed settings.
    Clean,
    /// Local edits have not been saved.
    Dirty,
}

/// Local copy of the settings being edited, next to the last settings the
/// backend confirmed.
#[derive(Debug, Clone)]
pub struct SettingsEditor {
    confirmed: AppSettings,
    local: AppSettings,
    state: EditState,
}

impl SettingsEditor {
    pub fn new(confirmed: AppSettings) -> Self {
        Self {
            local: confirmed.clone(),
            confirmed,
            state: EditState::Clean,
        }
    }

    /// Adopt settings received from the backend. Pending edits are dropped.
    pub fn reset(&mut self, confirmed: AppSettings) {
        *self = Self::new(confirmed);
    }

    pub fn confirmed(&self) -> &AppSettings {
        &self.confirmed
    }

    pub fn local(&self) -> &AppSettings {
        &self.local
    }

    pub fn state(&self) -> EditState {
        self.state
    }

    pub fn is_dirty(&self) -> bool {
        self.state() == EditState::Dirty
    }

    pub fn set_polling_frequency(&mut self, frequency: PollingFrequency) {
        self.local.polling_frequency = frequency.id().to_string();
        self.state = EditState::Dirty;
    }

    pub fn set_auto_start(&mut self, auto_start: bool) {
        self.local.auto_start = auto_start;
        self.state = EditState::Dirty;
    }

    /// Settings to persist, or `None` when there is nothing to save.
    /// The editor stays dirty until [`confirm_saved`](Self::confirm_saved).
    pub fn begin_save(&self) -> Option<AppSettings> {
        self.is_dirty().then(|| self.local.clone())
    }

    /// Record that `saved` was persisted. Returns to clean unless the local
    /// settings changed again while the save was in flight.
    pub fn confirm_saved(&mut self, saved: AppSettings) {
        if self.local == saved {
            self.state = EditState::Clean;
        }
        self.confirmed = saved;
    }

    /// Discard local edits.
    pub fn cancel(&mut self) {
        self.local = self.confirmed.clone();
        self.state = EditState::Clean;
    }
}
