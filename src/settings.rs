//! Caretaker-facing monitoring settings.
//!
//! Settings live in the key-value store under [`SETTINGS_KEY`]. The engine
//! reads a snapshot when the scheduler starts; saving new settings while
//! monitoring restarts the scheduler so the new cadence takes effect.

use crate::error::{Error, Result};
use crate::storage::{KeyValueStore, SETTINGS_KEY};
use serde::{Deserialize, Deserializer, Serialize};
use std::time::Duration;

/// Default minutes between scheduled ticks.
pub const DEFAULT_ALERT_INTERVAL_MINUTES: i64 = 3;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Settings {
    #[serde(
        alias = "emailNotification",
        deserialize_with = "deserialize_toggle",
        default
    )]
    pub email_notification_enabled: bool,

    #[serde(
        alias = "smsNotification",
        deserialize_with = "deserialize_toggle",
        default
    )]
    pub sms_notification_enabled: bool,

    /// Missing values deserialize to 0 and are rejected by [`Settings::validate`].
    #[serde(alias = "alertFrequency", default)]
    pub alert_interval_minutes: i64,

    #[serde(default)]
    pub emergency_contact: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            email_notification_enabled: true,
            sms_notification_enabled: true,
            alert_interval_minutes: DEFAULT_ALERT_INTERVAL_MINUTES,
            emergency_contact: String::new(),
        }
    }
}

impl Settings {
    pub fn validate(&self) -> Result<()> {
        if self.alert_interval_minutes <= 0 {
            return Err(Error::Configuration(format!(
                "alertIntervalMinutes must be a positive integer, got {}",
                self.alert_interval_minutes
            )));
        }
        Ok(())
    }

    /// Tick period, given the length of one engine minute.
    pub fn alert_interval(&self, minute: Duration) -> Result<Duration> {
        self.validate()?;
        let minutes = u32::try_from(self.alert_interval_minutes).map_err(|_| {
            Error::Configuration(format!(
                "alertIntervalMinutes is too large: {}",
                self.alert_interval_minutes
            ))
        })?;
        Ok(minute * minutes)
    }

    /// Email is only sent when enabled and a contact address is configured.
    pub fn email_channel_active(&self) -> bool {
        self.email_notification_enabled && !self.emergency_contact.trim().is_empty()
    }

    pub fn with_interval_minutes(mut self, minutes: i64) -> Self {
        self.alert_interval_minutes = minutes;
        self
    }

    pub fn with_contact(mut self, contact: impl Into<String>) -> Self {
        self.emergency_contact = contact.into();
        self
    }

    pub fn with_channels(mut self, email: bool, sms: bool) -> Self {
        self.email_notification_enabled = email;
        self.sms_notification_enabled = sms;
        self
    }

    /// Load the stored settings, or defaults when none were ever saved.
    pub async fn load(store: &dyn KeyValueStore) -> Result<Self> {
        match store.get(SETTINGS_KEY).await? {
            Some(raw) => Ok(serde_json::from_str(&raw)?),
            None => Ok(Self::default()),
        }
    }

    pub async fn save(&self, store: &dyn KeyValueStore) -> Result<()> {
        let raw = serde_json::to_string(self)?;
        store.set(SETTINGS_KEY, raw).await
    }
}

/// Accept either a JSON bool or the `"enabled"`/`"disabled"` strings used by
/// older settings records.
fn deserialize_toggle<'de, D>(deserializer: D) -> std::result::Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Toggle {
        Flag(bool),
        Word(String),
    }

    match Toggle::deserialize(deserializer)? {
        Toggle::Flag(flag) => Ok(flag),
        Toggle::Word(word) => match word.to_ascii_lowercase().as_str() {
            "enabled" | "true" | "on" => Ok(true),
            "disabled" | "false" | "off" => Ok(false),
            other => Err(serde::de::Error::custom(format!(
                "expected \"enabled\" or \"disabled\", got {other:?}"
            ))),
        },
    }
}
