//! # vital-monitor
//!
//! Simulated vital-sign monitor for a remote-care dashboard.
//!
//! The crate periodically produces synthetic physiological readings, checks
//! them against fixed clinical thresholds and sends rate-limited emergency
//! notifications to caretakers. [`MonitoringSession`] is the entry point;
//! everything else is reachable through it.

pub mod activity;
pub mod config;
pub mod error;
pub mod logging;
pub mod monitoring;
pub mod notification;
pub mod settings;
pub mod storage;
pub mod vitals;

pub use config::EngineConfig;
pub use error::{Error, Result};
pub use monitoring::{ManualAlertOutcome, MonitorEvent, MonitoringSession, SessionBuilder};
pub use notification::{LoggingNotifier, Notifier};
pub use settings::Settings;
pub use vitals::{is_abnormal, Reading};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_creation() {
        let err = Error::Configuration("alertIntervalMinutes".to_string());
        assert!(err.to_string().contains("alertIntervalMinutes"));
    }
}
