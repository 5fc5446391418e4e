//! Caretaker notification channels.
//!
//! Real email/SMS delivery is an external service; the engine only talks to
//! it through [`Notifier`]. [`LoggingNotifier`] is the built-in stand-in that
//! records each delivery as a structured log event.

use crate::error::ChannelError;
use crate::vitals::{violations, Reading};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};

/// Delivery channel kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChannelKind {
    Email,
    Sms,
}

impl ChannelKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Email => "email",
            Self::Sms => "sms",
        }
    }
}

#[async_trait]
pub trait Notifier: Send + Sync {
    /// Send an alert email about `reading` to `contact`.
    async fn send_email(&self, contact: &str, reading: &Reading) -> Result<(), ChannelError>;

    /// Send an alert SMS about `reading`.
    async fn send_sms(&self, reading: &Reading) -> Result<(), ChannelError>;
}

/// Notifier that only logs what it would have sent.
#[derive(Debug, Default)]
pub struct LoggingNotifier {
    sent: AtomicU64,
}

impl LoggingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of notifications "sent" so far.
    pub fn sent_count(&self) -> u64 {
        self.sent.load(Ordering::Relaxed)
    }
}

/// Human-readable alert body shared by every channel.
pub fn alert_message(reading: &Reading) -> String {
    let details: Vec<String> = violations(reading).iter().map(|v| v.to_string()).collect();
    format!(
        "Abnormal values detected at {}: {} [{}]",
        reading.timestamp().format("%H:%M:%S"),
        reading,
        details.join(", ")
    )
}

#[async_trait]
impl Notifier for LoggingNotifier {
    async fn send_email(&self, contact: &str, reading: &Reading) -> Result<(), ChannelError> {
        self.sent.fetch_add(1, Ordering::Relaxed);
        tracing::info!(
            channel = ChannelKind::Email.as_str(),
            contact,
            message = %alert_message(reading),
            "Sending email alert"
        );
        Ok(())
    }

    async fn send_sms(&self, reading: &Reading) -> Result<(), ChannelError> {
        self.sent.fetch_add(1, Ordering::Relaxed);
        tracing::info!(
            channel = ChannelKind::Sms.as_str(),
            message = %alert_message(reading),
            "Sending SMS alert"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vitals::BloodPressure;
    use chrono::TimeZone;

    fn abnormal() -> Reading {
        Reading::new(128, 88, 96, 37.0, BloodPressure::new(118, 76))
            .with_timestamp(chrono::Utc.with_ymd_and_hms(2025, 1, 2, 14, 5, 9).unwrap())
    }

    #[test]
    fn test_alert_message_lists_violations() {
        let message = alert_message(&abnormal());
        assert!(message.starts_with("Abnormal values detected at 14:05:09"));
        assert!(message.contains("heart_rate 128bpm > 100"));
        assert!(message.contains("spo2 88% < 95"));
        assert!(!message.contains("pulse_rate"));
    }

    #[tokio::test]
    async fn test_logging_notifier_counts_deliveries() {
        let notifier = LoggingNotifier::new();
        notifier.send_email("carer@example.org", &abnormal()).await.unwrap();
        notifier.send_sms(&abnormal()).await.unwrap();
        assert_eq!(notifier.sent_count(), 2);
    }
}
