//! Mock Services
//!
//! テスト用の通知チャンネルとストア

use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::Mutex;
use vital_monitor::error::{ChannelError, Error, Result};
use vital_monitor::notification::Notifier;
use vital_monitor::storage::KeyValueStore;
use vital_monitor::Reading;

/// 呼び出しを記録する通知チャンネル
#[derive(Default)]
pub struct RecordingNotifier {
    emails: Mutex<Vec<(String, Reading)>>,
    sms: Mutex<Vec<Reading>>,
    fail: bool,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// 常に送信失敗を返す
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub async fn email_count(&self) -> usize {
        self.emails.lock().await.len()
    }

    pub async fn sms_count(&self) -> usize {
        self.sms.lock().await.len()
    }

    pub async fn email_contacts(&self) -> Vec<String> {
        self.emails
            .lock()
            .await
            .iter()
            .map(|(contact, _)| contact.clone())
            .collect()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn send_email(&self, contact: &str, reading: &Reading) -> std::result::Result<(), ChannelError> {
        self.emails
            .lock()
            .await
            .push((contact.to_string(), reading.clone()));
        if self.fail {
            return Err(ChannelError::Email {
                contact: contact.to_string(),
                reason: "mailbox unavailable".to_string(),
            });
        }
        Ok(())
    }

    async fn send_sms(&self, reading: &Reading) -> std::result::Result<(), ChannelError> {
        self.sms.lock().await.push(reading.clone());
        if self.fail {
            return Err(ChannelError::Sms("carrier rejected message".to_string()));
        }
        Ok(())
    }
}

/// SMS 送信時にパニックする通知チャンネル
#[derive(Default)]
pub struct PanickingNotifier {
    calls: AtomicUsize,
}

impl PanickingNotifier {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Notifier for PanickingNotifier {
    async fn send_email(&self, _contact: &str, _reading: &Reading) -> std::result::Result<(), ChannelError> {
        Ok(())
    }

    async fn send_sms(&self, _reading: &Reading) -> std::result::Result<(), ChannelError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        panic!("sms gateway exploded");
    }
}

/// 書き込みが常に失敗するストア
#[derive(Debug, Default)]
pub struct FailingStore {
    set_attempts: AtomicUsize,
}

impl FailingStore {
    pub fn set_attempts(&self) -> usize {
        self.set_attempts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl KeyValueStore for FailingStore {
    async fn get(&self, _key: &str) -> Result<Option<String>> {
        Ok(None)
    }

    async fn set(&self, key: &str, _value: String) -> Result<()> {
        self.set_attempts.fetch_add(1, Ordering::SeqCst);
        Err(Error::Persistence(format!("disk full while writing {key}")))
    }

    async fn remove(&self, _key: &str) -> Result<bool> {
        Ok(false)
    }
}
