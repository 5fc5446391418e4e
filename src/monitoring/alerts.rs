//! 緊急アラート送信
//!
//! [`AlertDispatcher`] は待機 (Idle) とクールダウン (Cooldown) の 2 状態を持つ。
//! 待機中のトリガーは通知チャンネルへ送信してクールダウンへ遷移し、
//! クールダウン中のトリガーは抑制される。クールダウンは専用の期限タスクでのみ
//! 解除され、スケジューラーの停止には影響されない。

use crate::error::Error;
use crate::monitoring::events::{AlertRecord, EventPublisher, MonitorEvent};
use crate::notification::{ChannelKind, Notifier};
use crate::settings::Settings;
use crate::vitals::Reading;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, RwLock};
use tokio::task::JoinHandle;

/// クールダウン時間（エンジン分）
pub const ALERT_COOLDOWN_MINUTES: u32 = 5;

/// トリガー結果
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DispatchResult {
    /// 通知を送信しクールダウン開始
    Dispatched,
    /// クールダウン中のため抑制
    Suppressed,
}

/// アラート状態
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AlertState {
    pub cooldown_active: bool,
    pub last_alert_timestamp: Option<DateTime<Utc>>,
}

#[derive(Debug, Default)]
struct DispatchInner {
    state: AlertState,
    /// 期限タスクの世代（古いタスクが新しいクールダウンを解除しないため）
    generation: u64,
    expiry: Option<JoinHandle<()>>,
}

/// アラート送信器
pub struct AlertDispatcher {
    inner: Arc<Mutex<DispatchInner>>,
    settings: Arc<RwLock<Settings>>,
    notifier: Arc<dyn Notifier>,
    events: EventPublisher,
    cooldown: Duration,
}

impl AlertDispatcher {
    pub fn new(
        settings: Arc<RwLock<Settings>>,
        notifier: Arc<dyn Notifier>,
        events: EventPublisher,
        cooldown: Duration,
    ) -> Self {
        Self {
            inner: Arc::new(Mutex::new(DispatchInner::default())),
            settings,
            notifier,
            events,
            cooldown,
        }
    }

    pub fn cooldown(&self) -> Duration {
        self.cooldown
    }

    /// アラートをトリガー
    ///
    /// 異常判定は呼び出し側の責任。チャンネル送信の失敗はログのみで、
    /// クールダウンは巻き戻さない。
    pub async fn trigger(&self, reading: &Reading) -> DispatchResult {
        let now = Utc::now();
        {
            let mut inner = self.inner.lock().await;
            if inner.state.cooldown_active {
                drop(inner);
                tracing::info!(
                    heart_rate = reading.heart_rate(),
                    "Alert suppressed, cooldown active"
                );
                self.events.publish(MonitorEvent::AlertSuppressed { at: now });
                return DispatchResult::Suppressed;
            }

            inner.state.cooldown_active = true;
            inner.state.last_alert_timestamp = Some(now);
            inner.generation += 1;
            let generation = inner.generation;
            if let Some(stale) = inner.expiry.take() {
                stale.abort();
            }
            inner.expiry = Some(self.spawn_expiry(generation));
        }

        let settings = self.settings.read().await.clone();
        let channels = self.notify_channels(&settings, reading).await;

        tracing::warn!(
            channels = ?channels,
            cooldown_secs = self.cooldown.as_secs(),
            "Emergency alert dispatched"
        );
        self.events
            .publish(MonitorEvent::AlertDispatched(AlertRecord::new(
                reading.clone(),
                now,
                channels,
            )));

        DispatchResult::Dispatched
    }

    /// 現在の状態を取得
    pub async fn state(&self) -> AlertState {
        self.inner.lock().await.state.clone()
    }

    pub async fn is_cooling_down(&self) -> bool {
        self.inner.lock().await.state.cooldown_active
    }

    /// セッション終了時のリセット
    ///
    /// 期限タスクを中止しクールダウンを解除する。最終アラート時刻は保持。
    pub async fn reset(&self) {
        let mut inner = self.inner.lock().await;
        if let Some(expiry) = inner.expiry.take() {
            expiry.abort();
        }
        inner.generation += 1;
        inner.state.cooldown_active = false;
        tracing::debug!("Alert dispatcher reset");
    }

    fn spawn_expiry(&self, generation: u64) -> JoinHandle<()> {
        let inner = Arc::clone(&self.inner);
        let events = self.events.clone();
        let cooldown = self.cooldown;

        tokio::spawn(async move {
            tokio::time::sleep(cooldown).await;

            let mut inner = inner.lock().await;
            if inner.generation != generation || !inner.state.cooldown_active {
                return;
            }
            inner.state.cooldown_active = false;
            inner.expiry = None;
            drop(inner);

            tracing::info!("Alert cooldown expired");
            events.publish(MonitorEvent::CooldownExpired { at: Utc::now() });
        })
    }

    async fn notify_channels(&self, settings: &Settings, reading: &Reading) -> Vec<ChannelKind> {
        let mut attempted = Vec::new();

        if settings.email_channel_active() {
            attempted.push(ChannelKind::Email);
            if let Err(e) = self
                .notifier
                .send_email(&settings.emergency_contact, reading)
                .await
            {
                log_channel_failure(ChannelKind::Email, Error::from(e));
            }
        } else if settings.email_notification_enabled {
            tracing::debug!("Email alert skipped, no emergency contact configured");
        }

        if settings.sms_notification_enabled {
            attempted.push(ChannelKind::Sms);
            if let Err(e) = self.notifier.send_sms(reading).await {
                log_channel_failure(ChannelKind::Sms, Error::from(e));
            }
        }

        attempted
    }
}

fn log_channel_failure(channel: ChannelKind, error: Error) {
    tracing::error!(
        channel = channel.as_str(),
        error = %error,
        recoverable = error.is_recoverable(),
        "Notification delivery failed"
    );
}

impl Drop for AlertDispatcher {
    fn drop(&mut self) {
        if let Ok(mut inner) = self.inner.try_lock() {
            if let Some(expiry) = inner.expiry.take() {
                expiry.abort();
            }
        }
    }
}
