//! 監視イベント配信
//!
//! 表示層（ダッシュボード等）は [`EventPublisher::subscribe`] で受信側を
//! 取得し、ティックごとの読み取り値やアラート送信結果を受け取る。

use crate::notification::{alert_message, ChannelKind};
use crate::vitals::Reading;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use uuid::Uuid;

/// ブロードキャストチャンネルのバッファサイズ
const EVENT_BUFFER_SIZE: usize = 256;

/// ティックごとに表示層へ渡す読み取り結果
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReadingUpdate {
    pub reading: Reading,
    pub abnormal: bool,
}

/// 送信済みアラートの記録（ユーザー向け確認表示に使用）
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlertRecord {
    /// アラートID
    pub id: String,
    /// 送信時刻
    pub dispatched_at: DateTime<Utc>,
    /// 対象の読み取り値
    pub reading: Reading,
    /// 送信を試みたチャンネル
    pub channels: Vec<ChannelKind>,
    /// 表示用メッセージ
    pub message: String,
}

impl AlertRecord {
    pub fn new(reading: Reading, dispatched_at: DateTime<Utc>, channels: Vec<ChannelKind>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            dispatched_at,
            message: alert_message(&reading),
            reading,
            channels,
        }
    }
}

/// 監視エンジンが発行するイベント
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MonitorEvent {
    /// 新しい読み取り値
    Reading(ReadingUpdate),
    /// 緊急アラート送信済み
    AlertDispatched(AlertRecord),
    /// クールダウン中のため抑制
    AlertSuppressed { at: DateTime<Utc> },
    /// クールダウン終了
    CooldownExpired { at: DateTime<Utc> },
    /// 監視開始
    MonitoringStarted { interval_secs: u64 },
    /// 監視停止
    MonitoringStopped,
}

impl MonitorEvent {
    /// イベント名を取得
    pub fn name(&self) -> &'static str {
        match self {
            Self::Reading(_) => "reading",
            Self::AlertDispatched(_) => "alert_dispatched",
            Self::AlertSuppressed { .. } => "alert_suppressed",
            Self::CooldownExpired { .. } => "cooldown_expired",
            Self::MonitoringStarted { .. } => "monitoring_started",
            Self::MonitoringStopped => "monitoring_stopped",
        }
    }
}

/// イベント発行者
#[derive(Debug, Clone)]
pub struct EventPublisher {
    sender: broadcast::Sender<MonitorEvent>,
}

impl EventPublisher {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// 購読者がいない場合は破棄される（エンジンは表示層の結果に依存しない）
    pub fn publish(&self, event: MonitorEvent) {
        let _ = self.sender.send(event);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<MonitorEvent> {
        self.sender.subscribe()
    }
}

impl Default for EventPublisher {
    fn default() -> Self {
        Self::new(EVENT_BUFFER_SIZE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vitals::BloodPressure;

    #[tokio::test]
    async fn test_publish_and_receive() {
        let publisher = EventPublisher::default();
        let mut rx = publisher.subscribe();

        let reading = Reading::new(70, 98, 71, 36.9, BloodPressure::new(110, 70));
        publisher.publish(MonitorEvent::Reading(ReadingUpdate {
            reading: reading.clone(),
            abnormal: false,
        }));

        match rx.recv().await.unwrap() {
            MonitorEvent::Reading(update) => {
                assert_eq!(update.reading, reading);
                assert!(!update.abnormal);
            }
            other => panic!("unexpected event: {}", other.name()),
        }
    }

    #[test]
    fn test_publish_without_subscribers() {
        let publisher = EventPublisher::default();
        publisher.publish(MonitorEvent::MonitoringStopped);
    }

    #[test]
    fn test_event_serialization_is_tagged() {
        let json = serde_json::to_value(MonitorEvent::MonitoringStarted { interval_secs: 60 })
            .unwrap();
        assert_eq!(json["type"], "monitoring_started");
        assert_eq!(json["interval_secs"], 60);
    }
}
