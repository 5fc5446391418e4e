//! Test Data
//!
//! テスト用の共通データとヘルパー関数

use std::sync::Arc;
use vital_monitor::config::EngineOptions;
use vital_monitor::notification::Notifier;
use vital_monitor::storage::{KeyValueStore, MemoryStore};
use vital_monitor::vitals::BloodPressure;
use vital_monitor::{MonitoringSession, Reading, Settings};

pub const CONTACT: &str = "caretaker@example.org";

/// 全項目が正常範囲内の読み取り値
pub fn normal_reading() -> Reading {
    Reading::new(72, 97, 74, 36.8, BloodPressure::new(115, 75))
}

/// SpO₂ と血圧が異常な読み取り値
pub fn abnormal_reading() -> Reading {
    Reading::new(80, 88, 78, 37.0, BloodPressure::new(150, 95))
}

/// 1 分間隔、連絡先あり
pub fn one_minute_settings() -> Settings {
    Settings::default()
        .with_interval_minutes(1)
        .with_contact(CONTACT)
}

/// メモリストアと指定の通知チャンネルでセッションを開く
pub async fn open_session(notifier: Arc<dyn Notifier>) -> MonitoringSession {
    open_session_with(Arc::new(MemoryStore::new()), notifier, EngineOptions::default()).await
}

pub async fn open_session_with(
    store: Arc<dyn KeyValueStore>,
    notifier: Arc<dyn Notifier>,
    options: EngineOptions,
) -> MonitoringSession {
    MonitoringSession::builder()
        .store(store)
        .notifier(notifier)
        .options(EngineOptions {
            seed: Some(options.seed.unwrap_or(2024)),
            ..options
        })
        .open()
        .await
        .expect("session should open")
}
