//! 設定・履歴の永続化に関する統合テスト

mod fixtures;

use fixtures::mock_services::RecordingNotifier;
use fixtures::test_data::*;
use chrono::{TimeZone, Utc};
use std::sync::Arc;
use vital_monitor::config::{EngineOptions, StorageBackend, StorageConfig};
use vital_monitor::monitoring::history;
use vital_monitor::storage::{FileStore, KeyValueStore, HISTORY_KEY, SETTINGS_KEY};
use vital_monitor::{ManualAlertOutcome, Reading, Settings};

async fn file_store(dir: &std::path::Path) -> Arc<dyn KeyValueStore> {
    Arc::new(FileStore::open(dir).await.unwrap())
}

#[tokio::test]
async fn test_settings_and_history_survive_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let settings = Settings::default()
        .with_interval_minutes(2)
        .with_contact(CONTACT);

    let last = {
        let session = open_session_with(
            file_store(dir.path()).await,
            Arc::new(RecordingNotifier::new()),
            EngineOptions::default(),
        )
        .await;
        session.save_settings(settings.clone()).await.unwrap();
        session.force_tick(false).await;
        session.force_tick(false).await;
        let last = session.force_tick(true).await.reading;
        session.logout().await;
        last
    };

    let reopened = open_session_with(
        file_store(dir.path()).await,
        Arc::new(RecordingNotifier::new()),
        EngineOptions::default(),
    )
    .await;
    assert_eq!(reopened.settings().await, settings);
    assert_eq!(reopened.history().await.len(), 3);
    assert_eq!(reopened.latest_reading().await, Some(last));

    // クールダウンは永続化されないため、復元した異常値で再送できる
    assert!(!reopened.alert_state().await.cooldown_active);
    assert_eq!(reopened.notify_now().await, ManualAlertOutcome::Dispatched);
}

#[tokio::test]
async fn test_history_on_disk_is_capped() {
    let dir = tempfile::tempdir().unwrap();
    let store = file_store(dir.path()).await;
    let session = open_session_with(
        store.clone(),
        Arc::new(RecordingNotifier::new()),
        EngineOptions::default(),
    )
    .await;

    for _ in 0..150 {
        session.force_tick(false).await;
    }
    session.logout().await;

    let stored = history::load(store.as_ref()).await.unwrap();
    assert_eq!(stored.len(), 100);
    assert_eq!(stored, session.history().await);

    let raw = std::fs::read_to_string(dir.path().join("healthHistory.json")).unwrap();
    let value: serde_json::Value = serde_json::from_str(&raw).unwrap();
    assert!(value[0]["bloodPressure"]["systolic"].is_u64());
    assert!(value[0]["heartRate"].is_u64());
}

#[tokio::test]
async fn test_legacy_records_are_accepted() {
    let dir = tempfile::tempdir().unwrap();
    let store = file_store(dir.path()).await;
    store
        .set(
            SETTINGS_KEY,
            r#"{"emailNotification":"disabled","smsNotification":"enabled","alertFrequency":4,"emergencyContact":""}"#
                .to_string(),
        )
        .await
        .unwrap();
    store
        .set(
            HISTORY_KEY,
            r#"[{"heartRate":72,"spo2":97,"pulseRate":74,"temperature":36.8,"bp":{"systolic":115,"diastolic":75,"timestamp":"2025-01-02T03:04:05.000Z"}}]"#
                .to_string(),
        )
        .await
        .unwrap();

    let session = open_session_with(store.clone(), Arc::new(RecordingNotifier::new()), EngineOptions::default()).await;
    let settings = session.settings().await;
    assert!(!settings.email_notification_enabled);
    assert!(settings.sms_notification_enabled);
    assert_eq!(settings.alert_interval_minutes, 4);

    let restored: Vec<Reading> = session.history().await;
    assert_eq!(restored.len(), 1);
    assert_eq!(restored[0].blood_pressure().to_string(), "115/75");
    let recorded_at = Utc.with_ymd_and_hms(2025, 1, 2, 3, 4, 5).unwrap();
    assert_eq!(restored[0].timestamp(), recorded_at);
    assert_eq!(session.notify_now().await, ManualAlertOutcome::ReadingsNormal);

    // 書き戻し後も記録時刻を保持する
    session.force_tick(false).await;
    session.logout().await;
    let stored = history::load(store.as_ref()).await.unwrap();
    assert_eq!(stored.len(), 2);
    assert_eq!(stored[0].timestamp(), recorded_at);
}

#[tokio::test]
async fn test_storage_config_opens_file_backend() {
    let dir = tempfile::tempdir().unwrap();
    let storage = StorageConfig {
        backend: StorageBackend::File,
        data_dir: dir.path().join("nested"),
    };
    let store = storage.open().await.unwrap();

    Settings::default().save(store.as_ref()).await.unwrap();
    assert!(dir.path().join("nested").join("healthMonitorSettings.json").exists());
}
