//! 読み取り履歴
//!
//! [`HistoryLog`] は容量制限付きの追記専用ログ（古い順に破棄する FIFO）。
//! [`HistoryRecorder`] はログを所有し、追記のたびにバックグラウンドの
//! 書き込みタスクへ通知してキーバリューストアへ保存する。保存失敗は
//! ログ出力のみで、次回の追記時に最新スナップショットで再試行される。

use crate::error::Result;
use crate::storage::{KeyValueStore, HISTORY_KEY};
use crate::vitals::Reading;
use std::collections::VecDeque;
use std::sync::Arc;
use tokio::sync::{watch, Mutex, RwLock};
use tokio::task::JoinHandle;

/// 保持する履歴の最大件数
pub const HISTORY_CAPACITY: usize = 100;

/// 容量制限付き履歴ログ
#[derive(Debug, Clone)]
pub struct HistoryLog {
    entries: VecDeque<Reading>,
    capacity: usize,
}

impl HistoryLog {
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// 既存の読み取り値から作成（末尾 `capacity` 件のみ保持）
    pub fn with_entries(entries: impl IntoIterator<Item = Reading>, capacity: usize) -> Self {
        let mut log = Self::new(capacity);
        for reading in entries {
            log.append(reading);
        }
        log
    }

    /// 追記し、容量超過で押し出された最古の値を返す
    pub fn append(&mut self, reading: Reading) -> Option<Reading> {
        if self.capacity == 0 {
            return Some(reading);
        }
        let evicted = if self.entries.len() >= self.capacity {
            self.entries.pop_front()
        } else {
            None
        };
        self.entries.push_back(reading);
        evicted
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn latest(&self) -> Option<&Reading> {
        self.entries.back()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Reading> {
        self.entries.iter()
    }

    /// 挿入順のスナップショット
    pub fn snapshot(&self) -> Vec<Reading> {
        self.entries.iter().cloned().collect()
    }
}

impl Default for HistoryLog {
    fn default() -> Self {
        Self::new(HISTORY_CAPACITY)
    }
}

/// 永続化付き履歴
#[derive(Debug)]
pub struct HistoryRecorder {
    log: Arc<RwLock<HistoryLog>>,
    store: Arc<dyn KeyValueStore>,
    changes: watch::Sender<u64>,
    /// スナップショット取得と保存を直列化（古い内容での上書きを防ぐ）
    write_lock: Arc<Mutex<()>>,
    writer: JoinHandle<()>,
}

impl HistoryRecorder {
    /// ストアから履歴を復元し、書き込みタスクを開始
    ///
    /// 保存済みデータが読めない場合は空の履歴で開始する。
    pub async fn restore(store: Arc<dyn KeyValueStore>, capacity: usize) -> Self {
        let stored = match load(store.as_ref()).await {
            Ok(entries) => entries,
            Err(e) => {
                tracing::warn!(error = %e, "Failed to restore reading history, starting empty");
                Vec::new()
            }
        };
        let restored = stored.len();
        let log = Arc::new(RwLock::new(HistoryLog::with_entries(stored, capacity)));

        let (changes, receiver) = watch::channel(0u64);
        let write_lock = Arc::new(Mutex::new(()));
        let writer = tokio::spawn(run_writer(
            Arc::clone(&log),
            Arc::clone(&store),
            Arc::clone(&write_lock),
            receiver,
        ));

        tracing::debug!(restored, capacity, "Reading history ready");
        Self {
            log,
            store,
            changes,
            write_lock,
            writer,
        }
    }

    /// 追記（永続化は非同期、失敗してもティックは継続）
    pub async fn append(&self, reading: Reading) {
        let evicted = {
            let mut log = self.log.write().await;
            log.append(reading)
        };
        if evicted.is_some() {
            tracing::trace!("Oldest reading evicted from history");
        }
        self.changes.send_modify(|version| *version += 1);
    }

    pub async fn snapshot(&self) -> Vec<Reading> {
        self.log.read().await.snapshot()
    }

    pub async fn latest(&self) -> Option<Reading> {
        self.log.read().await.latest().cloned()
    }

    pub async fn len(&self) -> usize {
        self.log.read().await.len()
    }

    /// 現在のスナップショットを同期的に保存
    pub async fn flush(&self) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        let snapshot = self.snapshot().await;
        persist(self.store.as_ref(), &snapshot).await
    }
}

impl Drop for HistoryRecorder {
    fn drop(&mut self) {
        self.writer.abort();
    }
}

/// ストアから履歴を読み込む
pub async fn load(store: &dyn KeyValueStore) -> Result<Vec<Reading>> {
    match store.get(HISTORY_KEY).await? {
        Some(raw) => Ok(serde_json::from_str(&raw)?),
        None => Ok(Vec::new()),
    }
}

async fn persist(store: &dyn KeyValueStore, entries: &[Reading]) -> Result<()> {
    let raw = serde_json::to_string(entries)?;
    store.set(HISTORY_KEY, raw).await
}

/// 書き込みタスク: 変更通知ごとに最新スナップショットを保存
async fn run_writer(
    log: Arc<RwLock<HistoryLog>>,
    store: Arc<dyn KeyValueStore>,
    write_lock: Arc<Mutex<()>>,
    mut changes: watch::Receiver<u64>,
) {
    while changes.changed().await.is_ok() {
        let _guard = write_lock.lock().await;
        let snapshot = log.read().await.snapshot();
        if let Err(e) = persist(store.as_ref(), &snapshot).await {
            tracing::warn!(
                error = %e,
                entries = snapshot.len(),
                "Failed to persist reading history, will retry on next append"
            );
        }
    }
    tracing::debug!("History writer stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;
    use crate::vitals::BloodPressure;
    use std::time::Duration;

    fn reading(heart_rate: u32) -> Reading {
        Reading::new(heart_rate, 97, 70, 36.8, BloodPressure::new(110, 70))
    }

    #[test]
    fn test_keeps_last_hundred_in_order() {
        let mut log = HistoryLog::default();
        for i in 0..150 {
            log.append(reading(i));
        }

        assert_eq!(log.len(), HISTORY_CAPACITY);
        let rates: Vec<u32> = log.iter().map(|r| r.heart_rate()).collect();
        let expected: Vec<u32> = (50..150).collect();
        assert_eq!(rates, expected);
    }

    #[test]
    fn test_append_reports_evicted_entry() {
        let mut log = HistoryLog::new(2);
        assert!(log.append(reading(1)).is_none());
        assert!(log.append(reading(2)).is_none());
        let evicted = log.append(reading(3)).unwrap();
        assert_eq!(evicted.heart_rate(), 1);
        assert_eq!(log.latest().unwrap().heart_rate(), 3);
    }

    #[test]
    fn test_with_entries_trims_to_capacity() {
        let log = HistoryLog::with_entries((0..10).map(reading), 4);
        let rates: Vec<u32> = log.iter().map(|r| r.heart_rate()).collect();
        assert_eq!(rates, vec![6, 7, 8, 9]);
    }

    #[tokio::test]
    async fn test_recorder_persists_in_background() {
        let store = Arc::new(MemoryStore::new());
        let recorder = HistoryRecorder::restore(store.clone(), HISTORY_CAPACITY).await;

        recorder.append(reading(88)).await;

        // 書き込みタスクの完了を待つ
        let mut persisted = Vec::new();
        for _ in 0..50 {
            persisted = load(store.as_ref()).await.unwrap();
            if !persisted.is_empty() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert_eq!(persisted.len(), 1);
        assert_eq!(persisted[0].heart_rate(), 88);
    }

    #[tokio::test]
    async fn test_restore_trims_stored_history() {
        let store = Arc::new(MemoryStore::new());
        let stored: Vec<Reading> = (0..120).map(reading).collect();
        persist(store.as_ref(), &stored).await.unwrap();

        let recorder = HistoryRecorder::restore(store, HISTORY_CAPACITY).await;
        assert_eq!(recorder.len().await, HISTORY_CAPACITY);
        assert_eq!(recorder.latest().await.unwrap().heart_rate(), 119);
    }

    #[tokio::test]
    async fn test_restore_ignores_corrupt_history() {
        let store = Arc::new(MemoryStore::new());
        store
            .set(HISTORY_KEY, "not json".to_string())
            .await
            .unwrap();

        let recorder = HistoryRecorder::restore(store.clone(), HISTORY_CAPACITY).await;
        assert_eq!(recorder.len().await, 0);

        recorder.append(reading(75)).await;
        recorder.flush().await.unwrap();
        assert_eq!(load(store.as_ref()).await.unwrap().len(), 1);
    }
}
