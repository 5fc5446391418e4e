//! 監視セッション
//!
//! [`MonitoringSession`] は設定・履歴・アラート送信器・スケジューラーを所有し、
//! 表示層や CLI から呼ばれる唯一の入口となる。グローバル状態は持たない。

use crate::config::EngineOptions;
use crate::error::Result;
use crate::monitoring::alerts::{AlertDispatcher, AlertState, DispatchResult, ALERT_COOLDOWN_MINUTES};
use crate::monitoring::events::{EventPublisher, MonitorEvent};
use crate::monitoring::history::HistoryRecorder;
use crate::monitoring::scheduler::{MonitorCore, MonitoringScheduler, SchedulerState, TickOutcome};
use crate::notification::{LoggingNotifier, Notifier};
use crate::settings::Settings;
use crate::storage::{KeyValueStore, MemoryStore};
use crate::vitals::{is_abnormal, Reading, ReadingGenerator};
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::{broadcast, Mutex, RwLock};

/// 手動通知の結果
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ManualAlertOutcome {
    /// 介護者へ送信済み
    Dispatched,
    /// クールダウン中
    CooldownActive,
    /// 全て正常値のため送信不要
    ReadingsNormal,
    /// 読み取り値がまだない
    NoReading,
}

impl ManualAlertOutcome {
    /// ユーザー向け確認メッセージ
    pub fn message(&self) -> &'static str {
        match self {
            Self::Dispatched => "Emergency alert sent to caretaker!",
            Self::CooldownActive => "Alert is in cooldown period. Please wait before sending again.",
            Self::ReadingsNormal => "All readings are normal. No need to send alert.",
            Self::NoReading => "No reading available yet.",
        }
    }
}

/// セッションビルダー
#[derive(Default)]
pub struct SessionBuilder {
    store: Option<Arc<dyn KeyValueStore>>,
    notifier: Option<Arc<dyn Notifier>>,
    options: EngineOptions,
}

impl SessionBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn store(mut self, store: Arc<dyn KeyValueStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifier = Some(notifier);
        self
    }

    pub fn options(mut self, options: EngineOptions) -> Self {
        self.options = options;
        self
    }

    pub fn seed(mut self, seed: u64) -> Self {
        self.options.seed = Some(seed);
        self
    }

    /// セッションを開く
    ///
    /// 保存済み設定が読めない場合は既定値で続行する。
    pub async fn open(self) -> Result<MonitoringSession> {
        self.options.validate()?;

        let store = self
            .store
            .unwrap_or_else(|| Arc::new(MemoryStore::new()));
        let notifier = self
            .notifier
            .unwrap_or_else(|| Arc::new(LoggingNotifier::new()));

        let settings = match Settings::load(store.as_ref()).await {
            Ok(settings) => settings,
            Err(e) => {
                tracing::warn!(error = %e, "Failed to load settings, using defaults");
                Settings::default()
            }
        };
        let settings = Arc::new(RwLock::new(settings));

        let events = EventPublisher::default();
        let minute = self.options.minute();
        let history = HistoryRecorder::restore(Arc::clone(&store), self.options.history_capacity).await;
        let dispatcher = AlertDispatcher::new(
            Arc::clone(&settings),
            notifier,
            events.clone(),
            minute * ALERT_COOLDOWN_MINUTES,
        );
        let generator = match self.options.seed {
            Some(seed) => ReadingGenerator::seeded(seed),
            None => ReadingGenerator::from_entropy(),
        };
        let core = Arc::new(MonitorCore::new(
            generator,
            history,
            dispatcher,
            events.clone(),
            self.options.abnormal_probability,
        ));

        tracing::info!(
            seconds_per_minute = self.options.seconds_per_minute,
            seeded = self.options.seed.is_some(),
            "Monitoring session opened"
        );

        Ok(MonitoringSession {
            store,
            settings,
            scheduler: MonitoringScheduler::new(core, minute),
            events,
            lifecycle: Mutex::new(()),
        })
    }
}

/// 監視セッション
pub struct MonitoringSession {
    store: Arc<dyn KeyValueStore>,
    settings: Arc<RwLock<Settings>>,
    scheduler: MonitoringScheduler,
    events: EventPublisher,
    /// 開始・停止・設定変更による再起動を直列化する
    lifecycle: Mutex<()>,
}

impl MonitoringSession {
    pub fn builder() -> SessionBuilder {
        SessionBuilder::new()
    }

    /// 現在の設定で監視を開始
    pub async fn start_monitoring(&self) -> Result<()> {
        let _lifecycle = self.lifecycle.lock().await;
        let settings = self.settings.read().await.clone();
        self.scheduler.start(&settings).await
    }

    pub async fn stop_monitoring(&self) -> bool {
        let _lifecycle = self.lifecycle.lock().await;
        self.scheduler.stop().await
    }

    pub async fn is_monitoring(&self) -> bool {
        self.scheduler.is_running().await
    }

    pub async fn scheduler_state(&self) -> SchedulerState {
        self.scheduler.state().await
    }

    pub async fn settings(&self) -> Settings {
        self.settings.read().await.clone()
    }

    /// 設定を保存
    ///
    /// 不正な設定は拒否する。保存失敗はログのみ（メモリ上の設定が有効）。
    /// 監視中であれば新しい間隔で再起動する。
    pub async fn save_settings(&self, settings: Settings) -> Result<()> {
        settings.validate()?;

        let _lifecycle = self.lifecycle.lock().await;
        *self.settings.write().await = settings.clone();
        if let Err(e) = settings.save(self.store.as_ref()).await {
            tracing::warn!(error = %e, "Failed to persist settings");
        }
        tracing::info!(
            interval_minutes = settings.alert_interval_minutes,
            email = settings.email_notification_enabled,
            sms = settings.sms_notification_enabled,
            "Settings saved"
        );

        if self.scheduler.stop().await {
            self.scheduler.start(&settings).await?;
        }
        Ok(())
    }

    /// 指定の読み取り値で手動通知
    pub async fn send_notification(&self, reading: &Reading) -> ManualAlertOutcome {
        if !is_abnormal(reading) {
            return ManualAlertOutcome::ReadingsNormal;
        }
        match self.scheduler.core().dispatcher().trigger(reading).await {
            DispatchResult::Dispatched => ManualAlertOutcome::Dispatched,
            DispatchResult::Suppressed => ManualAlertOutcome::CooldownActive,
        }
    }

    /// 最新の読み取り値で手動通知
    pub async fn notify_now(&self) -> ManualAlertOutcome {
        match self.latest_reading().await {
            Some(reading) => self.send_notification(&reading).await,
            None => ManualAlertOutcome::NoReading,
        }
    }

    /// 最新の読み取り値（未配信なら履歴の末尾）
    pub async fn latest_reading(&self) -> Option<Reading> {
        let core = self.scheduler.core();
        match core.latest().await {
            Some(update) => Some(update.reading),
            None => core.history().latest().await,
        }
    }

    pub async fn history(&self) -> Vec<Reading> {
        self.scheduler.core().history().snapshot().await
    }

    pub async fn alert_state(&self) -> AlertState {
        self.scheduler.core().dispatcher().state().await
    }

    pub fn subscribe(&self) -> broadcast::Receiver<MonitorEvent> {
        self.events.subscribe()
    }

    /// 異常モードを指定して 1 ティック実行
    pub async fn force_tick(&self, force_abnormal: bool) -> TickOutcome {
        self.scheduler.core().tick(force_abnormal).await
    }

    /// 定期ティックと同じ手順で 1 ティック実行
    pub async fn tick_now(&self) -> TickOutcome {
        self.scheduler.core().scheduled_tick().await
    }

    /// ログアウト（監視停止、クールダウン解除、履歴保存）
    pub async fn logout(&self) {
        let _lifecycle = self.lifecycle.lock().await;
        self.scheduler.stop().await;
        self.scheduler.core().dispatcher().reset().await;
        if let Err(e) = self.scheduler.core().history().flush().await {
            tracing::warn!(error = %e, "Failed to flush history on logout");
        }
        tracing::info!("Monitoring session closed");
    }
}
