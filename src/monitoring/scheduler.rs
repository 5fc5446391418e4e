//! 監視スケジューラー
//!
//! 停止 (Stopped) / 実行中 (Running) の 2 状態。開始時に 1 回即時ティックを
//! 実行し、その後は設定間隔ごとに [`MonitorCore::scheduled_tick`] を呼ぶ。
//! ティック内のパニックは捕捉してログに記録し、ループは継続する。

use crate::error::Result;
use crate::monitoring::alerts::{AlertDispatcher, DispatchResult};
use crate::monitoring::events::{EventPublisher, MonitorEvent, ReadingUpdate};
use crate::monitoring::history::HistoryRecorder;
use crate::settings::Settings;
use crate::vitals::{is_abnormal, violations, Reading, ReadingGenerator};
use chrono::{DateTime, Utc};
use futures::FutureExt;
use std::any::Any;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, RwLock};
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

/// 1 ティックの結果
#[derive(Debug, Clone)]
pub struct TickOutcome {
    pub reading: Reading,
    pub abnormal: bool,
    /// 異常時のみ `Some`
    pub dispatch: Option<DispatchResult>,
}

/// ティック処理本体（生成・判定・履歴・配信・アラート）
pub struct MonitorCore {
    generator: Mutex<ReadingGenerator>,
    history: HistoryRecorder,
    dispatcher: AlertDispatcher,
    events: EventPublisher,
    abnormal_probability: f64,
    latest: RwLock<Option<ReadingUpdate>>,
}

impl MonitorCore {
    pub fn new(
        generator: ReadingGenerator,
        history: HistoryRecorder,
        dispatcher: AlertDispatcher,
        events: EventPublisher,
        abnormal_probability: f64,
    ) -> Self {
        Self {
            generator: Mutex::new(generator),
            history,
            dispatcher,
            events,
            abnormal_probability,
            latest: RwLock::new(None),
        }
    }

    /// 1 ティック実行
    pub async fn tick(&self, force_abnormal: bool) -> TickOutcome {
        let reading = self.generator.lock().await.generate(force_abnormal);
        let abnormal = is_abnormal(&reading);

        self.history.append(reading.clone()).await;

        let update = ReadingUpdate {
            reading: reading.clone(),
            abnormal,
        };
        *self.latest.write().await = Some(update.clone());
        self.events.publish(MonitorEvent::Reading(update));

        let dispatch = if abnormal {
            let found: Vec<String> = violations(&reading).iter().map(|v| v.to_string()).collect();
            let result = self.dispatcher.trigger(&reading).await;
            tracing::info!(
                violations = ?found,
                result = ?result,
                "Abnormal reading detected"
            );
            Some(result)
        } else {
            tracing::debug!(reading = %reading, "Reading within normal ranges");
            None
        };

        TickOutcome {
            reading,
            abnormal,
            dispatch,
        }
    }

    /// 定期ティック（異常モードを確率的に選択）
    pub async fn scheduled_tick(&self) -> TickOutcome {
        let force_abnormal = self
            .generator
            .lock()
            .await
            .draw_abnormal(self.abnormal_probability);
        self.tick(force_abnormal).await
    }

    /// 最後に配信した読み取り結果
    pub async fn latest(&self) -> Option<ReadingUpdate> {
        self.latest.read().await.clone()
    }

    pub fn history(&self) -> &HistoryRecorder {
        &self.history
    }

    pub fn dispatcher(&self) -> &AlertDispatcher {
        &self.dispatcher
    }

    pub fn events(&self) -> &EventPublisher {
        &self.events
    }
}

struct RunningSchedule {
    cancel: CancellationToken,
    handle: JoinHandle<()>,
    interval: Duration,
    started_at: DateTime<Utc>,
}

/// スケジューラー状態
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SchedulerState {
    Stopped,
    Running {
        interval: Duration,
        started_at: DateTime<Utc>,
    },
}

/// 監視スケジューラー
pub struct MonitoringScheduler {
    core: Arc<MonitorCore>,
    minute: Duration,
    running: Mutex<Option<RunningSchedule>>,
}

impl MonitoringScheduler {
    /// `minute` はエンジン上の 1 分の長さ
    pub fn new(core: Arc<MonitorCore>, minute: Duration) -> Self {
        Self {
            core,
            minute,
            running: Mutex::new(None),
        }
    }

    pub fn core(&self) -> &Arc<MonitorCore> {
        &self.core
    }

    /// 監視開始
    ///
    /// 実行中の場合は何もしない。間隔が不正な場合は設定エラー。
    pub async fn start(&self, settings: &Settings) -> Result<()> {
        let period = settings.alert_interval(self.minute)?;

        let mut running = self.running.lock().await;
        if running.is_some() {
            tracing::debug!("Monitoring already running, start ignored");
            return Ok(());
        }

        // 初回は通常モードで即時実行
        isolated(self.core.tick(false)).await;

        let cancel = CancellationToken::new();
        let handle = tokio::spawn(run_loop(Arc::clone(&self.core), period, cancel.clone()));
        *running = Some(RunningSchedule {
            cancel,
            handle,
            interval: period,
            started_at: Utc::now(),
        });
        drop(running);

        tracing::info!(
            interval_minutes = settings.alert_interval_minutes,
            interval_secs = period.as_secs(),
            "Monitoring started"
        );
        self.core.events.publish(MonitorEvent::MonitoringStarted {
            interval_secs: period.as_secs(),
        });
        Ok(())
    }

    /// 監視停止（アラートのクールダウンには影響しない）
    ///
    /// 停止した場合は `true`、元々停止中なら `false`。
    pub async fn stop(&self) -> bool {
        let Some(schedule) = self.running.lock().await.take() else {
            return false;
        };

        schedule.cancel.cancel();
        if let Err(e) = schedule.handle.await {
            tracing::warn!(error = %e, "Monitoring loop ended abnormally");
        }

        tracing::info!("Monitoring stopped");
        self.core.events.publish(MonitorEvent::MonitoringStopped);
        true
    }

    pub async fn state(&self) -> SchedulerState {
        match self.running.lock().await.as_ref() {
            Some(schedule) => SchedulerState::Running {
                interval: schedule.interval,
                started_at: schedule.started_at,
            },
            None => SchedulerState::Stopped,
        }
    }

    pub async fn is_running(&self) -> bool {
        self.running.lock().await.is_some()
    }
}

impl Drop for MonitoringScheduler {
    fn drop(&mut self) {
        if let Some(schedule) = self.running.get_mut().take() {
            schedule.cancel.cancel();
            schedule.handle.abort();
        }
    }
}

/// 定期ティックループ（最初のティックは 1 周期後）
async fn run_loop(core: Arc<MonitorCore>, period: Duration, cancel: CancellationToken) {
    let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                tracing::debug!("Monitoring loop cancelled");
                break;
            }
            _ = ticker.tick() => {
                isolated(core.scheduled_tick()).await;
            }
        }
    }
}

/// ティックを実行する。パニックはログに記録して `None` を返す
async fn isolated<F: Future>(tick: F) -> Option<F::Output> {
    match AssertUnwindSafe(tick).catch_unwind().await {
        Ok(outcome) => Some(outcome),
        Err(panic) => {
            tracing::error!(
                panic = %panic_message(panic.as_ref()),
                "Monitoring tick panicked, continuing"
            );
            None
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}
