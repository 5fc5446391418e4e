//! 監視・アラートエンジン
//!
//! このモジュールは、定期的な読み取り値の生成、閾値判定、履歴の保存、
//! クールダウン付きの緊急アラート送信を提供します。

pub mod alerts;
pub mod events;
pub mod history;
pub mod scheduler;
pub mod session;

pub use alerts::{AlertDispatcher, AlertState, DispatchResult, ALERT_COOLDOWN_MINUTES};
pub use events::{AlertRecord, EventPublisher, MonitorEvent, ReadingUpdate};
pub use history::{HistoryLog, HistoryRecorder, HISTORY_CAPACITY};
pub use scheduler::{MonitorCore, MonitoringScheduler, SchedulerState, TickOutcome};
pub use session::{ManualAlertOutcome, MonitoringSession, SessionBuilder};
