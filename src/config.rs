use crate::error::{Error, Result as EngineResult};
use crate::logging::LogConfig;
use crate::monitoring::HISTORY_CAPACITY;
use crate::storage::{FileStore, KeyValueStore, MemoryStore};
use crate::vitals::ABNORMAL_TICK_PROBABILITY;
use anyhow::{Context, Result};
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

/// 設定ファイルの既定の検索場所（拡張子なし）
const CONFIG_SEARCH_PATHS: [&str; 2] = ["vital-monitor", "config/vital-monitor"];

/// 環境変数の接頭辞 (例: VITAL_MONITOR_ENGINE__SEED=42)
const ENV_PREFIX: &str = "VITAL_MONITOR";

/// アプリケーション全体の設定
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub engine: EngineOptions,
    pub storage: StorageConfig,
    pub logging: LogConfig,
}

/// 監視エンジンの動作パラメータ
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineOptions {
    /// エンジン上の 1 分の長さ（秒）。デモ用に短縮できる
    pub seconds_per_minute: u64,
    /// 定期ティックで異常値を生成する確率
    pub abnormal_probability: f64,
    /// 履歴の最大件数
    pub history_capacity: usize,
    /// 乱数シード（未指定ならエントロピーから初期化）
    pub seed: Option<u64>,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            seconds_per_minute: 60,
            abnormal_probability: ABNORMAL_TICK_PROBABILITY,
            history_capacity: HISTORY_CAPACITY,
            seed: None,
        }
    }
}

impl EngineOptions {
    /// エンジン上の 1 分
    pub fn minute(&self) -> Duration {
        Duration::from_secs(self.seconds_per_minute)
    }

    pub fn validate(&self) -> EngineResult<()> {
        if self.seconds_per_minute == 0 {
            return Err(Error::Configuration(
                "engine.seconds_per_minute must be greater than zero".to_string(),
            ));
        }
        if !(0.0..=1.0).contains(&self.abnormal_probability) {
            return Err(Error::Configuration(format!(
                "engine.abnormal_probability must be within [0, 1], got {}",
                self.abnormal_probability
            )));
        }
        if self.history_capacity == 0 {
            return Err(Error::Configuration(
                "engine.history_capacity must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    /// プロセス内のみ（終了時に破棄）
    Memory,
    /// キーごとの JSON ファイル
    File,
}

/// 永続化設定
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub backend: StorageBackend,
    pub data_dir: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: StorageBackend::File,
            data_dir: PathBuf::from("data"),
        }
    }
}

impl StorageConfig {
    /// 設定に従ってストアを開く
    pub async fn open(&self) -> EngineResult<Arc<dyn KeyValueStore>> {
        match self.backend {
            StorageBackend::Memory => Ok(Arc::new(MemoryStore::new())),
            StorageBackend::File => Ok(Arc::new(FileStore::open(&self.data_dir).await?)),
        }
    }
}

impl EngineConfig {
    /// 設定を読み込む
    ///
    /// 優先順位: 既定値 < 設定ファイル < 環境変数。`path` 指定時はそのファイルが
    /// 必須、未指定時は既定の検索場所を試す。
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut builder = Config::builder().add_source(Config::try_from(&EngineConfig::default())?);

        match path {
            Some(path) => {
                builder = builder.add_source(File::from(path).required(true));
            }
            None => {
                for candidate in CONFIG_SEARCH_PATHS {
                    builder = builder.add_source(File::with_name(candidate).required(false));
                }
            }
        }

        builder = builder.add_source(
            Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        let config: EngineConfig = builder
            .build()
            .context("Failed to build configuration")?
            .try_deserialize()
            .context("Failed to deserialize configuration")?;

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        self.engine.validate()?;
        Ok(())
    }

    /// サンプル設定の内容
    pub fn sample_config() -> Result<String> {
        let sample = EngineConfig {
            engine: EngineOptions {
                seed: Some(42),
                ..EngineOptions::default()
            },
            ..EngineConfig::default()
        };
        let toml_content = toml::to_string_pretty(&sample)?;

        Ok(format!(
            r#"# vital-monitor configuration
#
# vital-monitor.toml として保存してください
# 環境変数での上書きも可能です (例: VITAL_MONITOR_ENGINE__SECONDS_PER_MINUTE=1)

{}
# 設定説明:
#
# [engine]
# seconds_per_minute = エンジン上の 1 分の長さ（秒）。アラート間隔と
#                      5 分間のクールダウンの両方に適用
# abnormal_probability = 定期ティックで異常値を生成する確率 (0.0 - 1.0)
# history_capacity = 保持する読み取り履歴の件数
# seed = 乱数シード（削除するとランダム）
#
# [storage]
# backend = memory | file
# data_dir = file バックエンドの保存先
#
# [logging]
# level = ログレベル (trace, debug, info, warn, error)
# rotation = daily | hourly | never
"#,
            toml_content
        ))
    }

    /// サンプル設定ファイルを生成
    pub fn generate_sample_config(path: &Path) -> Result<()> {
        let content = Self::sample_config()?;
        std::fs::write(path, content)
            .with_context(|| format!("cannot write {}", path.display()))?;
        Ok(())
    }
}
