use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::broadcast::error::RecvError;
use tokio_util::sync::CancellationToken;
use vital_monitor::activity::{ActivityTracker, DisplayMode, ACTIVITY_UPDATE_INTERVAL};
use vital_monitor::config::{EngineConfig, StorageBackend};
use vital_monitor::logging::init_logging;
use vital_monitor::monitoring::{MonitorEvent, MonitoringSession};
use vital_monitor::notification::LoggingNotifier;

#[derive(Parser)]
#[command(name = "vital-monitor")]
#[command(version)]
#[command(about = "Simulated vital-sign monitor with caretaker alerts", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Path to configuration file
    #[arg(short, long, global = true, env = "VITAL_MONITOR_CONFIG")]
    config: Option<PathBuf>,

    /// Directory for persisted settings and history (implies the file backend)
    #[arg(short, long, global = true)]
    data_dir: Option<PathBuf>,

    /// Seed for reproducible readings
    #[arg(short, long, global = true)]
    seed: Option<u64>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, global = true)]
    log_level: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start monitoring and print readings until Ctrl-C (default)
    Run(RunArgs),

    /// Send one manual notification for the latest stored reading
    Notify,

    /// Print the stored reading history
    History(HistoryArgs),

    /// Write an example configuration file
    SampleConfig {
        /// Output path
        #[arg(default_value = "vital-monitor.toml.example")]
        path: PathBuf,
    },
}

#[derive(Args, Default)]
struct RunArgs {
    /// Minutes between scheduled readings (saved to settings)
    #[arg(short, long)]
    interval: Option<i64>,

    /// Emergency contact address (saved to settings)
    #[arg(long)]
    contact: Option<String>,

    /// Also print the simulated activity story
    #[arg(long)]
    activity: bool,
}

#[derive(Args)]
struct HistoryArgs {
    /// Number of most recent entries to print
    #[arg(short = 'n', long, default_value_t = 10)]
    limit: usize,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    if let Some(Commands::SampleConfig { path }) = &cli.command {
        EngineConfig::generate_sample_config(path)?;
        println!("📝 サンプル設定ファイルを生成しました: {}", path.display());
        println!("💡 このファイルを vital-monitor.toml にコピーして編集してください");
        return Ok(());
    }

    let mut config = EngineConfig::load(cli.config.as_deref())?;
    if let Some(dir) = cli.data_dir {
        config.storage.backend = StorageBackend::File;
        config.storage.data_dir = dir;
    }
    if let Some(seed) = cli.seed {
        config.engine.seed = Some(seed);
    }
    if let Some(level) = cli.log_level {
        config.logging.level = level;
    }

    let _log_guard = init_logging(&config.logging)?;

    let store = config
        .storage
        .open()
        .await
        .context("Failed to open storage")?;
    let session = MonitoringSession::builder()
        .store(store)
        .notifier(Arc::new(LoggingNotifier::new()))
        .options(config.engine.clone())
        .open()
        .await?;

    match cli.command.unwrap_or(Commands::Run(RunArgs::default())) {
        Commands::Run(args) => run(&session, args).await,
        Commands::Notify => notify(&session).await,
        Commands::History(args) => history(&session, args.limit).await,
        Commands::SampleConfig { .. } => Ok(()),
    }
}

async fn run(session: &MonitoringSession, args: RunArgs) -> Result<()> {
    if args.interval.is_some() || args.contact.is_some() {
        let mut settings = session.settings().await;
        if let Some(minutes) = args.interval {
            settings = settings.with_interval_minutes(minutes);
        }
        if let Some(contact) = args.contact {
            settings = settings.with_contact(contact);
        }
        session.save_settings(settings).await?;
    }

    let cancel = CancellationToken::new();
    let printer = tokio::spawn(print_events(session.subscribe(), cancel.clone()));
    let activity = args
        .activity
        .then(|| tokio::spawn(print_activity(cancel.clone())));

    println!("{}", DisplayMode::now().label());
    session.start_monitoring().await?;

    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for Ctrl-C")?;

    cancel.cancel();
    session.logout().await;
    let _ = printer.await;
    if let Some(activity) = activity {
        let _ = activity.await;
    }
    Ok(())
}

async fn print_events(
    mut events: tokio::sync::broadcast::Receiver<MonitorEvent>,
    cancel: CancellationToken,
) {
    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            event = events.recv() => match event {
                Ok(MonitorEvent::Reading(update)) => {
                    let marker = if update.abnormal { "⚠️ " } else { "✅" };
                    println!("{} {}", marker, update.reading);
                }
                Ok(MonitorEvent::AlertDispatched(record)) => {
                    println!("🚨 {}", record.message);
                }
                Ok(MonitorEvent::AlertSuppressed { .. }) => {
                    println!("⏳ Alert suppressed (cooldown active)");
                }
                Ok(MonitorEvent::CooldownExpired { .. }) => {
                    println!("🔔 Alert cooldown expired");
                }
                Ok(MonitorEvent::MonitoringStarted { interval_secs }) => {
                    println!("▶️  Monitoring every {}s", interval_secs);
                }
                Ok(MonitorEvent::MonitoringStopped) => {
                    println!("⏹️  Monitoring stopped");
                }
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "Event printer lagged behind");
                }
                Err(RecvError::Closed) => break,
            }
        }
    }
}

async fn print_activity(cancel: CancellationToken) {
    let mut tracker = ActivityTracker::from_entropy();
    let mut ticker = tokio::time::interval(ACTIVITY_UPDATE_INTERVAL);
    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = ticker.tick() => {
                let snapshot = tracker.step();
                println!("🚶 {}", snapshot);
                println!("   {}", snapshot.story());
            }
        }
    }
}

async fn notify(session: &MonitoringSession) -> Result<()> {
    let outcome = session.notify_now().await;
    println!("{}", outcome.message());
    Ok(())
}

async fn history(session: &MonitoringSession, limit: usize) -> Result<()> {
    let entries = session.history().await;
    if entries.is_empty() {
        println!("No readings recorded yet.");
        return Ok(());
    }

    println!("📋 {} readings stored (showing last {})", entries.len(), limit.min(entries.len()));
    for reading in entries.iter().rev().take(limit) {
        let flag = if vital_monitor::is_abnormal(reading) { "⚠️ " } else { "  " };
        println!(
            "{} {}  HR: {} bpm | {}",
            flag,
            reading.timestamp().format("%Y-%m-%d %H:%M:%S"),
            reading.heart_rate(),
            reading.summary()
        );
    }
    Ok(())
}
