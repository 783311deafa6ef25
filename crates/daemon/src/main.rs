// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! tasbihd - The tasbih sync daemon.
//!
//! Owns the offline action queue at `~/.local/state/tasbih/queue.db` and
//! drains it into the remote API whenever the remote is reachable. Old synced
//! records are swept once a day.
//!
//! Usage:
//!   tasbihd --state-dir <path>
//!
//! Reads `config.toml` from the state directory. Stops on SIGINT or SIGTERM.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tb_core::{Collection, QueueStore};
use tb_sync::{
    BackgroundTasks, ConnectivityMonitor, HttpRemote, RemoteApi, RetentionJob, Settings,
    SyncEngine, SyncError, SyncResult,
};
use tokio_util::sync::CancellationToken;

mod env;
mod probe;

use probe::ReachabilityProbe;

/// Log filename within the state directory.
const LOG_NAME: &str = "tasbihd.log";
/// PID filename within the state directory.
const PID_NAME: &str = "tasbihd.pid";
/// Lock filename for single instance guarantee.
const LOCK_NAME: &str = "tasbihd.lock";

fn main() {
    // Parse args
    let args: Vec<String> = std::env::args().collect();
    let state_dir = parse_state_dir(&args);

    if let Err(e) = fs::create_dir_all(&state_dir) {
        eprintln!("failed to create state dir {}: {}", state_dir.display(), e);
        std::process::exit(1);
    }

    // Set up logging
    setup_logging(&state_dir.join(LOG_NAME));

    tracing::info!("tasbihd starting, state_dir={}", state_dir.display());

    // Acquire file lock for single instance
    let lock_file = match acquire_lock(&state_dir.join(LOCK_NAME)) {
        Ok(f) => f,
        Err(e) => {
            tracing::error!("failed to acquire lock: {}", e);
            std::process::exit(1);
        }
    };

    let pid_path = state_dir.join(PID_NAME);
    if let Err(e) = write_pid_file(&pid_path) {
        tracing::error!("failed to write PID file: {}", e);
        std::process::exit(1);
    }

    let settings = match Settings::load(&state_dir) {
        Ok(s) => s,
        Err(e) => {
            tracing::error!("{}", e);
            cleanup(&pid_path);
            std::process::exit(1);
        }
    };

    let runtime = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(rt) => rt,
        Err(e) => {
            tracing::error!("failed to start runtime: {}", e);
            cleanup(&pid_path);
            std::process::exit(1);
        }
    };

    let result = runtime.block_on(run(&state_dir, settings));

    cleanup(&pid_path);
    drop(lock_file);

    match result {
        Ok(()) => tracing::info!("tasbihd stopped"),
        Err(e) => {
            tracing::error!("tasbihd failed: {}", e);
            std::process::exit(1);
        }
    }
}

async fn run(state_dir: &Path, settings: Settings) -> SyncResult<()> {
    let db_path = settings.database_path(state_dir);
    let queue = Arc::new(QueueStore::open(&db_path)?);
    log_queue_stats(&queue, settings.sync.max_retry);

    let http = HttpRemote::new(&settings.remote)?;
    let (host, port) = http.probe_address().ok_or_else(|| {
        SyncError::Config(format!("no host in remote base_url '{}'", http.base_url()))
    })?;
    let remote: Arc<dyn RemoteApi> = Arc::new(http);

    // Offline until the first probe says otherwise.
    let monitor = Arc::new(ConnectivityMonitor::new(false));

    let engine = Arc::new(
        SyncEngine::new(Arc::clone(&queue), remote, Arc::clone(&monitor))
            .with_max_retry(settings.sync.max_retry),
    );
    let retention =
        RetentionJob::new(Arc::clone(&queue)).with_horizon(settings.retention.horizon());
    let tasks = BackgroundTasks::start(engine, retention, &monitor, settings.intervals());

    let probe_cancel = CancellationToken::new();
    let probe = ReachabilityProbe::new(host, port, &settings.connectivity);
    let probe_task = tokio::spawn(probe.run(Arc::clone(&monitor), probe_cancel.clone()));

    wait_for_shutdown().await;
    tracing::info!("shutting down");

    probe_cancel.cancel();
    if let Err(e) = probe_task.await {
        tracing::warn!("probe task ended abnormally: {}", e);
    }
    tasks.shutdown().await;

    log_queue_stats(&queue, settings.sync.max_retry);
    Ok(())
}

async fn wait_for_shutdown() {
    use tokio::signal::unix::{signal, SignalKind};

    let mut terminate = match signal(SignalKind::terminate()) {
        Ok(s) => s,
        Err(e) => {
            tracing::warn!("failed to install SIGTERM handler: {}", e);
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::warn!("failed to wait for SIGINT: {}", e);
            }
            return;
        }
    };

    tokio::select! {
        result = tokio::signal::ctrl_c() => {
            if let Err(e) = result {
                tracing::warn!("failed to wait for SIGINT: {}", e);
            }
        }
        _ = terminate.recv() => {}
    }
}

fn log_queue_stats(queue: &QueueStore, max_retry: u32) {
    for collection in [Collection::Events, Collection::Sessions] {
        match queue.stats(collection, max_retry) {
            Ok(stats) => tracing::info!(
                %collection,
                pending = stats.pending,
                dead = stats.dead,
                synced = stats.synced,
                "queue stats"
            ),
            Err(e) => tracing::warn!("failed to read {} stats: {}", collection, e),
        }
    }
}

fn parse_state_dir(args: &[String]) -> PathBuf {
    for i in 0..args.len() {
        if args[i] == "--state-dir" {
            if let Some(dir) = args.get(i + 1) {
                return PathBuf::from(dir);
            }
        }
    }
    // Default to XDG state directory
    if let Some(dir) = env::state_dir() {
        return dir;
    }
    if let Some(dir) = env::xdg_state_home() {
        return dir.join("tasbih");
    }
    dirs::home_dir()
        .map(|h| h.join(".local/state/tasbih"))
        .unwrap_or_else(|| PathBuf::from(".local/state/tasbih"))
}

fn setup_logging(log_path: &Path) {
    use tracing_subscriber::EnvFilter;

    let filter =
        EnvFilter::try_from_env(env::names::RUST_LOG).unwrap_or_else(|_| EnvFilter::new("info"));

    // Try to open log file, fall back to stderr
    if let Ok(file) = fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(log_path)
    {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(file)
            .with_ansi(false)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init();
    }
}

fn acquire_lock(lock_path: &Path) -> std::io::Result<fs::File> {
    use fs2::FileExt;

    let file = fs::OpenOptions::new()
        .create(true)
        .write(true)
        .truncate(true)
        .open(lock_path)?;
    file.try_lock_exclusive()
        .map_err(|_| std::io::Error::other("another tasbihd instance is already running"))?;
    Ok(file)
}

fn write_pid_file(pid_path: &Path) -> std::io::Result<()> {
    fs::write(pid_path, format!("{}", std::process::id()))
}

fn cleanup(pid_path: &Path) {
    let _ = fs::remove_file(pid_path);
}
