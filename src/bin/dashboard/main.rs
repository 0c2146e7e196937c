mod args;
mod message;
mod ws;

use std::{process::ExitCode, sync::Arc, time::Duration};

use air_quality::{
    alert::Remediation,
    config::Config,
    logging,
    monitor::{self, Monitor},
    storage::{Gateway, PgStorage, Storage},
};
use anyhow::{Context as _, Result};
use args::Args;
use axum::{Router, response::Html, routing::get};
use chrono::{DateTime, Utc};
use clap::Parser as _;
use tokio::sync::{RwLock, broadcast};
use tokio_stream::wrappers::BroadcastStream;

use crate::message::DashboardMessage;

const INDEX_HTML: &str = include_str!("../../../static/index.html");

const CHANNEL_CAPACITY: usize = 16;

#[derive(Clone)]
pub struct AppState {
    tx: broadcast::Sender<String>,
    latest: Arc<RwLock<Option<String>>>,
}

impl AppState {
    fn new() -> Self {
        let (tx, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self {
            tx,
            latest: Arc::new(RwLock::new(None)),
        }
    }

    /// Frames for a new client: the most recent data frame, if any, then
    /// every frame broadcast from now on.
    async fn subscribe(&self) -> (Option<String>, BroadcastStream<String>) {
        let updates = BroadcastStream::new(self.tx.subscribe());
        let latest = self.latest.read().await.clone();
        (latest, updates)
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let _ = dotenvy::dotenv();
    logging::init("info");

    if let Err(e) = run().await {
        eprintln!("{e:#}");
        return ExitCode::from(1);
    }

    ExitCode::from(0)
}

async fn run() -> Result<()> {
    let args = Args::parse();

    let config = Config::load(&args.config)?;

    let storage = PgStorage::connect(&args.database_url).await?;
    storage.migrate().await?;

    let monitor = Monitor::new(
        Gateway::new(storage),
        &config,
        args.state_file,
        args.timezone,
    );

    let state = AppState::new();

    let poller = tokio::spawn(poll(
        monitor,
        state.clone(),
        Duration::from_secs(args.poll_interval_secs.max(1)),
    ));

    let app = Router::new()
        .route("/", get(|| async { Html(INDEX_HTML) }))
        .route("/ws", get(ws::ws_handler))
        .with_state(state);

    let listener = tokio::net::TcpListener::bind(args.bind)
        .await
        .with_context(|| format!("failed to bind {}", args.bind))?;
    tracing::info!(addr = %args.bind, "Serving dashboard");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("dashboard server failed")?;

    poller.abort();
    tracing::info!("Shut down");

    Ok(())
}

/// Runs the monitor cycle and fans each result out to connected clients.
async fn poll(mut monitor: Monitor<PgStorage>, state: AppState, interval: Duration) {
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

    loop {
        ticker.tick().await;

        let remediations = publish(&mut monitor, &state, Utc::now()).await;
        monitor::spawn_remediations(remediations);
    }
}

/// One monitor cycle: stores the data frame as the latest one, broadcasts
/// it and any notifications, and returns the restarts to run.
async fn publish<S: Storage>(
    monitor: &mut Monitor<S>,
    state: &AppState,
    now: DateTime<Utc>,
) -> Vec<Remediation> {
    let cycle = monitor.tick(now).await;

    match DashboardMessage::Data(cycle.snapshot.payload).to_json() {
        Ok(data) => {
            *state.latest.write().await = Some(data.clone());
            // no clients connected
            let _ = state.tx.send(data);
        }
        Err(e) => tracing::error!(error = %e, "Failed to serialize dashboard data"),
    }

    if !cycle.notifications.is_empty() {
        tracing::info!(count = cycle.notifications.len(), "Pushing notifications");
        match DashboardMessage::Notification(cycle.notifications).to_json() {
            Ok(frame) => {
                let _ = state.tx.send(frame);
            }
            Err(e) => tracing::error!(error = %e, "Failed to serialize notifications"),
        }
    }

    cycle.remediations
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
