mod args;

use std::{process::ExitCode, time::Duration};

use air_quality::{
    alert::NotificationKind,
    config::Config,
    logging,
    monitor::{self, Monitor},
    storage::{Gateway, PgStorage},
};
use anyhow::Result;
use args::Args;
use chrono::Utc;
use clap::Parser as _;

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
    tracing::info!(
        thresholds = config.thresholds.len(),
        watched = ?config.watchdog.parameters,
        "Loaded configuration",
    );

    let storage = PgStorage::connect(&args.database_url).await?;
    storage.migrate().await?;

    let mut monitor = Monitor::new(
        Gateway::new(storage),
        &config,
        args.state_file,
        args.timezone,
    );

    let mut ticker = tokio::time::interval(Duration::from_secs(args.poll_interval_secs.max(1)));
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = ticker.tick() => {}
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("Shutting down");
                return Ok(());
            }
        }

        let cycle = monitor.tick(Utc::now()).await;

        for n in &cycle.notifications {
            match n.kind {
                NotificationKind::Threshold => {
                    tracing::info!(parameter = %n.parameter, "{}", n.message)
                }
                NotificationKind::MissingData => {
                    tracing::warn!(parameter = %n.parameter, "{}", n.message)
                }
            }
        }

        monitor::spawn_remediations(cycle.remediations);
    }
}
