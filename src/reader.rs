//! Generic sensor polling loop.
//!
//! Every sensor reader is the same loop: take a reading, write it, sleep.
//! Sensors plug in through [`SensorSource`]; storage goes through the
//! [`Gateway`].

use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use chrono::Utc;

use crate::measurement::Reading;
use crate::storage::{Gateway, Storage};

const INITIAL_BACKOFF: Duration = Duration::from_secs(5);

const MAX_BACKOFF: Duration = Duration::from_secs(300);

#[async_trait]
pub trait SensorSource: Send {
    /// Short name used in logs.
    fn name(&self) -> &str;

    /// Takes one reading. An empty vector means the sensor had nothing to
    /// report this cycle (warming up, no new advertisement, ...).
    async fn read_sample(&mut self) -> Result<Vec<Reading>>;
}

/// Doubling delay applied after consecutive read failures.
#[derive(Debug, Clone)]
pub struct Backoff {
    current: Duration,
}

impl Default for Backoff {
    fn default() -> Self {
        Self {
            current: INITIAL_BACKOFF,
        }
    }
}

impl Backoff {
    /// Returns the delay to wait now and doubles the next one, up to the cap.
    pub fn next_delay(&mut self) -> Duration {
        let delay = self.current;
        self.current = (self.current * 2).min(MAX_BACKOFF);
        delay
    }

    pub fn reset(&mut self) {
        self.current = INITIAL_BACKOFF;
    }
}

/// Reads once and writes every reading, stamped with the current time.
/// Returns the number of readings written.
pub async fn poll_once<T, S>(source: &mut T, gateway: &Gateway<S>) -> Result<usize>
where
    T: SensorSource + ?Sized,
    S: Storage,
{
    let readings = source.read_sample().await?;
    let at = Utc::now();

    for reading in &readings {
        gateway.write_reading(at, reading).await;
    }

    Ok(readings.len())
}

/// Polls `source` forever, `interval` apart. Read failures are logged and
/// retried with exponential backoff instead of ending the loop.
pub async fn run<T, S>(source: &mut T, gateway: &Gateway<S>, interval: Duration)
where
    T: SensorSource + ?Sized,
    S: Storage,
{
    let mut backoff = Backoff::default();

    tracing::info!(sensor = source.name(), interval_secs = interval.as_secs_f64(), "Polling sensor");

    loop {
        match poll_once(source, gateway).await {
            Ok(n) => {
                tracing::debug!(sensor = source.name(), readings = n, "Sample written");
                backoff.reset();
                tokio::time::sleep(interval).await;
            }
            Err(e) => {
                let delay = backoff.next_delay();
                tracing::error!(
                    sensor = source.name(),
                    error = %format!("{e:#}"),
                    retry_in_secs = delay.as_secs(),
                    "Failed to read sensor",
                );
                tokio::time::sleep(delay).await;
            }
        }
    }
}
