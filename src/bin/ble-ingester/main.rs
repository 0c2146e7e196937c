mod args;
mod ble;

use std::{collections::HashMap, process::ExitCode, time::Duration};

use air_quality::{
    config::Config,
    logging,
    measurement::Reading,
    reader::{self, SensorSource},
    storage::{Gateway, PgStorage},
    switchbot::Device,
};
use anyhow::{Context as _, Result, anyhow, bail};
use args::Args;
use async_trait::async_trait;
use btleplug::{
    api::{Central, Manager as _, Peripheral, ScanFilter},
    platform::{Adapter, Manager},
};
use chrono::{DateTime, TimeDelta, Utc};
use clap::Parser as _;
use indexmap::IndexMap;
use macaddr::MacAddr6;

use crate::ble::switchbot::decode_switchbot_ble_data;

/// Meters advertise every few seconds; keep one reading per device per minute.
const MIN_READING_INTERVAL: TimeDelta = TimeDelta::minutes(1);

#[tokio::main]
async fn main() -> ExitCode {
    let _ = dotenvy::dotenv();
    logging::init("info,btleplug=warn");

    if let Err(e) = run().await {
        eprintln!("{e:#}");
        return ExitCode::from(1);
    }

    ExitCode::from(0)
}

async fn run() -> Result<()> {
    let args = Args::parse();

    let config = Config::load(&args.config)?;
    if config.devices.is_empty() {
        bail!(
            "no SwitchBot devices configured in {}",
            args.config.display()
        );
    }

    let storage = PgStorage::connect(&args.database_url).await?;
    storage.migrate().await?;
    let gateway = Gateway::new(storage);

    let manager = Manager::new()
        .await
        .context("failed to initialize Bluetooth manager")?;

    let adapters = manager
        .adapters()
        .await
        .context("failed to get Bluetooth adapters")?;

    let adapter = adapters
        .into_iter()
        .next()
        .ok_or_else(|| anyhow!("no Bluetooth adapters found"))?;

    adapter
        .start_scan(ScanFilter::default())
        .await
        .context("failed to start BLE scan")?;

    let mut scanner = SwitchBotScanner::new(adapter, config.devices);

    reader::run(
        &mut scanner,
        &gateway,
        Duration::from_secs(args.scan_interval_secs),
    )
    .await;

    Ok(())
}

#[derive(Debug, Default)]
struct Throttle {
    last_recorded_at: HashMap<MacAddr6, DateTime<Utc>>,
}

impl Throttle {
    /// Returns whether a reading taken at `now` should be recorded, and if
    /// so remembers it.
    fn should_record(&mut self, id: MacAddr6, now: DateTime<Utc>) -> bool {
        if let Some(&last) = self.last_recorded_at.get(&id)
            && now - last < MIN_READING_INTERVAL
        {
            return false;
        }

        self.last_recorded_at.insert(id, now);
        true
    }
}

struct SwitchBotScanner {
    adapter: Adapter,
    devices: IndexMap<MacAddr6, Device>,
    throttle: Throttle,
}

impl SwitchBotScanner {
    fn new(adapter: Adapter, devices: Vec<Device>) -> Self {
        Self {
            adapter,
            devices: devices.into_iter().map(|d| (d.id, d)).collect(),
            throttle: Throttle::default(),
        }
    }
}

#[async_trait]
impl SensorSource for SwitchBotScanner {
    fn name(&self) -> &str {
        "switchbot-ble"
    }

    async fn read_sample(&mut self) -> Result<Vec<Reading>> {
        let peripherals = self
            .adapter
            .peripherals()
            .await
            .context("failed to get BLE peripherals")?;

        let mut readings = Vec::new();
        for peripheral in peripherals.iter() {
            let mac_address: MacAddr6 = peripheral.address().into_inner().into();

            let Some(device) = self.devices.get(&mac_address) else {
                continue;
            };

            let properties = match peripheral.properties().await {
                Ok(Some(p)) => p,
                Ok(None) => {
                    tracing::debug!(device = %device.name, "BLE peripheral properties not available");
                    continue;
                }
                Err(e) => {
                    tracing::warn!(
                        device = %device.name,
                        error = %e,
                        "Failed to get BLE peripheral properties",
                    );
                    continue;
                }
            };

            let (device_type, reading) = match decode_switchbot_ble_data(
                mac_address,
                &properties.manufacturer_data,
                &properties.service_data,
            ) {
                Ok(r) => r,
                Err(e) => {
                    tracing::warn!(
                        device = %device.name,
                        error = %format!("{e:#}"),
                        "Failed to decode SwitchBot BLE data",
                    );
                    continue;
                }
            };

            if device_type != device.r#type {
                tracing::warn!(
                    device = %device.name,
                    configured = device.r#type.as_str(),
                    advertised = device_type.as_str(),
                    "SwitchBot device type differs from configuration",
                );
            }

            if !self.throttle.should_record(mac_address, Utc::now()) {
                continue;
            }

            tracing::debug!(
                device = %device.name,
                temperature = reading.temperature_celsius,
                humidity = reading.humidity_percent,
                "SwitchBot reading",
            );
            readings.push(Reading::SwitchBot(reading));
        }

        Ok(readings)
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    #[test]
    fn throttle_keeps_one_reading_per_minute_per_device() {
        let a = MacAddr6::new(0xd0, 0xc8, 0x41, 0x0a, 0x1b, 0x2c);
        let b = MacAddr6::new(0xd0, 0xc8, 0x41, 0x0a, 0x1b, 0x2d);
        let t0 = Utc.with_ymd_and_hms(2025, 1, 5, 9, 0, 0).unwrap();
        let mut throttle = Throttle::default();

        assert!(throttle.should_record(a, t0));
        assert!(throttle.should_record(b, t0 + TimeDelta::seconds(2)));
        assert!(!throttle.should_record(a, t0 + TimeDelta::seconds(59)));
        assert!(throttle.should_record(a, t0 + TimeDelta::seconds(60)));
    }
}
