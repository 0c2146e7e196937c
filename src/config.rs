//! Notifier and dashboard configuration file.
//!
//! Threshold tables, watchdog settings, the parameter → systemd service
//! mapping and the list of SwitchBot meters all come from one TOML file
//! passed on the command line.

use std::path::Path;

use anyhow::{Context as _, Result, anyhow};
use chrono::TimeDelta;
use indexmap::IndexMap;
use macaddr::MacAddr6;
use serde::Deserialize;

use crate::switchbot::{Device, DeviceType};
use crate::thresholds::{Interval, IntervalTable, Thresholds};

/// Minimum time between two missing-data alerts for one parameter.
pub const DEFAULT_WATCHDOG_INTERVAL_SECS: u64 = 10 * 60;

/// Parameter groups watched when the configuration does not list any.
pub const DEFAULT_WATCHED_PARAMETERS: [&str; 4] = ["aqi", "noise", "ambient_data", "visible_light"];

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub watchdog: WatchdogConfig,

    /// Parameter group → systemd unit restarted when that group stops reporting.
    pub services: IndexMap<String, String>,

    pub thresholds: Thresholds,

    /// SwitchBot meters, ordered by `sort_order`.
    pub devices: Vec<Device>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct WatchdogConfig {
    interval: TimeDelta,

    pub parameters: Vec<String>,
}

impl WatchdogConfig {
    pub fn interval(&self) -> TimeDelta {
        self.interval
    }
}

fn default_interval_secs() -> u64 {
    DEFAULT_WATCHDOG_INTERVAL_SECS
}

fn default_watched_parameters() -> Vec<String> {
    DEFAULT_WATCHED_PARAMETERS.map(String::from).to_vec()
}

#[derive(Debug, Deserialize)]
struct RawWatchdog {
    #[serde(default = "default_interval_secs")]
    interval_secs: u64,

    #[serde(default = "default_watched_parameters")]
    parameters: Vec<String>,
}

impl RawWatchdog {
    fn validate(self) -> Result<WatchdogConfig> {
        let interval = i64::try_from(self.interval_secs)
            .ok()
            .and_then(TimeDelta::try_seconds)
            .ok_or_else(|| anyhow!("{} seconds is out of range", self.interval_secs))?;

        Ok(WatchdogConfig {
            interval,
            parameters: self.parameters,
        })
    }
}

impl Default for RawWatchdog {
    fn default() -> Self {
        Self {
            interval_secs: default_interval_secs(),
            parameters: default_watched_parameters(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawConfig {
    #[serde(default)]
    watchdog: RawWatchdog,

    #[serde(default)]
    services: IndexMap<String, String>,

    #[serde(default)]
    thresholds: IndexMap<String, RawTable>,

    #[serde(default)]
    switchbot: Vec<RawDevice>,
}

#[derive(Debug, Deserialize)]
struct RawTable {
    intervals: Vec<Interval>,
}

#[derive(Debug, Deserialize)]
struct RawDevice {
    id: String,
    r#type: String,
    name: String,
    #[serde(default)]
    sort_order: u8,
}

impl Config {
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file: {}", path.display()))?;

        Self::from_toml(&text)
            .with_context(|| format!("failed to load config file: {}", path.display()))
    }

    pub fn from_toml(text: &str) -> Result<Self> {
        let raw: RawConfig = toml::from_str(text).context("failed to parse TOML")?;

        let watchdog = raw
            .watchdog
            .validate()
            .context("invalid watchdog interval_secs")?;

        let mut thresholds = Thresholds::new();
        for (parameter, table) in raw.thresholds {
            let table = IntervalTable::new(table.intervals)
                .with_context(|| format!("invalid interval table for {parameter}"))?;
            thresholds.insert(parameter, table);
        }

        let mut devices = raw
            .switchbot
            .into_iter()
            .map(|d| {
                let id: MacAddr6 = d
                    .id
                    .parse()
                    .with_context(|| format!("invalid SwitchBot device id: {}", d.id))?;
                let r#type: DeviceType = d
                    .r#type
                    .parse()
                    .with_context(|| format!("invalid SwitchBot device type for {}", d.id))?;
                Ok(Device {
                    id,
                    r#type,
                    name: d.name,
                    sort_order: d.sort_order,
                })
            })
            .collect::<Result<Vec<_>>>()?;
        devices.sort_by_key(|d| d.sort_order);

        Ok(Self {
            watchdog,
            services: raw.services,
            thresholds,
            devices,
        })
    }
}
