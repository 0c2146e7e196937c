use std::path::PathBuf;

use clap::Parser;

#[derive(Debug, Parser)]
pub struct Args {
    /// Configuration file listing the SwitchBot meters to record.
    #[arg(long, env = "AIR_QUALITY_CONFIG")]
    pub config: PathBuf,

    #[arg(long, env = "DATABASE_URL")]
    pub database_url: String,

    /// Seconds between two scans of the advertisement cache.
    #[arg(long, env = "BLE_SCAN_INTERVAL_SECS", default_value_t = 2)]
    pub scan_interval_secs: u64,
}
