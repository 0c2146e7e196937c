use std::path::PathBuf;

use chrono_tz::Tz;
use clap::Parser;

#[derive(Debug, Parser)]
pub struct Args {
    #[arg(long, env = "AIR_QUALITY_CONFIG")]
    pub config: PathBuf,

    #[arg(long, env = "DATABASE_URL")]
    pub database_url: String,

    #[arg(long, env = "ALERT_STATE_FILE", default_value = "alert_state.json")]
    pub state_file: PathBuf,

    #[arg(long, env = "TZ", default_value = "UTC")]
    pub timezone: Tz,

    #[arg(long, env = "POLL_INTERVAL_SECS", default_value_t = 3)]
    pub poll_interval_secs: u64,
}
