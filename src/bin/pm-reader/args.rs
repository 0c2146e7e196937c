use std::path::PathBuf;

use clap::Parser;

#[derive(Debug, Parser)]
pub struct Args {
    /// Serial device the PMSA003 streams on, already configured for 9600 8N1.
    #[arg(long, env = "PM_DEVICE", default_value = "/dev/serial0")]
    pub device: PathBuf,

    /// Index of this sensor when several are attached.
    #[arg(long, env = "PM_SENSOR_INDEX", default_value_t = 0)]
    pub index: u8,

    /// Also derive and store the PM2.5 air quality index.
    #[arg(long, env = "PM_WRITE_AQI")]
    pub write_aqi: bool,

    /// Extra delay between samples. 0 records every frame the sensor sends.
    #[arg(long, env = "PM_INTERVAL_SECS", default_value_t = 0)]
    pub interval_secs: u64,

    #[arg(long, env = "DATABASE_URL")]
    pub database_url: String,
}
