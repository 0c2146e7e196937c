pub mod alert;
pub mod aqi;
pub mod config;
pub mod logging;
pub mod measurement;
pub mod monitor;
pub mod pms;
pub mod reader;
pub mod snapshot;
pub mod storage;
pub mod switchbot;
pub mod thresholds;
