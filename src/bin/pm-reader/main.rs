mod args;

use std::{process::ExitCode, time::Duration};

use air_quality::{
    aqi, logging,
    measurement::Reading,
    pms::FrameReader,
    reader::{self, SensorSource},
    storage::{Gateway, PgStorage},
};
use anyhow::{Context as _, Result};
use args::Args;
use async_trait::async_trait;
use clap::Parser as _;
use tokio::{fs::File, io::AsyncRead};

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

    let storage = PgStorage::connect(&args.database_url).await?;
    storage.migrate().await?;
    let gateway = Gateway::new(storage);

    let file = File::open(&args.device)
        .await
        .with_context(|| format!("failed to open {}", args.device.display()))?;

    let mut source = Pmsa003 {
        frames: FrameReader::new(file),
        index: args.index,
        write_aqi: args.write_aqi,
    };

    reader::run(&mut source, &gateway, Duration::from_secs(args.interval_secs)).await;

    Ok(())
}

struct Pmsa003<R> {
    frames: FrameReader<R>,
    index: u8,
    write_aqi: bool,
}

#[async_trait]
impl<R: AsyncRead + Unpin + Send> SensorSource for Pmsa003<R> {
    fn name(&self) -> &str {
        "pmsa003"
    }

    async fn read_sample(&mut self) -> Result<Vec<Reading>> {
        let sample = self.frames.next_sample().await?;

        let mut readings = Vec::with_capacity(2);
        if self.write_aqi {
            match aqi::pm25_aqi(sample.pm25_cf1.into()) {
                Some(v) => readings.push(Reading::Aqi {
                    pm25_cf1_aqi: v.into(),
                }),
                None => tracing::warn!(pm25 = sample.pm25_cf1, "Cannot compute AQI"),
            }
        }
        readings.push(Reading::Pm {
            index: self.index,
            sample,
        });

        Ok(readings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame(pm25: u16) -> Vec<u8> {
        let words: [u16; 13] = [3, pm25, 9, 3, pm25, 9, 600, 180, 30, 3, 1, 0, 0];
        let mut f = vec![0x42, 0x4d, 0x00, 0x1c];
        for w in words {
            f.extend_from_slice(&w.to_be_bytes());
        }
        let sum = f.iter().fold(0u16, |s, &b| s.wrapping_add(b.into()));
        f.extend_from_slice(&sum.to_be_bytes());
        f
    }

    #[tokio::test]
    async fn emits_pm_and_optional_aqi() {
        let bytes = frame(35);
        let mut source = Pmsa003 {
            frames: FrameReader::new(bytes.as_slice()),
            index: 1,
            write_aqi: true,
        };

        let readings = source.read_sample().await.unwrap();
        assert_eq!(readings.len(), 2);
        assert!(matches!(readings[0], Reading::Aqi { pm25_cf1_aqi } if pm25_cf1_aqi == 99.0));
        assert!(matches!(readings[1], Reading::Pm { index: 1, ref sample } if sample.pm25_cf1 == 35));
    }

    #[tokio::test]
    async fn aqi_is_opt_in() {
        let bytes = frame(12);
        let mut source = Pmsa003 {
            frames: FrameReader::new(bytes.as_slice()),
            index: 0,
            write_aqi: false,
        };

        let readings = source.read_sample().await.unwrap();
        assert_eq!(readings.len(), 1);
    }
}
