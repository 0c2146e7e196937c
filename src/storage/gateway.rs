use chrono::{DateTime, TimeDelta, Utc};

use crate::measurement::{Bucket, Measurement, PmSample, Point, Reading};
use crate::storage::Storage;
use crate::switchbot::MeterReading;

/// Samples older than this are treated as absent.
pub const DEFAULT_RECENCY_WINDOW: TimeDelta = TimeDelta::minutes(10);

/// Typed read/write API over a [`Storage`] backend.
///
/// Writes are fire-and-forget and reads never fail: backend errors are
/// logged, and a failed read looks the same as a stream with no recent data.
#[derive(Debug)]
pub struct Gateway<S> {
    storage: S,
    recency_window: TimeDelta,
}

impl<S: Storage> Gateway<S> {
    pub fn new(storage: S) -> Self {
        Self::with_recency_window(storage, DEFAULT_RECENCY_WINDOW)
    }

    pub fn with_recency_window(storage: S, recency_window: TimeDelta) -> Self {
        Self {
            storage,
            recency_window,
        }
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    async fn write(&self, mut measurements: Vec<Measurement>) {
        measurements.retain(|m| !m.fields.is_empty());
        let Some(first) = measurements.first() else {
            return;
        };

        if let Err(e) = self.storage.insert(&measurements).await {
            tracing::error!(
                point = %first.point,
                error = %format!("{e:#}"),
                "Failed to write measurement",
            );
        }
    }

    async fn read(&self, bucket: Bucket, point: Point) -> Option<Measurement> {
        let point = point.to_string();
        let since = Utc::now() - self.recency_window;

        match self.storage.latest(bucket, &point, since).await {
            Ok(m) => m,
            Err(e) => {
                tracing::warn!(
                    bucket = bucket.as_str(),
                    point = %point,
                    error = %format!("{e:#}"),
                    "Failed to read measurement",
                );
                None
            }
        }
    }

    // ---------------------------------------------------------------------
    // Writes
    // ---------------------------------------------------------------------

    /// Writes a typed reading to the stream(s) it belongs to.
    pub async fn write_reading(&self, at: DateTime<Utc>, reading: &Reading) {
        match *reading {
            Reading::Pm { index, ref sample } => self.write_pm(index, at, sample).await,
            Reading::Aqi { pm25_cf1_aqi } => self.write_aqi(at, pm25_cf1_aqi).await,
            Reading::SoundPressureLevel { spl } => self.write_sound_pressure_level(at, spl).await,
            Reading::Ambient {
                temperature,
                gas,
                relative_humidity,
                pressure,
                iaq,
            } => {
                self.write_ambient_data(at, temperature, gas, relative_humidity, pressure, iaq)
                    .await
            }
            Reading::Light {
                visible_light_lux,
                uv_index,
            } => self.write_light_data(at, visible_light_lux, uv_index).await,
            Reading::Co2 {
                co2,
                temperature,
                relative_humidity,
            } => {
                self.write_co2_data(at, co2, temperature, relative_humidity)
                    .await
            }
            Reading::Bmp390l {
                temperature,
                pressure,
                altitude,
            } => {
                self.write_bmp390l_data(at, temperature, pressure, altitude)
                    .await
            }
            Reading::Sgp41 {
                voc_index,
                nox_index,
            } => self.write_sgp41_data(at, voc_index, nox_index).await,
            Reading::Radon {
                radon_1day_avg,
                radon_week_avg,
                radon_year_avg,
                temperature,
                relative_humidity,
            } => {
                self.write_radon_data(
                    at,
                    radon_1day_avg,
                    radon_week_avg,
                    radon_year_avg,
                    temperature,
                    relative_humidity,
                )
                .await
            }
            Reading::Co { co_ppm } => self.write_co_data(at, co_ppm).await,
            Reading::Zmod4510 {
                o3_ppb,
                no2_ppb,
                fast_aqi,
                epa_aqi,
            } => {
                self.write_zmod4510_data(at, o3_ppb, no2_ppb, fast_aqi, epa_aqi)
                    .await
            }
            Reading::SwitchBot(ref meter) => self.write_switchbot_data(at, meter).await,
        }
    }

    pub async fn write_pm(&self, index: u8, at: DateTime<Utc>, sample: &PmSample) {
        let m = Measurement::new(Bucket::Dust, Point::Pm(index), at)
            .field("pm10_cf1", sample.pm10_cf1.into())
            .field("pm25_cf1", sample.pm25_cf1.into())
            .field("pm100_cf1", sample.pm100_cf1.into())
            .field("pm10_std", sample.pm10_std.into())
            .field("pm25_std", sample.pm25_std.into())
            .field("pm100_std", sample.pm100_std.into())
            .field("gr03um", sample.gr03um.into())
            .field("gr05um", sample.gr05um.into())
            .field("gr10um", sample.gr10um.into())
            .field("gr25um", sample.gr25um.into())
            .field("gr50um", sample.gr50um.into())
            .field("gr100um", sample.gr100um.into());
        self.write(vec![m]).await;
    }

    pub async fn write_aqi(&self, at: DateTime<Utc>, pm25_cf1_aqi: f64) {
        let m = Measurement::new(Bucket::Dust, Point::Aqi, at).field("pm25_cf1_aqi", pm25_cf1_aqi);
        self.write(vec![m]).await;
    }

    pub async fn write_sound_pressure_level(&self, at: DateTime<Utc>, spl: f64) {
        let m = Measurement::new(Bucket::Sound, Point::Sound, at).field("sound_pressure_level", spl);
        self.write(vec![m]).await;
    }

    pub async fn write_ambient_data(
        &self,
        at: DateTime<Utc>,
        temperature: f64,
        gas: f64,
        relative_humidity: f64,
        pressure: f64,
        iaq: f64,
    ) {
        let gas = Measurement::new(Bucket::Gas, Point::Bme688, at)
            .field("gas_resistance", gas)
            .field("iaq", iaq);
        let climate = Measurement::new(Bucket::Climate, Point::Bme688, at)
            .field("temperature", temperature)
            .field("relative_humidity", relative_humidity)
            .field("pressure", pressure);
        self.write(vec![gas, climate]).await;
    }

    pub async fn write_light_data(&self, at: DateTime<Utc>, visible_light_lux: f64, uv_index: f64) {
        let m = Measurement::new(Bucket::Light, Point::Ltr390, at)
            .field("visible_light_lux", visible_light_lux)
            .field("uv_index", uv_index);
        self.write(vec![m]).await;
    }

    pub async fn write_co2_data(
        &self,
        at: DateTime<Utc>,
        co2: f64,
        temperature: f64,
        relative_humidity: f64,
    ) {
        let gas = Measurement::new(Bucket::Gas, Point::Scd41, at).field("co2", co2);
        let climate = Measurement::new(Bucket::Climate, Point::Scd41, at)
            .field("temperature", temperature)
            .field("relative_humidity", relative_humidity);
        self.write(vec![gas, climate]).await;
    }

    pub async fn write_bmp390l_data(
        &self,
        at: DateTime<Utc>,
        temperature: f64,
        pressure: f64,
        altitude: f64,
    ) {
        let m = Measurement::new(Bucket::Climate, Point::Bmp390l, at)
            .field("temperature", temperature)
            .field("pressure", pressure)
            .field("altitude", altitude);
        self.write(vec![m]).await;
    }

    pub async fn write_sgp41_data(&self, at: DateTime<Utc>, voc_index: f64, nox_index: f64) {
        let m = Measurement::new(Bucket::Gas, Point::Sgp41, at)
            .field("voc_index", voc_index)
            .field("nox_index", nox_index);
        self.write(vec![m]).await;
    }

    /// Airthings devices report radon averages and climate independently; a
    /// half with no values is not written.
    pub async fn write_radon_data(
        &self,
        at: DateTime<Utc>,
        radon_1day_avg: Option<f64>,
        radon_week_avg: Option<f64>,
        radon_year_avg: Option<f64>,
        temperature: Option<f64>,
        relative_humidity: Option<f64>,
    ) {
        let radon = Measurement::new(Bucket::Gas, Point::AirthingsRadon, at)
            .optional_field("radon_1day_avg", radon_1day_avg)
            .optional_field("radon_week_avg", radon_week_avg)
            .optional_field("radon_year_avg", radon_year_avg);
        let climate = Measurement::new(Bucket::Climate, Point::AirthingsRadon, at)
            .optional_field("temperature", temperature)
            .optional_field("relative_humidity", relative_humidity);
        self.write(vec![radon, climate]).await;
    }

    pub async fn write_co_data(&self, at: DateTime<Utc>, co_ppm: f64) {
        let m = Measurement::new(Bucket::Gas, Point::Ze07Co, at).field("co_ppm", co_ppm);
        self.write(vec![m]).await;
    }

    pub async fn write_zmod4510_data(
        &self,
        at: DateTime<Utc>,
        o3_ppb: f64,
        no2_ppb: f64,
        fast_aqi: f64,
        epa_aqi: f64,
    ) {
        let m = Measurement::new(Bucket::Gas, Point::Zmod4510, at)
            .field("o3_ppb", o3_ppb)
            .field("no2_ppb", no2_ppb)
            .field("fast_aqi", fast_aqi)
            .field("epa_aqi", epa_aqi);
        self.write(vec![m]).await;
    }

    pub async fn write_switchbot_data(&self, at: DateTime<Utc>, meter: &MeterReading) {
        let point = Point::SwitchBot(meter.device_id);
        let climate = Measurement::new(Bucket::Climate, point, at)
            .field("temperature", meter.temperature_celsius.into())
            .field("relative_humidity", meter.humidity_percent.into());
        let gas = Measurement::new(Bucket::Gas, point, at)
            .optional_field("co2", meter.co2_ppm.map(f64::from));
        let light = Measurement::new(Bucket::Light, point, at)
            .optional_field("light_level", meter.light_level.map(f64::from));
        self.write(vec![climate, gas, light]).await;
    }

    // ---------------------------------------------------------------------
    // Reads
    // ---------------------------------------------------------------------

    pub async fn read_pm(&self, index: u8) -> Option<Measurement> {
        self.read(Bucket::Dust, Point::Pm(index)).await
    }

    pub async fn read_aqi(&self) -> Option<Measurement> {
        self.read(Bucket::Dust, Point::Aqi).await
    }

    pub async fn read_sound_pressure_level(&self) -> Option<Measurement> {
        self.read(Bucket::Sound, Point::Sound).await
    }

    pub async fn read_ambient_data(&self) -> Option<Measurement> {
        let gas = self.read(Bucket::Gas, Point::Bme688).await;
        let climate = self.read(Bucket::Climate, Point::Bme688).await;
        Measurement::merge(gas, climate)
    }

    pub async fn read_temperature_relative_humidity(&self) -> Option<(f64, f64)> {
        let m = self.read(Bucket::Climate, Point::Bme688).await?;
        let [temperature, relative_humidity] = m.get_all(["temperature", "relative_humidity"])?;
        Some((temperature, relative_humidity))
    }

    pub async fn read_light_data(&self) -> Option<Measurement> {
        self.read(Bucket::Light, Point::Ltr390).await
    }

    pub async fn read_co2_data(&self) -> Option<Measurement> {
        let gas = self.read(Bucket::Gas, Point::Scd41).await;
        let climate = self.read(Bucket::Climate, Point::Scd41).await;
        Measurement::merge(gas, climate)
    }

    pub async fn read_bmp390l_data(&self) -> Option<Measurement> {
        self.read(Bucket::Climate, Point::Bmp390l).await
    }

    pub async fn read_sgp41_data(&self) -> Option<Measurement> {
        self.read(Bucket::Gas, Point::Sgp41).await
    }

    pub async fn read_radon_data(&self) -> Option<Measurement> {
        let radon = self.read(Bucket::Gas, Point::AirthingsRadon).await;
        let climate = self.read(Bucket::Climate, Point::AirthingsRadon).await;
        Measurement::merge(radon, climate)
    }

    pub async fn read_co_data(&self) -> Option<Measurement> {
        self.read(Bucket::Gas, Point::Ze07Co).await
    }

    pub async fn read_zmod4510_data(&self) -> Option<Measurement> {
        self.read(Bucket::Gas, Point::Zmod4510).await
    }

    /// Climate, CO2 and light halves of one SwitchBot meter, merged.
    pub async fn read_switchbot_data(&self, device_id: macaddr::MacAddr6) -> Option<Measurement> {
        let point = Point::SwitchBot(device_id);
        let climate = self.read(Bucket::Climate, point).await;
        let gas = self.read(Bucket::Gas, point).await;
        let light = self.read(Bucket::Light, point).await;
        Measurement::merge(Measurement::merge(light, gas), climate)
    }
}

#[cfg(test)]
mod tests {
    use anyhow::{Result, bail};
    use async_trait::async_trait;

    use super::*;
    use crate::storage::MemoryStorage;

    struct FailingStorage;

    #[async_trait]
    impl Storage for FailingStorage {
        async fn insert(&self, _measurements: &[Measurement]) -> Result<()> {
            bail!("connection refused")
        }

        async fn latest(
            &self,
            _bucket: Bucket,
            _point: &str,
            _since: DateTime<Utc>,
        ) -> Result<Option<Measurement>> {
            bail!("connection refused")
        }
    }

    #[tokio::test]
    async fn ambient_data_is_split_and_merged() {
        let gateway = Gateway::new(MemoryStorage::new());
        let now = Utc::now();

        gateway
            .write_ambient_data(now, 21.5, 150_000.0, 45.0, 1013.0, 42.0)
            .await;

        assert_eq!(gateway.storage().len(Bucket::Gas, "bme688"), 1);
        assert_eq!(gateway.storage().len(Bucket::Climate, "bme688"), 1);

        let m = gateway.read_ambient_data().await.unwrap();
        assert_eq!(
            m.get_all(["temperature", "relative_humidity", "pressure", "gas_resistance", "iaq"]),
            Some([21.5, 45.0, 1013.0, 150_000.0, 42.0])
        );
        assert_eq!(
            gateway.read_temperature_relative_humidity().await,
            Some((21.5, 45.0))
        );
    }

    #[tokio::test]
    async fn latest_sample_wins() {
        let gateway = Gateway::new(MemoryStorage::new());
        let now = Utc::now();

        gateway.write_aqi(now - TimeDelta::seconds(30), 40.0).await;
        gateway.write_aqi(now, 55.0).await;
        gateway.write_aqi(now - TimeDelta::seconds(10), 48.0).await;

        assert_eq!(gateway.read_aqi().await.unwrap().get("pm25_cf1_aqi"), Some(55.0));
    }

    #[tokio::test]
    async fn stale_samples_read_as_absent() {
        let gateway = Gateway::new(MemoryStorage::new());

        gateway
            .write_light_data(Utc::now() - TimeDelta::minutes(11), 80.0, 0.1)
            .await;

        assert!(gateway.read_light_data().await.is_none());
    }

    #[tokio::test]
    async fn radon_halves_are_written_only_with_values() {
        let gateway = Gateway::new(MemoryStorage::new());

        gateway
            .write_radon_data(Utc::now(), Some(48.0), None, Some(60.0), None, None)
            .await;

        assert_eq!(gateway.storage().len(Bucket::Gas, "airthings_radon"), 1);
        assert_eq!(gateway.storage().len(Bucket::Climate, "airthings_radon"), 0);

        let m = gateway.read_radon_data().await.unwrap();
        assert_eq!(m.get("radon_1day_avg"), Some(48.0));
        assert_eq!(m.get("radon_week_avg"), None);
    }

    #[tokio::test]
    async fn reading_dispatches_to_matching_stream() {
        let gateway = Gateway::new(MemoryStorage::new());
        let now = Utc::now();

        gateway
            .write_reading(
                now,
                &Reading::Sgp41 {
                    voc_index: 100.0,
                    nox_index: 1.0,
                },
            )
            .await;
        gateway
            .write_reading(
                now,
                &Reading::Pm {
                    index: 1,
                    sample: PmSample {
                        pm25_cf1: 12,
                        ..PmSample::default()
                    },
                },
            )
            .await;

        assert_eq!(
            gateway.read_sgp41_data().await.unwrap().get("voc_index"),
            Some(100.0)
        );
        assert_eq!(gateway.read_pm(1).await.unwrap().get("pm25_cf1"), Some(12.0));
        assert!(gateway.read_pm(0).await.is_none());

        gateway.write_bmp390l_data(now, 20.0, 1009.5, 312.0).await;
        assert_eq!(
            gateway.read_bmp390l_data().await.unwrap().get("altitude"),
            Some(312.0)
        );
    }

    #[tokio::test]
    async fn switchbot_meter_without_co2_writes_climate_only() {
        let gateway = Gateway::new(MemoryStorage::new());
        let device_id: macaddr::MacAddr6 = "AA:BB:CC:DD:EE:01".parse().unwrap();

        gateway
            .write_reading(
                Utc::now(),
                &Reading::SwitchBot(MeterReading {
                    device_id,
                    temperature_celsius: 22.5,
                    humidity_percent: 40,
                    co2_ppm: None,
                    light_level: None,
                }),
            )
            .await;

        let point = Point::SwitchBot(device_id).to_string();
        assert_eq!(gateway.storage().len(Bucket::Climate, &point), 1);
        assert_eq!(gateway.storage().len(Bucket::Gas, &point), 0);

        let m = gateway.read_switchbot_data(device_id).await.unwrap();
        assert_eq!(m.get("temperature"), Some(22.5));
        assert_eq!(m.get("co2"), None);
    }

    #[tokio::test]
    async fn backend_errors_degrade_to_no_data() {
        let gateway = Gateway::new(FailingStorage);

        // must not panic or propagate
        gateway.write_aqi(Utc::now(), 10.0).await;

        assert!(gateway.read_aqi().await.is_none());
        assert!(gateway.read_ambient_data().await.is_none());
    }
}
