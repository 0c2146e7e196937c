use crate::switchbot::MeterReading;

/// One frame of a Plantower PMSA003 particulate sensor.
///
/// `*_cf1` are concentrations at the factory calibration (CF=1), `*_std`
/// under atmospheric environment, both in µg/m³. `grNNum` are particle
/// counts per 0.1 L of air above the given diameter (0.3 µm .. 10 µm).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PmSample {
    pub pm10_cf1: u16,
    pub pm25_cf1: u16,
    pub pm100_cf1: u16,
    pub pm10_std: u16,
    pub pm25_std: u16,
    pub pm100_std: u16,
    pub gr03um: u16,
    pub gr05um: u16,
    pub gr10um: u16,
    pub gr25um: u16,
    pub gr50um: u16,
    pub gr100um: u16,
}

/// A typed value produced by a sensor reader.
#[derive(Debug, Clone, PartialEq)]
pub enum Reading {
    Pm {
        index: u8,
        sample: PmSample,
    },
    Aqi {
        pm25_cf1_aqi: f64,
    },
    SoundPressureLevel {
        spl: f64,
    },
    Ambient {
        temperature: f64,
        gas: f64,
        relative_humidity: f64,
        pressure: f64,
        iaq: f64,
    },
    Light {
        visible_light_lux: f64,
        uv_index: f64,
    },
    Co2 {
        co2: f64,
        temperature: f64,
        relative_humidity: f64,
    },
    Bmp390l {
        temperature: f64,
        pressure: f64,
        altitude: f64,
    },
    Sgp41 {
        voc_index: f64,
        nox_index: f64,
    },
    Radon {
        radon_1day_avg: Option<f64>,
        radon_week_avg: Option<f64>,
        radon_year_avg: Option<f64>,
        temperature: Option<f64>,
        relative_humidity: Option<f64>,
    },
    Co {
        co_ppm: f64,
    },
    Zmod4510 {
        o3_ppb: f64,
        no2_ppb: f64,
        fast_aqi: f64,
        epa_aqi: f64,
    },
    SwitchBot(MeterReading),
}
