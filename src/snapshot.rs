//! One pass over the latest stored samples.
//!
//! [`collect`] reads every monitored stream once and produces the dashboard
//! payload, the per-parameter observations the alert evaluator classifies,
//! and the parameter groups that had no usable sample. A sample that lacks
//! one of its group's expected fields counts as missing, exactly like an
//! absent or stale one.

use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use serde_json::{Map, Value, json};

use crate::measurement::Measurement;
use crate::storage::{Gateway, Storage};
use crate::switchbot::Device;

/// Number of particulate sensors shown on the dashboard.
pub const PM_SENSORS: u8 = 2;

const DISPLAY_FORMAT: &str = "%d/%m/%Y, %H:%M:%S";

/// Formats a timestamp for display in the given timezone.
pub fn format_timestamp(at: DateTime<Utc>, timezone: Tz) -> String {
    at.with_timezone(&timezone).format(DISPLAY_FORMAT).to_string()
}

#[derive(Debug, Clone, PartialEq)]
pub struct Observation {
    pub parameter: &'static str,
    pub value: f64,
    pub measured_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Snapshot {
    /// Flat JSON object pushed to dashboard clients.
    pub payload: Map<String, Value>,

    pub observations: Vec<Observation>,

    /// Parameter groups without a usable sample, in read order.
    pub missing: Vec<&'static str>,
}

impl Snapshot {
    fn set(&mut self, key: &str, value: f64) {
        self.payload.insert(key.to_owned(), json!(value));
    }

    fn observe(&mut self, parameter: &'static str, value: f64, measured_at: DateTime<Utc>) {
        self.observations.push(Observation {
            parameter,
            value,
            measured_at,
        });
    }

    /// Time of the newest sample that made it into the snapshot.
    pub fn latest_measured_at(&self) -> Option<DateTime<Utc>> {
        self.observations.iter().map(|o| o.measured_at).max()
    }
}

fn values<const N: usize>(
    m: Option<&Measurement>,
    names: [&str; N],
) -> Option<(DateTime<Utc>, [f64; N])> {
    let m = m?;
    Some((m.measured_at, m.get_all(names)?))
}

pub async fn collect<S: Storage>(gateway: &Gateway<S>, timezone: Tz, devices: &[Device]) -> Snapshot {
    let mut s = Snapshot::default();

    let aqi = gateway.read_aqi().await;
    match values(aqi.as_ref(), ["pm25_cf1_aqi"]) {
        Some((at, [aqi])) => {
            s.set("aqi", aqi);
            s.observe("aqi", aqi, at);
        }
        None => s.missing.push("aqi"),
    }

    for i in 0..PM_SENSORS {
        let pm = gateway.read_pm(i).await;
        let Some((_, v)) = values(
            pm.as_ref(),
            [
                "pm10_cf1", "pm25_cf1", "pm100_cf1", "gr03um", "gr05um", "gr10um", "gr25um",
                "gr50um", "gr100um",
            ],
        ) else {
            continue;
        };
        let keys = [
            "pm10", "pm25", "pm100", "pm03plus", "pm05plus", "pm10plus", "pm25plus", "pm50plus",
            "pm100plus",
        ];
        for (key, value) in keys.iter().zip(v) {
            s.set(&format!("{key}_{i}"), value);
        }
    }

    let sound = gateway.read_sound_pressure_level().await;
    match values(sound.as_ref(), ["sound_pressure_level"]) {
        Some((at, [noise])) => {
            s.set("noise", noise);
            s.observe("noise", noise, at);
        }
        None => s.missing.push("noise"),
    }

    let ambient = gateway.read_ambient_data().await;
    match values(
        ambient.as_ref(),
        ["temperature", "relative_humidity", "pressure", "gas_resistance"],
    ) {
        Some((at, [temperature, relative_humidity, pressure, gas])) => {
            s.set("temperature", temperature);
            s.set("relative_humidity", relative_humidity);
            s.set("pressure", pressure);
            s.set("gas", gas);
            s.observe("temperature", temperature, at);
            s.observe("relative_humidity", relative_humidity, at);
            s.observe("gas", gas, at);

            if let Some(iaq) = ambient.as_ref().and_then(|m| m.get("iaq")) {
                s.set("iaq", iaq);
                s.observe("iaq_index", iaq, at);
            }
        }
        None => s.missing.push("ambient_data"),
    }

    let light = gateway.read_light_data().await;
    match values(light.as_ref(), ["visible_light_lux", "uv_index"]) {
        Some((at, [lux, uv_index])) => {
            s.set("visible_light_lux", lux);
            s.set("uv_index", uv_index);
            s.observe("visible_light", lux, at);
        }
        None => s.missing.push("visible_light"),
    }

    let co2 = gateway.read_co2_data().await;
    match values(co2.as_ref(), ["co2"]) {
        Some((at, [co2])) => {
            s.set("co2", co2);
            s.observe("co2", co2, at);
        }
        None => s.missing.push("co2"),
    }

    let sgp41 = gateway.read_sgp41_data().await;
    match values(sgp41.as_ref(), ["voc_index", "nox_index"]) {
        Some((at, [voc, nox])) => {
            s.set("voc_index", voc);
            s.set("nox_index", nox);
            s.observe("voc_index", voc, at);
            s.observe("nox_index", nox, at);
        }
        None => s.missing.push("voc_nox"),
    }

    let co = gateway.read_co_data().await;
    match values(co.as_ref(), ["co_ppm"]) {
        Some((at, [co])) => {
            s.set("co", co);
            s.observe("co", co, at);
        }
        None => s.missing.push("co"),
    }

    let zmod = gateway.read_zmod4510_data().await;
    match values(zmod.as_ref(), ["o3_ppb", "no2_ppb"]) {
        Some((at, [o3, no2])) => {
            s.set("o3", o3);
            s.set("no2", no2);
            s.observe("o3", o3, at);
            s.observe("no2", no2, at);
        }
        None => s.missing.push("o3_no2"),
    }

    let radon = gateway.read_radon_data().await;
    match values(radon.as_ref(), ["radon_1day_avg"]) {
        Some((at, [day])) => {
            s.set("radon_1day_avg", day);
            s.observe("radon", day, at);
            for key in ["radon_week_avg", "radon_year_avg"] {
                if let Some(v) = radon.as_ref().and_then(|m| m.get(key)) {
                    s.set(key, v);
                }
            }
        }
        None => s.missing.push("radon"),
    }

    if !devices.is_empty() {
        let mut meters = Vec::with_capacity(devices.len());
        for device in devices {
            let m = gateway.read_switchbot_data(device.id).await;
            let Some((_, [temperature, relative_humidity])) =
                values(m.as_ref(), ["temperature", "relative_humidity"])
            else {
                continue;
            };
            let mut meter = json!({
                "id": device.id.to_string(),
                "name": device.name,
                "temperature": temperature,
                "relative_humidity": relative_humidity,
            });
            for key in ["co2", "light_level"] {
                if let Some(v) = m.as_ref().and_then(|m| m.get(key)) {
                    meter[key] = json!(v);
                }
            }
            meters.push(meter);
        }
        s.payload.insert("switchbot".to_owned(), Value::Array(meters));
    }

    if let Some(at) = s.latest_measured_at() {
        s.payload
            .insert("timestamp".to_owned(), json!(format_timestamp(at, timezone)));
    }

    s
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;
    use chrono_tz::Europe::Paris;

    use super::*;

    #[test]
    fn formats_in_display_timezone() {
        let at = Utc.with_ymd_and_hms(2025, 7, 14, 20, 5, 9).unwrap();
        assert_eq!(format_timestamp(at, Paris), "14/07/2025, 22:05:09");
        assert_eq!(format_timestamp(at, Tz::UTC), "14/07/2025, 20:05:09");
    }
}
