use std::collections::HashMap;

use air_quality::switchbot::{DeviceType, MeterReading};
use anyhow::{Context as _, Result, anyhow, bail};
use macaddr::MacAddr6;
use uuid::{Uuid, uuid};

// Ref: https://github.com/OpenWonderLabs/SwitchBotAPI-BLE/blob/2bd727ecf7c0898b25ac2df58a4886b5930c9138/README.md?plain=1#L44
const SWITCHBOT_MANUFACTURER_DATA_COMPANY_ID: u16 = 0x0969;

// Ref: https://github.com/OpenWonderLabs/SwitchBotAPI-BLE/blob/2bd727ecf7c0898b25ac2df58a4886b5930c9138/README.md?plain=1#L45
pub const SWITCHBOT_SERVICE_DATA_UUID: Uuid = uuid!("0000fd3d-0000-1000-8000-00805f9b34fb");

/// Decodes one advertisement. Returns the device type found in the service
/// data alongside the reading.
pub fn decode_switchbot_ble_data(
    device_id: MacAddr6,
    manufacturer_data: &HashMap<u16, Vec<u8>>,
    service_data: &HashMap<Uuid, Vec<u8>>,
) -> Result<(DeviceType, MeterReading)> {
    let switchbot_service_data = get_switchbot_service_data(service_data)
        .context("failed to get SwitchBot service data")?;

    let device_type = detect_device_type(switchbot_service_data)
        .context("failed to detect SwitchBot device type")?;

    let switchbot_manufacturer_data = get_switchbot_manufacturer_data(manufacturer_data)
        .context("failed to get SwitchBot manufacturer data")?;

    let reading = decode_manufacturer_data(device_id, device_type, switchbot_manufacturer_data)
        .with_context(|| {
            format!(
                "failed to decode {} manufacturer data",
                device_type.as_str()
            )
        })?;

    Ok((device_type, reading))
}

pub fn decode_manufacturer_data(
    device_id: MacAddr6,
    device_type: DeviceType,
    manufacturer_data: &[u8],
) -> Result<MeterReading> {
    match device_type {
        DeviceType::Hub2 => decode_hub2_manufacturer_data(device_id, manufacturer_data),
        DeviceType::MeterPlus | DeviceType::WoIOSensor => {
            decode_meter_plus_manufacturer_data(device_id, manufacturer_data)
        }
        DeviceType::MeterProCO2 => decode_meter_pro_co2_manufacturer_data(device_id, manufacturer_data),
        DeviceType::Meter => bail!("Meter (WoSensorTH) advertisements are not supported"),
    }
}

fn ensure_len(manufacturer_data: &[u8], expected: usize) -> Result<()> {
    if manufacturer_data.len() < expected {
        bail!(
            "manufacturer data too short: expected at least {expected} bytes, got {}",
            manufacturer_data.len()
        )
    }
    Ok(())
}

fn decode_hub2_manufacturer_data(device_id: MacAddr6, d: &[u8]) -> Result<MeterReading> {
    ensure_len(d, 16)?;

    Ok(MeterReading {
        device_id,
        temperature_celsius: decode_temperature([d[13], d[14]]),
        humidity_percent: decode_humidity(d[15]).context("failed to decode humidity")?,
        co2_ppm: None,
        light_level: Some(decode_light_level(d[12]).context("failed to decode light level")?),
    })
}

fn decode_meter_plus_manufacturer_data(device_id: MacAddr6, d: &[u8]) -> Result<MeterReading> {
    ensure_len(d, 11)?;

    Ok(MeterReading {
        device_id,
        temperature_celsius: decode_temperature([d[8], d[9]]),
        humidity_percent: decode_humidity(d[10]).context("failed to decode humidity")?,
        co2_ppm: None,
        light_level: None,
    })
}

fn decode_meter_pro_co2_manufacturer_data(device_id: MacAddr6, d: &[u8]) -> Result<MeterReading> {
    ensure_len(d, 15)?;

    Ok(MeterReading {
        device_id,
        temperature_celsius: decode_temperature([d[8], d[9]]),
        humidity_percent: decode_humidity(d[10]).context("failed to decode humidity")?,
        co2_ppm: Some(u16::from_be_bytes([d[13], d[14]])),
        light_level: None,
    })
}

fn get_switchbot_manufacturer_data(manufacturer_data: &HashMap<u16, Vec<u8>>) -> Result<&[u8]> {
    manufacturer_data
        .get(&SWITCHBOT_MANUFACTURER_DATA_COMPANY_ID)
        .map(Vec::as_slice)
        .ok_or_else(|| {
            anyhow!(
                "SwitchBot manufacturer data not found: 0x{SWITCHBOT_MANUFACTURER_DATA_COMPANY_ID:04x}"
            )
        })
}

fn get_switchbot_service_data(service_data: &HashMap<Uuid, Vec<u8>>) -> Result<&[u8]> {
    service_data
        .get(&SWITCHBOT_SERVICE_DATA_UUID)
        .map(Vec::as_slice)
        .ok_or_else(|| anyhow!("SwitchBot service data not found: {SWITCHBOT_SERVICE_DATA_UUID}"))
}

fn detect_device_type(service_data: &[u8]) -> Result<DeviceType> {
    let Some(&device_type_raw) = service_data.first() else {
        bail!("SwitchBot service data is empty");
    };

    DeviceType::from_service_data_byte(device_type_raw & 0x7f)
}

/// Low nibble of the first byte is tenths of a degree; the second byte
/// carries the integral part and a sign bit set for positive values.
fn decode_temperature(v: [u8; 2]) -> f32 {
    let fractional_part = (v[0] & 0x0f) as i16;
    let integral_part = (v[1] & 0x7f) as i16;

    let sign = if v[1] & 0x80 != 0 { 1i16 } else { -1i16 };

    (sign * (integral_part * 10 + fractional_part)) as f32 / 10f32
}

fn decode_humidity(v: u8) -> Result<u8> {
    let humidity = v & 0x7f;
    if humidity > 100 {
        bail!("humidity out of range: expected 0-100, got {humidity}");
    }

    Ok(humidity)
}

fn decode_light_level(v: u8) -> Result<u8> {
    let light_level = v & 0x1f;
    if light_level > 20 {
        bail!("light level out of range: expected 0-20, got {light_level}");
    }

    Ok(light_level)
}
