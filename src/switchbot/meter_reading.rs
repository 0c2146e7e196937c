use macaddr::MacAddr6;

/// Values decoded from one SwitchBot meter advertisement.
#[derive(Debug, Clone, PartialEq)]
pub struct MeterReading {
    pub device_id: MacAddr6,

    pub temperature_celsius: f32,

    pub humidity_percent: u8,

    pub co2_ppm: Option<u16>,

    pub light_level: Option<u8>,
}
