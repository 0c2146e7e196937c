use std::str::FromStr;

use anyhow::{Error, bail};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceType {
    Hub2,
    Meter,
    MeterPlus,
    WoIOSensor,
    MeterProCO2,
}

impl DeviceType {
    pub fn as_str(&self) -> &'static str {
        match self {
            DeviceType::Hub2 => "Hub 2",
            DeviceType::Meter => "Meter",
            DeviceType::MeterPlus => "MeterPlus",
            DeviceType::WoIOSensor => "WoIOSensor",
            DeviceType::MeterProCO2 => "MeterPro(CO2)",
        }
    }

    /// Decodes the device type byte at the start of SwitchBot service data.
    pub fn from_service_data_byte(v: u8) -> Result<Self, Error> {
        match v {
            0x76 => Ok(DeviceType::Hub2),
            0x54 => Ok(DeviceType::Meter),
            0x69 => Ok(DeviceType::MeterPlus),
            0x77 => Ok(DeviceType::WoIOSensor),
            0x35 => Ok(DeviceType::MeterProCO2),
            _ => bail!("unknown SwitchBot device type: 0x{v:02x}"),
        }
    }
}

impl FromStr for DeviceType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Hub 2" => Ok(DeviceType::Hub2),
            "Meter" => Ok(DeviceType::Meter),
            "MeterPlus" => Ok(DeviceType::MeterPlus),
            "WoIOSensor" => Ok(DeviceType::WoIOSensor),
            "MeterPro(CO2)" => Ok(DeviceType::MeterProCO2),
            _ => bail!("unknown device type: {}", s),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_configured_names() {
        for t in [
            DeviceType::Hub2,
            DeviceType::Meter,
            DeviceType::MeterPlus,
            DeviceType::WoIOSensor,
            DeviceType::MeterProCO2,
        ] {
            assert_eq!(t.as_str().parse::<DeviceType>().unwrap(), t);
        }
        assert!("Hub 9".parse::<DeviceType>().is_err());
    }

    #[test]
    fn decodes_service_data_byte() {
        assert_eq!(
            DeviceType::from_service_data_byte(0x35).unwrap(),
            DeviceType::MeterProCO2
        );
        assert!(DeviceType::from_service_data_byte(0x00).is_err());
    }
}
