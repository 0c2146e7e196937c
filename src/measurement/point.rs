use std::fmt;

use macaddr::MacAddr6;

/// Name of a measurement stream, one per sensor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Point {
    /// Plantower PMSA003 particulate sensor, numbered from 0.
    Pm(u8),
    Aqi,
    Bme688,
    Scd41,
    Sound,
    Ltr390,
    Bmp390l,
    Sgp41,
    AirthingsRadon,
    Ze07Co,
    Zmod4510,
    SwitchBot(MacAddr6),
}

impl fmt::Display for Point {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Point::Pm(i) => write!(f, "pmsa003_{i}"),
            Point::Aqi => f.write_str("air_quality_index"),
            Point::Bme688 => f.write_str("bme688"),
            Point::Scd41 => f.write_str("scd41"),
            Point::Sound => f.write_str("sound"),
            Point::Ltr390 => f.write_str("ltr390"),
            Point::Bmp390l => f.write_str("bmp390l"),
            Point::Sgp41 => f.write_str("sgp41"),
            Point::AirthingsRadon => f.write_str("airthings_radon"),
            Point::Ze07Co => f.write_str("ze07co"),
            Point::Zmod4510 => f.write_str("zmod4510"),
            Point::SwitchBot(id) => {
                f.write_str("switchbot_")?;
                for b in id.as_bytes() {
                    write!(f, "{b:02x}")?;
                }
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn point_names() {
        assert_eq!(Point::Pm(1).to_string(), "pmsa003_1");
        assert_eq!(Point::Aqi.to_string(), "air_quality_index");
        assert_eq!(Point::AirthingsRadon.to_string(), "airthings_radon");

        let id: MacAddr6 = "AA:BB:CC:00:11:22".parse().unwrap();
        assert_eq!(Point::SwitchBot(id).to_string(), "switchbot_aabbcc001122");
    }
}
