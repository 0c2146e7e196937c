//! US EPA air quality index for PM2.5.

/// (concentration low, concentration high, index low, index high)
const PM25_BREAKPOINTS: [(f64, f64, f64, f64); 7] = [
    (0.0, 12.0, 0.0, 50.0),
    (12.1, 35.4, 51.0, 100.0),
    (35.5, 55.4, 101.0, 150.0),
    (55.5, 150.4, 151.0, 200.0),
    (150.5, 250.4, 201.0, 300.0),
    (250.5, 350.4, 301.0, 400.0),
    (350.5, 500.4, 401.0, 500.0),
];

const MAX_AQI: u16 = 500;

/// Converts a 24h-style PM2.5 concentration (µg/m³) to an AQI value.
///
/// The concentration is truncated to one decimal before lookup, as the EPA
/// procedure prescribes. Concentrations beyond the last breakpoint are
/// reported as 500. Returns `None` for negative or non-finite input.
pub fn pm25_aqi(concentration: f64) -> Option<u16> {
    if !concentration.is_finite() || concentration < 0.0 {
        return None;
    }

    let c = (concentration * 10.0).trunc() / 10.0;

    for (c_lo, c_hi, i_lo, i_hi) in PM25_BREAKPOINTS {
        if c <= c_hi {
            let c = c.max(c_lo);
            let aqi = (i_hi - i_lo) / (c_hi - c_lo) * (c - c_lo) + i_lo;
            return Some(aqi.round() as u16);
        }
    }

    Some(MAX_AQI)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn breakpoint_edges() {
        assert_eq!(pm25_aqi(0.0), Some(0));
        assert_eq!(pm25_aqi(12.0), Some(50));
        assert_eq!(pm25_aqi(12.1), Some(51));
        assert_eq!(pm25_aqi(35.4), Some(100));
        assert_eq!(pm25_aqi(35.5), Some(101));
        assert_eq!(pm25_aqi(500.4), Some(500));
    }

    #[test]
    fn interpolates_within_segment() {
        assert_eq!(pm25_aqi(10.0), Some(42));
        assert_eq!(pm25_aqi(35.0), Some(99));
        assert_eq!(pm25_aqi(100.0), Some(174));
    }

    #[test]
    fn truncates_to_one_decimal() {
        // 12.05 truncates to 12.0, still "good"
        assert_eq!(pm25_aqi(12.05), Some(50));
    }

    #[test]
    fn out_of_range_input() {
        assert_eq!(pm25_aqi(900.0), Some(500));
        assert_eq!(pm25_aqi(-1.0), None);
        assert_eq!(pm25_aqi(f64::NAN), None);
    }
}
