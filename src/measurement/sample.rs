use chrono::{DateTime, Utc};
use indexmap::IndexMap;

use crate::measurement::{Bucket, Point};

/// A stored sample: the fields one sensor reported at one instant.
#[derive(Debug, Clone, PartialEq)]
pub struct Measurement {
    pub bucket: Bucket,

    pub point: String,

    pub measured_at: DateTime<Utc>,

    pub fields: IndexMap<String, f64>,
}

impl Measurement {
    pub fn new(bucket: Bucket, point: Point, measured_at: DateTime<Utc>) -> Self {
        Self {
            bucket,
            point: point.to_string(),
            measured_at,
            fields: IndexMap::new(),
        }
    }

    /// Adds a field. Non-finite values are dropped since the store cannot
    /// represent them.
    pub fn field(mut self, name: &str, value: f64) -> Self {
        if value.is_finite() {
            self.fields.insert(name.to_owned(), value);
        }
        self
    }

    pub fn optional_field(self, name: &str, value: Option<f64>) -> Self {
        match value {
            Some(v) => self.field(name, v),
            None => self,
        }
    }

    pub fn get(&self, name: &str) -> Option<f64> {
        self.fields.get(name).copied()
    }

    /// Returns every named field, or `None` if any of them is absent.
    pub fn get_all<const N: usize>(&self, names: [&str; N]) -> Option<[f64; N]> {
        let mut values = [0f64; N];
        for (value, name) in values.iter_mut().zip(names) {
            *value = self.get(name)?;
        }
        Some(values)
    }

    /// Combines two halves of one sensor's sample that live in different
    /// buckets. Fields of `right` win, and so does its timestamp.
    pub fn merge(left: Option<Self>, right: Option<Self>) -> Option<Self> {
        match (left, right) {
            (None, None) => None,
            (Some(l), None) => Some(l),
            (None, Some(r)) => Some(r),
            (Some(mut l), Some(r)) => {
                l.measured_at = r.measured_at;
                l.fields.extend(r.fields);
                Some(l)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    fn at(sec: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 1, 12, 0, sec).unwrap()
    }

    #[test]
    fn non_finite_fields_are_dropped() {
        let m = Measurement::new(Bucket::Gas, Point::Bme688, at(0))
            .field("iaq", f64::NAN)
            .field("gas_resistance", 120.0)
            .optional_field("missing", None);

        assert_eq!(m.get("iaq"), None);
        assert_eq!(m.get("gas_resistance"), Some(120.0));
        assert_eq!(m.fields.len(), 1);
    }

    #[test]
    fn get_all_requires_every_field() {
        let m = Measurement::new(Bucket::Light, Point::Ltr390, at(0))
            .field("visible_light_lux", 80.0)
            .field("uv_index", 0.5);

        assert_eq!(
            m.get_all(["visible_light_lux", "uv_index"]),
            Some([80.0, 0.5])
        );
        assert_eq!(m.get_all(["visible_light_lux", "lux"]), None);
    }

    #[test]
    fn merge_prefers_right_half() {
        let gas = Measurement::new(Bucket::Gas, Point::Bme688, at(1))
            .field("gas_resistance", 100.0)
            .field("temperature", 1.0);
        let climate = Measurement::new(Bucket::Climate, Point::Bme688, at(2))
            .field("temperature", 21.5);

        let merged = Measurement::merge(Some(gas.clone()), Some(climate)).unwrap();
        assert_eq!(merged.measured_at, at(2));
        assert_eq!(merged.get("temperature"), Some(21.5));
        assert_eq!(merged.get("gas_resistance"), Some(100.0));

        assert_eq!(Measurement::merge(Some(gas.clone()), None), Some(gas));
        assert_eq!(Measurement::merge(None, None), None);
    }
}
