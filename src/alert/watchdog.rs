use std::collections::HashMap;

use chrono::{DateTime, TimeDelta, Utc};

/// Remembers when each parameter last raised a missing-data alert.
///
/// Takes `now` from the caller instead of reading the clock so cool-down
/// behaviour is deterministic in tests.
#[derive(Debug, Clone)]
pub struct Watchdog {
    interval: TimeDelta,
    last_alert: HashMap<String, DateTime<Utc>>,
}

impl Watchdog {
    pub fn new(interval: TimeDelta) -> Self {
        Self {
            interval,
            last_alert: HashMap::new(),
        }
    }

    pub fn interval(&self) -> TimeDelta {
        self.interval
    }

    /// A parameter that never alerted is always due; otherwise strictly more
    /// than `interval` must have passed since its last alert.
    pub fn is_due(&self, parameter: &str, now: DateTime<Utc>) -> bool {
        match self.last_alert.get(parameter) {
            Some(&last) => now - last > self.interval,
            None => true,
        }
    }

    /// Records an alert at `now` if one is due. Returns whether it was.
    pub fn try_fire(&mut self, parameter: &str, now: DateTime<Utc>) -> bool {
        if !self.is_due(parameter, now) {
            return false;
        }
        self.last_alert.insert(parameter.to_owned(), now);
        true
    }

    pub fn last_alert(&self, parameter: &str) -> Option<DateTime<Utc>> {
        self.last_alert.get(parameter).copied()
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    fn fixed_now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 1, 10, 8, 0, 0).unwrap()
    }

    #[test]
    fn first_call_fires() {
        let mut watchdog = Watchdog::new(TimeDelta::minutes(10));
        assert!(watchdog.try_fire("noise", fixed_now()));
        assert_eq!(watchdog.last_alert("noise"), Some(fixed_now()));
    }

    #[test]
    fn does_not_refire_within_cool_down() {
        let mut watchdog = Watchdog::new(TimeDelta::minutes(10));
        let start = fixed_now();
        assert!(watchdog.try_fire("noise", start));

        // called every 3 s evaluation cycle for the whole window
        let mut t = start;
        while t < start + TimeDelta::minutes(10) {
            t += TimeDelta::seconds(3);
            if t - start <= TimeDelta::minutes(10) {
                assert!(!watchdog.try_fire("noise", t), "re-fired at {t}");
            }
        }
        assert_eq!(watchdog.last_alert("noise"), Some(start));
    }

    #[test]
    fn exactly_at_interval_is_not_due() {
        let mut watchdog = Watchdog::new(TimeDelta::minutes(10));
        let start = fixed_now();
        watchdog.try_fire("aqi", start);

        assert!(!watchdog.is_due("aqi", start + TimeDelta::minutes(10)));
        assert!(watchdog.is_due("aqi", start + TimeDelta::minutes(10) + TimeDelta::seconds(1)));
    }

    #[test]
    fn parameters_are_tracked_independently() {
        let mut watchdog = Watchdog::new(TimeDelta::minutes(10));
        let start = fixed_now();

        assert!(watchdog.try_fire("aqi", start));
        assert!(watchdog.try_fire("noise", start + TimeDelta::minutes(1)));
        assert!(!watchdog.try_fire("aqi", start + TimeDelta::minutes(2)));
    }
}
