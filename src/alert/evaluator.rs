use std::collections::VecDeque;

use chrono::{DateTime, Utc};
use indexmap::IndexMap;

use crate::alert::{AlertState, Notification, NotificationKind, Watchdog};
use crate::config::Config;
use crate::snapshot::Snapshot;
use crate::thresholds::Thresholds;

/// A service restart requested by the missing-data watchdog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Remediation {
    pub parameter: String,
    pub service: String,
}

/// Owns all alerting state of one notifier process.
#[derive(Debug)]
pub struct Evaluator {
    thresholds: Thresholds,
    services: IndexMap<String, String>,
    watched: Vec<String>,
    state: AlertState,
    watchdog: Watchdog,
    pending: VecDeque<Notification>,
}

impl Evaluator {
    /// Builds an evaluator from configuration and the state persisted by a
    /// previous run.
    pub fn new(config: &Config, state: AlertState) -> Self {
        Self {
            thresholds: config.thresholds.clone(),
            services: config.services.clone(),
            watched: config.watchdog.parameters.clone(),
            state,
            watchdog: Watchdog::new(config.watchdog.interval()),
            pending: VecDeque::new(),
        }
    }

    pub fn state(&self) -> &AlertState {
        &self.state
    }

    pub fn watchdog(&self) -> &Watchdog {
        &self.watchdog
    }

    /// Classifies `value` and queues a notification when it lands in a
    /// different interval than the last one seen for `parameter`.
    ///
    /// Parameters without a table, and values outside every interval, are
    /// ignored. Returns whether a notification was queued.
    pub fn check_thresholds_and_alert(
        &mut self,
        parameter: &str,
        value: f64,
        timestamp: DateTime<Utc>,
    ) -> bool {
        let Some(table) = self.thresholds.get(parameter) else {
            return false;
        };

        let Some(interval) = table.find(value) else {
            tracing::debug!(parameter, value, "Value outside every interval");
            return false;
        };

        if self.state.current_interval(parameter) == Some(interval.name.as_str()) {
            return false;
        }

        let message = format!(
            "{parameter}: {value} entered '{}' interval, {}",
            interval.name, interval.description
        );
        tracing::info!(
            parameter,
            value,
            interval = %interval.name,
            previous = ?self.state.current_interval(parameter),
            %timestamp,
            "Interval changed",
        );

        self.pending.push_back(Notification {
            kind: NotificationKind::Threshold,
            parameter: parameter.to_owned(),
            message,
            timestamp,
            interval: Some(interval.name.clone()),
        });
        self.state.set_current_interval(parameter, &interval.name);

        true
    }

    /// Queues a missing-data notification for `parameter` unless one was
    /// raised within the watchdog interval.
    ///
    /// When it fires and the parameter maps to a service, returns the restart
    /// to perform.
    pub fn send_missing_data_alert_if_due(
        &mut self,
        parameter: &str,
        now: DateTime<Utc>,
    ) -> Option<Remediation> {
        if !self.watchdog.try_fire(parameter, now) {
            return None;
        }

        tracing::warn!(parameter, %now, "No recent data");
        self.pending.push_back(Notification {
            kind: NotificationKind::MissingData,
            parameter: parameter.to_owned(),
            message: format!("No data received for '{parameter}'"),
            timestamp: now,
            interval: None,
        });

        match self.services.get(parameter) {
            Some(service) => Some(Remediation {
                parameter: parameter.to_owned(),
                service: service.clone(),
            }),
            None => {
                tracing::warn!(parameter, "No service mapped, skipping restart");
                None
            }
        }
    }

    /// Runs one evaluation pass over a snapshot and returns the restarts
    /// the watchdog asked for.
    pub fn process(&mut self, snapshot: &Snapshot, now: DateTime<Utc>) -> Vec<Remediation> {
        for o in &snapshot.observations {
            self.check_thresholds_and_alert(o.parameter, o.value, o.measured_at);
        }

        let mut remediations = Vec::new();
        for &parameter in &snapshot.missing {
            if !self.watched.iter().any(|w| w == parameter) {
                tracing::debug!(parameter, "Missing data for unwatched parameter");
                continue;
            }
            remediations.extend(self.send_missing_data_alert_if_due(parameter, now));
        }

        remediations
    }

    pub fn pending(&self) -> usize {
        self.pending.len()
    }

    /// Takes every queued notification, oldest first.
    pub fn drain_notifications(&mut self) -> Vec<Notification> {
        self.pending.drain(..).collect()
    }
}
