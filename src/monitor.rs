//! The notifier cycle shared by the `notifier` and `dashboard` binaries:
//! collect a snapshot, evaluate it, persist alert state, hand back what
//! happened.

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use chrono_tz::Tz;

use crate::alert::{AlertState, Evaluator, Notification, Remediation, remediation};
use crate::config::Config;
use crate::snapshot::{self, Snapshot};
use crate::storage::{Gateway, Storage};
use crate::switchbot::Device;

#[derive(Debug)]
pub struct Cycle {
    pub snapshot: Snapshot,
    pub notifications: Vec<Notification>,
    pub remediations: Vec<Remediation>,
}

pub struct Monitor<S> {
    gateway: Gateway<S>,
    evaluator: Evaluator,
    state_path: PathBuf,
    saved_state: AlertState,
    timezone: Tz,
    devices: Vec<Device>,
}

impl<S: Storage> Monitor<S> {
    /// Restores alert state from `state_path`, if present.
    pub fn new(gateway: Gateway<S>, config: &Config, state_path: PathBuf, timezone: Tz) -> Self {
        let state = AlertState::load_or_default(&state_path);
        tracing::info!(
            path = %state_path.display(),
            parameters = state.parameters().count(),
            "Loaded alert state",
        );

        Self {
            gateway,
            evaluator: Evaluator::new(config, state.clone()),
            state_path,
            saved_state: state,
            timezone,
            devices: config.devices.clone(),
        }
    }

    pub fn evaluator(&self) -> &Evaluator {
        &self.evaluator
    }

    pub async fn tick(&mut self, now: DateTime<Utc>) -> Cycle {
        let snapshot = snapshot::collect(&self.gateway, self.timezone, &self.devices).await;
        let remediations = self.evaluator.process(&snapshot, now);
        self.persist_state();

        Cycle {
            snapshot,
            notifications: self.evaluator.drain_notifications(),
            remediations,
        }
    }

    /// Writes the alert state file when it differs from what was last saved.
    /// A failed write is retried on the next cycle.
    fn persist_state(&mut self) {
        let state = self.evaluator.state();
        if *state == self.saved_state {
            return;
        }

        match state.save(&self.state_path) {
            Ok(()) => self.saved_state = state.clone(),
            Err(e) => tracing::error!(error = %format!("{e:#}"), "Failed to save alert state"),
        }
    }
}

/// Runs each restart on its own task so a slow systemctl never delays the
/// next cycle.
pub fn spawn_remediations(remediations: Vec<Remediation>) {
    for r in remediations {
        tokio::spawn(async move {
            remediation::remediate(&r).await;
        });
    }
}
