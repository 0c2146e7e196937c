//! Service restarts requested by the missing-data watchdog.
//!
//! Runs `systemctl restart <unit>` and reports the outcome. A failed or
//! timed-out restart is logged and returned, never raised.

use std::time::{Duration, Instant};

use tokio::process::Command;

use crate::alert::Remediation;

const RESTART_TIMEOUT: Duration = Duration::from_secs(60);

const MAX_SERVICE_NAME_LEN: usize = 128;

/// Unit names are passed to systemctl as a single argument; restrict them
/// to characters systemd itself allows.
fn is_safe_service_name(name: &str) -> bool {
    !name.is_empty()
        && !name.starts_with('-')
        && name.len() <= MAX_SERVICE_NAME_LEN
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.' | '@'))
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RestartOutcome {
    pub service: String,
    pub success: bool,
    /// `None` when systemctl could not be run or was killed on timeout.
    pub exit_code: Option<i32>,
    pub message: String,
    pub duration: Duration,
}

pub async fn restart_service(service: &str) -> RestartOutcome {
    restart_with(service, "systemctl", RESTART_TIMEOUT).await
}

/// Performs a watchdog remediation.
pub async fn remediate(remediation: &Remediation) -> RestartOutcome {
    tracing::info!(
        parameter = %remediation.parameter,
        service = %remediation.service,
        "Restarting service for missing data",
    );
    restart_service(&remediation.service).await
}

async fn restart_with(service: &str, program: &str, timeout: Duration) -> RestartOutcome {
    let start = Instant::now();

    if !is_safe_service_name(service) {
        tracing::error!(service, "Refusing to restart service with invalid name");
        return RestartOutcome {
            service: service.to_owned(),
            success: false,
            exit_code: None,
            message: "invalid service name".to_owned(),
            duration: start.elapsed(),
        };
    }

    let result = tokio::time::timeout(
        timeout,
        Command::new(program)
            .args(["restart", service])
            .kill_on_drop(true)
            .output(),
    )
    .await;

    let duration = start.elapsed();

    match result {
        Ok(Ok(output)) => {
            let success = output.status.success();
            let exit_code = output.status.code();
            let stderr = String::from_utf8_lossy(&output.stderr);
            let stdout = String::from_utf8_lossy(&output.stdout);

            let message = if success {
                format!("service '{service}' restarted")
            } else {
                format!(
                    "service '{service}' restart failed (exit {}): {}",
                    exit_code.unwrap_or(-1),
                    stderr.trim(),
                )
            };

            if success {
                tracing::info!(service, elapsed_ms = duration.as_millis() as u64, "Restart succeeded");
            } else {
                tracing::error!(
                    service,
                    exit_code = ?exit_code,
                    stdout = %stdout.trim(),
                    stderr = %stderr.trim(),
                    "Restart failed",
                );
            }

            RestartOutcome {
                service: service.to_owned(),
                success,
                exit_code,
                message,
                duration,
            }
        }
        Ok(Err(e)) => {
            tracing::error!(service, program, error = %e, "Failed to run restart command");
            RestartOutcome {
                service: service.to_owned(),
                success: false,
                exit_code: None,
                message: format!("failed to run {program}: {e}"),
                duration,
            }
        }
        Err(_) => {
            tracing::error!(service, timeout_secs = timeout.as_secs(), "Restart timed out");
            RestartOutcome {
                service: service.to_owned(),
                success: false,
                exit_code: None,
                message: format!(
                    "restart of '{service}' timed out after {}s",
                    timeout.as_secs()
                ),
                duration,
            }
        }
    }
}
