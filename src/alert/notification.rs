use chrono::{DateTime, Utc};
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    /// The parameter's value moved into a different interval.
    Threshold,
    /// The parameter has not reported within the recency window.
    MissingData,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Notification {
    pub kind: NotificationKind,

    pub parameter: String,

    pub message: String,

    pub timestamp: DateTime<Utc>,

    /// Interval entered, for threshold notifications.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub interval: Option<String>,
}
