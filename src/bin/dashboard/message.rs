use air_quality::alert::Notification;
use serde::Serialize;
use serde_json::{Map, Value};

/// Frame pushed to every connected client.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", content = "payload", rename_all = "lowercase")]
pub enum DashboardMessage {
    Data(Map<String, Value>),
    Notification(Vec<Notification>),
}

impl DashboardMessage {
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

#[cfg(test)]
mod tests {
    use air_quality::alert::NotificationKind;
    use chrono::{TimeZone, Utc};
    use serde_json::json;

    use super::*;

    #[test]
    fn data_frame_shape() {
        let mut payload = Map::new();
        payload.insert("aqi".to_owned(), json!(42.0));
        let json = DashboardMessage::Data(payload).to_json().unwrap();
        let v: Value = serde_json::from_str(&json).unwrap();

        assert_eq!(v, json!({"type": "data", "payload": {"aqi": 42.0}}));
    }

    #[test]
    fn notification_frame_shape() {
        let n = Notification {
            kind: NotificationKind::MissingData,
            parameter: "noise".to_owned(),
            message: "No data received for 'noise'".to_owned(),
            timestamp: Utc.with_ymd_and_hms(2025, 3, 1, 12, 0, 0).unwrap(),
            interval: None,
        };
        let json = DashboardMessage::Notification(vec![n]).to_json().unwrap();
        let v: Value = serde_json::from_str(&json).unwrap();

        assert_eq!(v["type"], "notification");
        assert_eq!(v["payload"][0]["kind"], "missing_data");
        assert_eq!(v["payload"][0]["parameter"], "noise");
        assert!(v["payload"][0].get("interval").is_none());
    }
}
