use air_quality::{
    alert::{AlertState, NotificationKind},
    config::Config,
    monitor::Monitor,
    storage::{Gateway, MemoryStorage},
};
use chrono::{TimeDelta, Utc};
use chrono_tz::Tz;

const CONFIG: &str = r#"
    [watchdog]
    interval_secs = 600
    parameters = ["ambient_data", "noise"]

    [services]
    noise = "noise-level.service"

    [thresholds.temperature]
    intervals = [
        { min = -50.0, max = 16.0, name = "cold", description = "Too cold" },
        { min = 16.0, max = 18.0, name = "normal", description = "Acceptable" },
        { min = 18.0, max = 60.0, name = "warm", description = "Warm" },
    ]
"#;

fn config() -> Config {
    Config::from_toml(CONFIG).unwrap()
}

#[tokio::test]
async fn cycle_alerts_on_transitions_and_persists_state() {
    let dir = tempfile::tempdir().unwrap();
    let state_path = dir.path().join("alert_state.json");
    let config = config();

    let gateway = Gateway::new(MemoryStorage::new());
    let now = Utc::now();
    gateway
        .write_ambient_data(now, 17.0, 90_000.0, 40.0, 1012.0, 30.0)
        .await;

    let mut monitor = Monitor::new(gateway, &config, state_path.clone(), Tz::UTC);

    let first = monitor.tick(now).await;
    let kinds: Vec<_> = first.notifications.iter().map(|n| n.kind).collect();
    assert_eq!(
        kinds,
        [NotificationKind::Threshold, NotificationKind::MissingData]
    );
    assert_eq!(first.notifications[0].interval.as_deref(), Some("normal"));
    assert_eq!(first.notifications[1].parameter, "noise");
    assert_eq!(first.remediations.len(), 1);
    assert_eq!(first.remediations[0].service, "noise-level.service");

    let saved = AlertState::load(&state_path).unwrap();
    assert_eq!(saved.current_interval("temperature"), Some("normal"));

    // same interval, noise still cooling down
    let second = monitor.tick(now + TimeDelta::seconds(3)).await;
    assert!(second.notifications.is_empty());
    assert!(second.remediations.is_empty());
}

#[tokio::test]
async fn restored_state_suppresses_repeat_alert_after_restart() {
    let dir = tempfile::tempdir().unwrap();
    let state_path = dir.path().join("alert_state.json");
    let config = config();
    let now = Utc::now();

    let mut state = AlertState::new();
    state.set_current_interval("temperature", "warm");
    state.save(&state_path).unwrap();

    let gateway = Gateway::new(MemoryStorage::new());
    gateway
        .write_ambient_data(now, 22.0, 90_000.0, 40.0, 1012.0, 30.0)
        .await;
    gateway.write_sound_pressure_level(now, 35.0).await;

    let mut monitor = Monitor::new(gateway, &config, state_path, Tz::UTC);
    let cycle = monitor.tick(now).await;

    assert!(cycle.notifications.is_empty());
    assert_eq!(
        monitor.evaluator().state().current_interval("temperature"),
        Some("warm")
    );
}

#[tokio::test]
async fn corrupt_state_file_starts_fresh() {
    let dir = tempfile::tempdir().unwrap();
    let state_path = dir.path().join("alert_state.json");
    std::fs::write(&state_path, "{not json").unwrap();

    let gateway = Gateway::new(MemoryStorage::new());
    let now = Utc::now();
    gateway
        .write_ambient_data(now, 10.0, 90_000.0, 40.0, 1012.0, 30.0)
        .await;
    gateway.write_sound_pressure_level(now, 35.0).await;

    let mut monitor = Monitor::new(gateway, &config(), state_path.clone(), Tz::UTC);
    let cycle = monitor.tick(now).await;

    assert_eq!(cycle.notifications.len(), 1);
    assert_eq!(cycle.notifications[0].interval.as_deref(), Some("cold"));
    assert_eq!(
        AlertState::load(&state_path)
            .unwrap()
            .current_interval("temperature"),
        Some("cold")
    );
}

#[tokio::test]
async fn missing_data_realerts_after_watchdog_interval() {
    let dir = tempfile::tempdir().unwrap();
    let gateway = Gateway::new(MemoryStorage::new());
    let mut monitor = Monitor::new(
        gateway,
        &config(),
        dir.path().join("alert_state.json"),
        Tz::UTC,
    );
    let start = Utc::now();

    let mut alerts = 0;
    for secs in (0..=601).step_by(3) {
        alerts += monitor
            .tick(start + TimeDelta::seconds(secs))
            .await
            .notifications
            .iter()
            .filter(|n| n.parameter == "noise")
            .count();
    }
    // last tick above is t=600, still inside the window
    assert_eq!(alerts, 1);

    let late = monitor.tick(start + TimeDelta::seconds(601)).await;
    assert_eq!(
        late.notifications
            .iter()
            .filter(|n| n.parameter == "noise")
            .count(),
        1
    );
}
