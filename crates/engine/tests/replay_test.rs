//! Replays the bundled recording through the bundled rule set.

use std::io::BufRead;
use std::path::PathBuf;
use std::sync::Arc;

use roadrisk_core::{EngineConfig, RiskEvent};
use roadrisk_engine::{
    run_session, CollectingSink, CsvReplay, Detector, FanOutSink, JsonLinesSink, RuleSet,
};
use roadrisk_rules::RuleLoader;

fn data_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../../data")
}

fn bundled_rules() -> Arc<RuleSet> {
    let report = RuleLoader::new(data_dir().join("rules")).load_all().unwrap();
    assert_eq!(report.failures().count(), 0);
    Arc::new(RuleSet::from_definitions(report.rules).unwrap())
}

fn recording() -> CsvReplay<std::fs::File> {
    CsvReplay::open(data_dir().join("recordings/sample.csv")).unwrap()
}

#[tokio::test]
async fn sample_drive_produces_expected_events() {
    let mut detector =
        Detector::new(bundled_rules(), &EngineConfig::default(), CollectingSink::new()).unwrap();
    let mut source = recording();

    let stats = run_session(&mut detector, &mut source, None).await;
    assert_eq!(stats.updates, 17);
    assert_eq!(stats.ignored, 0);
    assert_eq!(stats.sessions_ended, 1);

    let events = detector.sink().events();
    let fired: Vec<(&str, f64)> = events.iter().map(|e| (e.name.as_str(), e.timestamp)).collect();
    assert_eq!(
        fired,
        vec![
            ("harsh_acceleration", 2000.0),
            ("speeding", 3000.0),
            ("harsh_braking", 6000.0),
            ("no_seatbelt", 8000.0),
            ("tcs_activated", 9500.0),
        ]
    );
    assert!(events.iter().all(RiskEvent::is_start));

    // Captured speed is the latest sample at the time of firing.
    assert_eq!(events[1].event_data["Vehicle_Speed"], serde_json::json!(135.0));
    assert_eq!(events[2].event_data["Vehicle_Speed"], serde_json::json!(120.0));

    assert_eq!(detector.debounce().active_rules().count(), 0);
}

#[tokio::test]
async fn events_are_written_as_json_lines() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("events.jsonl");
    let sink = FanOutSink::new(CollectingSink::new(), JsonLinesSink::create(&path).unwrap());
    let mut detector = Detector::new(bundled_rules(), &EngineConfig::default(), sink).unwrap();

    run_session(&mut detector, &mut recording(), None).await;
    let collected = detector.sink().first.events().to_vec();
    drop(detector);

    let file = std::io::BufReader::new(std::fs::File::open(&path).unwrap());
    let written: Vec<RiskEvent> = file
        .lines()
        .map(|line| serde_json::from_str(&line.unwrap()).unwrap())
        .collect();
    assert_eq!(written, collected);
    assert_eq!(written.len(), 5);
}
