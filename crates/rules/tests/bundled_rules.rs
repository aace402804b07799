//! The rule files shipped in `data/rules/` must load and validate cleanly.

use std::path::PathBuf;

use roadrisk_core::config::DEFAULT_WINDOW_SIZE;
use roadrisk_core::RiskLevel;
use roadrisk_rules::{validate_rule_set, Condition, LoadStatus, RuleDefinition, RuleLoader};

/// Integration tests run from the crate directory, so go up two levels.
fn rules_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../../data/rules")
}

fn load() -> Vec<RuleDefinition> {
    let report = RuleLoader::new(rules_dir()).load_all().unwrap();
    for result in &report.results {
        assert!(
            matches!(result.status, LoadStatus::Loaded { .. }),
            "{} did not load: {:?}",
            result.path.display(),
            result.status
        );
    }
    report.rules
}

fn rule<'a>(rules: &'a [RuleDefinition], id: &str) -> &'a RuleDefinition {
    rules
        .iter()
        .find(|r| r.name() == id)
        .unwrap_or_else(|| panic!("bundled rule '{id}' missing"))
}

#[test]
fn all_bundled_rules_load_in_file_order() {
    let rules = load();
    let ids: Vec<&str> = rules.iter().map(|r| r.name()).collect();
    assert_eq!(
        ids,
        vec![
            "autobahn",
            "cruise_control_activated",
            "esc_activated",
            "harsh_acceleration",
            "harsh_braking",
            "harsh_cornering",
            "massive_speeding",
            "no_seatbelt",
            "performance_mode_activated",
            "speeding",
            "tcs_activated",
            "traffic_jam",
        ]
    );
}

#[test]
fn bundled_rules_validate_without_issues() {
    let rules = load();
    let result = validate_rule_set(&rules, DEFAULT_WINDOW_SIZE);
    assert!(result.valid, "errors: {:?}", result.errors);
    assert!(result.warnings.is_empty(), "warnings: {:?}", result.warnings);
}

#[test]
fn small_window_flags_long_conditions() {
    let rules = load();
    let result = validate_rule_set(&rules, 10);
    assert!(result.valid);
    let flagged: Vec<&str> = result.warnings.iter().map(|w| w.path.as_str()).collect();
    assert_eq!(flagged, vec!["autobahn.condition", "traffic_jam.condition"]);
}

#[test]
fn seatbelt_rule_reads_speed_too() {
    let rules = load();
    let seatbelt = rule(&rules, "no_seatbelt");
    assert_eq!(seatbelt.risk_level, RiskLevel::High);
    assert_eq!(
        seatbelt.relevant_signals(),
        vec!["Vehicle_Cabin_Seat_Row1_DriverSide_IsBelted", "Vehicle_Speed"]
    );
    assert!(matches!(seatbelt.condition, Condition::All { .. }));
    assert_eq!(seatbelt.cooldown_ms().unwrap(), 60_000.0);
}

#[test]
fn harsh_braking_captures_speed() {
    let rules = load();
    let braking = rule(&rules, "harsh_braking");
    assert_eq!(braking.relevant_signals(), vec!["Vehicle_Acceleration_Longitudinal"]);
    assert_eq!(braking.captured_signals().collect::<Vec<_>>(), vec!["Vehicle_Speed"]);
    assert_eq!(braking.cooldown_ms().unwrap(), 3_000.0);
}
