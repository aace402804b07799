//! YAML schema for risk rule definitions.
//!
//! One document per rule:
//!
//! ```yaml
//! apiVersion: v1
//! kind: RiskRule
//! metadata:
//!   id: speeding
//!   name: Speeding
//! risk_level: medium
//! relevant_signals: [Vehicle_Speed]
//! condition:
//!   type: threshold
//!   signal: Vehicle_Speed
//!   operator: gt
//!   value: 130
//! debounce:
//!   cooldown: 30s
//! event_data:
//!   Vehicle_Speed: null
//! ```

use indexmap::IndexMap;
use roadrisk_core::RiskLevel;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::conditions::Condition;
use crate::cooldown;
use crate::error::{Result, RuleError};

pub const API_VERSION: &str = "v1";
pub const RULE_KIND: &str = "RiskRule";

// ── Root rule document ──────────────────────────────────────────────

/// Top-level risk rule definition parsed from YAML.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct RuleDefinition {
    #[serde(rename = "apiVersion")]
    pub api_version: String,
    pub kind: String,
    pub metadata: RuleMetadata,
    pub risk_level: RiskLevel,
    /// Signals the rule reads. Defaults to the signals named in `condition`.
    #[serde(default)]
    pub relevant_signals: Vec<String>,
    pub condition: Condition,
    #[serde(default)]
    pub debounce: DebounceSpec,
    /// Extra fields copied onto every emitted event. A `null` value marks the
    /// key as a signal capture: it is tracked and filled with its latest value.
    #[serde(default)]
    pub event_data: IndexMap<String, Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct RuleMetadata {
    /// Unique rule name, also the name of emitted events.
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub tags: Option<Vec<String>>,
    #[serde(default = "default_true")]
    pub enabled: bool,
}

fn default_true() -> bool {
    true
}

/// Re-fire policy of a rule.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct DebounceSpec {
    /// Minimum time between firings, e.g. "30s". Absent means no cooldown.
    #[serde(default)]
    pub cooldown: Option<String>,
    /// Emit `start = false` events while an episode continues.
    #[serde(default)]
    pub emit_on_continue: bool,
    /// Reset the cooldown when an episode ends. Defaults to `!emit_on_continue`.
    #[serde(default)]
    pub rearm_on_clear: Option<bool>,
}

impl DebounceSpec {
    pub fn rearm_on_clear(&self) -> bool {
        self.rearm_on_clear.unwrap_or(!self.emit_on_continue)
    }
}

impl RuleDefinition {
    /// Build a definition in code. Relevant signals come from the condition.
    pub fn new(id: impl Into<String>, risk_level: RiskLevel, condition: Condition) -> Self {
        let id = id.into();
        Self {
            api_version: API_VERSION.to_string(),
            kind: RULE_KIND.to_string(),
            metadata: RuleMetadata {
                name: id.clone(),
                id,
                description: None,
                tags: None,
                enabled: true,
            },
            risk_level,
            relevant_signals: Vec::new(),
            condition,
            debounce: DebounceSpec::default(),
            event_data: IndexMap::new(),
        }
    }

    pub fn with_cooldown(mut self, cooldown: impl Into<String>) -> Self {
        self.debounce.cooldown = Some(cooldown.into());
        self
    }

    pub fn with_emit_on_continue(mut self, emit: bool) -> Self {
        self.debounce.emit_on_continue = emit;
        self
    }

    pub fn with_rearm_on_clear(mut self, rearm: bool) -> Self {
        self.debounce.rearm_on_clear = Some(rearm);
        self
    }

    pub fn with_relevant_signals<I, S>(mut self, signals: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.relevant_signals = signals.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_event_data(mut self, key: impl Into<String>, value: Value) -> Self {
        self.event_data.insert(key.into(), value);
        self
    }

    /// Parse a single YAML document.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let rule: RuleDefinition = serde_yaml::from_str(yaml)?;
        if rule.metadata.id.trim().is_empty() {
            return Err(RuleError::Validation(
                "rule metadata.id must not be empty".to_string(),
            ));
        }
        Ok(rule)
    }

    /// Rule name as used by the engine and on emitted events.
    pub fn name(&self) -> &str {
        &self.metadata.id
    }

    /// Signals the rule declares interest in.
    pub fn relevant_signals(&self) -> Vec<&str> {
        if self.relevant_signals.is_empty() {
            self.condition.signals()
        } else {
            self.relevant_signals.iter().map(String::as_str).collect()
        }
    }

    /// `event_data` keys captured from signal history.
    pub fn captured_signals(&self) -> impl Iterator<Item = &str> {
        self.event_data
            .iter()
            .filter(|(key, value)| value.is_null() && key.as_str() != roadrisk_core::START_KEY)
            .map(|(key, _)| key.as_str())
    }

    /// Everything the rule may read: relevant signals plus captured signals.
    pub fn referenced_signals(&self) -> Vec<&str> {
        let mut out = self.relevant_signals();
        for key in self.captured_signals() {
            if !out.contains(&key) {
                out.push(key);
            }
        }
        out
    }

    /// Cooldown in milliseconds. Absent cooldown is zero.
    pub fn cooldown_ms(&self) -> Result<f64> {
        match self.debounce.cooldown.as_deref() {
            None => Ok(0.0),
            Some(raw) => cooldown::cooldown_ms(raw).ok_or_else(|| {
                RuleError::Validation(format!(
                    "rule '{}': unparseable cooldown '{}'",
                    self.name(),
                    raw
                ))
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::conditions::Operator;

    const SPEEDING_YAML: &str = r#"
apiVersion: v1
kind: RiskRule
metadata:
  id: speeding
  name: Speeding
  tags: [speed]
risk_level: medium
condition:
  type: threshold
  signal: Vehicle_Speed
  operator: gt
  value: 130
debounce:
  cooldown: 30s
event_data:
  Vehicle_Odometer: null
  source: recording
"#;

    #[test]
    fn parse_full_rule() {
        let rule = RuleDefinition::from_yaml(SPEEDING_YAML).unwrap();
        assert_eq!(rule.name(), "speeding");
        assert_eq!(rule.risk_level, RiskLevel::Medium);
        assert!(rule.metadata.enabled);
        assert_eq!(rule.relevant_signals(), vec!["Vehicle_Speed"]);
        assert_eq!(rule.referenced_signals(), vec!["Vehicle_Speed", "Vehicle_Odometer"]);
        assert_eq!(rule.cooldown_ms().unwrap(), 30_000.0);
        assert!(!rule.debounce.emit_on_continue);
        assert!(rule.debounce.rearm_on_clear());
        assert_eq!(
            rule.condition,
            Condition::threshold("Vehicle_Speed", Operator::Gt, 130.0)
        );
        assert_eq!(rule.event_data["source"], Value::String("recording".into()));
    }

    #[test]
    fn minimal_rule_uses_defaults() {
        let yaml = r#"
apiVersion: v1
kind: RiskRule
metadata:
  id: tcs_activated
  name: TCS activated
risk_level: low
condition:
  type: threshold
  signal: Vehicle_TCS_IsEngaged
  operator: eq
  value: 1
"#;
        let rule = RuleDefinition::from_yaml(yaml).unwrap();
        assert_eq!(rule.debounce, DebounceSpec::default());
        assert_eq!(rule.cooldown_ms().unwrap(), 0.0);
        assert!(rule.event_data.is_empty());
    }

    #[test]
    fn unknown_fields_are_rejected() {
        let yaml = SPEEDING_YAML.replace("risk_level: medium", "risk_level: medium\nseverity: 3");
        assert!(matches!(
            RuleDefinition::from_yaml(&yaml),
            Err(RuleError::Parse(_))
        ));
    }

    #[test]
    fn empty_id_is_rejected() {
        let yaml = SPEEDING_YAML.replace("id: speeding", "id: \"\"");
        assert!(matches!(
            RuleDefinition::from_yaml(&yaml),
            Err(RuleError::Validation(_))
        ));
    }

    #[test]
    fn explicit_relevant_signals_win() {
        let rule = RuleDefinition::new(
            "massive_speeding",
            RiskLevel::High,
            Condition::threshold("Vehicle_Speed", Operator::Gt, 180.0),
        )
        .with_relevant_signals(["Vehicle_Speed", "Vehicle_Road_Type"]);
        assert_eq!(
            rule.relevant_signals(),
            vec!["Vehicle_Speed", "Vehicle_Road_Type"]
        );
    }

    #[test]
    fn emit_on_continue_flips_rearm_default() {
        let rule = RuleDefinition::new(
            "no_seatbelt",
            RiskLevel::High,
            Condition::threshold("belt", Operator::Eq, 0.0),
        )
        .with_emit_on_continue(true);
        assert!(!rule.debounce.rearm_on_clear());
        assert!(rule.clone().with_rearm_on_clear(true).debounce.rearm_on_clear());
    }

    #[test]
    fn bad_cooldown_is_an_error() {
        let rule = RuleDefinition::new(
            "speeding",
            RiskLevel::Medium,
            Condition::threshold("speed", Operator::Gt, 1.0),
        )
        .with_cooldown("whenever");
        assert!(rule.cooldown_ms().is_err());
    }
}
