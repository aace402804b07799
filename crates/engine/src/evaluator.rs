//! Rule evaluators and the ordered rule set.
//!
//! Every rule implements [`RiskRule`]. The provided
//! [`evaluate`](RiskRule::evaluate) method owns the episode state machine,
//! so an implementation only decides whether its condition holds right now:
//!
//! | active | triggered | eligible | result                                         |
//! |--------|-----------|----------|------------------------------------------------|
//! | no     | yes       | yes      | fire `start = true`, record fire, mark active  |
//! | no     | yes       | no       | silent (debounced)                             |
//! | yes    | yes       | yes      | fire `start = false` if `emit_on_continue`     |
//! | yes    | no        | -        | mark inactive, rearm if `rearm_on_clear`       |
//! | no     | no        | -        | nothing                                        |

use std::collections::{BTreeSet, HashSet};

use indexmap::IndexMap;
use roadrisk_core::{EventData, RiskEvent, SignalHistory, SignalUpdate, START_KEY};
use roadrisk_rules::RuleDefinition;
use serde_json::Value;
use tracing::debug;

use crate::debounce::DebounceRegistry;
use crate::error::EngineError;

// ── Rule trait ──────────────────────────────────────────────────────

/// A risk event detector.
///
/// Implementations must be independent of each other: `evaluate` only ever
/// touches the debounce state stored under the rule's own name.
pub trait RiskRule: Send + Sync {
    /// Static configuration: name, risk level, signals, re-fire policy.
    fn definition(&self) -> &RuleDefinition;

    /// Whether the rule's condition holds on the current history.
    /// Too little history must read as `false`.
    fn is_triggered(&self, history: &SignalHistory) -> bool;

    /// Cooldown between firings, in milliseconds.
    fn cooldown_ms(&self) -> f64;

    fn name(&self) -> &str {
        self.definition().name()
    }

    /// Whether an update on `signal` can change this rule's outcome.
    fn is_relevant(&self, signal: &str) -> bool {
        signal == self.name() || self.definition().relevant_signals().contains(&signal)
    }

    /// Run the episode state machine for one incoming update.
    fn evaluate(
        &self,
        history: &SignalHistory,
        debounce: &mut DebounceRegistry,
        update: &SignalUpdate,
    ) -> Option<RiskEvent> {
        if !self.is_relevant(&update.name) {
            return None;
        }

        let name = self.name();
        let now = update.timestamp;
        let policy = &self.definition().debounce;
        let triggered = self.is_triggered(history);

        match (debounce.is_active(name), triggered) {
            (false, true) => {
                if !debounce.is_eligible(name, now) {
                    debug!(rule = name, timestamp = now, "trigger debounced");
                    return None;
                }
                debounce.record_fire(name, now, self.cooldown_ms());
                debounce.set_active(name, true);
                Some(self.build_event(history, now, true))
            }
            (true, true) => {
                if !policy.emit_on_continue || !debounce.is_eligible(name, now) {
                    return None;
                }
                debounce.record_fire(name, now, self.cooldown_ms());
                Some(self.build_event(history, now, false))
            }
            (true, false) => {
                debug!(rule = name, timestamp = now, "episode cleared");
                debounce.set_active(name, false);
                if policy.rearm_on_clear() {
                    debounce.rearm(name);
                }
                None
            }
            (false, false) => None,
        }
    }

    /// Assemble the event payload: configured `event_data`, captured signal
    /// values, and the `start` flag.
    fn build_event(&self, history: &SignalHistory, timestamp: f64, start: bool) -> RiskEvent {
        let definition = self.definition();
        let mut event_data = EventData::new();
        for (key, value) in &definition.event_data {
            let value = if value.is_null() {
                history
                    .latest(key)
                    .and_then(serde_json::Number::from_f64)
                    .map(Value::Number)
                    .unwrap_or(Value::Null)
            } else {
                value.clone()
            };
            event_data.insert(key.clone(), value);
        }
        event_data.insert(START_KEY.to_string(), Value::Bool(start));

        RiskEvent {
            name: self.name().to_string(),
            timestamp,
            risk_level: definition.risk_level,
            event_data,
        }
    }
}

// ── YAML-configured rule ────────────────────────────────────────────

/// A rule whose condition comes entirely from its [`RuleDefinition`].
#[derive(Debug, Clone)]
pub struct ConfiguredRule {
    definition: RuleDefinition,
    cooldown_ms: f64,
    relevant: HashSet<String>,
}

impl ConfiguredRule {
    pub fn new(definition: RuleDefinition) -> Result<Self, EngineError> {
        let cooldown_ms = definition.cooldown_ms()?;
        let relevant = definition
            .relevant_signals()
            .into_iter()
            .map(str::to_string)
            .collect();
        Ok(Self {
            definition,
            cooldown_ms,
            relevant,
        })
    }
}

impl RiskRule for ConfiguredRule {
    fn definition(&self) -> &RuleDefinition {
        &self.definition
    }

    fn is_triggered(&self, history: &SignalHistory) -> bool {
        self.definition.condition.is_met(history)
    }

    fn cooldown_ms(&self) -> f64 {
        self.cooldown_ms
    }

    fn is_relevant(&self, signal: &str) -> bool {
        signal == self.definition.name() || self.relevant.contains(signal)
    }
}

// ── Rule set ────────────────────────────────────────────────────────

/// Rules in registration order, unique by name.
#[derive(Default)]
pub struct RuleSet {
    rules: IndexMap<String, Box<dyn RiskRule>>,
}

impl RuleSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build [`ConfiguredRule`]s from definitions, keeping their order.
    pub fn from_definitions(
        definitions: impl IntoIterator<Item = RuleDefinition>,
    ) -> Result<Self, EngineError> {
        let mut set = Self::new();
        for definition in definitions {
            set.register(ConfiguredRule::new(definition)?)?;
        }
        Ok(set)
    }

    /// Append a rule. Returns error if the name is already registered.
    pub fn register(&mut self, rule: impl RiskRule + 'static) -> Result<(), EngineError> {
        let name = rule.name().to_string();
        if self.rules.contains_key(&name) {
            return Err(EngineError::DuplicateRule(name));
        }
        self.rules.insert(name, Box::new(rule));
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&dyn RiskRule> {
        self.rules.get(name).map(|r| r.as_ref())
    }

    pub fn iter(&self) -> impl Iterator<Item = &dyn RiskRule> {
        self.rules.values().map(|r| r.as_ref())
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.rules.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Signals worth keeping history for: everything any rule reads or
    /// captures, minus names that belong to rules themselves.
    pub fn tracked_signals(&self) -> BTreeSet<String> {
        self.iter()
            .flat_map(|rule| rule.definition().referenced_signals())
            .filter(|signal| !self.rules.contains_key(*signal))
            .map(str::to_string)
            .collect()
    }
}

impl std::fmt::Debug for RuleSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.rules.keys()).finish()
    }
}
