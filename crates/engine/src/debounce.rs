//! Per-rule cooldown and episode bookkeeping.
//!
//! Two independent primitives per rule: `next_eligible_time` suppresses
//! re-firing until a cooldown has passed, `active` marks an ongoing episode.
//! Rules choose how to combine them; the registry never couples the two.

use std::collections::HashMap;

/// Runtime state of one rule.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct RuleState {
    /// The rule's condition has held on every check since the episode began.
    pub active: bool,
    /// Timestamp (ms) before which the rule may not fire. `0.0` = always eligible.
    pub next_eligible_time: f64,
}

/// Cooldown and episode state for every rule of a session.
#[derive(Debug, Clone, Default)]
pub struct DebounceRegistry {
    states: HashMap<String, RuleState>,
}

impl DebounceRegistry {
    pub fn new<I, S>(rule_names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut registry = Self::default();
        for name in rule_names {
            registry.register(name);
        }
        registry
    }

    /// Add a rule with default state. Existing state is left untouched.
    pub fn register(&mut self, rule_name: impl Into<String>) {
        self.states.entry(rule_name.into()).or_default();
    }

    /// Whether the rule may fire at `now`. Unknown rules are eligible.
    pub fn is_eligible(&self, rule_name: &str, now: f64) -> bool {
        self.states
            .get(rule_name)
            .map(|s| now >= s.next_eligible_time)
            .unwrap_or(true)
    }

    /// Block the rule until `now + cooldown_ms`.
    pub fn record_fire(&mut self, rule_name: &str, now: f64, cooldown_ms: f64) {
        self.entry(rule_name).next_eligible_time = now + cooldown_ms;
    }

    /// Make the rule eligible again immediately.
    pub fn rearm(&mut self, rule_name: &str) {
        self.entry(rule_name).next_eligible_time = 0.0;
    }

    pub fn is_active(&self, rule_name: &str) -> bool {
        self.states.get(rule_name).map(|s| s.active).unwrap_or(false)
    }

    pub fn set_active(&mut self, rule_name: &str, active: bool) {
        self.entry(rule_name).active = active;
    }

    /// End-of-session reset: every episode closes, cooldowns stay.
    pub fn reset_all_active(&mut self) {
        for state in self.states.values_mut() {
            state.active = false;
        }
    }

    pub fn state(&self, rule_name: &str) -> Option<RuleState> {
        self.states.get(rule_name).copied()
    }

    pub fn active_rules(&self) -> impl Iterator<Item = &str> {
        self.states
            .iter()
            .filter(|(_, s)| s.active)
            .map(|(name, _)| name.as_str())
    }

    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    fn entry(&mut self, rule_name: &str) -> &mut RuleState {
        self.states.entry(rule_name.to_string()).or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_rules_are_eligible_and_inactive() {
        let registry = DebounceRegistry::default();
        assert!(registry.is_eligible("speeding", 0.0));
        assert!(!registry.is_active("speeding"));
        assert_eq!(registry.state("speeding"), None);
    }

    #[test]
    fn cooldown_blocks_until_deadline() {
        let mut registry = DebounceRegistry::new(["speeding"]);
        registry.record_fire("speeding", 10.0, 1000.0);
        assert!(!registry.is_eligible("speeding", 10.0));
        assert!(!registry.is_eligible("speeding", 1009.9));
        assert!(registry.is_eligible("speeding", 1010.0));

        registry.rearm("speeding");
        assert!(registry.is_eligible("speeding", 11.0));
    }

    #[test]
    fn reset_all_active_keeps_cooldowns() {
        let mut registry = DebounceRegistry::new(["a", "b"]);
        registry.set_active("a", true);
        registry.record_fire("a", 0.0, 500.0);
        registry.set_active("b", true);

        registry.reset_all_active();
        assert_eq!(registry.active_rules().count(), 0);
        assert!(!registry.is_eligible("a", 100.0));
    }

    #[test]
    fn reset_with_nothing_active_changes_nothing() {
        let mut registry = DebounceRegistry::new(["a"]);
        registry.record_fire("a", 5.0, 5.0);
        let before = registry.state("a");
        registry.reset_all_active();
        assert_eq!(registry.state("a"), before);
    }

    #[test]
    fn writes_create_entries_lazily() {
        let mut registry = DebounceRegistry::default();
        registry.set_active("late", true);
        assert!(registry.is_active("late"));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn register_does_not_clobber_state() {
        let mut registry = DebounceRegistry::new(["a"]);
        registry.set_active("a", true);
        registry.register("a");
        assert!(registry.is_active("a"));
    }
}
