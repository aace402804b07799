//! The dispatch loop: one update in, zero or more risk events out.
//!
//! A [`Detector`] owns the signal history and the debounce registry for one
//! detection session and shares the read-only [`RuleSet`]. Updates must be
//! fed strictly in arrival order; episode state is not commutative.

use std::sync::Arc;

use roadrisk_core::{EngineConfig, SignalHistory, SignalUpdate};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::debounce::DebounceRegistry;
use crate::error::EngineError;
use crate::evaluator::RuleSet;
use crate::sink::RiskEventSink;

/// What a single [`Detector::on_signal`] call did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchOutcome {
    /// The signal is tracked and was recorded.
    pub tracked: bool,
    /// Events produced by rules (delivered or not).
    pub emitted: usize,
    /// Events the sink refused.
    pub sink_failures: usize,
}

/// Running counters for a detector.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SessionStats {
    pub updates: u64,
    pub ignored: u64,
    pub events: u64,
    pub sink_failures: u64,
    pub sessions_ended: u64,
}

pub struct Detector<S> {
    window_size: usize,
    rules: Arc<RuleSet>,
    history: SignalHistory,
    debounce: DebounceRegistry,
    sink: S,
    stats: SessionStats,
}

impl<S: RiskEventSink> Detector<S> {
    /// Set up history buffers for every tracked signal and debounce state
    /// for every rule.
    pub fn new(rules: Arc<RuleSet>, config: &EngineConfig, sink: S) -> Result<Self, EngineError> {
        config.validate()?;
        let history = SignalHistory::new(rules.tracked_signals());
        let debounce = DebounceRegistry::new(rules.names());
        info!(
            rules = rules.len(),
            signals = history.tracked_signals().count(),
            window_size = config.window_size,
            "detector ready"
        );
        Ok(Self {
            window_size: config.window_size,
            rules,
            history,
            debounce,
            sink,
            stats: SessionStats::default(),
        })
    }

    /// Record one update and run every rule against it, in registration order.
    ///
    /// A sink failure is logged and counted; the remaining rules are still
    /// evaluated and their events still delivered. Engine state is never
    /// rolled back because of the sink.
    pub fn on_signal(&mut self, update: &SignalUpdate) -> DispatchOutcome {
        self.stats.updates += 1;
        let mut outcome = DispatchOutcome::default();

        if !self.history.record(&update.name, update.value, self.window_size) {
            self.stats.ignored += 1;
            return outcome;
        }
        outcome.tracked = true;

        for rule in self.rules.iter() {
            let Some(event) = rule.evaluate(&self.history, &mut self.debounce, update) else {
                continue;
            };
            debug!(rule = rule.name(), timestamp = event.timestamp, start = event.is_start(), "rule fired");
            outcome.emitted += 1;
            if let Err(e) = self.sink.on_risk_event(event) {
                warn!(rule = rule.name(), error = %e, "sink rejected risk event");
                outcome.sink_failures += 1;
            }
        }

        self.stats.events += outcome.emitted as u64;
        self.stats.sink_failures += outcome.sink_failures as u64;
        outcome
    }

    /// Close the session: every open episode ends. Cooldowns and history stay.
    pub fn end_session(&mut self) {
        let open = self.debounce.active_rules().count();
        self.debounce.reset_all_active();
        self.stats.sessions_ended += 1;
        info!(open_episodes = open, "detection session ended");
    }

    pub fn history(&self) -> &SignalHistory {
        &self.history
    }

    pub fn debounce(&self) -> &DebounceRegistry {
        &self.debounce
    }

    pub fn rules(&self) -> &Arc<RuleSet> {
        &self.rules
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn sink_mut(&mut self) -> &mut S {
        &mut self.sink
    }

    pub fn into_sink(self) -> S {
        self.sink
    }

    pub fn stats(&self) -> SessionStats {
        self.stats
    }

    pub fn window_size(&self) -> usize {
        self.window_size
    }
}
