//! Bounded per-signal sample history.
//!
//! Only signals registered up front are tracked; everything else is dropped
//! on the floor so memory stays at `registered signals × window size`.

use std::collections::{HashMap, VecDeque};

static EMPTY: VecDeque<f64> = VecDeque::new();

/// Sliding windows of the most recent values, one per tracked signal.
#[derive(Debug, Clone, Default)]
pub struct SignalHistory {
    buffers: HashMap<String, VecDeque<f64>>,
}

impl SignalHistory {
    /// Register an empty buffer for every name. No other signal is ever tracked.
    pub fn new<I, S>(signals: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            buffers: signals
                .into_iter()
                .map(|s| (s.into(), VecDeque::new()))
                .collect(),
        }
    }

    /// Append a value, evicting the oldest samples beyond `window_size`.
    ///
    /// Returns `false` (and stores nothing) for unregistered signals.
    pub fn record(&mut self, signal: &str, value: f64, window_size: usize) -> bool {
        let Some(buffer) = self.buffers.get_mut(signal) else {
            return false;
        };
        buffer.push_back(value);
        while buffer.len() > window_size {
            buffer.pop_front();
        }
        true
    }

    /// Oldest-to-newest view of a signal's window. Empty for unknown signals.
    pub fn snapshot(&self, signal: &str) -> &VecDeque<f64> {
        self.buffers.get(signal).unwrap_or(&EMPTY)
    }

    /// Most recent value of a signal, if any has been recorded.
    pub fn latest(&self, signal: &str) -> Option<f64> {
        self.snapshot(signal).back().copied()
    }

    pub fn is_tracked(&self, signal: &str) -> bool {
        self.buffers.contains_key(signal)
    }

    pub fn tracked_signals(&self) -> impl Iterator<Item = &str> {
        self.buffers.keys().map(String::as_str)
    }

    /// Drop all samples but keep the registrations.
    pub fn clear(&mut self) {
        for buffer in self.buffers.values_mut() {
            buffer.clear();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn values(history: &SignalHistory, signal: &str) -> Vec<f64> {
        history.snapshot(signal).iter().copied().collect()
    }

    #[test]
    fn window_keeps_most_recent_values_in_order() {
        let mut history = SignalHistory::new(["speed"]);
        for (i, window) in [(1.0, 3), (2.0, 3), (3.0, 3), (4.0, 3), (5.0, 3)] {
            history.record("speed", i, window);
            assert!(history.snapshot("speed").len() <= 3);
        }
        assert_eq!(values(&history, "speed"), vec![3.0, 4.0, 5.0]);
        assert_eq!(history.latest("speed"), Some(5.0));
    }

    #[test]
    fn shorter_than_window_keeps_everything() {
        let mut history = SignalHistory::new(["speed"]);
        history.record("speed", 10.0, 60);
        history.record("speed", 20.0, 60);
        assert_eq!(values(&history, "speed"), vec![10.0, 20.0]);
    }

    #[test]
    fn shrinking_window_drops_down_to_size() {
        let mut history = SignalHistory::new(["rpm"]);
        for v in 0..10 {
            history.record("rpm", v as f64, 10);
        }
        history.record("rpm", 10.0, 4);
        assert_eq!(values(&history, "rpm"), vec![7.0, 8.0, 9.0, 10.0]);
    }

    #[test]
    fn untracked_signal_is_ignored() {
        let mut history = SignalHistory::new(["speed"]);
        assert!(!history.record("wiper", 1.0, 60));
        assert!(!history.is_tracked("wiper"));
        assert!(history.snapshot("wiper").is_empty());
        assert_eq!(history.latest("wiper"), None);
        assert_eq!(history.tracked_signals().count(), 1);
    }

    #[test]
    fn clear_keeps_registrations() {
        let mut history = SignalHistory::new(["speed"]);
        history.record("speed", 1.0, 60);
        history.clear();
        assert!(history.is_tracked("speed"));
        assert!(history.snapshot("speed").is_empty());
    }
}
