//! Trigger conditions evaluated over signal history.
//!
//! Leaf conditions read one signal's window; `all`, `any` and `not` combine
//! them. A leaf with too few samples is undecided, never an error, and an
//! undecided condition is not met.

use roadrisk_core::SignalHistory;
use serde::{Deserialize, Serialize};

// ── Comparison operators ────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operator {
    Gt,
    Gte,
    Lt,
    Lte,
    Eq,
    Neq,
}

impl Operator {
    /// Compare `lhs` against `rhs`. Equality is exact up to `f64::EPSILON`.
    pub fn apply(self, lhs: f64, rhs: f64) -> bool {
        match self {
            Operator::Gt => lhs > rhs,
            Operator::Gte => lhs >= rhs,
            Operator::Lt => lhs < rhs,
            Operator::Lte => lhs <= rhs,
            Operator::Eq => (lhs - rhs).abs() <= f64::EPSILON,
            Operator::Neq => (lhs - rhs).abs() > f64::EPSILON,
        }
    }

    fn symbol(self) -> &'static str {
        match self {
            Operator::Gt => ">",
            Operator::Gte => ">=",
            Operator::Lt => "<",
            Operator::Lte => "<=",
            Operator::Eq => "==",
            Operator::Neq => "!=",
        }
    }
}

impl std::fmt::Display for Operator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.symbol())
    }
}

// ── Condition tree ──────────────────────────────────────────────────

/// A rule's trigger condition, tagged by `type` in YAML.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Condition {
    /// Latest sample compared to `value`.
    Threshold {
        signal: String,
        operator: Operator,
        value: f64,
    },
    /// Every one of the last `samples` samples satisfies the comparison.
    Sustained {
        signal: String,
        operator: Operator,
        value: f64,
        samples: usize,
    },
    /// Mean of the last `samples` samples compared to `value`.
    Average {
        signal: String,
        operator: Operator,
        value: f64,
        samples: usize,
    },
    /// Latest sample minus the one `samples` positions earlier.
    Delta {
        signal: String,
        operator: Operator,
        value: f64,
        samples: usize,
    },
    All { conditions: Vec<Condition> },
    Any { conditions: Vec<Condition> },
    Not { condition: Box<Condition> },
}

impl Condition {
    /// Shorthand for the most common leaf.
    pub fn threshold(signal: impl Into<String>, operator: Operator, value: f64) -> Self {
        Condition::Threshold {
            signal: signal.into(),
            operator,
            value,
        }
    }

    /// Whether the condition holds. Too little history reads as not met.
    pub fn is_met(&self, history: &SignalHistory) -> bool {
        self.evaluate(history).unwrap_or(false)
    }

    /// Three-valued evaluation: `None` when the history is too short to
    /// decide. Composites only report `None` when the undecided leaves
    /// could change their outcome, so `not` never turns missing data into
    /// a trigger.
    pub fn evaluate(&self, history: &SignalHistory) -> Option<bool> {
        match self {
            Condition::Threshold {
                signal,
                operator,
                value,
            } => history
                .latest(signal)
                .map(|latest| operator.apply(latest, *value)),
            Condition::Sustained {
                signal,
                operator,
                value,
                samples,
            } => last_n(history, signal, *samples)
                .map(|mut window| window.all(|v| operator.apply(v, *value))),
            Condition::Average {
                signal,
                operator,
                value,
                samples,
            } => last_n(history, signal, *samples).map(|window| {
                let mean = window.sum::<f64>() / *samples as f64;
                operator.apply(mean, *value)
            }),
            Condition::Delta {
                signal,
                operator,
                value,
                samples,
            } => {
                let window = history.snapshot(signal);
                if *samples == 0 || window.len() <= *samples {
                    return None;
                }
                let newest = window[window.len() - 1];
                let earlier = window[window.len() - 1 - samples];
                Some(operator.apply(newest - earlier, *value))
            }
            Condition::All { conditions } => {
                if conditions.is_empty() {
                    return Some(false);
                }
                let mut undecided = false;
                for c in conditions {
                    match c.evaluate(history) {
                        Some(false) => return Some(false),
                        Some(true) => {}
                        None => undecided = true,
                    }
                }
                (!undecided).then_some(true)
            }
            Condition::Any { conditions } => {
                let mut undecided = false;
                for c in conditions {
                    match c.evaluate(history) {
                        Some(true) => return Some(true),
                        Some(false) => {}
                        None => undecided = true,
                    }
                }
                (!undecided).then_some(false)
            }
            Condition::Not { condition } => condition.evaluate(history).map(|met| !met),
        }
    }

    /// Distinct signal names read by this condition, in order of appearance.
    pub fn signals(&self) -> Vec<&str> {
        let mut out = Vec::new();
        self.collect_signals(&mut out);
        out
    }

    fn collect_signals<'a>(&'a self, out: &mut Vec<&'a str>) {
        match self {
            Condition::Threshold { signal, .. }
            | Condition::Sustained { signal, .. }
            | Condition::Average { signal, .. }
            | Condition::Delta { signal, .. } => {
                if !out.contains(&signal.as_str()) {
                    out.push(signal);
                }
            }
            Condition::All { conditions } | Condition::Any { conditions } => {
                for c in conditions {
                    c.collect_signals(out);
                }
            }
            Condition::Not { condition } => condition.collect_signals(out),
        }
    }

    /// Samples of history the deepest leaf needs before it can be met.
    pub fn required_samples(&self) -> usize {
        match self {
            Condition::Threshold { .. } => 1,
            Condition::Sustained { samples, .. } | Condition::Average { samples, .. } => *samples,
            Condition::Delta { samples, .. } => samples + 1,
            Condition::All { conditions } | Condition::Any { conditions } => conditions
                .iter()
                .map(Condition::required_samples)
                .max()
                .unwrap_or(0),
            Condition::Not { condition } => condition.required_samples(),
        }
    }

    /// Leaf conditions with a sample count of zero, which can never be met.
    pub(crate) fn zero_sample_leaves(&self) -> Vec<&str> {
        match self {
            Condition::Sustained {
                signal, samples: 0, ..
            }
            | Condition::Average {
                signal, samples: 0, ..
            }
            | Condition::Delta {
                signal, samples: 0, ..
            } => vec![signal.as_str()],
            Condition::All { conditions } | Condition::Any { conditions } => conditions
                .iter()
                .flat_map(Condition::zero_sample_leaves)
                .collect(),
            Condition::Not { condition } => condition.zero_sample_leaves(),
            _ => Vec::new(),
        }
    }
}

/// Iterator over the newest `n` samples, or `None` if fewer are recorded.
fn last_n<'a>(
    history: &'a SignalHistory,
    signal: &str,
    n: usize,
) -> Option<impl Iterator<Item = f64> + 'a> {
    let window = history.snapshot(signal);
    if n == 0 || window.len() < n {
        return None;
    }
    Some(window.iter().skip(window.len() - n).copied())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn history_with(signal: &str, values: &[f64]) -> SignalHistory {
        let mut history = SignalHistory::new([signal]);
        for v in values {
            history.record(signal, *v, 60);
        }
        history
    }

    #[test]
    fn threshold_reads_latest_sample() {
        let cond = Condition::threshold("speed", Operator::Gt, 100.0);
        assert!(cond.is_met(&history_with("speed", &[50.0, 120.0])));
        assert!(!cond.is_met(&history_with("speed", &[120.0, 50.0])));
        assert!(!cond.is_met(&history_with("speed", &[])));
    }

    #[test]
    fn sustained_needs_full_run() {
        let cond = Condition::Sustained {
            signal: "speed".into(),
            operator: Operator::Lt,
            value: 10.0,
            samples: 3,
        };
        assert!(!cond.is_met(&history_with("speed", &[5.0, 5.0])));
        assert!(cond.is_met(&history_with("speed", &[80.0, 5.0, 4.0, 3.0])));
        assert!(!cond.is_met(&history_with("speed", &[5.0, 40.0, 4.0, 3.0])));
    }

    #[test]
    fn average_over_last_samples() {
        let cond = Condition::Average {
            signal: "speed".into(),
            operator: Operator::Gte,
            value: 100.0,
            samples: 2,
        };
        assert!(cond.is_met(&history_with("speed", &[0.0, 90.0, 110.0])));
        assert!(!cond.is_met(&history_with("speed", &[0.0, 80.0, 110.0])));
    }

    #[test]
    fn delta_compares_against_earlier_sample() {
        // Harsh braking: speed drops by more than 20 over 2 samples.
        let cond = Condition::Delta {
            signal: "speed".into(),
            operator: Operator::Lt,
            value: -20.0,
            samples: 2,
        };
        assert!(cond.is_met(&history_with("speed", &[100.0, 90.0, 75.0])));
        assert!(!cond.is_met(&history_with("speed", &[100.0, 90.0, 85.0])));
        assert!(!cond.is_met(&history_with("speed", &[100.0, 70.0])));
        assert_eq!(cond.required_samples(), 3);
    }

    #[test]
    fn composition() {
        let mut history = SignalHistory::new(["speed", "belt"]);
        history.record("speed", 30.0, 60);
        history.record("belt", 0.0, 60);

        let moving = Condition::threshold("speed", Operator::Gt, 5.0);
        let unbelted = Condition::threshold("belt", Operator::Eq, 0.0);

        let all = Condition::All {
            conditions: vec![moving.clone(), unbelted.clone()],
        };
        assert!(all.is_met(&history));
        assert_eq!(all.signals(), vec!["speed", "belt"]);

        let not = Condition::Not {
            condition: Box::new(unbelted),
        };
        assert!(!not.is_met(&history));

        let any = Condition::Any {
            conditions: vec![not, moving],
        };
        assert!(any.is_met(&history));
        assert!(!Condition::All { conditions: vec![] }.is_met(&history));
    }

    #[test]
    fn not_over_short_history_is_not_met() {
        let belted_for_a_while = Condition::Sustained {
            signal: "belt".into(),
            operator: Operator::Eq,
            value: 1.0,
            samples: 3,
        };
        let unbelted = Condition::Not {
            condition: Box::new(belted_for_a_while),
        };

        let history = history_with("belt", &[0.0]);
        assert_eq!(unbelted.evaluate(&history), None);
        assert!(!unbelted.is_met(&history));
        assert!(unbelted.is_met(&history_with("belt", &[1.0, 0.0, 1.0])));

        let never_seen = Condition::Not {
            condition: Box::new(Condition::threshold("belt2", Operator::Gt, 0.0)),
        };
        assert!(!never_seen.is_met(&history));
    }

    #[test]
    fn composites_stay_undecided_only_when_it_matters() {
        let history = history_with("speed", &[30.0]);
        let moving = Condition::threshold("speed", Operator::Gt, 5.0);
        let stopped = Condition::threshold("speed", Operator::Lt, 5.0);
        let unknown = Condition::threshold("belt", Operator::Eq, 0.0);

        let all = |cs: Vec<Condition>| Condition::All { conditions: cs };
        let any = |cs: Vec<Condition>| Condition::Any { conditions: cs };

        assert_eq!(all(vec![moving.clone(), unknown.clone()]).evaluate(&history), None);
        assert_eq!(all(vec![stopped.clone(), unknown.clone()]).evaluate(&history), Some(false));
        assert_eq!(any(vec![moving, unknown.clone()]).evaluate(&history), Some(true));
        assert_eq!(any(vec![stopped, unknown.clone()]).evaluate(&history), None);

        let negated = Condition::Not {
            condition: Box::new(all(vec![unknown])),
        };
        assert!(!negated.is_met(&history));
    }

    #[test]
    fn parses_from_yaml() {
        let yaml = r#"
type: all
conditions:
  - type: threshold
    signal: Vehicle_Speed
    operator: gt
    value: 5
  - type: not
    condition:
      type: sustained
      signal: Vehicle_Seatbelt
      operator: eq
      value: 1
      samples: 3
"#;
        let cond: Condition = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(cond.signals(), vec!["Vehicle_Speed", "Vehicle_Seatbelt"]);
        assert_eq!(cond.required_samples(), 3);
    }

    #[test]
    fn zero_sample_leaves_are_reported() {
        let cond = Condition::Any {
            conditions: vec![
                Condition::threshold("a", Operator::Gt, 1.0),
                Condition::Average {
                    signal: "b".into(),
                    operator: Operator::Gt,
                    value: 1.0,
                    samples: 0,
                },
            ],
        };
        assert_eq!(cond.zero_sample_leaves(), vec!["b"]);
    }
}
