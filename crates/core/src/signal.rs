use serde::{Deserialize, Serialize};

/// A single observed change of a vehicle signal.
///
/// `timestamp` is milliseconds since the Unix epoch, kept as `f64` because
/// recordings carry fractional milliseconds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignalUpdate {
    pub name: String,
    pub value: f64,
    pub timestamp: f64,
}

impl SignalUpdate {
    pub fn new(name: impl Into<String>, value: f64, timestamp: f64) -> Self {
        Self {
            name: name.into(),
            value,
            timestamp,
        }
    }
}

impl std::fmt::Display for SignalUpdate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}={} @{}", self.name, self.value, self.timestamp)
    }
}
