use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Key under which the engine marks the first event of an episode.
pub const START_KEY: &str = "start";

/// Free-form payload attached to a risk event.
pub type EventData = Map<String, Value>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
    Critical,
}

impl std::fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RiskLevel::Low => write!(f, "low"),
            RiskLevel::Medium => write!(f, "medium"),
            RiskLevel::High => write!(f, "high"),
            RiskLevel::Critical => write!(f, "critical"),
        }
    }
}

/// A detected risk situation, handed to the sink and then dropped.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RiskEvent {
    pub name: String,
    pub timestamp: f64,
    pub risk_level: RiskLevel,
    #[serde(default)]
    pub event_data: EventData,
}

impl RiskEvent {
    /// Whether this event opens a new episode. Missing flag reads as `false`.
    pub fn is_start(&self) -> bool {
        self.event_data
            .get(START_KEY)
            .and_then(Value::as_bool)
            .unwrap_or(false)
    }
}
