use std::env;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::CoreError;

/// Samples kept per signal when nothing else is configured.
pub const DEFAULT_WINDOW_SIZE: usize = 60;

pub const DEFAULT_RULES_DIR: &str = "data/rules";

/// Load .env file (silently ignores if missing).
pub fn load_dotenv() {
    dotenvy::dotenv().ok();
}

// ── Engine config ─────────────────────────────────────────────

/// Detection engine settings, fixed for the lifetime of a session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Number of samples kept per tracked signal.
    pub window_size: usize,
    /// Directory holding the rule definition YAML files.
    pub rules_dir: PathBuf,
    /// Idle gap after which a live session is considered finished.
    pub idle_timeout_ms: Option<u64>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            window_size: DEFAULT_WINDOW_SIZE,
            rules_dir: PathBuf::from(DEFAULT_RULES_DIR),
            idle_timeout_ms: None,
        }
    }
}

impl EngineConfig {
    /// Build config from environment variables (call `load_dotenv()` first).
    ///
    /// Reads `ROADRISK_WINDOW_SIZE`, `ROADRISK_RULES_DIR` and
    /// `ROADRISK_IDLE_TIMEOUT_MS`. Unparseable numbers fall back to defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Same as [`from_env`](Self::from_env) with an injectable lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let opt = |key: &str| lookup(key).filter(|s| !s.trim().is_empty());
        let defaults = Self::default();

        let window_size = opt("ROADRISK_WINDOW_SIZE")
            .and_then(|v| parse_or_warn("ROADRISK_WINDOW_SIZE", &v))
            .unwrap_or(defaults.window_size);
        let rules_dir = opt("ROADRISK_RULES_DIR")
            .map(PathBuf::from)
            .unwrap_or(defaults.rules_dir);
        let idle_timeout_ms = opt("ROADRISK_IDLE_TIMEOUT_MS")
            .and_then(|v| parse_or_warn("ROADRISK_IDLE_TIMEOUT_MS", &v));

        Self {
            window_size,
            rules_dir,
            idle_timeout_ms,
        }
    }

    pub fn validate(&self) -> Result<(), CoreError> {
        if self.window_size == 0 {
            return Err(CoreError::Config(
                "window_size must be at least 1".to_string(),
            ));
        }
        if self.idle_timeout_ms == Some(0) {
            return Err(CoreError::Config(
                "idle_timeout_ms must be positive when set".to_string(),
            ));
        }
        Ok(())
    }
}

fn parse_or_warn<T: std::str::FromStr>(key: &str, raw: &str) -> Option<T> {
    match raw.trim().parse() {
        Ok(v) => Some(v),
        Err(_) => {
            warn!(key, value = raw, "ignoring unparseable config value");
            None
        }
    }
}
