use roadrisk_core::CoreError;
use roadrisk_rules::RuleError;
use thiserror::Error;

/// Errors raised while assembling a detector. Nothing fails once it runs.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("duplicate rule name: {0}")]
    DuplicateRule(String),

    #[error(transparent)]
    Rule(#[from] RuleError),

    #[error(transparent)]
    Config(#[from] CoreError),
}
