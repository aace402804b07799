//! Rule-set validation with structured errors and suggestions.
//!
//! Checks each [`RuleDefinition`] on its own and the set as a whole
//! (duplicate ids, sample counts against the window size). Returns a
//! [`ValidationResult`] with errors (refuse to start) and warnings (advisory).

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::cooldown::parse_cooldown;
use crate::schema::{RuleDefinition, API_VERSION, RULE_KIND};

// ── Result types ────────────────────────────────────────────────────

/// Overall validation outcome.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationResult {
    pub valid: bool,
    pub errors: Vec<ValidationError>,
    pub warnings: Vec<ValidationWarning>,
}

/// A blocking validation error.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationError {
    /// Location, e.g. `"speeding.condition"`.
    pub path: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggestion: Option<String>,
}

/// A non-blocking advisory warning.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationWarning {
    pub path: String,
    pub message: String,
}

impl ValidationResult {
    fn new() -> Self {
        Self {
            valid: true,
            errors: Vec::new(),
            warnings: Vec::new(),
        }
    }

    fn error(&mut self, path: impl Into<String>, message: impl Into<String>) {
        self.valid = false;
        self.errors.push(ValidationError {
            path: path.into(),
            message: message.into(),
            suggestion: None,
        });
    }

    fn error_with_suggestion(
        &mut self,
        path: impl Into<String>,
        message: impl Into<String>,
        suggestion: impl Into<String>,
    ) {
        self.valid = false;
        self.errors.push(ValidationError {
            path: path.into(),
            message: message.into(),
            suggestion: Some(suggestion.into()),
        });
    }

    fn warn(&mut self, path: impl Into<String>, message: impl Into<String>) {
        self.warnings.push(ValidationWarning {
            path: path.into(),
            message: message.into(),
        });
    }
}

// ── Public API ──────────────────────────────────────────────────────

/// Validate an ordered rule set for an engine with the given window size.
pub fn validate_rule_set(rules: &[RuleDefinition], window_size: usize) -> ValidationResult {
    let mut result = ValidationResult::new();
    let mut seen = HashSet::new();

    for rule in rules {
        if !seen.insert(rule.name()) {
            result.error(
                format!("{}.metadata.id", rule.name()),
                format!("duplicate rule id '{}'", rule.name()),
            );
        }
        validate_header(rule, &mut result);
        validate_signals(rule, &mut result);
        validate_condition(rule, window_size, &mut result);
        validate_debounce(rule, &mut result);
    }

    result
}

// ── Per-rule checks ─────────────────────────────────────────────────

fn validate_header(rule: &RuleDefinition, result: &mut ValidationResult) {
    let id = rule.name();
    if rule.api_version != API_VERSION {
        result.error(
            format!("{id}.apiVersion"),
            format!("apiVersion must be '{API_VERSION}', got '{}'", rule.api_version),
        );
    }
    if rule.kind != RULE_KIND {
        result.error(
            format!("{id}.kind"),
            format!("kind must be '{RULE_KIND}', got '{}'", rule.kind),
        );
    }
    if !is_identifier(id) {
        result.error(
            format!("{id}.metadata.id"),
            format!("id must be lowercase alphanumeric with '_' or '-', got '{id}'"),
        );
    }
}

fn validate_signals(rule: &RuleDefinition, result: &mut ValidationResult) {
    let id = rule.name();
    let relevant = rule.relevant_signals();
    if relevant.is_empty() {
        result.error(
            format!("{id}.relevant_signals"),
            "rule reads no signals and can never trigger",
        );
    }

    for signal in rule.condition.signals() {
        if !relevant.contains(&signal) {
            result.error_with_suggestion(
                format!("{id}.condition"),
                format!("condition reads '{signal}' which is not a relevant signal"),
                format!("add '{signal}' to relevant_signals"),
            );
        }
    }

    if rule.event_data.contains_key(roadrisk_core::START_KEY) {
        result.warn(
            format!("{id}.event_data.start"),
            "'start' is set by the engine and will be overwritten",
        );
    }
}

fn validate_condition(rule: &RuleDefinition, window_size: usize, result: &mut ValidationResult) {
    let id = rule.name();
    for signal in rule.condition.zero_sample_leaves() {
        result.error(
            format!("{id}.condition"),
            format!("condition on '{signal}' uses samples: 0"),
        );
    }

    let required = rule.condition.required_samples();
    if required > window_size {
        result.warn(
            format!("{id}.condition"),
            format!(
                "condition needs {required} samples but the window holds {window_size}; it can never trigger"
            ),
        );
    }
}

fn validate_debounce(rule: &RuleDefinition, result: &mut ValidationResult) {
    if let Some(raw) = rule.debounce.cooldown.as_deref() {
        if parse_cooldown(raw).is_none() {
            result.error_with_suggestion(
                format!("{}.debounce.cooldown", rule.name()),
                format!("unparseable cooldown '{raw}'"),
                "use e.g. '500ms', '10s', '1m30s'",
            );
        }
    }
}

fn is_identifier(s: &str) -> bool {
    !s.is_empty()
        && s
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_' || c == '-')
}
