//! Risk rule definitions for the detection engine.
//!
//! This crate provides:
//! - YAML rule schema with serde deserialization
//! - A small condition language (threshold, sustained, average, delta, all/any/not)
//! - Filesystem loader producing an ordered rule list
//! - Rule-set validation with errors and warnings

pub mod conditions;
pub mod cooldown;
pub mod error;
pub mod loader;
pub mod schema;
pub mod validation;

pub use conditions::{Condition, Operator};
pub use error::{Result, RuleError};
pub use loader::{LoadReport, LoadResult, LoadStatus, RuleLoader};
pub use schema::{DebounceSpec, RuleDefinition, RuleMetadata};
pub use validation::{validate_rule_set, ValidationResult};
