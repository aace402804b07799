//! Filesystem rule loader.
//!
//! Scans a directory for YAML rule files and returns the enabled rules in
//! file-name order, which becomes the engine's registration order. Rules are
//! loaded once at startup and never reloaded during a session.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::{info, warn};

use crate::error::Result;
use crate::schema::RuleDefinition;

// ── Load result types ───────────────────────────────────────────────

/// Outcome of loading a single rule file.
#[derive(Debug)]
pub struct LoadResult {
    /// Path to the file that was loaded.
    pub path: PathBuf,
    /// Status of the load attempt.
    pub status: LoadStatus,
}

/// Status of a single file load attempt.
#[derive(Debug)]
pub enum LoadStatus {
    /// Rule was successfully loaded.
    Loaded { rule_id: String },
    /// File was skipped (dotfile, non-YAML, disabled rule).
    Skipped { reason: String },
    /// Parse error occurred.
    Failed { error: String },
}

/// Everything a directory scan produced.
#[derive(Debug, Default)]
pub struct LoadReport {
    /// Enabled rules in registration order.
    pub rules: Vec<RuleDefinition>,
    /// Per-file outcomes, including skipped and failed files.
    pub results: Vec<LoadResult>,
}

impl LoadReport {
    pub fn failures(&self) -> impl Iterator<Item = &LoadResult> {
        self.results
            .iter()
            .filter(|r| matches!(r.status, LoadStatus::Failed { .. }))
    }
}

// ── Rule loader ─────────────────────────────────────────────────────

/// Directory-backed rule loader.
pub struct RuleLoader {
    rules_dir: PathBuf,
}

impl RuleLoader {
    pub fn new(rules_dir: impl Into<PathBuf>) -> Self {
        Self {
            rules_dir: rules_dir.into(),
        }
    }

    pub fn rules_dir(&self) -> &Path {
        &self.rules_dir
    }

    /// Scan the rules directory and load all YAML files.
    ///
    /// Dotfiles and disabled rules are skipped. Parse errors are reported
    /// per-file but do not abort the scan; a missing directory does.
    pub fn load_all(&self) -> Result<LoadReport> {
        let mut paths = Vec::new();
        for entry in fs::read_dir(&self.rules_dir)? {
            let path = entry?.path();
            if !path.is_dir() {
                paths.push(path);
            }
        }
        paths.sort();

        let mut report = LoadReport::default();
        for path in paths {
            if let Some(reason) = skip_reason(&path) {
                report.results.push(LoadResult {
                    path,
                    status: LoadStatus::Skipped { reason },
                });
                continue;
            }

            match self.load_file(&path) {
                Ok(rule) if !rule.metadata.enabled => {
                    info!(rule_id = %rule.name(), "rule disabled, skipping");
                    report.results.push(LoadResult {
                        path,
                        status: LoadStatus::Skipped {
                            reason: "disabled".to_string(),
                        },
                    });
                }
                Ok(rule) => {
                    let rule_id = rule.name().to_string();
                    info!(rule_id = %rule_id, path = %path.display(), "loaded rule");
                    report.rules.push(rule);
                    report.results.push(LoadResult {
                        path,
                        status: LoadStatus::Loaded { rule_id },
                    });
                }
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "failed to load rule file");
                    report.results.push(LoadResult {
                        path,
                        status: LoadStatus::Failed {
                            error: e.to_string(),
                        },
                    });
                }
            }
        }

        Ok(report)
    }

    /// Parse a single YAML file into a [`RuleDefinition`].
    pub fn load_file(&self, path: &Path) -> Result<RuleDefinition> {
        let contents = fs::read_to_string(path)?;
        RuleDefinition::from_yaml(&contents)
    }
}

fn skip_reason(path: &Path) -> Option<String> {
    let name = path.file_name().and_then(|n| n.to_str()).unwrap_or_default();
    if name.starts_with('.') {
        return Some("dotfile".to_string());
    }
    let is_yaml = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e == "yml" || e == "yaml")
        .unwrap_or(false);
    if !is_yaml {
        return Some("not a YAML file".to_string());
    }
    None
}
