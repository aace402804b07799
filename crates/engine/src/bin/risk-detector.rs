//! risk-detector: runs the risk rules over a recording or a live feed.
//!
//! Replay: `risk-detector --file drive.csv`
//! Live:   `risk-detector --endpoint tcp://127.0.0.1:5556`
//!
//! Detected events are logged; `--output` additionally writes them as JSON lines.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::Parser;
use tracing::{error, info, warn};

use roadrisk_core::config::load_dotenv;
use roadrisk_core::EngineConfig;
use roadrisk_engine::{
    run_session, CsvReplay, Detector, FanOutSink, JsonLinesSink, LogSink, RiskEventSink, RuleSet,
    ZmqSource,
};
use roadrisk_rules::{validate_rule_set, RuleLoader};

// ── CLI ─────────────────────────────────────────────────────────────

/// Vehicle risk event detector.
#[derive(Parser, Debug)]
#[command(name = "risk-detector", version, about)]
struct Cli {
    /// Recording to replay. Without it the detector subscribes to `--endpoint`.
    #[arg(short, long)]
    file: Option<PathBuf>,

    /// ZeroMQ endpoint publishing live signal updates.
    #[arg(long, env = "ROADRISK_ZMQ_ENDPOINT", default_value = "tcp://127.0.0.1:5556")]
    endpoint: String,

    /// Directory with rule definition YAML files.
    #[arg(long)]
    rules_dir: Option<PathBuf>,

    /// Samples kept per signal.
    #[arg(long)]
    window_size: Option<usize>,

    /// End a live session after this many quiet milliseconds.
    #[arg(long)]
    idle_timeout_ms: Option<u64>,

    /// Also write every risk event to this file as JSON lines.
    #[arg(short, long)]
    output: Option<PathBuf>,
}

impl Cli {
    /// Flags win over environment.
    fn engine_config(&self) -> EngineConfig {
        let mut config = EngineConfig::from_env();
        if let Some(dir) = &self.rules_dir {
            config.rules_dir = dir.clone();
        }
        if let Some(size) = self.window_size {
            config.window_size = size;
        }
        if self.idle_timeout_ms.is_some() {
            config.idle_timeout_ms = self.idle_timeout_ms;
        }
        config
    }
}

// ── main ────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<()> {
    load_dotenv();
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let config = cli.engine_config();
    config.validate().context("invalid engine configuration")?;

    let rules = load_rules(&config)?;

    let sink: Box<dyn RiskEventSink + Send> = match &cli.output {
        Some(path) => {
            let file = JsonLinesSink::create(path)
                .with_context(|| format!("failed to create {}", path.display()))?;
            info!(path = %path.display(), "writing risk events as JSON lines");
            Box::new(FanOutSink::new(LogSink, file))
        }
        None => Box::new(LogSink),
    };
    let mut detector = Detector::new(rules, &config, sink)?;

    let stats = match &cli.file {
        Some(file) => {
            let mut source = CsvReplay::open(file)
                .with_context(|| format!("failed to open recording {}", file.display()))?;
            run_session(&mut detector, &mut source, None).await
        }
        None => {
            let signals: Vec<String> = detector.history().tracked_signals().map(String::from).collect();
            let mut source = ZmqSource::connect(&cli.endpoint, &signals)
                .await
                .with_context(|| format!("failed to subscribe to {}", cli.endpoint))?;
            let idle = config.idle_timeout_ms.map(Duration::from_millis);
            let finished = tokio::select! {
                stats = run_session(&mut detector, &mut source, idle) => Some(stats),
                _ = tokio::signal::ctrl_c() => None,
            };
            finished.unwrap_or_else(|| {
                info!("interrupted, closing session");
                detector.end_session();
                detector.stats()
            })
        }
    };

    info!(
        updates = stats.updates,
        events = stats.events,
        sink_failures = stats.sink_failures,
        "risk-detector exited cleanly"
    );
    Ok(())
}

/// Load, validate and register the rule definitions.
fn load_rules(config: &EngineConfig) -> Result<Arc<RuleSet>> {
    let report = RuleLoader::new(&config.rules_dir)
        .load_all()
        .with_context(|| format!("failed to read rules from {}", config.rules_dir.display()))?;

    let failed = report.failures().count();
    if failed > 0 {
        bail!("{failed} rule file(s) failed to parse");
    }

    let validation = validate_rule_set(&report.rules, config.window_size);
    for warning in &validation.warnings {
        warn!(path = %warning.path, "{}", warning.message);
    }
    if !validation.valid {
        for err in &validation.errors {
            error!(path = %err.path, suggestion = ?err.suggestion, "{}", err.message);
        }
        bail!("{} rule validation error(s)", validation.errors.len());
    }

    let rules = RuleSet::from_definitions(report.rules)?;
    if rules.is_empty() {
        warn!(rules_dir = %config.rules_dir.display(), "no enabled rules, nothing will be detected");
    }
    Ok(Arc::new(rules))
}
