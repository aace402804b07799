//! Downstream consumers of risk events.
//!
//! A sink is called synchronously, in rule order, zero or more times per
//! update. It must not block indefinitely: the engine has no backpressure.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use roadrisk_core::RiskEvent;
use thiserror::Error;
use tracing::info;

#[derive(Debug, Error)]
pub enum SinkError {
    #[error("sink I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("sink serialization error: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("event rejected: {0}")]
    Rejected(String),
}

/// Receives every emitted risk event.
pub trait RiskEventSink {
    fn on_risk_event(&mut self, event: RiskEvent) -> Result<(), SinkError>;
}

impl<S: RiskEventSink + ?Sized> RiskEventSink for &mut S {
    fn on_risk_event(&mut self, event: RiskEvent) -> Result<(), SinkError> {
        (**self).on_risk_event(event)
    }
}

impl<S: RiskEventSink + ?Sized> RiskEventSink for Box<S> {
    fn on_risk_event(&mut self, event: RiskEvent) -> Result<(), SinkError> {
        (**self).on_risk_event(event)
    }
}

// ── Log sink ────────────────────────────────────────────────────────

/// Writes one structured log line per event.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogSink;

impl RiskEventSink for LogSink {
    fn on_risk_event(&mut self, event: RiskEvent) -> Result<(), SinkError> {
        info!(
            event = %event.name,
            timestamp = event.timestamp,
            risk_level = %event.risk_level,
            start = event.is_start(),
            "received risk event"
        );
        Ok(())
    }
}

// ── In-memory sink ──────────────────────────────────────────────────

/// Keeps every event, for tests and embedding.
#[derive(Debug, Default)]
pub struct CollectingSink {
    events: Vec<RiskEvent>,
}

impl CollectingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> &[RiskEvent] {
        &self.events
    }

    /// Drain collected events.
    pub fn take(&mut self) -> Vec<RiskEvent> {
        std::mem::take(&mut self.events)
    }
}

impl RiskEventSink for CollectingSink {
    fn on_risk_event(&mut self, event: RiskEvent) -> Result<(), SinkError> {
        self.events.push(event);
        Ok(())
    }
}

// ── JSON lines sink ─────────────────────────────────────────────────

/// Serializes each event as one JSON object per line.
///
/// This is the hand-off point to whatever ships events off the vehicle.
#[derive(Debug)]
pub struct JsonLinesSink<W: Write> {
    writer: W,
}

impl JsonLinesSink<BufWriter<File>> {
    /// Create (or truncate) a file sink.
    pub fn create(path: impl AsRef<Path>) -> std::io::Result<Self> {
        Ok(Self::new(BufWriter::new(File::create(path)?)))
    }
}

impl<W: Write> JsonLinesSink<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write> RiskEventSink for JsonLinesSink<W> {
    fn on_risk_event(&mut self, event: RiskEvent) -> Result<(), SinkError> {
        serde_json::to_writer(&mut self.writer, &event)?;
        self.writer.write_all(b"\n")?;
        self.writer.flush()?;
        Ok(())
    }
}

// ── Adapters ────────────────────────────────────────────────────────

/// Wraps a closure as a sink.
pub struct FnSink<F>(pub F);

impl<F> RiskEventSink for FnSink<F>
where
    F: FnMut(RiskEvent) -> Result<(), SinkError>,
{
    fn on_risk_event(&mut self, event: RiskEvent) -> Result<(), SinkError> {
        (self.0)(event)
    }
}

/// Delivers every event to two sinks. Both are always called; the first
/// error wins.
#[derive(Debug, Default)]
pub struct FanOutSink<A, B> {
    pub first: A,
    pub second: B,
}

impl<A, B> FanOutSink<A, B> {
    pub fn new(first: A, second: B) -> Self {
        Self { first, second }
    }
}

impl<A: RiskEventSink, B: RiskEventSink> RiskEventSink for FanOutSink<A, B> {
    fn on_risk_event(&mut self, event: RiskEvent) -> Result<(), SinkError> {
        let first = self.first.on_risk_event(event.clone());
        let second = self.second.on_risk_event(event);
        first.and(second)
    }
}
