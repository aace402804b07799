//! Signal-history and rule-evaluation engine for vehicle risk events.
//!
//! For every incoming signal update the [`Detector`] records the value in a
//! bounded history, runs each registered [`RiskRule`] in order and forwards
//! the resulting [`RiskEvent`](roadrisk_core::RiskEvent)s to a sink.
//! Per-rule cooldown and episode state live in the [`DebounceRegistry`].

pub mod debounce;
pub mod dispatch;
pub mod error;
pub mod evaluator;
pub mod session;
pub mod sink;
pub mod source;

pub use debounce::{DebounceRegistry, RuleState};
pub use dispatch::{DispatchOutcome, Detector, SessionStats};
pub use error::EngineError;
pub use evaluator::{ConfiguredRule, RiskRule, RuleSet};
pub use session::run_session;
pub use sink::{
    CollectingSink, FanOutSink, FnSink, JsonLinesSink, LogSink, RiskEventSink, SinkError,
};
pub use source::{ChannelSource, CsvReplay, SignalSource, SourceError, ZmqSource};
