//! Producers of signal updates.
//!
//! The engine only needs `(name, value, timestamp)` tuples. Each source turns
//! its own wire format into [`SignalUpdate`]s and rejects malformed records
//! here, at the boundary, so the detector never sees them.

use std::fs::File;
use std::io::Read;
use std::path::Path;

use async_trait::async_trait;
use roadrisk_core::SignalUpdate;
use thiserror::Error;
use tokio::sync::mpsc;
use tracing::{debug, info};
use zeromq::prelude::*;
use zeromq::SubSocket;

/// Column positions in recording files: `<id>,<name>,<timestamp>,<value>`.
const NAME_FIELD: usize = 1;
const TIMESTAMP_FIELD: usize = 2;
const VALUE_FIELD: usize = 3;

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("zeromq error: {0}")]
    Zmq(#[from] zeromq::ZmqError),

    #[error("malformed record at {location}: {reason}")]
    Malformed { location: String, reason: String },
}

impl SourceError {
    fn malformed(location: impl Into<String>, reason: impl Into<String>) -> Self {
        SourceError::Malformed {
            location: location.into(),
            reason: reason.into(),
        }
    }

    /// Whether the source can keep producing after this error.
    pub fn is_recoverable(&self) -> bool {
        match self {
            SourceError::Io(_) => false,
            SourceError::Csv(e) => !matches!(e.kind(), csv::ErrorKind::Io(_)),
            SourceError::Zmq(_) | SourceError::Malformed { .. } => true,
        }
    }
}

/// Anything that yields signal updates in arrival order.
///
/// `None` means the producer is exhausted and the session is over.
#[async_trait]
pub trait SignalSource: Send {
    async fn next_update(&mut self) -> Option<Result<SignalUpdate, SourceError>>;
}

// ── Recording replay ────────────────────────────────────────────────

/// Replays a comma-separated recording. The first line is a header.
pub struct CsvReplay<R> {
    records: csv::StringRecordsIntoIter<R>,
}

impl CsvReplay<File> {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, SourceError> {
        let path = path.as_ref();
        let reader = reader_builder().from_path(path)?;
        info!(path = %path.display(), "replaying recording");
        Ok(Self {
            records: reader.into_records(),
        })
    }
}

impl<R: Read> CsvReplay<R> {
    pub fn from_reader(reader: R) -> Self {
        Self {
            records: reader_builder().from_reader(reader).into_records(),
        }
    }
}

fn reader_builder() -> csv::ReaderBuilder {
    let mut builder = csv::ReaderBuilder::new();
    builder.has_headers(true).flexible(true).quote(b'"');
    builder
}

impl<R: Read> Iterator for CsvReplay<R> {
    type Item = Result<SignalUpdate, SourceError>;

    fn next(&mut self) -> Option<Self::Item> {
        let record = match self.records.next()? {
            Ok(record) => record,
            Err(e) => return Some(Err(e.into())),
        };
        Some(parse_record(&record))
    }
}

#[async_trait]
impl<R: Read + Send> SignalSource for CsvReplay<R> {
    async fn next_update(&mut self) -> Option<Result<SignalUpdate, SourceError>> {
        self.next()
    }
}

fn parse_record(record: &csv::StringRecord) -> Result<SignalUpdate, SourceError> {
    let location = match record.position() {
        Some(pos) => format!("line {}", pos.line()),
        None => "unknown line".to_string(),
    };
    let field = |index: usize, what: &str| {
        record
            .get(index)
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .ok_or_else(|| SourceError::malformed(&location, format!("missing {what}")))
    };

    let name = field(NAME_FIELD, "signal name")?;
    let timestamp = parse_number(field(TIMESTAMP_FIELD, "timestamp")?, "timestamp", &location)?;
    let value = parse_number(field(VALUE_FIELD, "value")?, "value", &location)?;
    Ok(SignalUpdate::new(name, value, timestamp))
}

fn parse_number(raw: &str, what: &str, location: &str) -> Result<f64, SourceError> {
    raw.parse::<f64>()
        .map_err(|_| SourceError::malformed(location, format!("{what} '{raw}' is not a number")))
}

// ── In-process channel ──────────────────────────────────────────────

/// Serializes updates from any number of producers into one ordered queue.
///
/// Clone the sender for every concurrent producer; the detector sees updates
/// in the order the channel received them.
pub struct ChannelSource {
    rx: mpsc::Receiver<SignalUpdate>,
}

impl ChannelSource {
    pub fn channel(capacity: usize) -> (mpsc::Sender<SignalUpdate>, Self) {
        let (tx, rx) = mpsc::channel(capacity);
        (tx, Self { rx })
    }
}

#[async_trait]
impl SignalSource for ChannelSource {
    async fn next_update(&mut self) -> Option<Result<SignalUpdate, SourceError>> {
        self.rx.recv().await.map(Ok)
    }
}

// ── Live ZeroMQ subscription ────────────────────────────────────────

/// Live signal feed over a ZeroMQ SUB socket.
///
/// Publishers send two frames, `[topic, value]`, where the topic is the
/// signal name with `_` written as `/` (e.g. `Vehicle/Speed`) and the value
/// is a decimal number as text. The timestamp is the time of receipt.
pub struct ZmqSource {
    socket: SubSocket,
}

impl ZmqSource {
    /// Connect to `endpoint` and subscribe to one topic per signal.
    pub async fn connect<I, S>(endpoint: &str, signals: I) -> Result<Self, SourceError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut socket = SubSocket::new();
        info!(endpoint = %endpoint, "connecting SUB socket to signal publisher");
        socket.connect(endpoint).await?;
        for signal in signals {
            let topic = signal_to_topic(signal.as_ref());
            socket.subscribe(&topic).await?;
            debug!(topic = %topic, "subscribed to signal topic");
        }
        Ok(Self { socket })
    }
}

#[async_trait]
impl SignalSource for ZmqSource {
    async fn next_update(&mut self) -> Option<Result<SignalUpdate, SourceError>> {
        let message = match self.socket.recv().await {
            Ok(message) => message,
            Err(e) => return Some(Err(e.into())),
        };
        let frames: Vec<&[u8]> = message.iter().map(|frame| frame.as_ref()).collect();
        let received_at = chrono::Utc::now().timestamp_millis() as f64;
        Some(decode_frames(&frames, received_at))
    }
}

/// Topic a signal is published under.
pub fn signal_to_topic(signal: &str) -> String {
    signal.replace('_', "/")
}

/// Signal name for a received topic.
pub fn topic_to_signal(topic: &str) -> String {
    topic.replace('/', "_")
}

/// Decode `[topic, value]`, or a single `"topic value"` frame.
fn decode_frames(frames: &[&[u8]], received_at: f64) -> Result<SignalUpdate, SourceError> {
    let (topic, payload) = match frames {
        [topic, payload, ..] => (frame_text(topic)?, frame_text(payload)?),
        [single] => frame_text(single)?
            .split_once(char::is_whitespace)
            .map(|(t, p)| (t, p.trim()))
            .ok_or_else(|| SourceError::malformed("zmq message", "single frame without payload"))?,
        [] => return Err(SourceError::malformed("zmq message", "empty message")),
    };

    let value = parse_number(payload, "value", topic)?;
    Ok(SignalUpdate::new(topic_to_signal(topic), value, received_at))
}

fn frame_text(bytes: &[u8]) -> Result<&str, SourceError> {
    std::str::from_utf8(bytes)
        .map(str::trim)
        .map_err(|_| SourceError::malformed("zmq message", "frame is not UTF-8"))
}
