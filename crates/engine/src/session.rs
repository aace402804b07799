//! Drives a signal source into a detector.

use std::time::Duration;

use tracing::{info, warn};

use crate::dispatch::{Detector, SessionStats};
use crate::sink::RiskEventSink;
use crate::source::{SignalSource, SourceError};

/// Pause before polling a live source again after a transport error.
const RETRY_DELAY: Duration = Duration::from_millis(100);

/// Consecutive transport errors after which the source is given up on.
const MAX_TRANSPORT_RETRIES: u32 = 10;

/// Feed every update from `source` into `detector`, one at a time, in
/// arrival order.
///
/// Malformed records are logged and skipped. Transport errors are retried
/// a bounded number of times in a row. When the source is exhausted (or
/// fails for good) the session is ended once. With an `idle_timeout`,
/// a quiet period after activity also ends the session; the loop then keeps
/// waiting for the next update, which opens a fresh session.
pub async fn run_session<S, Src>(
    detector: &mut Detector<S>,
    source: &mut Src,
    idle_timeout: Option<Duration>,
) -> SessionStats
where
    S: RiskEventSink,
    Src: SignalSource + ?Sized,
{
    let mut in_session = false;
    let mut transport_errors = 0u32;

    loop {
        let next = match idle_timeout {
            Some(limit) => match tokio::time::timeout(limit, source.next_update()).await {
                Ok(next) => next,
                Err(_) => {
                    if in_session {
                        info!(idle_ms = limit.as_millis() as u64, "signal stream idle");
                        detector.end_session();
                        in_session = false;
                    }
                    continue;
                }
            },
            None => source.next_update().await,
        };

        match next {
            Some(Ok(update)) => {
                transport_errors = 0;
                detector.on_signal(&update);
                in_session = true;
            }
            Some(Err(e @ SourceError::Zmq(_))) => {
                transport_errors += 1;
                if transport_errors > MAX_TRANSPORT_RETRIES {
                    warn!(error = %e, retries = MAX_TRANSPORT_RETRIES, "signal source unreachable, ending session");
                    break;
                }
                warn!(error = %e, attempt = transport_errors, "signal source receive error");
                tokio::time::sleep(RETRY_DELAY).await;
            }
            Some(Err(e)) if e.is_recoverable() => {
                warn!(error = %e, "rejected signal record");
            }
            Some(Err(e)) => {
                warn!(error = %e, "signal source failed, ending session");
                break;
            }
            None => break,
        }
    }

    detector.end_session();
    let stats = detector.stats();
    info!(
        updates = stats.updates,
        ignored = stats.ignored,
        events = stats.events,
        sink_failures = stats.sink_failures,
        "signal stream finished"
    );
    stats
}
