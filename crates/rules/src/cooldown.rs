//! Human-readable cooldown durations.

use std::time::Duration;

/// Parse a human-readable duration string into a [`Duration`].
///
/// Supports components: `Xh` (hours), `Xm` (minutes), `Xs` (seconds) and
/// `Xms` (milliseconds). Components can be combined: "1m30s", "2s500ms".
/// A bare number is read as seconds. Returns `None` if the string is empty
/// or unparseable.
pub fn parse_cooldown(s: &str) -> Option<Duration> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }

    if let Ok(secs) = s.parse::<f64>() {
        return Duration::try_from_secs_f64(secs).ok();
    }

    let mut total_ms: u64 = 0;
    let mut num_buf = String::new();
    let mut chars = s.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch.is_ascii_digit() {
            num_buf.push(ch);
            continue;
        }
        let n: u64 = num_buf.parse().ok()?;
        num_buf.clear();
        let unit_ms = match ch {
            'h' => 3_600_000,
            'm' if chars.peek() == Some(&'s') => {
                chars.next();
                1
            }
            'm' => 60_000,
            's' => 1_000,
            _ => return None,
        };
        total_ms = total_ms.checked_add(n.checked_mul(unit_ms)?)?;
    }

    // "30m15": trailing digits without a unit are ambiguous.
    if !num_buf.is_empty() {
        return None;
    }

    Some(Duration::from_millis(total_ms))
}

/// Cooldown as engine timestamp units (milliseconds).
pub fn cooldown_ms(s: &str) -> Option<f64> {
    parse_cooldown(s).map(|d| d.as_secs_f64() * 1000.0)
}
