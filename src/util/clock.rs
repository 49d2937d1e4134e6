//! Wall-clock helpers: epoch-millisecond timestamps and absolute sleeps.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Current wall-clock time in milliseconds since the Unix epoch.
#[must_use]
pub fn now_ms() -> u128 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis()
}

/// Suspend until the given absolute timestamp (milliseconds since epoch).
///
/// Returns immediately when the timestamp is already in the past. This is
/// one of the engine's three sanctioned suspension points.
pub async fn sleep_until_ms(deadline_ms: u128) {
    let now = now_ms();
    if deadline_ms > now {
        let delta = u64::try_from(deadline_ms - now).unwrap_or(u64::MAX);
        tracing::debug!("sleeping {}ms until {}", delta, fmt_clock(deadline_ms));
        tokio::time::sleep(Duration::from_millis(delta)).await;
    }
}

/// Render an epoch-millisecond timestamp as `hh:mm:ss.mmm` (UTC clock time).
///
/// Used for human-readable job labels; not intended for parsing.
#[must_use]
pub fn fmt_clock(ms: u128) -> String {
    let secs = ms / 1000;
    format!(
        "{:02}:{:02}:{:02}.{:03}",
        (secs / 3600) % 24,
        (secs / 60) % 60,
        secs % 60,
        ms % 1000
    )
}
