//! Best-effort warning sinks.
//!
//! Post-cycle invariant failures are surfaced as warnings, never as errors:
//! a sink must not block, and a failure to notify is swallowed.

use serde::{Deserialize, Serialize};

use crate::infra::channel::SharedChannel;
use crate::infra::envelope::Envelope;

/// Best-effort, non-blocking warning emission.
pub trait NotificationSink: Send + Sync {
    /// Emit a warning. Implementations swallow their own failures.
    fn warn(&self, summary: &str, detail: &str);
}

/// Sink that logs warnings through `tracing`.
pub struct TracingSink;

impl NotificationSink for TracingSink {
    fn warn(&self, summary: &str, detail: &str) {
        tracing::warn!("{summary}: {detail}");
    }
}

/// Payload of a channel-delivered notification.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Notification {
    /// Short headline.
    pub summary: String,
    /// Longer context.
    pub detail: String,
}

/// Sink that writes notifications onto a shared channel for a UI or
/// supervisor to pick up. One write attempt only; a full channel or codec
/// failure drops the notification.
pub struct ChannelSink {
    channel: SharedChannel,
    source: String,
}

impl ChannelSink {
    /// Create a sink writing as `source` onto `channel`.
    pub fn new(channel: SharedChannel, source: impl Into<String>) -> Self {
        Self {
            channel,
            source: source.into(),
        }
    }
}

impl NotificationSink for ChannelSink {
    fn warn(&self, summary: &str, detail: &str) {
        let notification = Notification {
            summary: summary.to_string(),
            detail: detail.to_string(),
        };
        let Ok(envelope) = Envelope::new(self.source.clone(), "notification", notification) else {
            return;
        };
        let Ok(json) = envelope.to_json() else {
            return;
        };
        if !self.channel.try_write(json) {
            tracing::debug!("notification channel full, dropping warning");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn channel_sink_drops_on_full_channel() {
        let channel = SharedChannel::new(1);
        let sink = ChannelSink::new(channel.clone(), "tests");
        sink.warn("first", "lands");
        sink.warn("second", "dropped");
        assert_eq!(channel.len(), 1);
        let head = channel.read().unwrap();
        assert!(head.contains("first"));
    }
}
