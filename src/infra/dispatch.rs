//! Fire-and-forget handoff of scheduled jobs to the execution dispatcher.

use std::time::Duration;

use crate::core::error::EngineError;
use crate::core::job::{DispatchInstruction, ScheduledJob};
use crate::infra::channel::SharedChannel;
use crate::infra::envelope::{send_envelope, Envelope};

/// Client side of the dispatcher channel.
///
/// The dispatcher alone is responsible for invoking each operation on its
/// assigned host at its assigned time and for reporting execution failures
/// elsewhere; once an instruction is written here it is not retracted.
pub struct DispatcherClient {
    channel: SharedChannel,
    source: String,
    timeout: Duration,
}

impl DispatcherClient {
    /// Create a client writing to the dispatcher's channel as `source`.
    pub fn new(channel: SharedChannel, source: impl Into<String>, timeout: Duration) -> Self {
        Self {
            channel,
            source: source.into(),
            timeout,
        }
    }

    /// Forward one reserved job, using non-blocking writes with retry.
    ///
    /// # Errors
    /// Returns [`EngineError::SendTimeout`] when the dispatcher channel stays
    /// full past the timeout, or a codec error for unserializable payloads.
    pub async fn dispatch(&self, scheduled: &ScheduledJob) -> Result<(), EngineError> {
        let instruction = DispatchInstruction::from(scheduled);
        let description = format!("dispatch job {}", instruction.label);
        let envelope = Envelope::new(self.source.clone(), description, instruction)?;
        send_envelope(&self.channel, &envelope, self.timeout).await?;
        tracing::debug!(
            "dispatched {} on {} starting {}",
            scheduled.job.label,
            scheduled.host,
            scheduled.job.start_time_ms
        );
        Ok(())
    }
}
