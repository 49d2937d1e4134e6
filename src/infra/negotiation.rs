//! Typed capacity negotiation over the allocator's shared channel.
//!
//! Wraps the envelope protocol into the two exchanges the engine needs:
//! "reserve `ram_cost` units for \[start, end)" and the side-effect-free
//! "largest grantable chunk right now" query. Denials and timeouts both
//! resolve to an unsuccessful response rather than an error or a block.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::core::error::EngineError;
use crate::infra::channel::SharedChannel;
use crate::infra::envelope::{receive, send_envelope, Envelope};

/// Envelope description for reservation requests; allocators route on it.
pub const RESERVATION_DESCRIPTION: &str = "reservation request";
/// Envelope description for max-grantable queries.
pub const MAX_GRANT_DESCRIPTION: &str = "max grant query";

/// Request to reserve capacity for a time window.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReservationRequest {
    /// Capacity units requested.
    pub ram_cost: f64,
    /// Window start, milliseconds since epoch.
    pub start_time_ms: u128,
    /// Window end, milliseconds since epoch.
    pub end_time_ms: u128,
}

/// Allocator's answer to a [`ReservationRequest`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReservationResponse {
    /// Whether the reservation was granted.
    pub success: bool,
    /// Assigned host; present only on success.
    pub host: Option<String>,
    /// Echoed window start.
    pub start_time_ms: u128,
    /// Echoed window end.
    pub end_time_ms: u128,
}

impl ReservationResponse {
    /// The response used for timeouts and malformed exchanges: an explicit
    /// denial carrying no host.
    #[must_use]
    pub const fn denied(start_time_ms: u128, end_time_ms: u128) -> Self {
        Self {
            success: false,
            host: None,
            start_time_ms,
            end_time_ms,
        }
    }
}

/// Side-effect-free query for the largest contiguous grant available now.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MaxGrantQuery;

/// Answer to a [`MaxGrantQuery`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MaxGrantResponse {
    /// Largest grantable capacity in units.
    pub units: f64,
}

/// Client side of the capacity negotiation protocol.
pub struct CapacityClient {
    channel: SharedChannel,
    source: String,
    timeout: Duration,
}

impl CapacityClient {
    /// Create a client speaking on the allocator's channel as `source`.
    pub fn new(channel: SharedChannel, source: impl Into<String>, timeout: Duration) -> Self {
        Self {
            channel,
            source: source.into(),
            timeout,
        }
    }

    /// Reserve `ram_cost` units for \[`start_time_ms`, `end_time_ms`).
    ///
    /// A timeout or explicit denial returns `success = false` with no host.
    ///
    /// # Errors
    /// Only transport-level failures (serialization, channel jammed past the
    /// send timeout) surface as errors.
    pub async fn request_capacity(
        &self,
        ram_cost: f64,
        start_time_ms: u128,
        end_time_ms: u128,
    ) -> Result<ReservationResponse, EngineError> {
        let request = ReservationRequest {
            ram_cost,
            start_time_ms,
            end_time_ms,
        };
        let envelope = Envelope::new(self.source.clone(), RESERVATION_DESCRIPTION, request)?;
        let correlation_id = envelope.correlation_id;
        send_envelope(&self.channel, &envelope, self.timeout).await?;

        let reply = receive::<ReservationRequest, ReservationResponse>(
            &self.channel,
            correlation_id,
            &self.source,
            self.timeout,
        )
        .await?;

        Ok(reply.map_or_else(
            || {
                tracing::debug!(
                    "no reservation response within {:?}, treating as denial",
                    self.timeout
                );
                ReservationResponse::denied(start_time_ms, end_time_ms)
            },
            |r| r.data,
        ))
    }

    /// Ask the allocator for the single largest grant currently available.
    ///
    /// Informational only; the allocator's state is unchanged. `None` means
    /// the allocator did not answer in time.
    ///
    /// # Errors
    /// Only transport-level failures surface as errors.
    pub async fn query_max_grantable(&self) -> Result<Option<f64>, EngineError> {
        let envelope = Envelope::new(self.source.clone(), MAX_GRANT_DESCRIPTION, MaxGrantQuery)?;
        let correlation_id = envelope.correlation_id;
        send_envelope(&self.channel, &envelope, self.timeout).await?;

        let reply = receive::<MaxGrantQuery, MaxGrantResponse>(
            &self.channel,
            correlation_id,
            &self.source,
            self.timeout,
        )
        .await?;
        Ok(reply.map(|r| r.data.units))
    }
}
