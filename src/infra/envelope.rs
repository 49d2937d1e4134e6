//! Correlation-and-timeout request/response framing over a shared channel.
//!
//! Requests travel as [`Envelope`]s whose correlation id is a deterministic
//! hash of the source, description, and serialized payload; the same request
//! content always hashes to the same id (idempotency-friendly, but not a
//! guarantee against duplicate sends). Responses travel as envelopes whose
//! payload is a [`Reply`] embedding the full request envelope, so a receiver
//! can match on both correlation id and source.
//!
//! The channel is shared by many concurrent requesters. [`receive`] therefore
//! only ever consumes the head entry when it is (a) provably garbage nobody
//! can parse, or (b) the reply addressed to this receiver. Everything else is
//! left in place for its rightful consumer.

use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tokio::time::Instant;

use crate::core::error::EngineError;
use crate::infra::channel::SharedChannel;
use crate::util::clock::now_ms;

/// Interval between channel polls while waiting to write or receive.
const POLL_INTERVAL: Duration = Duration::from_millis(1);

/// A correlated message on a shared channel.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Envelope<T> {
    /// Deterministic hash of source + description + serialized payload.
    pub correlation_id: i64,
    /// Identifier of the sending instance.
    pub source: String,
    /// Human-readable request description; responders may route on it.
    pub description: String,
    /// Typed payload.
    pub payload: T,
    /// Creation timestamp, milliseconds since epoch.
    pub created_at_ms: u128,
}

/// Response payload embedding the request envelope it answers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Reply<Req, Res> {
    /// The original request envelope, echoed back for correlation.
    pub request: Envelope<Req>,
    /// The responder's data.
    pub data: Res,
}

impl<T: Serialize> Envelope<T> {
    /// Build an envelope, deriving the correlation id from its content.
    ///
    /// # Errors
    /// Returns [`EngineError::Codec`] when the payload cannot be serialized.
    pub fn new(
        source: impl Into<String>,
        description: impl Into<String>,
        payload: T,
    ) -> Result<Self, EngineError> {
        let source = source.into();
        let description = description.into();
        let payload_json = serde_json::to_string(&payload)?;
        let correlation_id = correlation_hash(&source, &description, &payload_json);
        Ok(Self {
            correlation_id,
            source,
            description,
            payload,
            created_at_ms: now_ms(),
        })
    }

    /// Serialize the envelope to its wire form.
    ///
    /// # Errors
    /// Returns [`EngineError::Codec`] when serialization fails.
    pub fn to_json(&self) -> Result<String, EngineError> {
        Ok(serde_json::to_string(self)?)
    }
}

/// Wrap response data in an envelope answering `request`.
///
/// Responders (the allocator, test doubles) use this to produce replies the
/// requester's [`receive`] will match.
///
/// # Errors
/// Returns [`EngineError::Codec`] when the reply cannot be serialized.
pub fn reply_envelope<Req: Serialize, Res: Serialize>(
    responder_source: impl Into<String>,
    description: impl Into<String>,
    request: Envelope<Req>,
    data: Res,
) -> Result<Envelope<Reply<Req, Res>>, EngineError> {
    Envelope::new(responder_source, description, Reply { request, data })
}

/// Deterministic 31-multiplier wrapping hash over the request content.
#[must_use]
pub fn correlation_hash(source: &str, description: &str, payload_json: &str) -> i64 {
    let mut hash: i32 = 0;
    for byte in source
        .bytes()
        .chain(description.bytes())
        .chain(payload_json.bytes())
    {
        hash = hash.wrapping_mul(31).wrapping_add(i32::from(byte));
    }
    i64::from(hash)
}

/// Write a message with non-blocking retries until it lands or `timeout`
/// elapses.
///
/// # Errors
/// Returns [`EngineError::SendTimeout`] when the channel stays full past the
/// timeout.
pub async fn send_with_retry(
    channel: &SharedChannel,
    message: String,
    timeout: Duration,
) -> Result<(), EngineError> {
    let deadline = Instant::now() + timeout;
    while !channel.try_write(message.clone()) {
        if Instant::now() >= deadline {
            tracing::warn!("channel still full after {:?}, dropping send", timeout);
            return Err(EngineError::SendTimeout(timeout));
        }
        tokio::time::sleep(POLL_INTERVAL).await;
    }
    Ok(())
}

/// Serialize and send an envelope with the retry discipline of
/// [`send_with_retry`].
///
/// # Errors
/// Propagates codec failures and send timeouts.
pub async fn send_envelope<T: Serialize>(
    channel: &SharedChannel,
    envelope: &Envelope<T>,
    timeout: Duration,
) -> Result<(), EngineError> {
    send_with_retry(channel, envelope.to_json()?, timeout).await
}

/// Await the reply matching `correlation_id` and `source`, polling the
/// channel without disturbing other consumers' messages.
///
/// Returns `Ok(None)` when no matching reply arrives before `timeout`: an
/// explicit "no response", never an indefinite block. Head entries that are
/// not valid JSON objects can belong to nobody and are consumed and logged;
/// any other entry is left untouched.
///
/// # Errors
/// This function does not currently fail; the `Result` reserves room for
/// transport-level errors and keeps call sites uniform with the send path.
pub async fn receive<Req, Res>(
    channel: &SharedChannel,
    correlation_id: i64,
    source: &str,
    timeout: Duration,
) -> Result<Option<Reply<Req, Res>>, EngineError>
where
    Req: DeserializeOwned,
    Res: DeserializeOwned,
{
    let deadline = Instant::now() + timeout;
    loop {
        if let Some(head) = channel.peek() {
            if !is_json_object(&head) {
                if channel.pop_head_if(|entry| entry == head).is_some() {
                    tracing::debug!("discarding malformed channel entry: {}", head);
                }
                continue;
            }
            if let Ok(envelope) = serde_json::from_str::<Envelope<Reply<Req, Res>>>(&head) {
                if envelope.payload.request.correlation_id == correlation_id
                    && envelope.payload.request.source == source
                {
                    // Guard against racing consumers between peek and pop.
                    if channel.pop_head_if(|entry| entry == head).is_some() {
                        return Ok(Some(envelope.payload));
                    }
                    continue;
                }
            }
            // Someone else's message; leave it for its rightful consumer.
        }
        if Instant::now() >= deadline {
            return Ok(None);
        }
        tokio::time::sleep(POLL_INTERVAL).await;
    }
}

fn is_json_object(entry: &str) -> bool {
    serde_json::from_str::<serde_json::Value>(entry)
        .map(|value| value.is_object())
        .unwrap_or(false)
}
