//! Scripted allocator stand-in shared by the integration tests.
//!
//! The real allocator is an external collaborator; tests drive the engine
//! against this task, which serves reservation requests from a scripted
//! grant/deny list and answers capacity queries with a fixed figure.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use extraction_scheduler::infra::{
    reply_envelope, send_with_retry, Envelope, MaxGrantQuery, MaxGrantResponse,
    ReservationRequest, ReservationResponse, SharedChannel, MAX_GRANT_DESCRIPTION,
    RESERVATION_DESCRIPTION,
};

pub(crate) struct AllocatorScript {
    /// Grant decisions in arrival order; exhausted entries default to grant.
    pub(crate) grants: Vec<bool>,
    /// Answer for every max-grant query.
    pub(crate) max_grant_units: f64,
}

/// Spawn the allocator task on `channel`; the returned counter tracks how
/// many reservation requests it served. The task runs until the test's
/// runtime shuts down.
pub(crate) fn spawn_allocator(channel: SharedChannel, script: AllocatorScript) -> Arc<AtomicUsize> {
    extraction_scheduler::util::init_tracing();
    let served = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&served);
    let units = script.max_grant_units;
    tokio::spawn(async move {
        let mut decisions = script.grants.into_iter();
        loop {
            let Some(head) = channel.peek() else {
                tokio::time::sleep(Duration::from_millis(1)).await;
                continue;
            };
            let Ok(probe) = serde_json::from_str::<Envelope<serde_json::Value>>(&head) else {
                tokio::time::sleep(Duration::from_millis(1)).await;
                continue;
            };
            if probe.description == RESERVATION_DESCRIPTION {
                if channel.pop_head_if(|entry| entry == head).is_none() {
                    continue;
                }
                let request: Envelope<ReservationRequest> = serde_json::from_str(&head).unwrap();
                let index = counter.fetch_add(1, Ordering::SeqCst);
                let response = if decisions.next().unwrap_or(true) {
                    ReservationResponse {
                        success: true,
                        host: Some(format!("host-{index}")),
                        start_time_ms: request.payload.start_time_ms,
                        end_time_ms: request.payload.end_time_ms,
                    }
                } else {
                    ReservationResponse::denied(
                        request.payload.start_time_ms,
                        request.payload.end_time_ms,
                    )
                };
                let reply =
                    reply_envelope("allocator", "reservation response", request, response).unwrap();
                send_with_retry(&channel, reply.to_json().unwrap(), Duration::from_millis(500))
                    .await
                    .unwrap();
            } else if probe.description == MAX_GRANT_DESCRIPTION {
                if channel.pop_head_if(|entry| entry == head).is_none() {
                    continue;
                }
                let request: Envelope<MaxGrantQuery> = serde_json::from_str(&head).unwrap();
                let reply = reply_envelope(
                    "allocator",
                    "max grant response",
                    request,
                    MaxGrantResponse { units },
                )
                .unwrap();
                send_with_retry(&channel, reply.to_json().unwrap(), Duration::from_millis(500))
                    .await
                    .unwrap();
            } else {
                // A reply waiting for its requester; leave it alone.
                tokio::time::sleep(Duration::from_millis(1)).await;
            }
        }
    });
    served
}
