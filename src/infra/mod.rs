//! Infrastructure for shared channels and the envelope protocol.

pub mod channel;
pub mod dispatch;
pub mod envelope;
pub mod negotiation;

pub use channel::SharedChannel;
pub use dispatch::DispatcherClient;
pub use envelope::{
    correlation_hash, receive, reply_envelope, send_envelope, send_with_retry, Envelope, Reply,
};
pub use negotiation::{
    CapacityClient, MaxGrantQuery, MaxGrantResponse, ReservationRequest, ReservationResponse,
    MAX_GRANT_DESCRIPTION, RESERVATION_DESCRIPTION,
};
