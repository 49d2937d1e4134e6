//! External world-state boundary: providers, caching, notifications.

pub mod cache;
pub mod notify;
pub mod state;

pub use cache::CachedWorld;
pub use notify::{ChannelSink, Notification, NotificationSink, TracingSink};
pub use state::{ActorState, TargetState, WorldState};
