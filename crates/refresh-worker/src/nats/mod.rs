//! NATS JetStream integration.

mod subscriber;

pub use subscriber::{NatsSubscriber, RefreshNotification};
