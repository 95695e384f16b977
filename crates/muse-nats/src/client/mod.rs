//! NATS client connection management and configuration.

mod nats_client;
mod nats_config;

pub use nats_client::NatsClient;
pub use nats_config::{MAX_RECONNECT_DELAY, NatsConfig};
