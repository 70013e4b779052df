//! Minimal topic-multiplexed PUB/SUB bus over `tokio` TCP.
//!
//! No ZeroMQ/nanomsg binding exists anywhere in this workspace's dependency
//! stack, so the bus described by the wire contract (`bind`/`connect`,
//! `[topic, payload]` multipart delivery) is implemented directly here,
//! reusing the same "4-byte big-endian length prefix per part" framing the
//! VadPacket transport uses. One task per socket, no shared event loop,
//! matching the rest of this workspace.

pub mod binding_subscriber;
pub mod connecting_publisher;
pub mod publisher;
pub mod subscriber;
pub mod wire;

pub use binding_subscriber::BindingSubscriber;
pub use connecting_publisher::ConnectingPublisher;
pub use publisher::BusPublisher;
pub use subscriber::BusSubscriber;
