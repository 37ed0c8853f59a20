//! Connection handles, the identity registry, authentication, and keepalive.

pub mod authenticator;
pub mod handle;
pub mod heartbeat;
pub mod registry;

pub use authenticator::WsAuthenticator;
pub use handle::{ConnectionFrame, ConnectionHandle};
pub use heartbeat::{HeartbeatConfig, run_heartbeat};
pub use registry::{ConnectionRegistry, Delivery};
