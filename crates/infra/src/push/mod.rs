//! Server-push channel: SSE framing, wire decoding, and the reconnecting
//! listener task.

pub mod listener;
pub mod sse;
pub mod wire;

pub use listener::{ListenerMessage, PushListener, PushListenerConfig};
