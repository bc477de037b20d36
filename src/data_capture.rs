//! Byte-stream duplication for intercepted connections.
//!
//! A [`StreamTee`] relays one source to its sinks unmodified while pushing a
//! copy of every chunk into zero or more [`Injector`]s. The matching
//! [`InjectedStream`] is an in-process reader a protocol engine consumes at its
//! own pace: the injector never applies backpressure to the relay.

pub mod injector;
pub mod tee;
pub mod types;

pub use injector::{injected_channel, InjectedStream, Injector};
pub use tee::{StreamTee, BUFSIZE};
pub use types::Direction;
