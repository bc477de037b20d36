//! Protocol engines reconstructing print jobs from an injected byte stream.
//!
//! An engine consumes the copy of the bytes a client submits to its print
//! server and stores every completed job through the shared [`Storage`].
//! Engines are looked up by name in a [`ProtocolRegistry`].
//!
//! [`Storage`]: crate::storage::Storage

pub mod engine;
pub mod lpd;
pub mod registry;

pub use engine::{JobContext, JobOutcome, ProtocolEngine};
pub use lpd::LpdEngine;
pub use registry::{ProtocolDescriptor, ProtocolRegistry};
