//! Storage subsystem
//!
//! This module provides the persistence of intercepted print jobs.
//!
//! Components:
//! - `storage_trait`: the Storage trait defining a uniform API.
//! - `types`: the `Digest` naming a stored payload.
//! - `file_storage`: content-addressed filesystem implementation.

pub mod file_storage;
pub mod storage_trait;
pub mod types;

pub use file_storage::FileStorage;
pub use storage_trait::Storage;
pub use types::Digest;
