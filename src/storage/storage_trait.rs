//! Storage Trait
//!
//! This module defines the `Storage` trait, the interface protocol engines use
//! to persist the payload of a completed print job.

use crate::error_handling::types::StorageError;
use crate::storage::types::Digest;

/// The `Storage` trait defines the interface for job payload storage backends.
///
/// Implementors name every payload by its [`Digest`], so storing identical bytes
/// twice is idempotent. Shared between every session of every listener.
pub trait Storage: Send + Sync {
    /// Persists `data` and returns the digest it is stored under.
    fn store(&self, data: &[u8]) -> Result<Digest, StorageError>;
}
