//! Profile persistence — a single-key store of `StoredRecord`s keyed by employee number.
//!
//! `put` is a full-record overwrite and the only durability point; concurrent writers to
//! the same key are last-writer-wins. Callers read, merge, then write.

use async_trait::async_trait;
use thiserror::Error;

use crate::models::StoredRecord;

pub mod dynamodb;
pub mod memory;

pub use dynamodb::DynamoProfileStore;
pub use memory::MemoryProfileStore;

#[derive(Debug, Error)]
pub enum StoreError {
    /// The store is unreachable, timed out, or not provisioned.
    #[error("profile store unavailable: {0}")]
    Unavailable(String),

    /// The store was reachable but rejected the write.
    #[error("profile write failed: {0}")]
    Write(String),

    /// A record exists but cannot be decoded.
    #[error("stored record for {employee_number} is unreadable: {reason}")]
    Corrupt {
        employee_number: String,
        reason: String,
    },
}

#[async_trait]
pub trait ProfileStore: Send + Sync {
    /// Returns `Ok(None)` when no record exists for the key.
    async fn get(&self, employee_number: &str) -> Result<Option<StoredRecord>, StoreError>;

    /// Overwrites the whole record stored under `record.employee_number`.
    async fn put(&self, record: &StoredRecord) -> Result<(), StoreError>;

    /// Capability check run once at startup. Never called mid-request.
    async fn check_ready(&self) -> Result<(), StoreError>;

    fn backend_name(&self) -> &'static str;
}
