//! Document store port.
//!
//! This port defines the primitive operations the connector needs from a
//! document/key-value store. Implementations own transport, pooling and
//! socket-level retry; the connector owns everything above that.

use async_trait::async_trait;

use super::StoreError;
use crate::domain::{Cas, DocumentKey, Payload, StoreDocument};
use crate::translator::StoreQuery;

/// Primitive operations of a document store.
///
/// Every single-document write must be atomic at the store level.
///
/// # Design Rules
///
/// - No model semantics: keys and JSON payloads only
/// - `insert` is insert-if-absent and reports `DuplicateKey` atomically
/// - `replace_if_unchanged` compares the supplied `Cas` and reports `Conflict`
/// - `query` returns rows in the store's natural order
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Fetch a document with its current version token.
    ///
    /// Returns `Err(StoreError::NotFound)` if no document exists at `key`.
    async fn get(&self, key: &DocumentKey) -> Result<StoreDocument, StoreError>;

    /// Write a new document.
    ///
    /// Returns `Err(StoreError::DuplicateKey)` if `key` is already taken.
    async fn insert(&self, key: &DocumentKey, payload: Payload) -> Result<Cas, StoreError>;

    /// Write a document, creating or fully replacing it.
    async fn upsert_raw(&self, key: &DocumentKey, payload: Payload) -> Result<Cas, StoreError>;

    /// Replace a document only if its version still equals `cas`.
    ///
    /// Returns `Err(StoreError::Conflict)` when the version moved on and
    /// `Err(StoreError::NotFound)` when the document is gone.
    async fn replace_if_unchanged(
        &self,
        key: &DocumentKey,
        payload: Payload,
        cas: Cas,
    ) -> Result<Cas, StoreError>;

    /// Delete a document.
    ///
    /// Returns `Err(StoreError::NotFound)` if no document exists at `key`.
    async fn remove(&self, key: &DocumentKey) -> Result<(), StoreError>;

    /// Run a translated query.
    async fn query(&self, query: &StoreQuery) -> Result<Vec<StoreDocument>, StoreError>;

    /// Whether `LIMIT`/`OFFSET` are executed by the store itself.
    fn supports_paging(&self) -> bool;

    /// Release the store handle. Called once by the connector on disconnect.
    async fn close(&self) -> Result<(), StoreError> {
        Ok(())
    }
}
