//! Port definitions (trait abstractions) for external systems.
//!
//! Ports define the interfaces the connector expects from infrastructure.
//! They contain no implementation details and use only domain types.
//!
//! # Design Rules
//!
//! - No transport or client-library types in any signature
//! - Store primitives are key/payload based; model semantics stay in services

pub mod document_store;

use thiserror::Error;

pub use document_store::DocumentStore;

use crate::domain::DefinitionError;
use crate::settings::SettingsError;

/// Errors reported by a [`DocumentStore`] implementation.
///
/// This error type abstracts away client-library details and gives the
/// orchestrator a small, matchable vocabulary.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// No document exists at the key.
    #[error("Document not found: {0}")]
    NotFound(String),

    /// Insert-if-absent found an existing document.
    #[error("Document already exists: {0}")]
    DuplicateKey(String),

    /// The document's version token no longer matches.
    #[error("Version conflict on {0}")]
    Conflict(String),

    /// Storage backend error (connection, closed handle, engine failure).
    #[error("Storage error: {0}")]
    Storage(String),

    /// The payload could not be serialized or deserialized by the store.
    #[error("Serialization error: {0}")]
    Serialization(String),
}

/// Error type of every caller-facing connector operation.
///
/// Adapters map this to their own conventions; nothing below the facade
/// swallows a failure silently.
#[derive(Debug, Error)]
pub enum ConnectorError {
    /// An identifier was empty when a key was built. Indicates a bug in
    /// identifier resolution rather than bad input.
    #[error("Invalid identifier: {0}")]
    InvalidIdentifier(String),

    /// Strict create with a caller-supplied identifier that already exists.
    #[error("Identifier already in use: {0}")]
    IdentifierConflict(String),

    /// Strict create with a generated identifier whose key already exists.
    #[error("Duplicate document key: {0}")]
    DuplicateKey(String),

    /// Update or delete of a document that does not exist.
    #[error("Not found: {0}")]
    NotFound(String),

    /// A value does not fit the declared type of its field.
    #[error("Cannot encode field '{field}': {reason}")]
    Encoding { field: String, reason: String },

    /// Compare-and-swap retries were exhausted.
    #[error("Concurrent modification of {key} after {attempts} attempts")]
    ConcurrentModification { key: String, attempts: u32 },

    /// Invalid input (definition, missing mandatory identifier, ...).
    #[error("Validation error: {0}")]
    Validation(String),

    /// Operation against a model that was never registered.
    #[error("Unknown model: {0}")]
    UnknownModel(String),

    /// Operation issued after the connector was disconnected.
    #[error("Connector is disconnected")]
    Disconnected,

    /// Store failure outside the mapped cases above.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// Invalid connector settings.
    #[error(transparent)]
    Settings(#[from] SettingsError),
}

impl ConnectorError {
    pub(crate) fn encoding(field: &str, reason: impl Into<String>) -> Self {
        Self::Encoding {
            field: field.to_string(),
            reason: reason.into(),
        }
    }
}

impl From<DefinitionError> for ConnectorError {
    fn from(err: DefinitionError) -> Self {
        Self::Validation(err.to_string())
    }
}
