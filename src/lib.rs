//! # couchlink
//!
//! Model-level CRUD and query mapping onto document/key-value stores.
//!
//! This crate is a thin facade over the workspace crates:
//!
//! - `couchlink_core` - domain types, the `DocumentStore` port, identifier
//!   resolution, codec, query translation and the `Connector`
//! - `couchlink_mem` - the in-memory store adapter and composition helpers
//!
//! ## Example
//!
//! ```rust,ignore
//! use couchlink::{ConnectorFactory, ConnectorSettings, FieldType, ModelDefinition};
//!
//! couchlink::init_tracing();
//! let (connector, _store) = ConnectorFactory::in_memory(ConnectorSettings::with_defaults())?;
//! let countries = connector.define(
//!     ModelDefinition::builder("Country")
//!         .field("name", FieldType::String)
//!         .field("gdp", FieldType::Number)
//!         .build()?,
//! )?;
//! let japan = countries.create(countries.new_instance().with("name", "Japan")).await?;
//! ```

mod logging;

pub use logging::{DEFAULT_FILTER, init_tracing};

// =============================================================================
// Workspace Crate Re-exports
// =============================================================================

// Re-export core domain types, ports and services
pub use couchlink_core::{
    Cas, Connector, ConnectorError, ConnectorSettings, DefinitionError, DocumentKey, DocumentStore,
    FieldDescriptor, FieldMap, FieldType, FieldValue, IdExposure, ModelDefinition, ModelHandle,
    ModelInstance, Operator, Payload, QueryDescriptor, SettingsError, SettingsUpdate,
    StoreDocument, StoreError, StoreQuery, field_map_from_json,
};

// Re-export the in-memory adapter
pub use couchlink_mem::{ConnectorFactory, MemoryStore};

/// Re-export of couchlink-core for lower-level access.
pub mod core {
    pub use couchlink_core::*;
}

/// Re-export of couchlink-mem for lower-level access.
pub mod mem {
    pub use couchlink_mem::*;
}
