#![doc = include_str!(concat!(env!("OUT_DIR"), "/README_GENERATED.md"))]
#![deny(unused_crate_dependencies)]

pub mod codec;
pub mod domain;
pub mod identity;
pub mod keys;
pub mod ports;
pub mod services;
pub mod settings;
pub mod translator;

// Re-export commonly used types for convenience
pub use domain::{
    Cas, DefinitionError, DocumentKey, FieldDescriptor, FieldMap, FieldType, FieldValue,
    ModelDefinition, ModelDefinitionBuilder, ModelInstance, Operator, Payload, Predicate,
    QueryDescriptor, StoreDocument, field_map_from_json,
};
pub use identity::{IdResolver, IdSource, ResolvedId, WriteMode, generate_id};
pub use keys::{KEY_SEPARATOR, build_key, identifier_of, namespace};
pub use ports::{ConnectorError, DocumentStore, StoreError};
pub use services::{Connector, CrudOrchestrator, ModelHandle};
pub use settings::{
    ConnectorSettings, DEFAULT_BUCKET, DEFAULT_MAX_RETRIES, DEFAULT_RETRY_BACKOFF_MS, IdExposure,
    SettingsError, SettingsUpdate, validate_settings,
};
pub use translator::{KEY_COLUMN, QueryPlan, QueryTranslator, StoreFilter, StoreQuery};

#[cfg(test)]
use tokio_test as _;
