//! Domain types shared by the connector services and store adapters.
//!
//! These are pure data types with no infrastructure dependencies.

pub mod document;
pub mod instance;
pub mod model;
pub mod query;

pub use document::{Cas, DocumentKey, Payload, StoreDocument};
pub use instance::{FieldMap, FieldValue, ModelInstance, field_map_from_json};
pub use model::{
    DefinitionError, FieldDescriptor, FieldType, ModelDefinition, ModelDefinitionBuilder,
};
pub use query::{Operator, Predicate, QueryDescriptor};
