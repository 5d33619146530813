//! Connector services - the orchestration layer.
//!
//! Services coordinate the pure components (identifier resolution, key
//! building, codec, query translation) with the [`crate::ports::DocumentStore`]
//! port. They never know which store implementation sits behind the port.

mod connector;
mod crud;

pub use connector::{Connector, ModelHandle};
pub use crud::CrudOrchestrator;
