#![doc = include_str!(concat!(env!("OUT_DIR"), "/README_GENERATED.md"))]
#![deny(unsafe_code)]
#![deny(unused_crate_dependencies)]

pub mod factory;
pub mod filter;
pub mod store;

// Re-export factory for convenient access
pub use factory::ConnectorFactory;

// Re-export TestStore for integration tests
#[cfg(any(test, feature = "test-utils"))]
pub use factory::TestStore;

pub use store::MemoryStore;

#[cfg(test)]
use tokio_test as _;
