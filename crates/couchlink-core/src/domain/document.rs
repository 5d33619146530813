//! Store-side representation of persisted instances.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Encoded document body: a JSON object keyed by field name.
pub type Payload = Map<String, Value>;

/// Address of a document in the store: `<model>::<identifier>`.
///
/// Construct through [`crate::keys::build_key`] so the invariants hold.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DocumentKey(String);

impl DocumentKey {
    pub(crate) const fn new_unchecked(key: String) -> Self {
        Self(key)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for DocumentKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for DocumentKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Opaque optimistic-concurrency token returned by the store with every
/// read and write.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Cas(pub u64);

impl fmt::Display for Cas {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#x}", self.0)
    }
}

/// A document as returned by the store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoreDocument {
    pub key: DocumentKey,
    pub value: Payload,
    /// Absent for stores without compare-and-swap support and for
    /// projected query rows.
    pub cas: Option<Cas>,
}

impl StoreDocument {
    pub const fn new(key: DocumentKey, value: Payload, cas: Option<Cas>) -> Self {
        Self { key, value, cas }
    }
}
