//! Document key construction.
//!
//! Every document lives under its model's namespace:
//!
//! - `{model}::{id}` - document of `model` with identifier `id`
//! - `{model}::` - namespace prefix scanned by queries and bulk deletes
//!
//! Model names may not contain the separator, so two models can never
//! produce the same key even for equal identifiers.

use crate::domain::DocumentKey;
use crate::ports::ConnectorError;

/// Separator between the model name and the identifier.
pub const KEY_SEPARATOR: &str = "::";

/// Build the key of a document.
///
/// Schema: `{model}::{id}`
///
/// An empty identifier here means identifier resolution went wrong upstream.
#[inline]
pub fn build_key(model: &str, id: &str) -> Result<DocumentKey, ConnectorError> {
    if id.is_empty() {
        return Err(ConnectorError::InvalidIdentifier(format!(
            "empty identifier for model '{model}'"
        )));
    }
    Ok(DocumentKey::new_unchecked(format!(
        "{model}{KEY_SEPARATOR}{id}"
    )))
}

/// Build the namespace prefix shared by every document of `model`.
///
/// Schema: `{model}::`
#[inline]
pub fn namespace(model: &str) -> String {
    format!("{model}{KEY_SEPARATOR}")
}

/// Extract the identifier from `key` if it belongs to `model`.
#[inline]
pub fn identifier_of<'a>(model: &str, key: &'a DocumentKey) -> Option<&'a str> {
    key.as_str()
        .strip_prefix(model)?
        .strip_prefix(KEY_SEPARATOR)
        .filter(|id| !id.is_empty())
}
