//! Connector settings and validation.
//!
//! Pure configuration types with no infrastructure dependencies. Values can
//! be overlaid from `COUCHLINK_*` environment variables.

use serde::{Deserialize, Serialize};

/// Default bucket queried by the translator.
pub const DEFAULT_BUCKET: &str = "default";

/// Default number of compare-and-swap retries for partial updates.
pub const DEFAULT_MAX_RETRIES: u32 = 5;

/// Default base backoff between compare-and-swap retries, in milliseconds.
pub const DEFAULT_RETRY_BACKOFF_MS: u64 = 10;

/// Default name of the timestamp field stamped on every write.
pub const DEFAULT_TIMESTAMP_FIELD: &str = "updatedAt";

/// Default identifier field name for models that do not declare one.
pub const DEFAULT_ID_FIELD: &str = "id";

/// Whether generated identifiers are written into the instance's field map.
///
/// The identifier is always available through `ModelInstance::id()`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IdExposure {
    /// Only models that declare an identifier field see it as a field.
    #[default]
    DeclaredOnly,
    /// Every model sees the identifier under its id field name
    /// (`default_id_field` when undeclared).
    Always,
}

impl IdExposure {
    fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "declared" | "declared_only" => Some(Self::DeclaredOnly),
            "always" => Some(Self::Always),
            _ => None,
        }
    }
}

/// Connector settings structure.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ConnectorSettings {
    /// Bucket holding the documents of every registered model.
    pub bucket: String,

    /// Compare-and-swap retries after the first attempt (0-20).
    pub max_retries: u32,

    /// Base backoff between retries; doubles per attempt.
    pub retry_backoff_ms: u64,

    /// Identifier exposure policy.
    pub id_exposure: IdExposure,

    /// Date field stamped with the write time on every write.
    pub timestamp_field: String,

    /// Identifier field name used when a model declares none.
    pub default_id_field: String,
}

impl Default for ConnectorSettings {
    fn default() -> Self {
        Self::with_defaults()
    }
}

impl ConnectorSettings {
    /// Create settings with sensible defaults.
    #[must_use]
    pub fn with_defaults() -> Self {
        Self {
            bucket: DEFAULT_BUCKET.to_string(),
            max_retries: DEFAULT_MAX_RETRIES,
            retry_backoff_ms: DEFAULT_RETRY_BACKOFF_MS,
            id_exposure: IdExposure::default(),
            timestamp_field: DEFAULT_TIMESTAMP_FIELD.to_string(),
            default_id_field: DEFAULT_ID_FIELD.to_string(),
        }
    }

    /// Defaults overlaid with `COUCHLINK_*` environment variables, validated.
    pub fn from_env() -> Result<Self, SettingsError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Defaults overlaid with values from `lookup`, validated.
    ///
    /// Recognised keys: `COUCHLINK_BUCKET`, `COUCHLINK_MAX_RETRIES`,
    /// `COUCHLINK_RETRY_BACKOFF_MS`, `COUCHLINK_ID_EXPOSURE`
    /// (`declared` | `always`), `COUCHLINK_TIMESTAMP_FIELD`.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, SettingsError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut settings = Self::with_defaults();

        if let Some(bucket) = lookup("COUCHLINK_BUCKET") {
            settings.bucket = bucket;
        }
        if let Some(raw) = lookup("COUCHLINK_MAX_RETRIES") {
            settings.max_retries = raw
                .trim()
                .parse()
                .map_err(|_| SettingsError::invalid_env("COUCHLINK_MAX_RETRIES", &raw))?;
        }
        if let Some(raw) = lookup("COUCHLINK_RETRY_BACKOFF_MS") {
            settings.retry_backoff_ms = raw
                .trim()
                .parse()
                .map_err(|_| SettingsError::invalid_env("COUCHLINK_RETRY_BACKOFF_MS", &raw))?;
        }
        if let Some(raw) = lookup("COUCHLINK_ID_EXPOSURE") {
            settings.id_exposure = IdExposure::parse(&raw)
                .ok_or_else(|| SettingsError::invalid_env("COUCHLINK_ID_EXPOSURE", &raw))?;
        }
        if let Some(field) = lookup("COUCHLINK_TIMESTAMP_FIELD") {
            settings.timestamp_field = field;
        }

        validate_settings(&settings)?;
        Ok(settings)
    }

    /// Merge a partial update, only touching fields that are `Some`.
    pub fn merge(&mut self, update: &SettingsUpdate) {
        if let Some(ref bucket) = update.bucket {
            self.bucket.clone_from(bucket);
        }
        if let Some(retries) = update.max_retries {
            self.max_retries = retries;
        }
        if let Some(backoff) = update.retry_backoff_ms {
            self.retry_backoff_ms = backoff;
        }
        if let Some(exposure) = update.id_exposure {
            self.id_exposure = exposure;
        }
        if let Some(ref field) = update.timestamp_field {
            self.timestamp_field.clone_from(field);
        }
        if let Some(ref field) = update.default_id_field {
            self.default_id_field.clone_from(field);
        }
    }
}

/// Partial settings update. `None` leaves a field unchanged.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SettingsUpdate {
    pub bucket: Option<String>,
    pub max_retries: Option<u32>,
    pub retry_backoff_ms: Option<u64>,
    pub id_exposure: Option<IdExposure>,
    pub timestamp_field: Option<String>,
    pub default_id_field: Option<String>,
}

/// Settings validation error.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SettingsError {
    #[error("Bucket name cannot be empty")]
    EmptyBucket,

    #[error("Max retries must be between 0 and 20, got {0}")]
    InvalidMaxRetries(u32),

    #[error("Retry backoff must be at most 10000 ms, got {0}")]
    InvalidBackoff(u64),

    #[error("Field name for {0} cannot be empty")]
    EmptyFieldName(&'static str),

    #[error("Invalid value for {var}: '{value}'")]
    InvalidEnv { var: &'static str, value: String },
}

impl SettingsError {
    fn invalid_env(var: &'static str, value: &str) -> Self {
        Self::InvalidEnv {
            var,
            value: value.to_string(),
        }
    }
}

/// Validate settings values.
pub fn validate_settings(settings: &ConnectorSettings) -> Result<(), SettingsError> {
    if settings.bucket.trim().is_empty() {
        return Err(SettingsError::EmptyBucket);
    }

    if settings.max_retries > 20 {
        return Err(SettingsError::InvalidMaxRetries(settings.max_retries));
    }

    if settings.retry_backoff_ms > 10_000 {
        return Err(SettingsError::InvalidBackoff(settings.retry_backoff_ms));
    }

    if settings.timestamp_field.trim().is_empty() {
        return Err(SettingsError::EmptyFieldName("timestamp_field"));
    }

    if settings.default_id_field.trim().is_empty() {
        return Err(SettingsError::EmptyFieldName("default_id_field"));
    }

    Ok(())
}
