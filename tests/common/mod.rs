//! Common test utilities.
//!
//! This module provides shared test infrastructure: a connector over a
//! `TestStore` with the country and student models registered.

#![allow(dead_code)]

pub mod fixtures;

use std::sync::Arc;

use couchlink::mem::TestStore;
use couchlink::{Connector, ConnectorSettings, ModelHandle};

/// A connector, its store and the registered test models.
pub struct Harness {
    pub connector: Connector,
    pub store: Arc<TestStore>,
    /// `CountryModel`: no identifier field, `force_id = false`.
    pub countries: ModelHandle,
    /// `CountryModelWithId`: declared string identifier `id`.
    pub countries_with_id: ModelHandle,
    /// `StudentModel`: shares the bucket with the country models.
    pub students: ModelHandle,
}

/// Default settings with a short backoff so retry tests stay fast.
pub fn test_settings() -> ConnectorSettings {
    ConnectorSettings {
        retry_backoff_ms: 1,
        ..ConnectorSettings::with_defaults()
    }
}

/// Harness over a natively paging store with test settings.
pub fn setup() -> anyhow::Result<Harness> {
    setup_with(TestStore::new(), test_settings())
}

/// Harness over `store` with `settings`.
pub fn setup_with(store: Arc<TestStore>, settings: ConnectorSettings) -> anyhow::Result<Harness> {
    couchlink::init_tracing();

    let connector = store.connector(settings)?;
    let countries = connector.define(fixtures::country_model()?)?;
    let countries_with_id = connector.define(fixtures::country_model_with_id()?)?;
    let students = connector.define(fixtures::student_model()?)?;

    Ok(Harness {
        connector,
        store,
        countries,
        countries_with_id,
        students,
    })
}
