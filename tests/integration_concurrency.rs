//! Integration tests for concurrent writers against one document.

mod common;

use common::fixtures::{country, partial};
use common::{setup_with, test_settings};
use couchlink::mem::TestStore;
use couchlink::{ConnectorError, ConnectorSettings, FieldValue};

const WRITERS: usize = 4;

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_partial_updates_all_land() {
    let settings = ConnectorSettings {
        max_retries: 20,
        ..test_settings()
    };
    let h = setup_with(TestStore::new(), settings).unwrap();
    let existing = h
        .countries
        .create(country(&h.countries, 0))
        .await
        .unwrap();

    let mut tasks = Vec::with_capacity(WRITERS);
    for writer in 0..WRITERS {
        let handle = h.countries.clone();
        let instance = existing.clone();
        tasks.push(tokio::spawn(async move {
            let field = format!("writer{writer}");
            handle
                .update_attributes(&instance, partial([(field.as_str(), FieldValue::from(true))]))
                .await
        }));
    }
    for task in tasks {
        task.await.unwrap().unwrap();
    }

    let stored = h
        .countries
        .find_by_id(existing.id().unwrap())
        .await
        .unwrap()
        .unwrap();
    for writer in 0..WRITERS {
        assert_eq!(
            stored.get(&format!("writer{writer}")),
            Some(&FieldValue::Bool(true)),
            "update of writer {writer} was lost"
        );
    }
    assert_eq!(stored.get("name"), existing.get("name"));
    assert!(h.store.replace_attempts() >= u32::try_from(WRITERS).unwrap());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_creates_with_same_identifier() {
    let h = setup_with(TestStore::new(), test_settings()).unwrap();

    let mut tasks = Vec::with_capacity(WRITERS);
    for index in 0..WRITERS {
        let handle = h.countries_with_id.clone();
        let instance = country(&handle, index % 3).with("id", "contested");
        tasks.push(tokio::spawn(async move { handle.create(instance).await }));
    }

    let mut created = 0;
    let mut conflicts = 0;
    for task in tasks {
        match task.await.unwrap() {
            Ok(_) => created += 1,
            Err(ConnectorError::IdentifierConflict(_)) => conflicts += 1,
            Err(other) => panic!("unexpected error: {other}"),
        }
    }

    assert_eq!(created, 1);
    assert_eq!(conflicts, WRITERS - 1);
    assert_eq!(h.store.memory().len().await, 1);
}
