mod common;

use std::sync::Arc;

use indexstore::engine::MemoryEngine;
use indexstore::engine::memory::MemoryStore;
use indexstore::{EngineLoadError, IndexStoreLibrary, StoreOpenError};
use indexstore_testkit::{memory_library, scratch_store, scratch_store_with_version};

#[test]
fn test_loading_a_non_library_file_fails() {
    let dir = tempfile::tempdir().unwrap();
    let bogus = dir.path().join("libIndexStore.so");
    std::fs::write(&bogus, b"this is not a shared object").unwrap();

    let err = IndexStoreLibrary::load(&bogus).unwrap_err();
    assert!(matches!(err, EngineLoadError::NotALibrary { .. }), "{err}");
}

#[test]
fn test_loading_a_missing_library_fails() {
    let dir = tempfile::tempdir().unwrap();
    let err = IndexStoreLibrary::load(dir.path().join("nope.so")).unwrap_err();
    assert!(matches!(err, EngineLoadError::NotFound(_)));
}

#[test]
fn test_opening_a_missing_directory_fails() {
    let (_, library) = memory_library(MemoryStore::new());
    let dir = tempfile::tempdir().unwrap();
    let err = library.open_store(dir.path().join("index")).unwrap_err();
    assert!(matches!(err, StoreOpenError::Missing(_)));
}

#[test]
fn test_store_without_format_directory_is_rejected() {
    let (engine, library) = memory_library(MemoryStore::new());
    let dir = tempfile::tempdir().unwrap();
    let err = library.open_store(dir.path()).unwrap_err();
    assert!(matches!(err, StoreOpenError::NotAStore(_)));
    assert_eq!(engine.open_handles().stores, 0);
}

#[test]
fn test_store_of_another_format_is_rejected() {
    let engine = MemoryEngine::new(MemoryStore::new()).with_format_version(6);
    let library = IndexStoreLibrary::from_engine(Arc::new(engine));
    let dir = scratch_store().unwrap();

    match library.open_store(dir.path()) {
        Err(StoreOpenError::UnsupportedFormat {
            found, expected, ..
        }) => {
            assert_eq!(found, 5);
            assert_eq!(expected, 6);
        }
        other => panic!("unexpected result: {other:?}"),
    }
}

#[test]
fn test_engine_failures_surface_as_store_open_errors() {
    let engine = MemoryEngine::new(MemoryStore::new()).failing_store_open("permission denied");
    let library = IndexStoreLibrary::from_engine(Arc::new(engine));
    let dir = scratch_store().unwrap();

    let err = library.open_store(dir.path()).unwrap_err();
    match err {
        StoreOpenError::Engine { message, .. } => assert_eq!(message, "permission denied"),
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn test_shared_store_is_readable_from_several_threads() {
    let (_, library) = memory_library(common::sample_store());
    let dir = scratch_store().unwrap();
    let shared = library.open_store(dir.path()).unwrap().into_shared().unwrap();

    let counts: Vec<usize> = std::thread::scope(|scope| {
        let handles: Vec<_> = (0..4)
            .map(|_| scope.spawn(|| shared.units().filter(|u| u.is_ok()).count()))
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });
    assert_eq!(counts, vec![2; 4]);
}

#[test]
fn test_store_is_not_shareable_without_concurrent_reads() {
    let engine = MemoryEngine::new(MemoryStore::new()).with_concurrent_reads(false);
    let engine = Arc::new(engine);
    let library = IndexStoreLibrary::from_engine(engine.clone());
    let dir = scratch_store_with_version(5).unwrap();

    let err = library
        .open_store(dir.path())
        .unwrap()
        .into_shared()
        .unwrap_err();
    assert!(matches!(err, StoreOpenError::NotShareable));
    assert_eq!(engine.open_handles().stores, 0);
}
