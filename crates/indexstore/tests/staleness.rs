use std::time::{Duration, SystemTime};

use indexstore::Staleness;
use indexstore::engine::Timestamp;
use indexstore::engine::memory::{MemoryStore, MemoryUnit};
use indexstore_testkit::{memory_library, scratch_store};

fn unit_in(workdir: &std::path::Path, written: SystemTime) -> MemoryStore {
    MemoryStore::new().unit(
        MemoryUnit::new("main.o-1")
            .working_dir(workdir.to_string_lossy())
            .main_file("main.c")
            .record_dependency("util.h-1", "util.h")
            .file_dependency(workdir.join("data.inc").to_string_lossy())
            .modified_at(Timestamp::from_system_time(written)),
    )
}

fn write_inputs(workdir: &std::path::Path) {
    for name in ["main.c", "util.h", "data.inc"] {
        std::fs::write(workdir.join(name), b"// input\n").unwrap();
    }
}

#[test]
fn test_unit_written_after_its_inputs_is_up_to_date() {
    let work = tempfile::tempdir().unwrap();
    write_inputs(work.path());
    let later = SystemTime::now() + Duration::from_secs(3600);

    let (_, library) = memory_library(unit_in(work.path(), later));
    let dir = scratch_store().unwrap();
    let store = library.open_store(dir.path()).unwrap();
    let unit = store.unit("main.o-1").unwrap();

    assert_eq!(unit.input_files().len(), 3);
    assert!(unit.input_files().iter().all(|p| p.starts_with(work.path())));
    assert_eq!(unit.staleness().unwrap(), Staleness::UpToDate);
}

#[test]
fn test_inputs_modified_after_the_unit_make_it_stale() {
    let work = tempfile::tempdir().unwrap();
    write_inputs(work.path());
    let long_ago = SystemTime::UNIX_EPOCH + Duration::from_secs(60);

    let (_, library) = memory_library(unit_in(work.path(), long_ago));
    let dir = scratch_store().unwrap();
    let store = library.open_store(dir.path()).unwrap();
    let unit = store.unit("main.o-1").unwrap();

    match unit.staleness().unwrap() {
        Staleness::Stale { newer } => {
            assert_eq!(newer.len(), 3);
            assert!(newer.contains(&work.path().join("main.c")));
        }
        other => panic!("expected stale, got {other:?}"),
    }
}

#[test]
fn test_deleted_inputs_are_reported_missing() {
    let work = tempfile::tempdir().unwrap();
    write_inputs(work.path());
    std::fs::remove_file(work.path().join("util.h")).unwrap();

    let (_, library) = memory_library(unit_in(work.path(), SystemTime::now()));
    let dir = scratch_store().unwrap();
    let store = library.open_store(dir.path()).unwrap();
    let unit = store.unit("main.o-1").unwrap();

    let staleness = unit.staleness().unwrap();
    assert_eq!(
        staleness,
        Staleness::Missing {
            paths: vec![work.path().join("util.h")]
        }
    );
    assert!(!staleness.is_up_to_date());

    let json = serde_json::to_value(&staleness).unwrap();
    assert_eq!(json["state"], "missing");
}
