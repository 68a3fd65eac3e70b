mod common;

use std::ops::ControlFlow;
use std::panic::{self, AssertUnwindSafe};
use std::path::PathBuf;

use common::MAIN_UNIT;
use indexstore::engine::memory::{MemoryStore, MemoryUnit};
use indexstore::{IncludeDirective, MalformedRecordError};
use indexstore_testkit::{memory_library, scratch_store};

#[test]
fn test_include_of_other_header_reports_its_line() {
    let (_, library) = memory_library(common::sample_store());
    let dir = scratch_store().unwrap();
    let store = library.open_store(dir.path()).unwrap();
    let unit = store.unit(MAIN_UNIT).unwrap();

    let mut matches = Vec::new();
    unit.includes().for_each(|include| {
        if include.target_path().ends_with("other.h") {
            matches.push(include.snapshot());
        }
    });

    assert_eq!(matches.len(), 1);
    let include = &matches[0];
    assert!(include.source_path.ends_with("main.c"));
    assert_eq!(include.line, 5);
    assert!(include.target_path.ends_with("other.h"));
}

#[test]
fn test_includes_keep_engine_order() {
    let (_, library) = memory_library(common::sample_store());
    let dir = scratch_store().unwrap();
    let store = library.open_store(dir.path()).unwrap();
    let unit = store.unit(MAIN_UNIT).unwrap();

    assert_eq!(
        unit.includes().snapshot(),
        vec![
            IncludeDirective {
                source_path: PathBuf::from("/work/main.c"),
                line: 1,
                target_path: PathBuf::from("/work/util.h"),
            },
            IncludeDirective {
                source_path: PathBuf::from("/work/main.c"),
                line: 5,
                target_path: PathBuf::from("/work/other.h"),
            },
        ]
    );
    assert_eq!(unit.includes().count(), 2);
}

#[test]
fn test_checked_line_rejects_impossible_lines() {
    let store_fixture = MemoryStore::new().unit(
        MemoryUnit::new("bad.o-1")
            .main_file("/work/bad.c")
            .include("/work/bad.c", 0, "/work/a.h")
            .include("/work/bad.c", -3, "/work/b.h")
            .include("/work/bad.c", 7, "/work/c.h"),
    );
    let (_, library) = memory_library(store_fixture);
    let dir = scratch_store().unwrap();
    let store = library.open_store(dir.path()).unwrap();
    let unit = store.unit("bad.o-1").unwrap();

    let checked = unit
        .includes()
        .map_collect(|include| (include.line(), include.checked_line()));

    assert_eq!(checked[0].0, 0);
    assert_eq!(
        checked[0].1,
        Err(MalformedRecordError::InvalidLine {
            source_path: "/work/bad.c".to_string(),
            line: 0,
        })
    );
    assert_eq!(checked[1].0, -3);
    assert!(checked[1].1.is_err());
    assert_eq!(checked[2].1.as_ref().map(|l| l.get()), Ok(7));
}

#[test]
fn test_breaking_out_stops_the_traversal() {
    let (_, library) = memory_library(common::sample_store());
    let dir = scratch_store().unwrap();
    let store = library.open_store(dir.path()).unwrap();
    let unit = store.unit(MAIN_UNIT).unwrap();

    let mut visited = 0;
    let first = unit.includes().try_for_each(|include| {
        visited += 1;
        ControlFlow::Break(include.line())
    });
    assert_eq!(first, Some(1));
    assert_eq!(visited, 1);

    let found = unit
        .includes()
        .find_map(|include| include.target_path().ends_with("util.h").then(|| include.line()));
    assert_eq!(found, Some(1));
}

#[test]
fn test_non_ascii_paths_materialize_unchanged() {
    let source = "/work/ünïcødé/mäin.c";
    let target = "/work/ünïcødé/日本語.h";
    let (_, library) = memory_library(
        MemoryStore::new().unit(MemoryUnit::new("u.o-1").main_file(source).include(
            source,
            2,
            target,
        )),
    );
    let dir = scratch_store().unwrap();
    let store = library.open_store(dir.path()).unwrap();
    let unit = store.unit("u.o-1").unwrap();

    let (src, tgt) = unit
        .includes()
        .find_map(|include| {
            Some((
                include.source_path().to_owned_string().unwrap(),
                include.target_path().to_owned_string().unwrap(),
            ))
        })
        .unwrap();
    assert_eq!(src, source);
    assert_eq!(tgt, target);
    assert_eq!(unit.main_file().as_bytes(), source.as_bytes());
}

#[test]
fn test_panicking_visitor_leaves_no_open_handles() {
    let (engine, library) = memory_library(common::sample_store());
    let dir = scratch_store().unwrap();
    {
        let store = library.open_store(dir.path()).unwrap();
        let unit = store.unit(MAIN_UNIT).unwrap();
        let result = panic::catch_unwind(AssertUnwindSafe(|| {
            unit.includes().for_each(|_| panic!("visitor failed"));
        }));
        assert!(result.is_err());
        // The unit is still usable afterwards.
        assert_eq!(unit.includes().count(), 2);
    }
    assert_eq!(engine.open_handles().total(), 0);
}
