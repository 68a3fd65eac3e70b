//! End-to-end tests against a real compiler and `libIndexStore`. They are
//! ignored by default; run them with `cargo test -- --ignored` on a machine
//! with clang and the library installed.

mod common;

use indexstore::{IncludeDirective, IndexStore, Unit};
use indexstore_testkit::TestProject;

fn unit_for<'s>(store: &'s IndexStore<'_>, main_file: &str) -> Unit<'s> {
    store
        .units()
        .filter_map(Result::ok)
        .find(|unit| unit.main_file().ends_with(main_file))
        .unwrap_or_else(|| panic!("no unit for {main_file}"))
}

fn numbered_lines(count: usize, at: usize, line: &str) -> String {
    (1..=count)
        .map(|n| {
            if n == at {
                line.to_string()
            } else {
                format!("// line {n}")
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

#[test]
#[ignore = "needs clang and libIndexStore"]
fn test_single_include_on_first_line() {
    let toolchain = common::toolchain();
    let project = TestProject::new()
        .clang_source("main.c", "#include \"util.h\"\nint main(void) { return helper(); }\n")
        .file("util.h", "int helper(void);\n")
        .index(&toolchain)
        .unwrap();
    let library = project.load_library().unwrap();
    let store = library.open_store(project.index_dir()).unwrap();

    let unit = unit_for(&store, "main.c");
    let includes: Vec<IncludeDirective> = unit.includes().snapshot();
    assert_eq!(includes.len(), 1);
    assert!(includes[0].source_path.ends_with("main.c"));
    assert_eq!(includes[0].line, 1);
    assert!(includes[0].target_path.ends_with("util.h"));
}

#[test]
#[ignore = "needs clang and libIndexStore"]
fn test_include_on_line_five() {
    let toolchain = common::toolchain();
    let project = TestProject::new()
        .clang_source("main.c", numbered_lines(8, 5, "#include \"other.h\""))
        .file("other.h", "int other(void);\n")
        .index(&toolchain)
        .unwrap();
    let library = project.load_library().unwrap();
    let store = library.open_store(project.index_dir()).unwrap();

    let unit = unit_for(&store, "main.c");
    let mut found = Vec::new();
    unit.includes().for_each(|include| {
        if include.target_path().ends_with("other.h") {
            found.push((include.source_path().to_path_buf(), include.line()));
        }
    });
    assert_eq!(found.len(), 1);
    assert!(found[0].0.ends_with("main.c"));
    assert_eq!(found[0].1, 5);
}

#[test]
#[ignore = "needs clang and libIndexStore"]
fn test_include_on_line_three_of_ten() {
    let toolchain = common::toolchain();
    let project = TestProject::new()
        .clang_source("lib.c", numbered_lines(10, 3, "#include \"dep.h\""))
        .file("dep.h", "#define DEP 1\n")
        .index(&toolchain)
        .unwrap();
    let library = project.load_library().unwrap();
    let store = library.open_store(project.index_dir()).unwrap();

    let unit = unit_for(&store, "lib.c");
    let line = unit
        .includes()
        .find_map(|include| include.checked_line().ok())
        .unwrap();
    assert_eq!(line.get(), 3);
}

#[test]
#[ignore = "needs clang and libIndexStore"]
fn test_non_ascii_paths_round_trip() {
    let toolchain = common::toolchain();
    let project = TestProject::new()
        .clang_source("ünïcødé/main.c", "#include \"en-tête.h\"\n")
        .file("ünïcødé/en-tête.h", "int x;\n")
        .index(&toolchain)
        .unwrap();
    let library = project.load_library().unwrap();
    let store = library.open_store(project.index_dir()).unwrap();

    let unit = unit_for(&store, "main.c");
    let target = unit
        .includes()
        .find_map(|include| include.target_path().to_owned_string().ok())
        .unwrap();
    assert!(target.ends_with("ünïcødé/en-tête.h"), "{target}");
}

#[test]
#[ignore = "needs clang and libIndexStore"]
fn test_units_enumerate_identically_twice() {
    let toolchain = common::toolchain();
    let project = TestProject::new()
        .clang_source("a.c", "int a(void) { return 1; }\n")
        .clang_source("b.c", "int b(void) { return 2; }\n")
        .index(&toolchain)
        .unwrap();
    let library = project.load_library().unwrap();
    let store = library.open_store(project.index_dir()).unwrap();

    let mut first = store.unit_names(false).to_vec();
    let mut second = store.unit_names(false).to_vec();
    first.sort();
    second.sort();
    assert_eq!(first, second);
    assert!(first.len() >= 2);
}

#[test]
#[ignore = "needs clang and libIndexStore"]
fn test_records_expose_defined_functions() {
    let toolchain = common::toolchain();
    let project = TestProject::new()
        .clang_source("main.c", "static int helper(void) { return 0; }\nint main(void) { return helper(); }\n")
        .index(&toolchain)
        .unwrap();
    let library = project.load_library().unwrap();
    let store = library.open_store(project.index_dir()).unwrap();
    let unit = unit_for(&store, "main.c");

    let mut names = Vec::new();
    for record in unit.records() {
        let record = record.unwrap();
        names.extend(record.symbols().map_collect(|s| s.name().to_string_lossy().into_owned()));
    }
    assert!(names.iter().any(|n| n == "helper"), "{names:?}");
    assert!(names.iter().any(|n| n == "main"), "{names:?}");
}

#[test]
#[ignore = "needs clang and libIndexStore"]
fn test_output_path_resolves_to_its_unit() {
    let toolchain = common::toolchain();
    let project = TestProject::new()
        .clang_source("main.c", "int main(void) { return 0; }\n")
        .index(&toolchain)
        .unwrap();
    let library = project.load_library().unwrap();
    let store = library.open_store(project.index_dir()).unwrap();
    let unit = unit_for(&store, "main.c");

    let output = unit.output_file().to_path_buf();
    assert_eq!(
        store.unit_name_for_output_path(&output).unwrap().as_deref(),
        Some(unit.name())
    );
    let unindexed = project.root().join("never-built.o");
    assert_eq!(store.unit_name_for_output_path(unindexed).unwrap(), None);
}
