use indexstore::engine::Timestamp;
use indexstore::engine::memory::{
    MemoryOccurrence, MemoryRecord, MemoryStore, MemorySymbol, MemoryUnit,
};
use indexstore::SymbolRoles;
use indexstore_testkit::Toolchain;

#[allow(dead_code)]
pub const FUNCTION: u32 = 12;

#[allow(dead_code)]
pub const MAIN_UNIT: &str = "main.o-1J8QFKJ3";
#[allow(dead_code)]
pub const UTIL_UNIT: &str = "util.o-3KE2M1Q0";
#[allow(dead_code)]
pub const BROKEN_UNIT: &str = "broken.o-0000000";

#[allow(dead_code)]
pub fn written_at() -> Timestamp {
    Timestamp::new(1_700_000_000, 0)
}

/// Two compiled files sharing `util.h`, plus a unit that cannot be read.
#[allow(dead_code)]
pub fn sample_store() -> MemoryStore {
    MemoryStore::new()
        .unit(
            MemoryUnit::new(MAIN_UNIT)
                .main_file("/work/main.c")
                .output_file("/work/main.o")
                .working_dir("/work")
                .target("x86_64-unknown-linux-gnu")
                .modified_at(written_at())
                .include("/work/main.c", 1, "/work/util.h")
                .include("/work/main.c", 5, "/work/other.h")
                .record_dependency("main.c-2B1X", "/work/main.c")
                .record_dependency("util.h-1M0P", "/work/util.h")
                .file_dependency("/work/other.h")
                .unit_dependency(UTIL_UNIT),
        )
        .unit(
            MemoryUnit::new(UTIL_UNIT)
                .main_file("/work/util.c")
                .output_file("/work/util.o")
                .working_dir("/work")
                .modified_at(written_at())
                .include("/work/util.c", 1, "/work/util.h")
                .record_dependency("util.h-1M0P", "/work/util.h"),
        )
        .unit(MemoryUnit::new(BROKEN_UNIT).unreadable("corrupted unit file"))
        .record(
            MemoryRecord::new("main.c-2B1X")
                .symbol(
                    MemorySymbol::new(FUNCTION, "main", "c:@F@main")
                        .roles((SymbolRoles::DEFINITION | SymbolRoles::DECLARATION).bits()),
                )
                .symbol(
                    MemorySymbol::new(FUNCTION, "helper", "c:@F@helper")
                        .roles((SymbolRoles::REFERENCE | SymbolRoles::CALL).bits())
                        .related_roles(
                            (SymbolRoles::REL_CALLED_BY | SymbolRoles::REL_CONTAINED_BY).bits(),
                        ),
                )
                .occurrence(MemoryOccurrence::new(
                    0,
                    (SymbolRoles::DEFINITION | SymbolRoles::DECLARATION).bits(),
                    3,
                    5,
                ))
                .occurrence(
                    MemoryOccurrence::new(
                        1,
                        (SymbolRoles::REFERENCE | SymbolRoles::CALL).bits(),
                        4,
                        12,
                    )
                    .related(
                        (SymbolRoles::REL_CALLED_BY | SymbolRoles::REL_CONTAINED_BY).bits(),
                        0,
                    ),
                ),
        )
        .record(
            MemoryRecord::new("util.h-1M0P")
                .symbol(
                    MemorySymbol::new(FUNCTION, "helper", "c:@F@helper")
                        .roles(SymbolRoles::DECLARATION.bits()),
                )
                .occurrence(MemoryOccurrence::new(0, SymbolRoles::DECLARATION.bits(), 1, 5)),
        )
}

/// The installed compilers and `libIndexStore`. Only called from tests that
/// are ignored by default, so a missing toolchain is a failure.
#[allow(dead_code)]
pub fn toolchain() -> Toolchain {
    let toolchain = Toolchain::discover().unwrap_or_else(|e| panic!("toolchain required: {e}"));
    assert!(toolchain.clang.is_some(), "clang not found on PATH");
    toolchain
}
