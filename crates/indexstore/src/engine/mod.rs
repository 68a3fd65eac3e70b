//! The seam between the safe access layer and a native query engine.
//!
//! [`IndexEngine`] mirrors the `indexstore_*` C function table one entry
//! point at a time. Handles are opaque tokens minted by the engine; the
//! access layer never dereferences them, it only hands them back.
//!
//! Two engines exist: [`DylibEngine`] binds `libIndexStore` at runtime and
//! `MemoryEngine` (behind the `testing` feature) serves an in-memory fixture
//! store.

use std::ffi::{CStr, c_void};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

pub mod dylib;
#[cfg(any(test, feature = "testing"))]
pub mod memory;

pub use dylib::DylibEngine;
#[cfg(any(test, feature = "testing"))]
pub use memory::MemoryEngine;

macro_rules! raw_handle {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq)]
        #[repr(transparent)]
        pub struct $name(*mut c_void);

        impl $name {
            pub fn from_ptr(ptr: *mut c_void) -> Self {
                Self(ptr)
            }

            pub fn as_ptr(self) -> *mut c_void {
                self.0
            }

            pub fn is_null(self) -> bool {
                self.0.is_null()
            }
        }
    };
}

raw_handle!(
    /// `indexstore_t`
    RawStore
);
raw_handle!(
    /// `indexstore_unit_reader_t`
    RawUnitReader
);
raw_handle!(
    /// `indexstore_unit_dependency_t`, valid for one applier call.
    RawDependency
);
raw_handle!(
    /// `indexstore_unit_include_t`, valid for one applier call.
    RawInclude
);
raw_handle!(
    /// `indexstore_record_reader_t`
    RawRecordReader
);
raw_handle!(
    /// `indexstore_symbol_t`
    RawSymbol
);
raw_handle!(
    /// `indexstore_occurrence_t`, valid for one applier call.
    RawOccurrence
);
raw_handle!(
    /// `indexstore_symbol_relation_t`, valid for one applier call.
    RawRelation
);

/// `indexstore_string_ref_t`: bytes owned by the engine.
#[derive(Debug, Clone, Copy)]
#[repr(C)]
pub struct RawStr {
    pub data: *const u8,
    pub length: usize,
}

impl RawStr {
    pub const EMPTY: RawStr = RawStr {
        data: std::ptr::null(),
        length: 0,
    };

    /// Borrow `s` as an engine string. The caller keeps `s` alive and
    /// unmodified for as long as the engine contract requires.
    pub fn from_str(s: &str) -> Self {
        Self {
            data: s.as_ptr(),
            length: s.len(),
        }
    }
}

/// A point in time as the engine reports it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord)]
pub struct Timestamp {
    pub seconds: i64,
    pub nanoseconds: i64,
}

impl Timestamp {
    pub fn new(seconds: i64, nanoseconds: i64) -> Self {
        Self {
            seconds,
            nanoseconds,
        }
    }

    pub fn from_system_time(time: SystemTime) -> Self {
        match time.duration_since(UNIX_EPOCH) {
            Ok(d) => Self::new(d.as_secs() as i64, i64::from(d.subsec_nanos())),
            Err(e) => {
                let d = e.duration();
                Self::new(-(d.as_secs() as i64), -i64::from(d.subsec_nanos()))
            }
        }
    }

    pub fn to_system_time(self) -> SystemTime {
        let nanos = (self.seconds as i128) * 1_000_000_000 + self.nanoseconds as i128;
        if nanos >= 0 {
            UNIX_EPOCH + Duration::from_nanos(nanos.min(u64::MAX as i128) as u64)
        } else {
            UNIX_EPOCH - Duration::from_nanos((-nanos).min(u64::MAX as i128) as u64)
        }
    }
}

/// `indexstore_unit_dependency_kind_t`
pub const DEPENDENCY_UNIT: u32 = 1;
pub const DEPENDENCY_RECORD: u32 = 2;
pub const DEPENDENCY_FILE: u32 = 3;

/// String-valued accessors of a unit reader.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnitField {
    MainFile,
    OutputFile,
    ModuleName,
    WorkingDir,
    Target,
    Sysroot,
    ProviderIdentifier,
    ProviderVersion,
}

/// Boolean accessors of a unit reader.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnitFlag {
    System,
    Module,
    DebugCompilation,
    HasMainFile,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DependencyField {
    Name,
    FilePath,
    ModuleName,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SymbolField {
    Name,
    Usr,
    CodegenName,
}

/// Push-style applier: return `false` to stop the traversal.
pub type Applier<'a, T> = &'a mut dyn FnMut(T) -> bool;

/// The capability "queryable index engine".
///
/// # Safety
///
/// Implementors guarantee that:
/// - a [`RawStr`] returned from an accessor stays valid while the handle it
///   was read from stays valid, and a `RawStr` passed to an applier stays
///   valid for the duration of that applier call;
/// - handles passed to appliers stay valid for the duration of the call;
/// - stores and readers stay valid until disposed. The access layer always
///   disposes readers before the store they were created from.
///
/// Every `unsafe fn` requires its handle arguments to have been produced by
/// this same engine and to still be valid.
pub unsafe trait IndexEngine: Send + Sync {
    /// The store format version this engine reads (`v<N>` on disk).
    fn format_version(&self) -> u32;

    /// Whether concurrent reads of one store from several threads are safe.
    fn concurrent_reads(&self) -> bool {
        false
    }

    fn store_create(&self, path: &CStr) -> Result<RawStore, String>;
    unsafe fn store_dispose(&self, store: RawStore);
    unsafe fn store_units_apply(
        &self,
        store: RawStore,
        sorted: bool,
        applier: Applier<'_, RawStr>,
    ) -> bool;
    /// The unit name the engine derives from an output path. Derivation does
    /// not consult the store, so a unit by that name need not exist.
    unsafe fn store_unit_name_from_output_path(
        &self,
        store: RawStore,
        output_path: &CStr,
    ) -> Vec<u8>;
    unsafe fn store_unit_modification_time(
        &self,
        store: RawStore,
        unit_name: &CStr,
    ) -> Result<Timestamp, String>;

    unsafe fn unit_reader_create(
        &self,
        store: RawStore,
        unit_name: &CStr,
    ) -> Result<RawUnitReader, String>;
    unsafe fn unit_reader_dispose(&self, reader: RawUnitReader);
    unsafe fn unit_reader_string(&self, reader: RawUnitReader, field: UnitField) -> RawStr;
    unsafe fn unit_reader_flag(&self, reader: RawUnitReader, flag: UnitFlag) -> bool;
    unsafe fn unit_reader_modification_time(&self, reader: RawUnitReader) -> Timestamp;
    unsafe fn unit_reader_dependencies_apply(
        &self,
        reader: RawUnitReader,
        applier: Applier<'_, RawDependency>,
    ) -> bool;
    unsafe fn unit_reader_includes_apply(
        &self,
        reader: RawUnitReader,
        applier: Applier<'_, RawInclude>,
    ) -> bool;

    unsafe fn dependency_kind(&self, dependency: RawDependency) -> u32;
    unsafe fn dependency_is_system(&self, dependency: RawDependency) -> bool;
    unsafe fn dependency_string(&self, dependency: RawDependency, field: DependencyField)
    -> RawStr;

    unsafe fn include_source_path(&self, include: RawInclude) -> RawStr;
    unsafe fn include_target_path(&self, include: RawInclude) -> RawStr;
    /// The line exactly as stored; no validation happens at this layer.
    unsafe fn include_source_line(&self, include: RawInclude) -> i64;

    unsafe fn record_reader_create(
        &self,
        store: RawStore,
        record_name: &CStr,
    ) -> Result<RawRecordReader, String>;
    unsafe fn record_reader_dispose(&self, reader: RawRecordReader);
    unsafe fn record_reader_symbols_apply(
        &self,
        reader: RawRecordReader,
        nocache: bool,
        applier: Applier<'_, RawSymbol>,
    ) -> bool;
    unsafe fn record_reader_occurrences_apply(
        &self,
        reader: RawRecordReader,
        applier: Applier<'_, RawOccurrence>,
    ) -> bool;
    unsafe fn record_reader_occurrences_in_line_range(
        &self,
        reader: RawRecordReader,
        line_start: u32,
        line_count: u32,
        applier: Applier<'_, RawOccurrence>,
    ) -> bool;

    unsafe fn symbol_language(&self, symbol: RawSymbol) -> u32;
    unsafe fn symbol_kind(&self, symbol: RawSymbol) -> u32;
    unsafe fn symbol_subkind(&self, symbol: RawSymbol) -> u32;
    unsafe fn symbol_properties(&self, symbol: RawSymbol) -> u64;
    unsafe fn symbol_roles(&self, symbol: RawSymbol) -> u64;
    unsafe fn symbol_related_roles(&self, symbol: RawSymbol) -> u64;
    unsafe fn symbol_string(&self, symbol: RawSymbol, field: SymbolField) -> RawStr;

    unsafe fn occurrence_symbol(&self, occurrence: RawOccurrence) -> RawSymbol;
    unsafe fn occurrence_roles(&self, occurrence: RawOccurrence) -> u64;
    unsafe fn occurrence_line_col(&self, occurrence: RawOccurrence) -> (u32, u32);
    unsafe fn occurrence_relations_apply(
        &self,
        occurrence: RawOccurrence,
        applier: Applier<'_, RawRelation>,
    ) -> bool;

    unsafe fn relation_roles(&self, relation: RawRelation) -> u64;
    unsafe fn relation_symbol(&self, relation: RawRelation) -> RawSymbol;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timestamp_round_trips_through_system_time() {
        let ts = Timestamp::new(1_700_000_000, 123_456_789);
        assert_eq!(Timestamp::from_system_time(ts.to_system_time()), ts);
    }

    #[test]
    fn test_timestamps_order_by_seconds_then_nanos() {
        assert!(Timestamp::new(10, 5) < Timestamp::new(10, 6));
        assert!(Timestamp::new(9, 999) < Timestamp::new(10, 0));
    }
}
