//! `libIndexStore` bound at runtime through `libloading`.

use std::any::Any;
use std::ffi::{CStr, c_char, c_uint, c_void};
use std::panic::{self, AssertUnwindSafe};
use std::path::Path;

use libloading::Library;
use tracing::debug;

use super::{
    Applier, DependencyField, IndexEngine, RawDependency, RawInclude, RawOccurrence,
    RawRecordReader, RawRelation, RawStore, RawStr, RawSymbol, RawUnitReader, SymbolField,
    Timestamp, UnitField, UnitFlag,
};
use crate::error::EngineLoadError;

type RawError = *mut c_void;
type CApplier<T> = unsafe extern "C" fn(*mut c_void, T) -> bool;
type ReaderStr<R> = unsafe extern "C" fn(R) -> RawStr;
type ReaderBool<R> = unsafe extern "C" fn(R) -> bool;

/// The `indexstore_*` entry points this layer calls.
struct FunctionTable {
    format_version: unsafe extern "C" fn() -> c_uint,
    error_get_description: unsafe extern "C" fn(RawError) -> *const c_char,
    error_dispose: unsafe extern "C" fn(RawError),

    store_create: unsafe extern "C" fn(*const c_char, *mut RawError) -> RawStore,
    store_dispose: unsafe extern "C" fn(RawStore),
    store_units_apply: unsafe extern "C" fn(RawStore, c_uint, *mut c_void, CApplier<RawStr>) -> bool,
    store_get_unit_name_from_output_path:
        unsafe extern "C" fn(RawStore, *const c_char, *mut c_char, usize) -> usize,
    store_get_unit_modification_time:
        unsafe extern "C" fn(RawStore, *const c_char, *mut i64, *mut i64, *mut RawError) -> bool,

    unit_reader_create:
        unsafe extern "C" fn(RawStore, *const c_char, *mut RawError) -> RawUnitReader,
    unit_reader_dispose: unsafe extern "C" fn(RawUnitReader),
    unit_reader_get_main_file: ReaderStr<RawUnitReader>,
    unit_reader_get_output_file: ReaderStr<RawUnitReader>,
    unit_reader_get_module_name: ReaderStr<RawUnitReader>,
    unit_reader_get_working_dir: ReaderStr<RawUnitReader>,
    unit_reader_get_target: ReaderStr<RawUnitReader>,
    unit_reader_get_sysroot_path: ReaderStr<RawUnitReader>,
    unit_reader_get_provider_identifier: Option<ReaderStr<RawUnitReader>>,
    unit_reader_get_provider_version: Option<ReaderStr<RawUnitReader>>,
    unit_reader_is_system_unit: ReaderBool<RawUnitReader>,
    unit_reader_is_module_unit: ReaderBool<RawUnitReader>,
    unit_reader_is_debug_compilation: ReaderBool<RawUnitReader>,
    unit_reader_has_main_file: ReaderBool<RawUnitReader>,
    unit_reader_get_modification_time: unsafe extern "C" fn(RawUnitReader, *mut i64, *mut i64),
    unit_reader_dependencies_apply:
        unsafe extern "C" fn(RawUnitReader, *mut c_void, CApplier<RawDependency>) -> bool,
    unit_reader_includes_apply:
        unsafe extern "C" fn(RawUnitReader, *mut c_void, CApplier<RawInclude>) -> bool,

    unit_dependency_get_kind: unsafe extern "C" fn(RawDependency) -> c_uint,
    unit_dependency_is_system: ReaderBool<RawDependency>,
    unit_dependency_get_name: ReaderStr<RawDependency>,
    unit_dependency_get_filepath: ReaderStr<RawDependency>,
    unit_dependency_get_modulename: ReaderStr<RawDependency>,

    unit_include_get_source_path: ReaderStr<RawInclude>,
    unit_include_get_target_path: ReaderStr<RawInclude>,
    unit_include_get_source_line: unsafe extern "C" fn(RawInclude) -> c_uint,

    record_reader_create:
        unsafe extern "C" fn(RawStore, *const c_char, *mut RawError) -> RawRecordReader,
    record_reader_dispose: unsafe extern "C" fn(RawRecordReader),
    record_reader_symbols_apply:
        unsafe extern "C" fn(RawRecordReader, bool, *mut c_void, CApplier<RawSymbol>) -> bool,
    record_reader_occurrences_apply:
        unsafe extern "C" fn(RawRecordReader, *mut c_void, CApplier<RawOccurrence>) -> bool,
    record_reader_occurrences_in_line_range: unsafe extern "C" fn(
        RawRecordReader,
        c_uint,
        c_uint,
        *mut c_void,
        CApplier<RawOccurrence>,
    ) -> bool,

    symbol_get_language: unsafe extern "C" fn(RawSymbol) -> c_uint,
    symbol_get_kind: unsafe extern "C" fn(RawSymbol) -> c_uint,
    symbol_get_subkind: unsafe extern "C" fn(RawSymbol) -> c_uint,
    symbol_get_properties: unsafe extern "C" fn(RawSymbol) -> u64,
    symbol_get_roles: unsafe extern "C" fn(RawSymbol) -> u64,
    symbol_get_related_roles: unsafe extern "C" fn(RawSymbol) -> u64,
    symbol_get_name: ReaderStr<RawSymbol>,
    symbol_get_usr: ReaderStr<RawSymbol>,
    symbol_get_codegen_name: ReaderStr<RawSymbol>,

    occurrence_get_symbol: unsafe extern "C" fn(RawOccurrence) -> RawSymbol,
    occurrence_get_roles: unsafe extern "C" fn(RawOccurrence) -> u64,
    occurrence_get_line_col: unsafe extern "C" fn(RawOccurrence, *mut c_uint, *mut c_uint),
    occurrence_relations_apply:
        unsafe extern "C" fn(RawOccurrence, *mut c_void, CApplier<RawRelation>) -> bool,

    symbol_relation_get_roles: unsafe extern "C" fn(RawRelation) -> u64,
    symbol_relation_get_symbol: unsafe extern "C" fn(RawRelation) -> RawSymbol,
}

fn required<T: Copy>(lib: &Library, symbol: &'static str) -> Result<T, EngineLoadError> {
    // SAFETY: `T` is the function-pointer type declared by indexstore.h for `symbol`.
    let sym = unsafe { lib.get::<T>(symbol.as_bytes()) }
        .map_err(|source| EngineLoadError::MissingSymbol { symbol, source })?;
    Ok(*sym)
}

fn optional<T: Copy>(lib: &Library, symbol: &'static str) -> Option<T> {
    // SAFETY: as in `required`.
    unsafe { lib.get::<T>(symbol.as_bytes()) }.ok().map(|sym| *sym)
}

impl FunctionTable {
    fn resolve(lib: &Library) -> Result<Self, EngineLoadError> {
        Ok(Self {
            format_version: required(lib, "indexstore_format_version")?,
            error_get_description: required(lib, "indexstore_error_get_description")?,
            error_dispose: required(lib, "indexstore_error_dispose")?,

            store_create: required(lib, "indexstore_store_create")?,
            store_dispose: required(lib, "indexstore_store_dispose")?,
            store_units_apply: required(lib, "indexstore_store_units_apply_f")?,
            store_get_unit_name_from_output_path: required(
                lib,
                "indexstore_store_get_unit_name_from_output_path",
            )?,
            store_get_unit_modification_time: required(
                lib,
                "indexstore_store_get_unit_modification_time",
            )?,

            unit_reader_create: required(lib, "indexstore_unit_reader_create")?,
            unit_reader_dispose: required(lib, "indexstore_unit_reader_dispose")?,
            unit_reader_get_main_file: required(lib, "indexstore_unit_reader_get_main_file")?,
            unit_reader_get_output_file: required(lib, "indexstore_unit_reader_get_output_file")?,
            unit_reader_get_module_name: required(lib, "indexstore_unit_reader_get_module_name")?,
            unit_reader_get_working_dir: required(lib, "indexstore_unit_reader_get_working_dir")?,
            unit_reader_get_target: required(lib, "indexstore_unit_reader_get_target")?,
            unit_reader_get_sysroot_path: required(
                lib,
                "indexstore_unit_reader_get_sysroot_path",
            )?,
            unit_reader_get_provider_identifier: optional(
                lib,
                "indexstore_unit_reader_get_provider_identifier",
            ),
            unit_reader_get_provider_version: optional(
                lib,
                "indexstore_unit_reader_get_provider_version",
            ),
            unit_reader_is_system_unit: required(lib, "indexstore_unit_reader_is_system_unit")?,
            unit_reader_is_module_unit: required(lib, "indexstore_unit_reader_is_module_unit")?,
            unit_reader_is_debug_compilation: required(
                lib,
                "indexstore_unit_reader_is_debug_compilation",
            )?,
            unit_reader_has_main_file: required(lib, "indexstore_unit_reader_has_main_file")?,
            unit_reader_get_modification_time: required(
                lib,
                "indexstore_unit_reader_get_modification_time",
            )?,
            unit_reader_dependencies_apply: required(
                lib,
                "indexstore_unit_reader_dependencies_apply_f",
            )?,
            unit_reader_includes_apply: required(lib, "indexstore_unit_reader_includes_apply_f")?,

            unit_dependency_get_kind: required(lib, "indexstore_unit_dependency_get_kind")?,
            unit_dependency_is_system: required(lib, "indexstore_unit_dependency_is_system")?,
            unit_dependency_get_name: required(lib, "indexstore_unit_dependency_get_name")?,
            unit_dependency_get_filepath: required(lib, "indexstore_unit_dependency_get_filepath")?,
            unit_dependency_get_modulename: required(
                lib,
                "indexstore_unit_dependency_get_modulename",
            )?,

            unit_include_get_source_path: required(
                lib,
                "indexstore_unit_include_get_source_path",
            )?,
            unit_include_get_target_path: required(
                lib,
                "indexstore_unit_include_get_target_path",
            )?,
            unit_include_get_source_line: required(
                lib,
                "indexstore_unit_include_get_source_line",
            )?,

            record_reader_create: required(lib, "indexstore_record_reader_create")?,
            record_reader_dispose: required(lib, "indexstore_record_reader_dispose")?,
            record_reader_symbols_apply: required(
                lib,
                "indexstore_record_reader_symbols_apply_f",
            )?,
            record_reader_occurrences_apply: required(
                lib,
                "indexstore_record_reader_occurrences_apply_f",
            )?,
            record_reader_occurrences_in_line_range: required(
                lib,
                "indexstore_record_reader_occurrences_in_line_range_f",
            )?,

            symbol_get_language: required(lib, "indexstore_symbol_get_language")?,
            symbol_get_kind: required(lib, "indexstore_symbol_get_kind")?,
            symbol_get_subkind: required(lib, "indexstore_symbol_get_subkind")?,
            symbol_get_properties: required(lib, "indexstore_symbol_get_properties")?,
            symbol_get_roles: required(lib, "indexstore_symbol_get_roles")?,
            symbol_get_related_roles: required(lib, "indexstore_symbol_get_related_roles")?,
            symbol_get_name: required(lib, "indexstore_symbol_get_name")?,
            symbol_get_usr: required(lib, "indexstore_symbol_get_usr")?,
            symbol_get_codegen_name: required(lib, "indexstore_symbol_get_codegen_name")?,

            occurrence_get_symbol: required(lib, "indexstore_occurrence_get_symbol")?,
            occurrence_get_roles: required(lib, "indexstore_occurrence_get_roles")?,
            occurrence_get_line_col: required(lib, "indexstore_occurrence_get_line_col")?,
            occurrence_relations_apply: required(
                lib,
                "indexstore_occurrence_relations_apply_f",
            )?,

            symbol_relation_get_roles: required(lib, "indexstore_symbol_relation_get_roles")?,
            symbol_relation_get_symbol: required(lib, "indexstore_symbol_relation_get_symbol")?,
        })
    }
}

/// Context threaded through a native applier as `void *context`.
struct Visitor<'a, T> {
    applier: Applier<'a, T>,
    panic: Option<Box<dyn Any + Send>>,
}

unsafe extern "C" fn trampoline<T>(context: *mut c_void, item: T) -> bool {
    // SAFETY: `context` is the `Visitor<T>` that `drive` passed to the engine,
    // alive and exclusively borrowed for the duration of the traversal.
    let visitor = unsafe { &mut *context.cast::<Visitor<'_, T>>() };
    if visitor.panic.is_some() {
        return false;
    }
    match panic::catch_unwind(AssertUnwindSafe(|| (visitor.applier)(item))) {
        Ok(keep_going) => keep_going,
        Err(payload) => {
            visitor.panic = Some(payload);
            false
        }
    }
}

/// Run a native traversal, routing each item to `applier`. A panic raised by
/// the applier stops the traversal and is resumed once the engine returns.
fn drive<T>(
    applier: Applier<'_, T>,
    traverse: impl FnOnce(*mut c_void, CApplier<T>) -> bool,
) -> bool {
    let mut visitor = Visitor {
        applier,
        panic: None,
    };
    let finished = traverse((&raw mut visitor).cast::<c_void>(), trampoline::<T>);
    if let Some(payload) = visitor.panic {
        panic::resume_unwind(payload);
    }
    finished
}

/// An [`IndexEngine`] backed by a loaded `libIndexStore`.
pub struct DylibEngine {
    api: FunctionTable,
    // Keeps every pointer in `api` alive.
    _library: Library,
}

impl DylibEngine {
    pub fn open(path: &Path) -> Result<Self, EngineLoadError> {
        // SAFETY: loading runs the library's initialisers; libIndexStore has
        // none with preconditions beyond being loaded once per path.
        let library = unsafe { Library::new(path) }.map_err(|source| {
            EngineLoadError::NotALibrary {
                path: path.to_path_buf(),
                source,
            }
        })?;
        let api = FunctionTable::resolve(&library)?;
        debug!(path = %path.display(), "resolved index store function table");
        Ok(Self {
            api,
            _library: library,
        })
    }

    fn take_error(&self, error: RawError) -> String {
        if error.is_null() {
            return "unknown error".to_string();
        }
        // SAFETY: `error` was produced by this library and is disposed exactly once.
        unsafe {
            let description = (self.api.error_get_description)(error);
            let message = if description.is_null() {
                "unknown error".to_string()
            } else {
                CStr::from_ptr(description).to_string_lossy().into_owned()
            };
            (self.api.error_dispose)(error);
            message
        }
    }
}

unsafe impl IndexEngine for DylibEngine {
    fn format_version(&self) -> u32 {
        // SAFETY: no arguments, no preconditions.
        unsafe { (self.api.format_version)() }
    }

    fn store_create(&self, path: &CStr) -> Result<RawStore, String> {
        let mut error: RawError = std::ptr::null_mut();
        // SAFETY: `path` is NUL-terminated and `error` is a valid out-pointer.
        let store = unsafe { (self.api.store_create)(path.as_ptr(), &mut error) };
        if store.is_null() {
            Err(self.take_error(error))
        } else {
            Ok(store)
        }
    }

    unsafe fn store_dispose(&self, store: RawStore) {
        unsafe { (self.api.store_dispose)(store) }
    }

    unsafe fn store_units_apply(
        &self,
        store: RawStore,
        sorted: bool,
        applier: Applier<'_, RawStr>,
    ) -> bool {
        drive(applier, |ctx, f| unsafe {
            (self.api.store_units_apply)(store, c_uint::from(sorted), ctx, f)
        })
    }

    unsafe fn store_unit_name_from_output_path(
        &self,
        store: RawStore,
        output_path: &CStr,
    ) -> Vec<u8> {
        let mut buf = vec![0u8; 256];
        loop {
            let needed = unsafe {
                (self.api.store_get_unit_name_from_output_path)(
                    store,
                    output_path.as_ptr(),
                    buf.as_mut_ptr().cast::<c_char>(),
                    buf.len(),
                )
            };
            // The return value is the full name length, excluding the NUL.
            if needed < buf.len() {
                buf.truncate(needed);
                return buf;
            }
            buf.resize(needed + 1, 0);
        }
    }

    unsafe fn store_unit_modification_time(
        &self,
        store: RawStore,
        unit_name: &CStr,
    ) -> Result<Timestamp, String> {
        let (mut seconds, mut nanoseconds) = (0i64, 0i64);
        let mut error: RawError = std::ptr::null_mut();
        // Returns true when an error occurred.
        let failed = unsafe {
            (self.api.store_get_unit_modification_time)(
                store,
                unit_name.as_ptr(),
                &mut seconds,
                &mut nanoseconds,
                &mut error,
            )
        };
        if failed {
            Err(self.take_error(error))
        } else {
            Ok(Timestamp::new(seconds, nanoseconds))
        }
    }

    unsafe fn unit_reader_create(
        &self,
        store: RawStore,
        unit_name: &CStr,
    ) -> Result<RawUnitReader, String> {
        let mut error: RawError = std::ptr::null_mut();
        let reader = unsafe { (self.api.unit_reader_create)(store, unit_name.as_ptr(), &mut error) };
        if reader.is_null() {
            Err(self.take_error(error))
        } else {
            Ok(reader)
        }
    }

    unsafe fn unit_reader_dispose(&self, reader: RawUnitReader) {
        unsafe { (self.api.unit_reader_dispose)(reader) }
    }

    unsafe fn unit_reader_string(&self, reader: RawUnitReader, field: UnitField) -> RawStr {
        let getter = match field {
            UnitField::MainFile => Some(self.api.unit_reader_get_main_file),
            UnitField::OutputFile => Some(self.api.unit_reader_get_output_file),
            UnitField::ModuleName => Some(self.api.unit_reader_get_module_name),
            UnitField::WorkingDir => Some(self.api.unit_reader_get_working_dir),
            UnitField::Target => Some(self.api.unit_reader_get_target),
            UnitField::Sysroot => Some(self.api.unit_reader_get_sysroot_path),
            UnitField::ProviderIdentifier => self.api.unit_reader_get_provider_identifier,
            UnitField::ProviderVersion => self.api.unit_reader_get_provider_version,
        };
        match getter {
            Some(getter) => unsafe { getter(reader) },
            None => RawStr::EMPTY,
        }
    }

    unsafe fn unit_reader_flag(&self, reader: RawUnitReader, flag: UnitFlag) -> bool {
        let getter = match flag {
            UnitFlag::System => self.api.unit_reader_is_system_unit,
            UnitFlag::Module => self.api.unit_reader_is_module_unit,
            UnitFlag::DebugCompilation => self.api.unit_reader_is_debug_compilation,
            UnitFlag::HasMainFile => self.api.unit_reader_has_main_file,
        };
        unsafe { getter(reader) }
    }

    unsafe fn unit_reader_modification_time(&self, reader: RawUnitReader) -> Timestamp {
        let (mut seconds, mut nanoseconds) = (0i64, 0i64);
        unsafe { (self.api.unit_reader_get_modification_time)(reader, &mut seconds, &mut nanoseconds) };
        Timestamp::new(seconds, nanoseconds)
    }

    unsafe fn unit_reader_dependencies_apply(
        &self,
        reader: RawUnitReader,
        applier: Applier<'_, RawDependency>,
    ) -> bool {
        drive(applier, |ctx, f| unsafe {
            (self.api.unit_reader_dependencies_apply)(reader, ctx, f)
        })
    }

    unsafe fn unit_reader_includes_apply(
        &self,
        reader: RawUnitReader,
        applier: Applier<'_, RawInclude>,
    ) -> bool {
        drive(applier, |ctx, f| unsafe {
            (self.api.unit_reader_includes_apply)(reader, ctx, f)
        })
    }

    unsafe fn dependency_kind(&self, dependency: RawDependency) -> u32 {
        unsafe { (self.api.unit_dependency_get_kind)(dependency) }
    }

    unsafe fn dependency_is_system(&self, dependency: RawDependency) -> bool {
        unsafe { (self.api.unit_dependency_is_system)(dependency) }
    }

    unsafe fn dependency_string(
        &self,
        dependency: RawDependency,
        field: DependencyField,
    ) -> RawStr {
        let getter = match field {
            DependencyField::Name => self.api.unit_dependency_get_name,
            DependencyField::FilePath => self.api.unit_dependency_get_filepath,
            DependencyField::ModuleName => self.api.unit_dependency_get_modulename,
        };
        unsafe { getter(dependency) }
    }

    unsafe fn include_source_path(&self, include: RawInclude) -> RawStr {
        unsafe { (self.api.unit_include_get_source_path)(include) }
    }

    unsafe fn include_target_path(&self, include: RawInclude) -> RawStr {
        unsafe { (self.api.unit_include_get_target_path)(include) }
    }

    unsafe fn include_source_line(&self, include: RawInclude) -> i64 {
        i64::from(unsafe { (self.api.unit_include_get_source_line)(include) })
    }

    unsafe fn record_reader_create(
        &self,
        store: RawStore,
        record_name: &CStr,
    ) -> Result<RawRecordReader, String> {
        let mut error: RawError = std::ptr::null_mut();
        let reader =
            unsafe { (self.api.record_reader_create)(store, record_name.as_ptr(), &mut error) };
        if reader.is_null() {
            Err(self.take_error(error))
        } else {
            Ok(reader)
        }
    }

    unsafe fn record_reader_dispose(&self, reader: RawRecordReader) {
        unsafe { (self.api.record_reader_dispose)(reader) }
    }

    unsafe fn record_reader_symbols_apply(
        &self,
        reader: RawRecordReader,
        nocache: bool,
        applier: Applier<'_, RawSymbol>,
    ) -> bool {
        drive(applier, |ctx, f| unsafe {
            (self.api.record_reader_symbols_apply)(reader, nocache, ctx, f)
        })
    }

    unsafe fn record_reader_occurrences_apply(
        &self,
        reader: RawRecordReader,
        applier: Applier<'_, RawOccurrence>,
    ) -> bool {
        drive(applier, |ctx, f| unsafe {
            (self.api.record_reader_occurrences_apply)(reader, ctx, f)
        })
    }

    unsafe fn record_reader_occurrences_in_line_range(
        &self,
        reader: RawRecordReader,
        line_start: u32,
        line_count: u32,
        applier: Applier<'_, RawOccurrence>,
    ) -> bool {
        drive(applier, |ctx, f| unsafe {
            (self.api.record_reader_occurrences_in_line_range)(
                reader, line_start, line_count, ctx, f,
            )
        })
    }

    unsafe fn symbol_language(&self, symbol: RawSymbol) -> u32 {
        unsafe { (self.api.symbol_get_language)(symbol) }
    }

    unsafe fn symbol_kind(&self, symbol: RawSymbol) -> u32 {
        unsafe { (self.api.symbol_get_kind)(symbol) }
    }

    unsafe fn symbol_subkind(&self, symbol: RawSymbol) -> u32 {
        unsafe { (self.api.symbol_get_subkind)(symbol) }
    }

    unsafe fn symbol_properties(&self, symbol: RawSymbol) -> u64 {
        unsafe { (self.api.symbol_get_properties)(symbol) }
    }

    unsafe fn symbol_roles(&self, symbol: RawSymbol) -> u64 {
        unsafe { (self.api.symbol_get_roles)(symbol) }
    }

    unsafe fn symbol_related_roles(&self, symbol: RawSymbol) -> u64 {
        unsafe { (self.api.symbol_get_related_roles)(symbol) }
    }

    unsafe fn symbol_string(&self, symbol: RawSymbol, field: SymbolField) -> RawStr {
        let getter = match field {
            SymbolField::Name => self.api.symbol_get_name,
            SymbolField::Usr => self.api.symbol_get_usr,
            SymbolField::CodegenName => self.api.symbol_get_codegen_name,
        };
        unsafe { getter(symbol) }
    }

    unsafe fn occurrence_symbol(&self, occurrence: RawOccurrence) -> RawSymbol {
        unsafe { (self.api.occurrence_get_symbol)(occurrence) }
    }

    unsafe fn occurrence_roles(&self, occurrence: RawOccurrence) -> u64 {
        unsafe { (self.api.occurrence_get_roles)(occurrence) }
    }

    unsafe fn occurrence_line_col(&self, occurrence: RawOccurrence) -> (u32, u32) {
        let (mut line, mut column): (c_uint, c_uint) = (0, 0);
        unsafe { (self.api.occurrence_get_line_col)(occurrence, &mut line, &mut column) };
        (line, column)
    }

    unsafe fn occurrence_relations_apply(
        &self,
        occurrence: RawOccurrence,
        applier: Applier<'_, RawRelation>,
    ) -> bool {
        drive(applier, |ctx, f| unsafe {
            (self.api.occurrence_relations_apply)(occurrence, ctx, f)
        })
    }

    unsafe fn relation_roles(&self, relation: RawRelation) -> u64 {
        unsafe { (self.api.symbol_relation_get_roles)(relation) }
    }

    unsafe fn relation_symbol(&self, relation: RawRelation) -> RawSymbol {
        unsafe { (self.api.symbol_relation_get_symbol)(relation) }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_drive_reports_early_stop_and_forwards_items() {
        let mut seen = Vec::new();
        let mut applier = |n: u32| {
            seen.push(n);
            n < 2
        };
        let finished = drive(&mut applier, |ctx, f| {
            for n in 0..5u32 {
                if !unsafe { f(ctx, n) } {
                    return false;
                }
            }
            true
        });
        assert!(!finished);
        assert_eq!(seen, vec![0, 1, 2]);
    }

    #[test]
    fn test_drive_resumes_applier_panics_after_traversal() {
        let mut calls_after_panic = 0;
        let result = panic::catch_unwind(AssertUnwindSafe(|| {
            let mut applier = |n: u32| -> bool {
                if n == 1 {
                    panic!("boom");
                }
                true
            };
            drive(&mut applier, |ctx, f| {
                for n in 0..3u32 {
                    if !unsafe { f(ctx, n) } {
                        calls_after_panic += 1;
                    }
                }
                true
            })
        }));
        assert!(result.is_err());
        // The panicking item and every later one report a stop.
        assert_eq!(calls_after_panic, 2);
    }

    #[test]
    fn test_opening_a_missing_library_fails() {
        let err = match DylibEngine::open(Path::new("/definitely/not/libIndexStore.so")) {
            Err(err) => err,
            Ok(_) => panic!("expected load failure"),
        };
        assert!(matches!(err, EngineLoadError::NotALibrary { .. }));
    }
}
