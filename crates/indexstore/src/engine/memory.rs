//! An in-memory [`IndexEngine`] serving a fixture store.
//!
//! Fixtures are described with plain builder structs ([`MemoryStore`],
//! [`MemoryUnit`], [`MemoryRecord`], ...). The engine flattens them into
//! tables at construction time and hands out 1-based row numbers as handles,
//! so nothing it returns is ever a dangling pointer. It also counts live
//! stores and readers, which lets tests observe that every native resource
//! is released.

use std::ffi::{CStr, c_void};
use std::ops::Range;
use std::sync::atomic::{AtomicUsize, Ordering};

use super::{
    Applier, DEPENDENCY_FILE, DEPENDENCY_RECORD, DEPENDENCY_UNIT, DependencyField, IndexEngine,
    RawDependency, RawInclude, RawOccurrence, RawRecordReader, RawRelation, RawStore, RawStr,
    RawSymbol, RawUnitReader, SymbolField, Timestamp, UnitField, UnitFlag,
};

pub const DEFAULT_FORMAT_VERSION: u32 = 5;

#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    pub units: Vec<MemoryUnit>,
    pub records: Vec<MemoryRecord>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn unit(mut self, unit: MemoryUnit) -> Self {
        self.units.push(unit);
        self
    }

    pub fn record(mut self, record: MemoryRecord) -> Self {
        self.records.push(record);
        self
    }
}

#[derive(Debug, Clone, Default)]
pub struct MemoryUnit {
    pub name: String,
    pub main_file: String,
    pub output_file: String,
    pub module_name: String,
    pub working_dir: String,
    pub target: String,
    pub sysroot: String,
    pub provider_identifier: String,
    pub provider_version: String,
    pub modification_time: Timestamp,
    pub is_system: bool,
    pub is_module: bool,
    pub is_debug: bool,
    pub includes: Vec<MemoryInclude>,
    pub dependencies: Vec<MemoryDependency>,
    /// Opening this unit fails with this message.
    pub open_error: Option<String>,
}

impl MemoryUnit {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            provider_identifier: "clang".to_string(),
            ..Self::default()
        }
    }

    pub fn main_file(mut self, path: impl Into<String>) -> Self {
        self.main_file = path.into();
        self
    }

    pub fn output_file(mut self, path: impl Into<String>) -> Self {
        self.output_file = path.into();
        self
    }

    pub fn module_name(mut self, name: impl Into<String>) -> Self {
        self.module_name = name.into();
        self
    }

    pub fn working_dir(mut self, path: impl Into<String>) -> Self {
        self.working_dir = path.into();
        self
    }

    pub fn target(mut self, triple: impl Into<String>) -> Self {
        self.target = triple.into();
        self
    }

    pub fn modified_at(mut self, time: Timestamp) -> Self {
        self.modification_time = time;
        self
    }

    pub fn system(mut self) -> Self {
        self.is_system = true;
        self
    }

    pub fn include(
        mut self,
        source_path: impl Into<String>,
        line: i64,
        target_path: impl Into<String>,
    ) -> Self {
        self.includes.push(MemoryInclude {
            source_path: source_path.into(),
            line,
            target_path: target_path.into(),
        });
        self
    }

    pub fn dependency(mut self, dependency: MemoryDependency) -> Self {
        self.dependencies.push(dependency);
        self
    }

    pub fn record_dependency(self, record: impl Into<String>, file: impl Into<String>) -> Self {
        self.dependency(MemoryDependency::new(DEPENDENCY_RECORD, record).file_path(file))
    }

    pub fn file_dependency(self, file: impl Into<String>) -> Self {
        let file = file.into();
        self.dependency(MemoryDependency::new(DEPENDENCY_FILE, "").file_path(file))
    }

    pub fn unit_dependency(self, unit: impl Into<String>) -> Self {
        self.dependency(MemoryDependency::new(DEPENDENCY_UNIT, unit))
    }

    pub fn unreadable(mut self, message: impl Into<String>) -> Self {
        self.open_error = Some(message.into());
        self
    }
}

#[derive(Debug, Clone, Default)]
pub struct MemoryInclude {
    pub source_path: String,
    pub line: i64,
    pub target_path: String,
}

#[derive(Debug, Clone, Default)]
pub struct MemoryDependency {
    pub kind: u32,
    pub name: String,
    pub file_path: String,
    pub module_name: String,
    pub is_system: bool,
}

impl MemoryDependency {
    pub fn new(kind: u32, name: impl Into<String>) -> Self {
        Self {
            kind,
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn file_path(mut self, path: impl Into<String>) -> Self {
        self.file_path = path.into();
        self
    }

    pub fn module_name(mut self, name: impl Into<String>) -> Self {
        self.module_name = name.into();
        self
    }

    pub fn system(mut self) -> Self {
        self.is_system = true;
        self
    }
}

#[derive(Debug, Clone, Default)]
pub struct MemoryRecord {
    pub name: String,
    pub symbols: Vec<MemorySymbol>,
    pub occurrences: Vec<MemoryOccurrence>,
    pub open_error: Option<String>,
}

impl MemoryRecord {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn symbol(mut self, symbol: MemorySymbol) -> Self {
        self.symbols.push(symbol);
        self
    }

    pub fn occurrence(mut self, occurrence: MemoryOccurrence) -> Self {
        self.occurrences.push(occurrence);
        self
    }

    pub fn unreadable(mut self, message: impl Into<String>) -> Self {
        self.open_error = Some(message.into());
        self
    }
}

#[derive(Debug, Clone, Default)]
pub struct MemorySymbol {
    pub language: u32,
    pub kind: u32,
    pub subkind: u32,
    pub properties: u64,
    pub roles: u64,
    pub related_roles: u64,
    pub name: String,
    pub usr: String,
    pub codegen_name: String,
}

impl MemorySymbol {
    pub fn new(kind: u32, name: impl Into<String>, usr: impl Into<String>) -> Self {
        Self {
            kind,
            name: name.into(),
            usr: usr.into(),
            ..Self::default()
        }
    }

    pub fn language(mut self, language: u32) -> Self {
        self.language = language;
        self
    }

    pub fn roles(mut self, roles: u64) -> Self {
        self.roles = roles;
        self
    }

    pub fn related_roles(mut self, roles: u64) -> Self {
        self.related_roles = roles;
        self
    }

    pub fn properties(mut self, properties: u64) -> Self {
        self.properties = properties;
        self
    }
}

/// An occurrence of `symbols[symbol]` of the same record.
#[derive(Debug, Clone, Default)]
pub struct MemoryOccurrence {
    pub symbol: usize,
    pub roles: u64,
    pub line: u32,
    pub column: u32,
    /// `(roles, index into the record's symbols)`
    pub relations: Vec<(u64, usize)>,
}

impl MemoryOccurrence {
    pub fn new(symbol: usize, roles: u64, line: u32, column: u32) -> Self {
        Self {
            symbol,
            roles,
            line,
            column,
            relations: Vec::new(),
        }
    }

    pub fn related(mut self, roles: u64, symbol: usize) -> Self {
        self.relations.push((roles, symbol));
        self
    }
}

struct UnitRow {
    unit: MemoryUnit,
    includes: Range<usize>,
    dependencies: Range<usize>,
}

struct RecordRow {
    name: String,
    open_error: Option<String>,
    symbols: Range<usize>,
    occurrences: Range<usize>,
}

struct OccurrenceRow {
    symbol: usize,
    roles: u64,
    line: u32,
    column: u32,
    relations: Range<usize>,
}

#[derive(Default)]
struct LiveHandles {
    stores: AtomicUsize,
    units: AtomicUsize,
    records: AtomicUsize,
}

/// Snapshot of the resources an engine has handed out and not yet disposed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OpenHandles {
    pub stores: usize,
    pub units: usize,
    pub records: usize,
}

impl OpenHandles {
    pub fn total(&self) -> usize {
        self.stores + self.units + self.records
    }
}

pub struct MemoryEngine {
    format_version: u32,
    concurrent_reads: bool,
    store_error: Option<String>,
    units: Vec<UnitRow>,
    includes: Vec<MemoryInclude>,
    dependencies: Vec<MemoryDependency>,
    records: Vec<RecordRow>,
    symbols: Vec<MemorySymbol>,
    occurrences: Vec<OccurrenceRow>,
    relations: Vec<(u64, usize)>,
    live: LiveHandles,
    callbacks: AtomicUsize,
    peak_units: AtomicUsize,
}

fn token(row: usize) -> *mut c_void {
    std::ptr::without_provenance_mut(row.wrapping_add(1))
}

fn row(ptr: *mut c_void) -> usize {
    ptr.addr().wrapping_sub(1)
}

fn release(counter: &AtomicUsize) {
    let _ = counter.fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1));
}

impl MemoryEngine {
    pub fn new(store: MemoryStore) -> Self {
        let mut engine = Self {
            format_version: DEFAULT_FORMAT_VERSION,
            concurrent_reads: true,
            store_error: None,
            units: Vec::new(),
            includes: Vec::new(),
            dependencies: Vec::new(),
            records: Vec::new(),
            symbols: Vec::new(),
            occurrences: Vec::new(),
            relations: Vec::new(),
            live: LiveHandles::default(),
            callbacks: AtomicUsize::new(0),
            peak_units: AtomicUsize::new(0),
        };

        for mut unit in store.units {
            let start = engine.includes.len();
            engine.includes.append(&mut unit.includes);
            let includes = start..engine.includes.len();

            let start = engine.dependencies.len();
            engine.dependencies.append(&mut unit.dependencies);
            let dependencies = start..engine.dependencies.len();

            engine.units.push(UnitRow {
                unit,
                includes,
                dependencies,
            });
        }

        for record in store.records {
            let symbol_base = engine.symbols.len();
            engine.symbols.extend(record.symbols);
            let symbols = symbol_base..engine.symbols.len();

            let start = engine.occurrences.len();
            for occurrence in record.occurrences {
                let rel_start = engine.relations.len();
                engine.relations.extend(
                    occurrence
                        .relations
                        .iter()
                        .map(|&(roles, symbol)| (roles, symbol_base + symbol)),
                );
                engine.occurrences.push(OccurrenceRow {
                    symbol: symbol_base + occurrence.symbol,
                    roles: occurrence.roles,
                    line: occurrence.line,
                    column: occurrence.column,
                    relations: rel_start..engine.relations.len(),
                });
            }
            let occurrences = start..engine.occurrences.len();

            engine.records.push(RecordRow {
                name: record.name,
                open_error: record.open_error,
                symbols,
                occurrences,
            });
        }

        engine
    }

    pub fn with_format_version(mut self, version: u32) -> Self {
        self.format_version = version;
        self
    }

    pub fn with_concurrent_reads(mut self, enabled: bool) -> Self {
        self.concurrent_reads = enabled;
        self
    }

    /// Make every `store_create` fail with `message`.
    pub fn failing_store_open(mut self, message: impl Into<String>) -> Self {
        self.store_error = Some(message.into());
        self
    }

    pub fn open_handles(&self) -> OpenHandles {
        OpenHandles {
            stores: self.live.stores.load(Ordering::SeqCst),
            units: self.live.units.load(Ordering::SeqCst),
            records: self.live.records.load(Ordering::SeqCst),
        }
    }

    /// The most unit readers that were open at the same time.
    pub fn peak_open_units(&self) -> usize {
        self.peak_units.load(Ordering::SeqCst)
    }

    /// Items handed to appliers so far, across every traversal.
    pub fn callbacks(&self) -> usize {
        self.callbacks.load(Ordering::SeqCst)
    }

    fn lend<T>(&self, applier: &mut dyn FnMut(T) -> bool, item: T) -> bool {
        self.callbacks.fetch_add(1, Ordering::SeqCst);
        applier(item)
    }

    fn unit_row(&self, reader: RawUnitReader) -> Option<&UnitRow> {
        self.units.get(row(reader.as_ptr()))
    }

    fn unit_by_name(&self, name: &CStr) -> Option<usize> {
        let name = name.to_str().ok()?;
        self.units.iter().position(|row| row.unit.name == name)
    }

    fn occurrence_row(&self, occurrence: RawOccurrence) -> Option<&OccurrenceRow> {
        self.occurrences.get(row(occurrence.as_ptr()))
    }

    fn visit_occurrences(
        &self,
        reader: RawRecordReader,
        lines: Option<Range<u32>>,
        applier: Applier<'_, RawOccurrence>,
    ) -> bool {
        let Some(record) = self.records.get(row(reader.as_ptr())) else {
            return true;
        };
        for idx in record.occurrences.clone() {
            if let Some(lines) = &lines {
                if !lines.contains(&self.occurrences[idx].line) {
                    continue;
                }
            }
            if !self.lend(&mut *applier, RawOccurrence::from_ptr(token(idx))) {
                return false;
            }
        }
        true
    }
}

/// `<file name>-<hash>`, the shape compilers give unit names. Fixture units
/// keep their declared names; any other output path gets a derived one.
fn derived_unit_name(output_path: &[u8]) -> Vec<u8> {
    const ALPHABET: &[u8; 36] = b"0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZ";
    // FNV-1a
    let mut hash: u64 = 0xcbf2_9ce4_8422_2325;
    for &byte in output_path {
        hash ^= u64::from(byte);
        hash = hash.wrapping_mul(0x0100_0000_01b3);
    }
    let file_name = output_path
        .rsplit(|&b| b == b'/')
        .next()
        .unwrap_or(output_path);
    let mut digits = Vec::new();
    loop {
        digits.push(ALPHABET[(hash % 36) as usize]);
        hash /= 36;
        if hash == 0 {
            break;
        }
    }
    digits.reverse();

    let mut name = file_name.to_vec();
    name.push(b'-');
    name.extend(digits);
    name
}

fn str_of(value: Option<&String>) -> RawStr {
    value.map_or(RawStr::EMPTY, |s| RawStr::from_str(s))
}

// SAFETY: every `RawStr` points into strings owned by `self` that are never
// mutated after construction, so they live as long as the engine.
unsafe impl IndexEngine for MemoryEngine {
    fn format_version(&self) -> u32 {
        self.format_version
    }

    fn concurrent_reads(&self) -> bool {
        self.concurrent_reads
    }

    fn store_create(&self, _path: &CStr) -> Result<RawStore, String> {
        if let Some(message) = &self.store_error {
            return Err(message.clone());
        }
        self.live.stores.fetch_add(1, Ordering::SeqCst);
        Ok(RawStore::from_ptr(token(0)))
    }

    unsafe fn store_dispose(&self, _store: RawStore) {
        release(&self.live.stores);
    }

    unsafe fn store_units_apply(
        &self,
        _store: RawStore,
        sorted: bool,
        applier: Applier<'_, RawStr>,
    ) -> bool {
        let mut names: Vec<&str> = self.units.iter().map(|row| row.unit.name.as_str()).collect();
        if sorted {
            names.sort_unstable();
        }
        names.into_iter().all(|name| self.lend(&mut *applier, RawStr::from_str(name)))
    }

    unsafe fn store_unit_name_from_output_path(
        &self,
        _store: RawStore,
        output_path: &CStr,
    ) -> Vec<u8> {
        let bytes = output_path.to_bytes();
        match self
            .units
            .iter()
            .find(|row| row.unit.output_file.as_bytes() == bytes)
        {
            Some(row) => row.unit.name.clone().into_bytes(),
            None => derived_unit_name(bytes),
        }
    }

    unsafe fn store_unit_modification_time(
        &self,
        _store: RawStore,
        unit_name: &CStr,
    ) -> Result<Timestamp, String> {
        self.unit_by_name(unit_name)
            .map(|idx| self.units[idx].unit.modification_time)
            .ok_or_else(|| format!("unit '{}' not found", unit_name.to_string_lossy()))
    }

    unsafe fn unit_reader_create(
        &self,
        _store: RawStore,
        unit_name: &CStr,
    ) -> Result<RawUnitReader, String> {
        let idx = self
            .unit_by_name(unit_name)
            .ok_or_else(|| format!("unit '{}' not found", unit_name.to_string_lossy()))?;
        if let Some(message) = &self.units[idx].unit.open_error {
            return Err(message.clone());
        }
        let open = self.live.units.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak_units.fetch_max(open, Ordering::SeqCst);
        Ok(RawUnitReader::from_ptr(token(idx)))
    }

    unsafe fn unit_reader_dispose(&self, _reader: RawUnitReader) {
        release(&self.live.units);
    }

    unsafe fn unit_reader_string(&self, reader: RawUnitReader, field: UnitField) -> RawStr {
        let unit = self.unit_row(reader).map(|row| &row.unit);
        str_of(unit.map(|u| match field {
            UnitField::MainFile => &u.main_file,
            UnitField::OutputFile => &u.output_file,
            UnitField::ModuleName => &u.module_name,
            UnitField::WorkingDir => &u.working_dir,
            UnitField::Target => &u.target,
            UnitField::Sysroot => &u.sysroot,
            UnitField::ProviderIdentifier => &u.provider_identifier,
            UnitField::ProviderVersion => &u.provider_version,
        }))
    }

    unsafe fn unit_reader_flag(&self, reader: RawUnitReader, flag: UnitFlag) -> bool {
        self.unit_row(reader).is_some_and(|row| match flag {
            UnitFlag::System => row.unit.is_system,
            UnitFlag::Module => row.unit.is_module,
            UnitFlag::DebugCompilation => row.unit.is_debug,
            UnitFlag::HasMainFile => !row.unit.main_file.is_empty(),
        })
    }

    unsafe fn unit_reader_modification_time(&self, reader: RawUnitReader) -> Timestamp {
        self.unit_row(reader)
            .map(|row| row.unit.modification_time)
            .unwrap_or_default()
    }

    unsafe fn unit_reader_dependencies_apply(
        &self,
        reader: RawUnitReader,
        applier: Applier<'_, RawDependency>,
    ) -> bool {
        let Some(unit) = self.unit_row(reader) else {
            return true;
        };
        unit.dependencies
            .clone()
            .all(|idx| self.lend(&mut *applier, RawDependency::from_ptr(token(idx))))
    }

    unsafe fn unit_reader_includes_apply(
        &self,
        reader: RawUnitReader,
        applier: Applier<'_, RawInclude>,
    ) -> bool {
        let Some(unit) = self.unit_row(reader) else {
            return true;
        };
        unit.includes
            .clone()
            .all(|idx| self.lend(&mut *applier, RawInclude::from_ptr(token(idx))))
    }

    unsafe fn dependency_kind(&self, dependency: RawDependency) -> u32 {
        self.dependencies
            .get(row(dependency.as_ptr()))
            .map_or(0, |d| d.kind)
    }

    unsafe fn dependency_is_system(&self, dependency: RawDependency) -> bool {
        self.dependencies
            .get(row(dependency.as_ptr()))
            .is_some_and(|d| d.is_system)
    }

    unsafe fn dependency_string(
        &self,
        dependency: RawDependency,
        field: DependencyField,
    ) -> RawStr {
        let dep = self.dependencies.get(row(dependency.as_ptr()));
        str_of(dep.map(|d| match field {
            DependencyField::Name => &d.name,
            DependencyField::FilePath => &d.file_path,
            DependencyField::ModuleName => &d.module_name,
        }))
    }

    unsafe fn include_source_path(&self, include: RawInclude) -> RawStr {
        str_of(self.includes.get(row(include.as_ptr())).map(|i| &i.source_path))
    }

    unsafe fn include_target_path(&self, include: RawInclude) -> RawStr {
        str_of(self.includes.get(row(include.as_ptr())).map(|i| &i.target_path))
    }

    unsafe fn include_source_line(&self, include: RawInclude) -> i64 {
        self.includes.get(row(include.as_ptr())).map_or(0, |i| i.line)
    }

    unsafe fn record_reader_create(
        &self,
        _store: RawStore,
        record_name: &CStr,
    ) -> Result<RawRecordReader, String> {
        let name = record_name.to_string_lossy();
        let idx = self
            .records
            .iter()
            .position(|r| r.name == name)
            .ok_or_else(|| format!("record '{name}' not found"))?;
        if let Some(message) = &self.records[idx].open_error {
            return Err(message.clone());
        }
        self.live.records.fetch_add(1, Ordering::SeqCst);
        Ok(RawRecordReader::from_ptr(token(idx)))
    }

    unsafe fn record_reader_dispose(&self, _reader: RawRecordReader) {
        release(&self.live.records);
    }

    unsafe fn record_reader_symbols_apply(
        &self,
        reader: RawRecordReader,
        _nocache: bool,
        applier: Applier<'_, RawSymbol>,
    ) -> bool {
        let Some(record) = self.records.get(row(reader.as_ptr())) else {
            return true;
        };
        record
            .symbols
            .clone()
            .all(|idx| self.lend(&mut *applier, RawSymbol::from_ptr(token(idx))))
    }

    unsafe fn record_reader_occurrences_apply(
        &self,
        reader: RawRecordReader,
        applier: Applier<'_, RawOccurrence>,
    ) -> bool {
        self.visit_occurrences(reader, None, applier)
    }

    unsafe fn record_reader_occurrences_in_line_range(
        &self,
        reader: RawRecordReader,
        line_start: u32,
        line_count: u32,
        applier: Applier<'_, RawOccurrence>,
    ) -> bool {
        let lines = line_start..line_start.saturating_add(line_count);
        self.visit_occurrences(reader, Some(lines), applier)
    }

    unsafe fn symbol_language(&self, symbol: RawSymbol) -> u32 {
        self.symbols.get(row(symbol.as_ptr())).map_or(0, |s| s.language)
    }

    unsafe fn symbol_kind(&self, symbol: RawSymbol) -> u32 {
        self.symbols.get(row(symbol.as_ptr())).map_or(0, |s| s.kind)
    }

    unsafe fn symbol_subkind(&self, symbol: RawSymbol) -> u32 {
        self.symbols.get(row(symbol.as_ptr())).map_or(0, |s| s.subkind)
    }

    unsafe fn symbol_properties(&self, symbol: RawSymbol) -> u64 {
        self.symbols.get(row(symbol.as_ptr())).map_or(0, |s| s.properties)
    }

    unsafe fn symbol_roles(&self, symbol: RawSymbol) -> u64 {
        self.symbols.get(row(symbol.as_ptr())).map_or(0, |s| s.roles)
    }

    unsafe fn symbol_related_roles(&self, symbol: RawSymbol) -> u64 {
        self.symbols
            .get(row(symbol.as_ptr()))
            .map_or(0, |s| s.related_roles)
    }

    unsafe fn symbol_string(&self, symbol: RawSymbol, field: SymbolField) -> RawStr {
        let sym = self.symbols.get(row(symbol.as_ptr()));
        str_of(sym.map(|s| match field {
            SymbolField::Name => &s.name,
            SymbolField::Usr => &s.usr,
            SymbolField::CodegenName => &s.codegen_name,
        }))
    }

    unsafe fn occurrence_symbol(&self, occurrence: RawOccurrence) -> RawSymbol {
        let idx = self.occurrence_row(occurrence).map_or(usize::MAX, |o| o.symbol);
        RawSymbol::from_ptr(token(idx))
    }

    unsafe fn occurrence_roles(&self, occurrence: RawOccurrence) -> u64 {
        self.occurrence_row(occurrence).map_or(0, |o| o.roles)
    }

    unsafe fn occurrence_line_col(&self, occurrence: RawOccurrence) -> (u32, u32) {
        self.occurrence_row(occurrence)
            .map_or((0, 0), |o| (o.line, o.column))
    }

    unsafe fn occurrence_relations_apply(
        &self,
        occurrence: RawOccurrence,
        applier: Applier<'_, RawRelation>,
    ) -> bool {
        let Some(occurrence) = self.occurrence_row(occurrence) else {
            return true;
        };
        occurrence
            .relations
            .clone()
            .all(|idx| self.lend(&mut *applier, RawRelation::from_ptr(token(idx))))
    }

    unsafe fn relation_roles(&self, relation: RawRelation) -> u64 {
        self.relations.get(row(relation.as_ptr())).map_or(0, |r| r.0)
    }

    unsafe fn relation_symbol(&self, relation: RawRelation) -> RawSymbol {
        let idx = self
            .relations
            .get(row(relation.as_ptr()))
            .map_or(usize::MAX, |r| r.1);
        RawSymbol::from_ptr(token(idx))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fixture() -> MemoryEngine {
        MemoryEngine::new(
            MemoryStore::new()
                .unit(
                    MemoryUnit::new("b.o-1")
                        .include("/src/b.c", 2, "/src/b.h")
                        .include("/src/b.c", 3, "/src/c.h"),
                )
                .unit(MemoryUnit::new("a.o-2").include("/src/a.c", 1, "/src/a.h"))
                .record(
                    MemoryRecord::new("a.c-REC")
                        .symbol(MemorySymbol::new(12, "f", "c:@F@f"))
                        .symbol(MemorySymbol::new(12, "g", "c:@F@g"))
                        .occurrence(MemoryOccurrence::new(1, 4, 7, 3).related(1 << 13, 0)),
                ),
        )
    }

    fn names(engine: &MemoryEngine, sorted: bool) -> Vec<String> {
        let mut out = Vec::new();
        unsafe {
            engine.store_units_apply(RawStore::from_ptr(token(0)), sorted, &mut |raw| {
                let bytes = std::slice::from_raw_parts(raw.data, raw.length);
                out.push(String::from_utf8_lossy(bytes).into_owned());
                true
            });
        }
        out
    }

    #[test]
    fn test_units_apply_honours_sorting() {
        let engine = fixture();
        assert_eq!(names(&engine, false), vec!["b.o-1", "a.o-2"]);
        assert_eq!(names(&engine, true), vec!["a.o-2", "b.o-1"]);
    }

    #[test]
    fn test_include_handles_are_scoped_to_their_unit() {
        let engine = fixture();
        let reader = unsafe { engine.unit_reader_create(RawStore::from_ptr(token(0)), c"a.o-2") }
            .expect("unit a.o-2");
        let mut lines = Vec::new();
        unsafe {
            engine.unit_reader_includes_apply(reader, &mut |inc| {
                lines.push(engine.include_source_line(inc));
                true
            });
            engine.unit_reader_dispose(reader);
        }
        assert_eq!(lines, vec![1]);
    }

    #[test]
    fn test_relations_point_at_symbols_of_the_same_record() {
        let engine = fixture();
        let reader = unsafe { engine.record_reader_create(RawStore::from_ptr(token(0)), c"a.c-REC") }
            .expect("record");
        let mut related = Vec::new();
        unsafe {
            engine.record_reader_occurrences_apply(reader, &mut |occ| {
                engine.occurrence_relations_apply(occ, &mut |rel| {
                    related.push(row(engine.relation_symbol(rel).as_ptr()));
                    true
                });
                true
            });
            engine.record_reader_dispose(reader);
        }
        assert_eq!(related, vec![0]);
    }

    #[test]
    fn test_every_output_path_yields_a_name() {
        let engine = MemoryEngine::new(
            MemoryStore::new().unit(MemoryUnit::new("a.o-2").output_file("/src/a.o")),
        );
        let store = RawStore::from_ptr(token(0));
        let known = unsafe { engine.store_unit_name_from_output_path(store, c"/src/a.o") };
        assert_eq!(known, b"a.o-2");

        let derived = unsafe { engine.store_unit_name_from_output_path(store, c"/src/b.o") };
        let derived = String::from_utf8(derived).unwrap();
        assert!(derived.starts_with("b.o-"), "{derived}");
        assert_eq!(
            derived.into_bytes(),
            unsafe { engine.store_unit_name_from_output_path(store, c"/src/b.o") }
        );
    }

    #[test]
    fn test_live_handles_track_create_and_dispose() {
        let engine = fixture();
        let store = engine.store_create(c"/tmp/store").expect("store");
        let reader = unsafe { engine.unit_reader_create(store, c"b.o-1") }.expect("unit");
        assert_eq!(engine.open_handles().total(), 2);
        unsafe {
            engine.unit_reader_dispose(reader);
            engine.store_dispose(store);
        }
        assert_eq!(engine.open_handles(), OpenHandles::default());
    }
}
