use std::ffi::CString;
use std::ops::ControlFlow;
use std::path::PathBuf;
use std::time::SystemTime;

use serde::Serialize;
use tracing::{trace, warn};

use crate::engine::{
    DEPENDENCY_FILE, DEPENDENCY_RECORD, DEPENDENCY_UNIT, DependencyField, IndexEngine,
    RawDependency, RawUnitReader, UnitField, UnitFlag,
};
use crate::error::{IndexStoreError, MalformedRecordError, Result};
use crate::include::Includes;
use crate::record::Record;
use crate::sequence::{self, lending_sequence};
use crate::store::IndexStore;
use crate::string_ref::StringRef;

/// One compiled translation: a main file plus the compiler invocation that
/// indexed it. Owns the native unit reader and closes it on drop.
pub struct Unit<'s> {
    store: &'s IndexStore<'s>,
    raw: RawUnitReader,
    name: String,
}

impl<'s> Unit<'s> {
    pub(crate) fn open(store: &'s IndexStore<'s>, name: &str) -> Result<Self> {
        let c_name = CString::new(name).map_err(|_| IndexStoreError::UnitOpen {
            name: name.to_string(),
            message: "unit name contains a NUL byte".to_string(),
        })?;
        // SAFETY: the store handle is live for `'s`.
        let raw = unsafe { store.engine().unit_reader_create(store.raw(), &c_name) }.map_err(
            |message| IndexStoreError::UnitOpen {
                name: name.to_string(),
                message,
            },
        )?;
        trace!(unit = name, "opened unit reader");
        Ok(Self {
            store,
            raw,
            name: name.to_string(),
        })
    }

    pub(crate) fn engine(&self) -> &'s dyn IndexEngine {
        self.store.engine()
    }

    pub(crate) fn raw(&self) -> RawUnitReader {
        self.raw
    }

    pub(crate) fn store(&self) -> &'s IndexStore<'s> {
        self.store
    }

    fn string(&self, field: UnitField) -> StringRef<'_> {
        // SAFETY: unit-level strings live as long as the reader.
        unsafe { StringRef::from_raw(self.engine().unit_reader_string(self.raw, field)) }
    }

    fn flag(&self, flag: UnitFlag) -> bool {
        unsafe { self.engine().unit_reader_flag(self.raw, flag) }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn main_file(&self) -> StringRef<'_> {
        self.string(UnitField::MainFile)
    }

    pub fn output_file(&self) -> StringRef<'_> {
        self.string(UnitField::OutputFile)
    }

    pub fn module_name(&self) -> StringRef<'_> {
        self.string(UnitField::ModuleName)
    }

    pub fn working_dir(&self) -> StringRef<'_> {
        self.string(UnitField::WorkingDir)
    }

    pub fn target(&self) -> StringRef<'_> {
        self.string(UnitField::Target)
    }

    pub fn sysroot(&self) -> StringRef<'_> {
        self.string(UnitField::Sysroot)
    }

    /// Empty when the loaded library predates provider information.
    pub fn provider_identifier(&self) -> StringRef<'_> {
        self.string(UnitField::ProviderIdentifier)
    }

    pub fn provider_version(&self) -> StringRef<'_> {
        self.string(UnitField::ProviderVersion)
    }

    pub fn modification_time(&self) -> SystemTime {
        unsafe { self.engine().unit_reader_modification_time(self.raw) }.to_system_time()
    }

    pub fn is_system_unit(&self) -> bool {
        self.flag(UnitFlag::System)
    }

    pub fn is_module_unit(&self) -> bool {
        self.flag(UnitFlag::Module)
    }

    pub fn is_debug_compilation(&self) -> bool {
        self.flag(UnitFlag::DebugCompilation)
    }

    pub fn has_main_file(&self) -> bool {
        self.flag(UnitFlag::HasMainFile)
    }

    pub fn includes(&self) -> Includes<'_> {
        Includes::new(self)
    }

    pub fn dependencies(&self) -> Dependencies<'_> {
        Dependencies { unit: self }
    }

    /// Records this unit references, opened one at a time as they are pulled.
    /// The first pull walks every dependency of the unit.
    pub fn records(&self) -> Records<'_> {
        Records {
            unit: self,
            pending: None,
        }
    }

    /// Open each record while the engine walks the unit's dependencies.
    /// Breaking out of the visitor ends the walk there.
    pub fn record_readers(&self) -> RecordReaders<'_> {
        RecordReaders { unit: self }
    }

    /// Names of the units this unit depends on (e.g. imported modules).
    pub fn dependency_unit_names(&self) -> Vec<String> {
        let mut names = Vec::new();
        self.dependencies().for_each(|dep| {
            if dep.kind() == DependencyKind::Unit {
                names.push(dep.name().to_string_lossy().into_owned());
            }
        });
        names
    }

    pub fn snapshot(&self) -> UnitInfo {
        UnitInfo {
            name: self.name.clone(),
            main_file: self.has_main_file().then(|| self.main_file().to_path_buf()),
            output_file: self.output_file().to_path_buf(),
            module_name: self.module_name().to_string_lossy().into_owned(),
            target: self.target().to_string_lossy().into_owned(),
            is_system: self.is_system_unit(),
            modification_time: self.modification_time(),
        }
    }
}

impl Drop for Unit<'_> {
    fn drop(&mut self) {
        // SAFETY: the reader was created by this engine and is disposed once,
        // before the store that owns it.
        unsafe { self.engine().unit_reader_dispose(self.raw) };
        trace!(unit = %self.name, "closed unit reader");
    }
}

impl std::fmt::Debug for Unit<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Unit")
            .field("name", &self.name)
            .field("main_file", &self.main_file())
            .field("output_file", &self.output_file())
            .finish()
    }
}

/// Owned summary of a unit's metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UnitInfo {
    pub name: String,
    pub main_file: Option<PathBuf>,
    pub output_file: PathBuf,
    pub module_name: String,
    pub target: String,
    pub is_system: bool,
    pub modification_time: SystemTime,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum DependencyKind {
    Unit,
    Record,
    File,
    Unknown(u32),
}

impl From<u32> for DependencyKind {
    fn from(raw: u32) -> Self {
        match raw {
            DEPENDENCY_UNIT => Self::Unit,
            DEPENDENCY_RECORD => Self::Record,
            DEPENDENCY_FILE => Self::File,
            other => Self::Unknown(other),
        }
    }
}

/// An edge from a unit to another unit, a record, or a plain file.
#[derive(Clone, Copy)]
pub struct UnitDependency<'a> {
    engine: &'a dyn IndexEngine,
    raw: RawDependency,
}

impl<'a> UnitDependency<'a> {
    pub fn kind(&self) -> DependencyKind {
        DependencyKind::from(unsafe { self.engine.dependency_kind(self.raw) })
    }

    pub fn is_system(&self) -> bool {
        unsafe { self.engine.dependency_is_system(self.raw) }
    }

    /// Unit or record name; empty for file dependencies.
    pub fn name(&self) -> StringRef<'a> {
        self.string(DependencyField::Name)
    }

    pub fn file_path(&self) -> StringRef<'a> {
        self.string(DependencyField::FilePath)
    }

    pub fn module_name(&self) -> StringRef<'a> {
        self.string(DependencyField::ModuleName)
    }

    fn string(&self, field: DependencyField) -> StringRef<'a> {
        unsafe { StringRef::from_raw(self.engine.dependency_string(self.raw, field)) }
    }

    pub fn snapshot(&self) -> DependencyInfo {
        DependencyInfo {
            kind: self.kind(),
            name: self.name().to_string_lossy().into_owned(),
            file_path: self.file_path().to_path_buf(),
            module_name: self.module_name().to_string_lossy().into_owned(),
            is_system: self.is_system(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DependencyInfo {
    pub kind: DependencyKind,
    pub name: String,
    pub file_path: PathBuf,
    pub module_name: String,
    pub is_system: bool,
}

pub struct Dependencies<'u> {
    unit: &'u Unit<'u>,
}

impl Dependencies<'_> {
    pub fn try_for_each<B>(
        &self,
        mut f: impl FnMut(UnitDependency<'_>) -> ControlFlow<B>,
    ) -> Option<B> {
        let engine = self.unit.engine();
        let reader = self.unit.raw();
        sequence::drive(
            |applier| unsafe { engine.unit_reader_dependencies_apply(reader, applier) },
            |raw| f(UnitDependency { engine, raw }),
        )
    }

    lending_sequence!(UnitDependency);

    pub fn snapshot(&self) -> Vec<DependencyInfo> {
        self.map_collect(|dep| dep.snapshot())
    }
}

/// Records opened inside the engine's dependency walk, one visit each.
/// A record that fails to open is passed to the visitor as an error.
pub struct RecordReaders<'u> {
    unit: &'u Unit<'u>,
}

impl<'u> RecordReaders<'u> {
    pub fn try_for_each<B>(
        &self,
        mut f: impl FnMut(Result<Record<'u>>) -> ControlFlow<B>,
    ) -> Option<B> {
        let unit = self.unit;
        unit.dependencies().try_for_each(|dep| {
            if dep.kind() != DependencyKind::Record {
                return ControlFlow::Continue(());
            }
            let record = dep
                .name()
                .as_str()
                .map_err(|e| IndexStoreError::from(MalformedRecordError::from(e)))
                .and_then(|name| {
                    Record::open(unit.store(), name, Some(dep.file_path().to_path_buf()))
                });
            f(record)
        })
    }

    pub fn for_each(&self, mut f: impl FnMut(Result<Record<'u>>)) {
        self.try_for_each(|record| {
            f(record);
            ControlFlow::<()>::Continue(())
        });
    }
}

/// Pull-style iterator over the records a unit references.
///
/// Record names are gathered with one full dependency walk on the first pull; each reader is opened only
/// when its item is pulled. A record that fails to open is yielded as an
/// error without affecting the rest.
pub struct Records<'u> {
    unit: &'u Unit<'u>,
    pending: Option<std::vec::IntoIter<(String, PathBuf)>>,
}

impl<'u> Iterator for Records<'u> {
    type Item = Result<Record<'u>>;

    fn next(&mut self) -> Option<Self::Item> {
        let unit = self.unit;
        let pending = self.pending.get_or_insert_with(|| {
            let mut names = Vec::new();
            unit.dependencies().for_each(|dep| {
                if dep.kind() != DependencyKind::Record {
                    return;
                }
                match dep.name().to_owned_string() {
                    Ok(name) => names.push((name, dep.file_path().to_path_buf())),
                    Err(e) => warn!(unit = unit.name(), "skipping record dependency: {}", e),
                }
            });
            names.into_iter()
        });
        let (name, file_path) = pending.next()?;
        Some(Record::open(unit.store(), &name, Some(file_path)))
    }
}
