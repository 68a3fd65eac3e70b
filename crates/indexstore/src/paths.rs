//! Output-path lookups and staleness checks.

use std::collections::BTreeSet;
use std::ffi::CString;
use std::io;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use serde::Serialize;
use tracing::debug;

use crate::error::{IndexStoreError, MalformedRecordError, Result, StoreOpenError};
use crate::store::IndexStore;
use crate::unit::{DependencyKind, Unit};

#[cfg(unix)]
pub(crate) fn path_to_cstring(path: &Path) -> Option<CString> {
    use std::os::unix::ffi::OsStrExt;
    CString::new(path.as_os_str().as_bytes()).ok()
}

#[cfg(not(unix))]
pub(crate) fn path_to_cstring(path: &Path) -> Option<CString> {
    CString::new(path.to_str()?).ok()
}

fn engine_path(path: &Path) -> Result<CString> {
    path_to_cstring(path).ok_or_else(|| StoreOpenError::InvalidPath(path.to_path_buf()).into())
}

impl IndexStore<'_> {
    /// The unit the compiler wrote when producing `output_path`, if any.
    ///
    /// The engine derives a name from any path, so the result is only
    /// `Some` when a unit with that name is present in the store.
    pub fn unit_name_for_output_path(&self, output_path: impl AsRef<Path>) -> Result<Option<String>> {
        let c_path = engine_path(output_path.as_ref())?;
        let bytes = unsafe {
            self.engine()
                .store_unit_name_from_output_path(self.raw(), &c_path)
        };
        if bytes.is_empty() {
            return Ok(None);
        }
        let name = String::from_utf8(bytes)
            .map_err(|e| MalformedRecordError::InvalidUtf8(e.utf8_error()))?;
        match self.unit_modification_time(&name) {
            Ok(_) => Ok(Some(name)),
            Err(e) => {
                debug!(unit = %name, "no unit for output path: {}", e);
                Ok(None)
            }
        }
    }

    /// When the unit was last written, without opening a unit reader.
    pub fn unit_modification_time(&self, unit_name: &str) -> Result<SystemTime> {
        let c_name = CString::new(unit_name)
            .map_err(|_| IndexStoreError::Engine(format!("unit name {unit_name:?} contains NUL")))?;
        unsafe {
            self.engine()
                .store_unit_modification_time(self.raw(), &c_name)
        }
        .map(|ts| ts.to_system_time())
        .map_err(IndexStoreError::Engine)
    }
}

/// Whether a unit still reflects the files it was compiled from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum Staleness {
    UpToDate,
    /// Inputs modified after the unit was written.
    Stale { newer: Vec<PathBuf> },
    /// Inputs that no longer exist.
    Missing { paths: Vec<PathBuf> },
}

impl Staleness {
    pub fn is_up_to_date(&self) -> bool {
        matches!(self, Self::UpToDate)
    }
}

impl Unit<'_> {
    /// Every input file of the unit: the main file plus the files behind its
    /// record and file dependencies. Relative paths are resolved against the
    /// unit's working directory.
    pub fn input_files(&self) -> Vec<PathBuf> {
        let working_dir = self.working_dir().to_path_buf();
        let mut files = BTreeSet::new();
        if self.has_main_file() && !self.main_file().is_empty() {
            files.insert(working_dir.join(self.main_file().to_path_buf()));
        }
        self.dependencies().for_each(|dep| {
            if matches!(dep.kind(), DependencyKind::Record | DependencyKind::File)
                && !dep.file_path().is_empty()
            {
                files.insert(working_dir.join(dep.file_path().to_path_buf()));
            }
        });
        files.into_iter().collect()
    }

    pub fn staleness(&self) -> Result<Staleness> {
        let written = self.modification_time();
        let mut newer = Vec::new();
        let mut missing = Vec::new();

        for path in self.input_files() {
            match std::fs::metadata(&path) {
                Ok(meta) => {
                    if meta.modified()? > written {
                        newer.push(path);
                    }
                }
                Err(e) if e.kind() == io::ErrorKind::NotFound => missing.push(path),
                Err(e) => return Err(e.into()),
            }
        }

        let staleness = if !missing.is_empty() {
            Staleness::Missing { paths: missing }
        } else if !newer.is_empty() {
            Staleness::Stale { newer }
        } else {
            Staleness::UpToDate
        };
        debug!(unit = self.name(), ?staleness, "checked unit staleness");
        Ok(staleness)
    }
}
