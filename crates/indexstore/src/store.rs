use std::fmt;
use std::ops::{ControlFlow, Deref};
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::engine::{IndexEngine, RawStore};
use crate::error::{IndexStoreError, MalformedRecordError, Result, StoreOpenError};
use crate::library::IndexStoreLibrary;
use crate::paths::path_to_cstring;
use crate::record::Record;
use crate::sequence::{self, lending_sequence};
use crate::string_ref::StringRef;
use crate::unit::Unit;

/// An opened index store directory.
///
/// Units, records and every view derived from them borrow the store, so the
/// store cannot be dropped while any of them is alive. Not `Send`/`Sync`;
/// see [`IndexStore::into_shared`].
pub struct IndexStore<'lib> {
    library: &'lib IndexStoreLibrary,
    raw: RawStore,
    path: PathBuf,
}

impl<'lib> IndexStore<'lib> {
    pub fn open(
        library: &'lib IndexStoreLibrary,
        path: impl AsRef<Path>,
    ) -> std::result::Result<Self, StoreOpenError> {
        let path = path.as_ref();
        check_store_dir(path, library.format_version())?;
        let c_path = path_to_cstring(path).ok_or_else(|| StoreOpenError::InvalidPath(path.into()))?;
        let raw = library
            .engine()
            .store_create(&c_path)
            .map_err(|message| StoreOpenError::Engine {
                path: path.to_path_buf(),
                message,
            })?;
        debug!(path = %path.display(), "opened index store");
        Ok(Self {
            library,
            raw,
            path: path.to_path_buf(),
        })
    }

    pub(crate) fn engine(&self) -> &'lib dyn IndexEngine {
        self.library.engine()
    }

    pub(crate) fn raw(&self) -> RawStore {
        self.raw
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn library(&self) -> &'lib IndexStoreLibrary {
        self.library
    }

    /// Unit names as the engine reports them, borrowed for one visit each.
    pub fn unit_names(&self, sorted: bool) -> UnitNames<'_> {
        UnitNames {
            store: self,
            sorted,
        }
    }

    /// Open each unit while the engine enumerates the store. Breaking out of
    /// the visitor ends the native enumeration there.
    pub fn unit_readers(&self, sorted: bool) -> UnitReaders<'_> {
        UnitReaders {
            store: self,
            sorted,
        }
    }

    /// Every unit in the store, in engine order. Each call starts over.
    ///
    /// The first pull enumerates every unit name; prefer
    /// [`Self::unit_readers`] when only a few units are needed.
    pub fn units(&self) -> Units<'_> {
        Units {
            store: self,
            sorted: false,
            pending: None,
        }
    }

    /// Like [`Self::units`], ordered by unit name.
    pub fn sorted_units(&self) -> Units<'_> {
        Units {
            store: self,
            sorted: true,
            pending: None,
        }
    }

    pub fn unit(&self, name: &str) -> Result<Unit<'_>> {
        Unit::open(self, name)
    }

    pub fn record(&self, name: &str) -> Result<Record<'_>> {
        Record::open(self, name, None)
    }

    /// Allow the store to be shared across threads. Fails when the library
    /// does not support concurrent reads; the store is closed in that case.
    pub fn into_shared(self) -> std::result::Result<SharedIndexStore<'lib>, StoreOpenError> {
        if !self.library.concurrent_reads() {
            return Err(StoreOpenError::NotShareable);
        }
        Ok(SharedIndexStore { inner: self })
    }
}

impl Drop for IndexStore<'_> {
    fn drop(&mut self) {
        // SAFETY: every reader borrowed this store and is therefore gone.
        unsafe { self.engine().store_dispose(self.raw) };
        debug!(path = %self.path.display(), "closed index store");
    }
}

impl fmt::Debug for IndexStore<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IndexStore")
            .field("path", &self.path)
            .finish_non_exhaustive()
    }
}

/// Validate the on-disk shape before the engine sees the path. Engines
/// create missing store directories on open, which would hide mistakes.
fn check_store_dir(path: &Path, expected: u32) -> std::result::Result<(), StoreOpenError> {
    let meta = match std::fs::metadata(path) {
        Ok(meta) => meta,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(StoreOpenError::Missing(path.to_path_buf()));
        }
        Err(source) => {
            return Err(StoreOpenError::Io {
                path: path.to_path_buf(),
                source,
            });
        }
    };
    if !meta.is_dir() {
        return Err(StoreOpenError::NotADirectory(path.to_path_buf()));
    }

    let entries = std::fs::read_dir(path).map_err(|source| StoreOpenError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let mut versions: Vec<u32> = entries
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.path().is_dir())
        .filter_map(|entry| format_dir_version(&entry.file_name().to_string_lossy()))
        .collect();
    versions.sort_unstable();

    if versions.contains(&expected) {
        return Ok(());
    }
    match versions.last() {
        Some(&found) => Err(StoreOpenError::UnsupportedFormat {
            path: path.to_path_buf(),
            found,
            expected,
        }),
        None => Err(StoreOpenError::NotAStore(path.to_path_buf())),
    }
}

fn format_dir_version(name: &str) -> Option<u32> {
    let digits = name.strip_prefix('v')?;
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    digits.parse().ok()
}

pub struct UnitNames<'s> {
    store: &'s IndexStore<'s>,
    sorted: bool,
}

impl UnitNames<'_> {
    pub fn try_for_each<B>(
        &self,
        mut f: impl FnMut(StringRef<'_>) -> ControlFlow<B>,
    ) -> Option<B> {
        let engine = self.store.engine();
        let raw = self.store.raw();
        let sorted = self.sorted;
        sequence::drive(
            |applier| unsafe { engine.store_units_apply(raw, sorted, applier) },
            // SAFETY: the name is valid for the duration of the applier call.
            |name| f(unsafe { StringRef::from_raw(name) }),
        )
    }

    lending_sequence!(StringRef);

    /// Owned copies of every name. Names that are not UTF-8 are skipped.
    pub fn to_vec(&self) -> Vec<String> {
        let mut names = Vec::new();
        self.for_each(|name| match name.to_owned_string() {
            Ok(name) => names.push(name),
            Err(e) => warn!("skipping unit name: {}", e),
        });
        names
    }
}

/// Units opened inside the engine's enumeration, one visit each.
///
/// A unit that fails to open is passed to the visitor as an error and the
/// enumeration continues. Units may be kept past their visit; they borrow the
/// store, not the enumeration.
pub struct UnitReaders<'s> {
    store: &'s IndexStore<'s>,
    sorted: bool,
}

impl<'s> UnitReaders<'s> {
    pub fn try_for_each<B>(
        &self,
        mut f: impl FnMut(Result<Unit<'s>>) -> ControlFlow<B>,
    ) -> Option<B> {
        let store = self.store;
        store.unit_names(self.sorted).try_for_each(|name| {
            let unit = name
                .as_str()
                .map_err(|e| IndexStoreError::from(MalformedRecordError::from(e)))
                .and_then(|name| Unit::open(store, name));
            f(unit)
        })
    }

    pub fn for_each(&self, mut f: impl FnMut(Result<Unit<'s>>)) {
        self.try_for_each(|unit| {
            f(unit);
            ControlFlow::<()>::Continue(())
        });
    }

    /// Visit units until `f` returns `Some`, stopping the enumeration there.
    pub fn find_map<T>(&self, mut f: impl FnMut(Result<Unit<'s>>) -> Option<T>) -> Option<T> {
        self.try_for_each(|unit| match f(unit) {
            Some(found) => ControlFlow::Break(found),
            None => ControlFlow::Continue(()),
        })
    }
}

/// Pull-style iterator over the units of a store.
///
/// Names are gathered with one full enumeration on the first pull; each unit
/// reader is opened only when its item is pulled. A unit that fails to open
/// is yielded as an error and iteration continues with the next one.
pub struct Units<'s> {
    store: &'s IndexStore<'s>,
    sorted: bool,
    pending: Option<std::vec::IntoIter<Result<String>>>,
}

impl<'s> Iterator for Units<'s> {
    type Item = Result<Unit<'s>>;

    fn next(&mut self) -> Option<Self::Item> {
        let store = self.store;
        let sorted = self.sorted;
        let pending = self.pending.get_or_insert_with(|| {
            store
                .unit_names(sorted)
                .map_collect(|name| name.to_owned_string().map_err(IndexStoreError::from))
                .into_iter()
        });
        Some(pending.next()?.and_then(|name| Unit::open(store, &name)))
    }
}

/// An [`IndexStore`] that may be read from several threads at once.
pub struct SharedIndexStore<'lib> {
    inner: IndexStore<'lib>,
}

// SAFETY: only constructed when the engine supports concurrent reads; every
// reader opened through a shared reference stays on its own thread.
unsafe impl Send for SharedIndexStore<'_> {}
unsafe impl Sync for SharedIndexStore<'_> {}

impl<'lib> Deref for SharedIndexStore<'lib> {
    type Target = IndexStore<'lib>;

    fn deref(&self) -> &Self::Target {
        &self.inner
    }
}

impl fmt::Debug for SharedIndexStore<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("SharedIndexStore").field(&self.inner).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_dirs_must_be_v_followed_by_digits() {
        assert_eq!(format_dir_version("v5"), Some(5));
        assert_eq!(format_dir_version("v12"), Some(12));
        assert_eq!(format_dir_version("v"), None);
        assert_eq!(format_dir_version("v5a"), None);
        assert_eq!(format_dir_version("units"), None);
    }

    #[test]
    fn test_store_dir_checks_report_the_shape_problem() {
        let tmp = tempfile::tempdir().unwrap();

        let missing = tmp.path().join("missing");
        assert!(matches!(
            check_store_dir(&missing, 5),
            Err(StoreOpenError::Missing(_))
        ));

        let file = tmp.path().join("file");
        std::fs::write(&file, b"").unwrap();
        assert!(matches!(
            check_store_dir(&file, 5),
            Err(StoreOpenError::NotADirectory(_))
        ));

        let empty = tmp.path().join("empty");
        std::fs::create_dir(&empty).unwrap();
        assert!(matches!(
            check_store_dir(&empty, 5),
            Err(StoreOpenError::NotAStore(_))
        ));

        let old = tmp.path().join("old");
        std::fs::create_dir_all(old.join("v4")).unwrap();
        assert!(matches!(
            check_store_dir(&old, 5),
            Err(StoreOpenError::UnsupportedFormat { found: 4, expected: 5, .. })
        ));

        let good = tmp.path().join("good");
        std::fs::create_dir_all(good.join("v5")).unwrap();
        assert!(check_store_dir(&good, 5).is_ok());
    }
}
