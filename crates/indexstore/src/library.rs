use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, info};

use crate::engine::{DylibEngine, IndexEngine};
use crate::error::{EngineLoadError, StoreOpenError};
use crate::locate;
use crate::store::IndexStore;

/// Store format version understood by current `libIndexStore` releases.
pub const STORE_FORMAT_VERSION: u32 = 5;

/// Knobs for binding an engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadOptions {
    pub min_format_version: u32,
    pub max_format_version: u32,
    /// Treat the library as safe for concurrent reads of one store even
    /// though it has no way to say so itself.
    pub assume_concurrent_reads: bool,
}

impl Default for LoadOptions {
    fn default() -> Self {
        Self {
            min_format_version: STORE_FORMAT_VERSION,
            max_format_version: STORE_FORMAT_VERSION,
            assume_concurrent_reads: false,
        }
    }
}

impl LoadOptions {
    pub fn accepts(&self, version: u32) -> bool {
        (self.min_format_version..=self.max_format_version).contains(&version)
    }
}

/// A bound index-store engine. Every store opened from it borrows it.
pub struct IndexStoreLibrary {
    engine: Arc<dyn IndexEngine>,
    path: Option<PathBuf>,
    concurrent_reads: bool,
}

impl IndexStoreLibrary {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, EngineLoadError> {
        Self::load_with(path, LoadOptions::default())
    }

    pub fn load_with(path: impl AsRef<Path>, options: LoadOptions) -> Result<Self, EngineLoadError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(EngineLoadError::NotFound(path.to_path_buf()));
        }
        let engine = DylibEngine::open(path)?;
        let found = engine.format_version();
        if !options.accepts(found) {
            return Err(EngineLoadError::IncompatibleVersion {
                found,
                min: options.min_format_version,
                max: options.max_format_version,
            });
        }
        let concurrent_reads = options.assume_concurrent_reads || engine.concurrent_reads();
        info!(
            path = %path.display(),
            format_version = found,
            "loaded index store library"
        );
        Ok(Self {
            engine: Arc::new(engine),
            path: Some(path.to_path_buf()),
            concurrent_reads,
        })
    }

    /// Find and load `libIndexStore`, see [`Self::discover_with`].
    pub fn discover() -> Result<Self, EngineLoadError> {
        Self::discover_with(LoadOptions::default())
    }

    /// `INDEXSTORE_LIBRARY_PATH` wins when set, even if it points nowhere.
    /// Otherwise the library is looked for next to `clang` and `swiftc` on
    /// `PATH`.
    pub fn discover_with(options: LoadOptions) -> Result<Self, EngineLoadError> {
        if let Some(path) = locate::library_path_from_env() {
            debug!(path = %path.display(), "using library from environment");
            return Self::load_with(path, options);
        }
        let searched = locate::candidate_library_paths();
        match searched.iter().find(|p| p.is_file()) {
            Some(path) => Self::load_with(path, options),
            None => Err(EngineLoadError::NotDiscovered { searched }),
        }
    }

    /// Wrap an already constructed engine, such as the fixture engine
    /// enabled by the `testing` feature.
    pub fn from_engine(engine: Arc<dyn IndexEngine>) -> Self {
        let concurrent_reads = engine.concurrent_reads();
        Self {
            engine,
            path: None,
            concurrent_reads,
        }
    }

    pub fn open_store(&self, path: impl AsRef<Path>) -> Result<IndexStore<'_>, StoreOpenError> {
        IndexStore::open(self, path)
    }

    pub fn format_version(&self) -> u32 {
        self.engine.format_version()
    }

    pub fn concurrent_reads(&self) -> bool {
        self.concurrent_reads
    }

    /// Where the library was loaded from; `None` for wrapped engines.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn engine(&self) -> &dyn IndexEngine {
        &*self.engine
    }
}

impl fmt::Debug for IndexStoreLibrary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IndexStoreLibrary")
            .field("path", &self.path)
            .field("format_version", &self.format_version())
            .field("concurrent_reads", &self.concurrent_reads)
            .finish()
    }
}
