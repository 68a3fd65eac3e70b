use std::path::PathBuf;
use thiserror::Error;

/// Failure to bind to a native index-store engine.
#[derive(Error, Debug)]
pub enum EngineLoadError {
    #[error("index store library not found at {0}")]
    NotFound(PathBuf),
    #[error("{path} is not a loadable library: {source}")]
    NotALibrary {
        path: PathBuf,
        #[source]
        source: libloading::Error,
    },
    #[error("index store library is missing required symbol `{symbol}`: {source}")]
    MissingSymbol {
        symbol: &'static str,
        #[source]
        source: libloading::Error,
    },
    #[error("index store format version {found} is not supported (expected {min}..={max})")]
    IncompatibleVersion { found: u32, min: u32, max: u32 },
    #[error("no index store library found (searched: {})", display_paths(.searched))]
    NotDiscovered { searched: Vec<PathBuf> },
}

/// Failure to open an index store directory.
#[derive(Error, Debug)]
pub enum StoreOpenError {
    #[error("index store directory does not exist: {0}")]
    Missing(PathBuf),
    #[error("index store path is not a directory: {0}")]
    NotADirectory(PathBuf),
    #[error("{0} is not an index store (no format directory)")]
    NotAStore(PathBuf),
    #[error("index store at {path} uses format v{found}, library reads v{expected}")]
    UnsupportedFormat {
        path: PathBuf,
        found: u32,
        expected: u32,
    },
    #[error("path cannot be passed to the index store engine: {0}")]
    InvalidPath(PathBuf),
    #[error("failed to inspect {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("engine failed to open {path}: {message}")]
    Engine { path: PathBuf, message: String },
    #[error("index store engine does not support concurrent reads")]
    NotShareable,
}

/// A view whose fields violate basic structural expectations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MalformedRecordError {
    #[error("include directive in {source_path} has impossible line {line}")]
    InvalidLine { source_path: String, line: i64 },
    #[error("string from the index store is not valid UTF-8: {0}")]
    InvalidUtf8(#[from] std::str::Utf8Error),
}

#[derive(Error, Debug)]
pub enum IndexStoreError {
    #[error(transparent)]
    EngineLoad(#[from] EngineLoadError),
    #[error(transparent)]
    StoreOpen(#[from] StoreOpenError),
    #[error("failed to open unit `{name}`: {message}")]
    UnitOpen { name: String, message: String },
    #[error("failed to open record `{name}`: {message}")]
    RecordOpen { name: String, message: String },
    #[error("malformed index data: {0}")]
    Malformed(#[from] MalformedRecordError),
    #[error("engine error: {0}")]
    Engine(String),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, IndexStoreError>;

fn display_paths(paths: &[PathBuf]) -> String {
    if paths.is_empty() {
        return "nothing".to_string();
    }
    paths
        .iter()
        .map(|p| p.display().to_string())
        .collect::<Vec<_>>()
        .join(", ")
}
