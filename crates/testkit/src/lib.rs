//! Fixtures for exercising the index store access layer.
//!
//! [`TestProject`] writes sources into a scratch directory and runs the real
//! compilers over them to produce an index store. [`scratch_store`] and
//! [`memory_library`] cover the cases that need no toolchain at all.

use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::Arc;

use indexstore::engine::MemoryEngine;
use indexstore::engine::memory::MemoryStore;
use indexstore::{EngineLoadError, IndexStoreLibrary, STORE_FORMAT_VERSION, locate};
use tempfile::TempDir;
use thiserror::Error;
use tracing::debug;

#[derive(Error, Debug)]
pub enum FixtureError {
    #[error("toolchain unavailable: {0}")]
    ToolchainMissing(String),
    #[error("{tool} failed on {file} ({status}):\n{stderr}")]
    Compiler {
        tool: String,
        file: PathBuf,
        status: std::process::ExitStatus,
        stderr: String,
    },
    #[error(transparent)]
    Load(#[from] EngineLoadError),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, FixtureError>;

/// Compilers and index library found on this machine.
#[derive(Debug, Clone)]
pub struct Toolchain {
    pub clang: Option<PathBuf>,
    pub swiftc: Option<PathBuf>,
    pub library: PathBuf,
}

impl Toolchain {
    pub fn discover() -> Result<Self> {
        let library = locate::library_path_from_env()
            .filter(|p| p.is_file())
            .or_else(|| {
                locate::candidate_library_paths()
                    .into_iter()
                    .find(|p| p.is_file())
            })
            .ok_or_else(|| {
                FixtureError::ToolchainMissing(format!("no {}", locate::library_file_name()))
            })?;
        let clang = locate::find_tool("clang");
        let swiftc = locate::find_tool("swiftc");
        if clang.is_none() && swiftc.is_none() {
            return Err(FixtureError::ToolchainMissing(
                "neither clang nor swiftc on PATH".to_string(),
            ));
        }
        debug!(library = %library.display(), ?clang, ?swiftc, "discovered toolchain");
        Ok(Self {
            clang,
            swiftc,
            library,
        })
    }

    pub fn load_library(&self) -> Result<IndexStoreLibrary> {
        Ok(IndexStoreLibrary::load(&self.library)?)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SourceKind {
    Clang,
    Swift,
    Supplementary,
}

/// A set of source files to compile into a fresh index store.
#[derive(Debug, Default, Clone)]
pub struct TestProject {
    files: Vec<(PathBuf, String, SourceKind)>,
}

impl TestProject {
    pub fn new() -> Self {
        Self::default()
    }

    /// A C, C++ or Objective-C file passed to `clang`.
    pub fn clang_source(mut self, path: impl Into<PathBuf>, contents: impl Into<String>) -> Self {
        self.files
            .push((path.into(), contents.into(), SourceKind::Clang));
        self
    }

    /// A Swift file; all Swift files form one module.
    pub fn swift_source(mut self, path: impl Into<PathBuf>, contents: impl Into<String>) -> Self {
        self.files
            .push((path.into(), contents.into(), SourceKind::Swift));
        self
    }

    /// A file that is written but not compiled directly, e.g. a header.
    pub fn file(mut self, path: impl Into<PathBuf>, contents: impl Into<String>) -> Self {
        self.files
            .push((path.into(), contents.into(), SourceKind::Supplementary));
        self
    }

    fn sources(&self, kind: SourceKind) -> impl Iterator<Item = &Path> {
        self.files
            .iter()
            .filter(move |(_, _, k)| *k == kind)
            .map(|(path, _, _)| path.as_path())
    }

    pub fn index(&self, toolchain: &Toolchain) -> Result<IndexedProject> {
        let scratch = tempfile::tempdir()?;
        let source_dir = scratch.path().join("src");
        let index_dir = scratch.path().join("index");
        let object_dir = scratch.path().join("obj");
        std::fs::create_dir_all(&source_dir)?;
        std::fs::create_dir_all(&object_dir)?;

        for (path, contents, _) in &self.files {
            let full = source_dir.join(path);
            if let Some(parent) = full.parent() {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::write(&full, contents)?;
        }

        for source in self.sources(SourceKind::Clang) {
            let clang = toolchain
                .clang
                .as_deref()
                .ok_or_else(|| FixtureError::ToolchainMissing("clang not on PATH".into()))?;
            let mut cmd = Command::new(clang);
            cmd.current_dir(&source_dir)
                .arg("-fsyntax-only")
                .arg(source)
                .arg("-index-store-path")
                .arg(&index_dir)
                .arg("-o")
                .arg(object_dir.join(object_name(source)));
            run(cmd, "clang", source)?;
        }

        let swift_sources: Vec<&Path> = self.sources(SourceKind::Swift).collect();
        for source in &swift_sources {
            let swiftc = toolchain
                .swiftc
                .as_deref()
                .ok_or_else(|| FixtureError::ToolchainMissing("swiftc not on PATH".into()))?;
            let mut cmd = Command::new(swiftc);
            cmd.current_dir(&source_dir)
                .arg("-index-file")
                .arg("-index-file-path")
                .arg(source)
                .args(&swift_sources)
                .arg("-index-store-path")
                .arg(&index_dir)
                .arg("-index-ignore-system-modules")
                .arg("-module-name")
                .arg("Fixture")
                .arg("-o")
                .arg(object_dir.join(object_name(source)));
            run(cmd, "swiftc", source)?;
        }

        Ok(IndexedProject {
            scratch,
            source_dir,
            index_dir,
            library: toolchain.library.clone(),
        })
    }
}

fn object_name(source: &Path) -> String {
    let stem = source.to_string_lossy().replace(['/', '\\'], "_");
    format!("{stem}.o")
}

fn run(mut cmd: Command, tool: &str, file: &Path) -> Result<()> {
    debug!(?cmd, "running compiler");
    let output = cmd.output()?;
    if output.status.success() {
        return Ok(());
    }
    Err(FixtureError::Compiler {
        tool: tool.to_string(),
        file: file.to_path_buf(),
        status: output.status,
        stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
    })
}

/// Sources and the index store built from them. Removed on drop.
#[derive(Debug)]
pub struct IndexedProject {
    scratch: TempDir,
    source_dir: PathBuf,
    index_dir: PathBuf,
    library: PathBuf,
}

impl IndexedProject {
    pub fn root(&self) -> &Path {
        self.scratch.path()
    }

    pub fn source_dir(&self) -> &Path {
        &self.source_dir
    }

    pub fn index_dir(&self) -> &Path {
        &self.index_dir
    }

    /// Absolute path of a project file.
    pub fn path(&self, relative: impl AsRef<Path>) -> PathBuf {
        self.source_dir.join(relative)
    }

    pub fn load_library(&self) -> Result<IndexStoreLibrary> {
        Ok(IndexStoreLibrary::load(&self.library)?)
    }
}

/// An empty directory shaped like an index store of the current format.
pub fn scratch_store() -> Result<TempDir> {
    scratch_store_with_version(STORE_FORMAT_VERSION)
}

pub fn scratch_store_with_version(version: u32) -> Result<TempDir> {
    let dir = tempfile::tempdir()?;
    std::fs::create_dir_all(dir.path().join(format!("v{version}")))?;
    Ok(dir)
}

/// A library backed by an in-memory store. The engine is returned too so
/// callers can inspect [`MemoryEngine::open_handles`].
pub fn memory_library(store: MemoryStore) -> (Arc<MemoryEngine>, IndexStoreLibrary) {
    let engine = Arc::new(MemoryEngine::new(store));
    let library = IndexStoreLibrary::from_engine(engine.clone());
    (engine, library)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_object_names_flatten_directories() {
        assert_eq!(object_name(Path::new("a/b/main.c")), "a_b_main.c.o");
    }

    #[test]
    fn test_scratch_store_has_a_format_directory() {
        let dir = scratch_store_with_version(7).unwrap();
        assert!(dir.path().join("v7").is_dir());
    }
}
