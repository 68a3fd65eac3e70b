//! Safe, read-only access to clang/swift index stores through a
//! `libIndexStore` bound at runtime.
//!
//! ```no_run
//! use indexstore::IndexStoreLibrary;
//!
//! let library = IndexStoreLibrary::discover()?;
//! let store = library.open_store("build/index")?;
//! for unit in store.units() {
//!     let unit = unit?;
//!     unit.includes().for_each(|include| {
//!         println!("{}:{} -> {}", include.source_path(), include.line(), include.target_path());
//!     });
//! }
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! Lifetimes tie every view to what produced it: a [`Unit`] borrows its
//! [`IndexStore`], which borrows its [`IndexStoreLibrary`]. Views the engine
//! hands out during a traversal (includes, dependencies, symbols,
//! occurrences, relations) are only lent to a visitor closure.

pub mod engine;
pub mod error;
pub mod include;
pub mod library;
pub mod locate;
pub mod logging;
pub mod paths;
pub mod record;
mod sequence;
pub mod store;
pub mod string_ref;
pub mod symbol;
pub mod unit;

pub use error::{EngineLoadError, IndexStoreError, MalformedRecordError, Result, StoreOpenError};
pub use include::{IncludeDirective, Includes, UnitInclude};
pub use library::{IndexStoreLibrary, LoadOptions, STORE_FORMAT_VERSION};
pub use paths::Staleness;
pub use record::{
    Occurrence, OccurrenceInfo, Occurrences, Record, RelationInfo, Relations, SymbolRelation,
    Symbols,
};
pub use store::{IndexStore, SharedIndexStore, UnitNames, UnitReaders, Units};
pub use string_ref::StringRef;
pub use symbol::{Symbol, SymbolInfo, SymbolKind, SymbolLanguage, SymbolProperties, SymbolRoles};
pub use unit::{
    Dependencies, DependencyInfo, DependencyKind, RecordReaders, Records, Unit, UnitDependency,
    UnitInfo,
};
