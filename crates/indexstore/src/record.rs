use std::ffi::CString;
use std::fmt;
use std::ops::ControlFlow;
use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::trace;

use crate::engine::{IndexEngine, RawOccurrence, RawRecordReader, RawRelation};
use crate::error::{IndexStoreError, Result};
use crate::sequence::{self, lending_sequence};
use crate::store::IndexStore;
use crate::symbol::{Symbol, SymbolInfo, SymbolRoles};

/// The symbols and occurrences one source file contributed to the store.
/// Owns the native record reader and closes it on drop.
pub struct Record<'s> {
    store: &'s IndexStore<'s>,
    raw: RawRecordReader,
    name: String,
    file_path: Option<PathBuf>,
}

impl<'s> Record<'s> {
    pub(crate) fn open(
        store: &'s IndexStore<'s>,
        name: &str,
        file_path: Option<PathBuf>,
    ) -> Result<Self> {
        let open_error = |message: String| IndexStoreError::RecordOpen {
            name: name.to_string(),
            message,
        };
        let c_name =
            CString::new(name).map_err(|_| open_error("record name contains a NUL byte".into()))?;
        // SAFETY: the store handle is live for `'s`.
        let raw = unsafe { store.engine().record_reader_create(store.raw(), &c_name) }
            .map_err(open_error)?;
        trace!(record = name, "opened record reader");
        Ok(Self {
            store,
            raw,
            name: name.to_string(),
            file_path,
        })
    }

    fn engine(&self) -> &'s dyn IndexEngine {
        self.store.engine()
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// The source file this record describes, when it was reached through a
    /// unit dependency. Records opened by name carry no path.
    pub fn file_path(&self) -> Option<&Path> {
        self.file_path.as_deref()
    }

    pub fn symbols(&self) -> Symbols<'_> {
        Symbols { record: self }
    }

    pub fn occurrences(&self) -> Occurrences<'_> {
        Occurrences {
            record: self,
            lines: None,
        }
    }

    /// Occurrences on lines `start..start + count`.
    pub fn occurrences_in_line_range(&self, start: u32, count: u32) -> Occurrences<'_> {
        Occurrences {
            record: self,
            lines: Some((start, count)),
        }
    }
}

impl Drop for Record<'_> {
    fn drop(&mut self) {
        // SAFETY: created by this engine, disposed once, before the store.
        unsafe { self.engine().record_reader_dispose(self.raw) };
        trace!(record = %self.name, "closed record reader");
    }
}

impl fmt::Debug for Record<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Record")
            .field("name", &self.name)
            .field("file_path", &self.file_path)
            .finish()
    }
}

pub struct Symbols<'r> {
    record: &'r Record<'r>,
}

impl Symbols<'_> {
    pub fn try_for_each<B>(&self, mut f: impl FnMut(Symbol<'_>) -> ControlFlow<B>) -> Option<B> {
        let engine = self.record.engine();
        let reader = self.record.raw;
        sequence::drive(
            |applier| unsafe { engine.record_reader_symbols_apply(reader, false, applier) },
            |raw| f(Symbol::new(engine, raw)),
        )
    }

    lending_sequence!(Symbol);

    pub fn snapshot(&self) -> Vec<SymbolInfo> {
        self.map_collect(|symbol| symbol.snapshot())
    }
}

pub struct Occurrences<'r> {
    record: &'r Record<'r>,
    lines: Option<(u32, u32)>,
}

impl Occurrences<'_> {
    pub fn try_for_each<B>(
        &self,
        mut f: impl FnMut(Occurrence<'_>) -> ControlFlow<B>,
    ) -> Option<B> {
        let engine = self.record.engine();
        let reader = self.record.raw;
        let lines = self.lines;
        sequence::drive(
            |applier| match lines {
                Some((start, count)) => unsafe {
                    engine.record_reader_occurrences_in_line_range(reader, start, count, applier)
                },
                None => unsafe { engine.record_reader_occurrences_apply(reader, applier) },
            },
            |raw| f(Occurrence { engine, raw }),
        )
    }

    lending_sequence!(Occurrence);

    pub fn snapshot(&self) -> Vec<OccurrenceInfo> {
        self.map_collect(|occurrence| occurrence.snapshot())
    }
}

/// One mention of a symbol at a source position.
#[derive(Clone, Copy)]
pub struct Occurrence<'a> {
    engine: &'a dyn IndexEngine,
    raw: RawOccurrence,
}

impl<'a> Occurrence<'a> {
    pub fn symbol(&self) -> Symbol<'a> {
        Symbol::new(self.engine, unsafe { self.engine.occurrence_symbol(self.raw) })
    }

    pub fn roles(&self) -> SymbolRoles {
        SymbolRoles::from_bits(unsafe { self.engine.occurrence_roles(self.raw) })
    }

    /// 1-based line.
    pub fn line(&self) -> u32 {
        unsafe { self.engine.occurrence_line_col(self.raw) }.0
    }

    /// 1-based column, in bytes.
    pub fn column(&self) -> u32 {
        unsafe { self.engine.occurrence_line_col(self.raw) }.1
    }

    pub fn relations(&self) -> Relations<'a> {
        Relations {
            engine: self.engine,
            raw: self.raw,
        }
    }

    pub fn snapshot(&self) -> OccurrenceInfo {
        let (line, column) = unsafe { self.engine.occurrence_line_col(self.raw) };
        OccurrenceInfo {
            symbol: self.symbol().snapshot(),
            roles: self.roles(),
            line,
            column,
            relations: self.relations().map_collect(|rel| RelationInfo {
                roles: rel.roles(),
                usr: rel.symbol().usr().to_string_lossy().into_owned(),
            }),
        }
    }
}

impl fmt::Debug for Occurrence<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Occurrence")
            .field("symbol", &self.symbol().name())
            .field("roles", &self.roles())
            .field("line", &self.line())
            .field("column", &self.column())
            .finish()
    }
}

pub struct Relations<'a> {
    engine: &'a dyn IndexEngine,
    raw: RawOccurrence,
}

impl Relations<'_> {
    pub fn try_for_each<B>(
        &self,
        mut f: impl FnMut(SymbolRelation<'_>) -> ControlFlow<B>,
    ) -> Option<B> {
        let engine = self.engine;
        let occurrence = self.raw;
        sequence::drive(
            |applier| unsafe { engine.occurrence_relations_apply(occurrence, applier) },
            |raw| f(SymbolRelation { engine, raw }),
        )
    }

    lending_sequence!(SymbolRelation);
}

/// How an occurrence relates to another symbol, e.g. "called by".
#[derive(Clone, Copy)]
pub struct SymbolRelation<'a> {
    engine: &'a dyn IndexEngine,
    raw: RawRelation,
}

impl<'a> SymbolRelation<'a> {
    pub fn roles(&self) -> SymbolRoles {
        SymbolRoles::from_bits(unsafe { self.engine.relation_roles(self.raw) })
    }

    pub fn symbol(&self) -> Symbol<'a> {
        Symbol::new(self.engine, unsafe { self.engine.relation_symbol(self.raw) })
    }
}

impl fmt::Debug for SymbolRelation<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SymbolRelation")
            .field("roles", &self.roles())
            .field("symbol", &self.symbol().name())
            .finish()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OccurrenceInfo {
    pub symbol: SymbolInfo,
    pub roles: SymbolRoles,
    pub line: u32,
    pub column: u32,
    pub relations: Vec<RelationInfo>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RelationInfo {
    pub roles: SymbolRoles,
    pub usr: String,
}
