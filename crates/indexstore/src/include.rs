use std::num::NonZeroU32;
use std::ops::ControlFlow;
use std::path::PathBuf;

use serde::Serialize;

use crate::engine::{IndexEngine, RawInclude};
use crate::error::MalformedRecordError;
use crate::sequence::{self, lending_sequence};
use crate::string_ref::StringRef;
use crate::unit::Unit;

/// A `#include` (or `#import`) directive processed while indexing a unit.
#[derive(Clone, Copy)]
pub struct UnitInclude<'a> {
    engine: &'a dyn IndexEngine,
    raw: RawInclude,
}

impl<'a> UnitInclude<'a> {
    pub(crate) fn new(engine: &'a dyn IndexEngine, raw: RawInclude) -> Self {
        Self { engine, raw }
    }

    /// The file that contains the directive.
    pub fn source_path(&self) -> StringRef<'a> {
        // SAFETY: `raw` is live for `'a`, the duration of the visit.
        unsafe { StringRef::from_raw(self.engine.include_source_path(self.raw)) }
    }

    /// The line of the directive in `source_path`, exactly as recorded.
    /// Corrupt stores may report values below 1; see [`Self::checked_line`].
    pub fn line(&self) -> i64 {
        unsafe { self.engine.include_source_line(self.raw) }
    }

    pub fn checked_line(&self) -> Result<NonZeroU32, MalformedRecordError> {
        let line = self.line();
        u32::try_from(line)
            .ok()
            .and_then(NonZeroU32::new)
            .ok_or_else(|| MalformedRecordError::InvalidLine {
                source_path: self.source_path().to_string_lossy().into_owned(),
                line,
            })
    }

    /// The included file. Empty when the compiler could not resolve it.
    pub fn target_path(&self) -> StringRef<'a> {
        unsafe { StringRef::from_raw(self.engine.include_target_path(self.raw)) }
    }

    pub fn snapshot(&self) -> IncludeDirective {
        IncludeDirective {
            source_path: self.source_path().to_path_buf(),
            line: self.line(),
            target_path: self.target_path().to_path_buf(),
        }
    }
}

impl std::fmt::Debug for UnitInclude<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UnitInclude")
            .field("source_path", &self.source_path())
            .field("line", &self.line())
            .field("target_path", &self.target_path())
            .finish()
    }
}

/// An owned copy of a [`UnitInclude`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct IncludeDirective {
    pub source_path: PathBuf,
    pub line: i64,
    pub target_path: PathBuf,
}

/// The include directives of one unit, in the order the compiler saw them.
pub struct Includes<'u> {
    unit: &'u Unit<'u>,
}

impl<'u> Includes<'u> {
    pub(crate) fn new(unit: &'u Unit<'u>) -> Self {
        Self { unit }
    }

    pub fn try_for_each<B>(
        &self,
        mut f: impl FnMut(UnitInclude<'_>) -> ControlFlow<B>,
    ) -> Option<B> {
        let engine = self.unit.engine();
        let reader = self.unit.raw();
        sequence::drive(
            // SAFETY: the unit reader stays open while `self.unit` is borrowed.
            |applier| unsafe { engine.unit_reader_includes_apply(reader, applier) },
            |raw| f(UnitInclude::new(engine, raw)),
        )
    }

    lending_sequence!(UnitInclude);

    pub fn snapshot(&self) -> Vec<IncludeDirective> {
        self.map_collect(|include| include.snapshot())
    }
}
