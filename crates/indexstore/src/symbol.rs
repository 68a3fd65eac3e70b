use std::fmt;
use std::ops::{BitOr, BitOrAssign};

use serde::Serialize;

use crate::engine::{IndexEngine, RawSymbol, SymbolField};
use crate::string_ref::StringRef;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum SymbolKind {
    Unknown,
    Module,
    Namespace,
    NamespaceAlias,
    Macro,
    Enum,
    Struct,
    Class,
    Protocol,
    Extension,
    Union,
    TypeAlias,
    Function,
    Variable,
    Field,
    EnumConstant,
    InstanceMethod,
    ClassMethod,
    StaticMethod,
    InstanceProperty,
    ClassProperty,
    StaticProperty,
    Constructor,
    Destructor,
    ConversionFunction,
    Parameter,
    Using,
    Concept,
    CommentTag,
    Other(u32),
}

impl From<u32> for SymbolKind {
    fn from(raw: u32) -> Self {
        match raw {
            0 => Self::Unknown,
            1 => Self::Module,
            2 => Self::Namespace,
            3 => Self::NamespaceAlias,
            4 => Self::Macro,
            5 => Self::Enum,
            6 => Self::Struct,
            7 => Self::Class,
            8 => Self::Protocol,
            9 => Self::Extension,
            10 => Self::Union,
            11 => Self::TypeAlias,
            12 => Self::Function,
            13 => Self::Variable,
            14 => Self::Field,
            15 => Self::EnumConstant,
            16 => Self::InstanceMethod,
            17 => Self::ClassMethod,
            18 => Self::StaticMethod,
            19 => Self::InstanceProperty,
            20 => Self::ClassProperty,
            21 => Self::StaticProperty,
            22 => Self::Constructor,
            23 => Self::Destructor,
            24 => Self::ConversionFunction,
            25 => Self::Parameter,
            26 => Self::Using,
            27 => Self::Concept,
            1000 => Self::CommentTag,
            other => Self::Other(other),
        }
    }
}

impl SymbolKind {
    pub fn is_callable(&self) -> bool {
        matches!(
            self,
            Self::Function
                | Self::InstanceMethod
                | Self::ClassMethod
                | Self::StaticMethod
                | Self::Constructor
                | Self::Destructor
                | Self::ConversionFunction
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum SymbolLanguage {
    C,
    ObjC,
    Cxx,
    Swift,
    Other(u32),
}

impl From<u32> for SymbolLanguage {
    fn from(raw: u32) -> Self {
        match raw {
            0 => Self::C,
            1 => Self::ObjC,
            2 => Self::Cxx,
            100 => Self::Swift,
            other => Self::Other(other),
        }
    }
}

macro_rules! bit_set {
    ($(#[$meta:meta])* $name:ident { $($flag:ident = $bit:expr),* $(,)? }) => {
        $(#[$meta])*
        #[derive(Clone, Copy, Default, PartialEq, Eq, Hash, Serialize)]
        #[serde(transparent)]
        pub struct $name(u64);

        impl $name {
            $(pub const $flag: $name = $name(1 << $bit);)*

            const NAMED: &'static [(&'static str, $name)] = &[$((stringify!($flag), $name::$flag)),*];

            pub const fn from_bits(bits: u64) -> Self {
                Self(bits)
            }

            pub const fn bits(&self) -> u64 {
                self.0
            }

            pub const fn contains(&self, other: Self) -> bool {
                self.0 & other.0 == other.0
            }

            pub const fn intersects(&self, other: Self) -> bool {
                self.0 & other.0 != 0
            }

            pub const fn is_empty(&self) -> bool {
                self.0 == 0
            }

            /// Names of the known flags that are set, lowest bit first.
            pub fn iter_names(&self) -> impl Iterator<Item = &'static str> + '_ {
                Self::NAMED
                    .iter()
                    .filter(|(_, flag)| self.contains(*flag))
                    .map(|(name, _)| *name)
            }
        }

        impl BitOr for $name {
            type Output = Self;

            fn bitor(self, rhs: Self) -> Self {
                Self(self.0 | rhs.0)
            }
        }

        impl BitOrAssign for $name {
            fn bitor_assign(&mut self, rhs: Self) {
                self.0 |= rhs.0;
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                let names: Vec<&str> = self.iter_names().collect();
                write!(f, "{}({})", stringify!($name), names.join(" | "))
            }
        }
    };
}

bit_set!(
    /// `indexstore_symbol_role_t`
    SymbolRoles {
        DECLARATION = 0,
        DEFINITION = 1,
        REFERENCE = 2,
        READ = 3,
        WRITE = 4,
        CALL = 5,
        DYNAMIC = 6,
        ADDRESS_OF = 7,
        IMPLICIT = 8,
        REL_CHILD_OF = 9,
        REL_BASE_OF = 10,
        REL_OVERRIDE_OF = 11,
        REL_RECEIVED_BY = 12,
        REL_CALLED_BY = 13,
        REL_EXTENDED_BY = 14,
        REL_ACCESSOR_OF = 15,
        REL_CONTAINED_BY = 16,
        REL_IB_TYPE_OF = 17,
        REL_SPECIALIZATION_OF = 18,
        UNDEFINITION = 19,
    }
);

bit_set!(
    /// `indexstore_symbol_property_t`
    SymbolProperties {
        GENERIC = 0,
        TEMPLATE_PARTIAL_SPECIALIZATION = 1,
        TEMPLATE_SPECIALIZATION = 2,
        UNIT_TEST = 3,
        IB_ANNOTATED = 4,
        IB_OUTLET_COLLECTION = 5,
        GK_INSPECTABLE = 6,
        LOCAL = 7,
        PROTOCOL_INTERFACE = 8,
        SWIFT_ASYNC = 16,
    }
);

/// A symbol declared or referenced in a record.
#[derive(Clone, Copy)]
pub struct Symbol<'a> {
    engine: &'a dyn IndexEngine,
    raw: RawSymbol,
}

impl<'a> Symbol<'a> {
    pub(crate) fn new(engine: &'a dyn IndexEngine, raw: RawSymbol) -> Self {
        Self { engine, raw }
    }

    pub fn name(&self) -> StringRef<'a> {
        self.string(SymbolField::Name)
    }

    /// Unified symbol resolution: the cross-file identity of the symbol.
    pub fn usr(&self) -> StringRef<'a> {
        self.string(SymbolField::Usr)
    }

    pub fn codegen_name(&self) -> StringRef<'a> {
        self.string(SymbolField::CodegenName)
    }

    pub fn kind(&self) -> SymbolKind {
        SymbolKind::from(unsafe { self.engine.symbol_kind(self.raw) })
    }

    /// Raw `indexstore_symbol_subkind_t`.
    pub fn subkind(&self) -> u32 {
        unsafe { self.engine.symbol_subkind(self.raw) }
    }

    pub fn language(&self) -> SymbolLanguage {
        SymbolLanguage::from(unsafe { self.engine.symbol_language(self.raw) })
    }

    pub fn properties(&self) -> SymbolProperties {
        SymbolProperties::from_bits(unsafe { self.engine.symbol_properties(self.raw) })
    }

    /// Union of the roles of every occurrence of this symbol in the record.
    pub fn roles(&self) -> SymbolRoles {
        SymbolRoles::from_bits(unsafe { self.engine.symbol_roles(self.raw) })
    }

    pub fn related_roles(&self) -> SymbolRoles {
        SymbolRoles::from_bits(unsafe { self.engine.symbol_related_roles(self.raw) })
    }

    fn string(&self, field: SymbolField) -> StringRef<'a> {
        // SAFETY: the symbol handle is live for `'a`.
        unsafe { StringRef::from_raw(self.engine.symbol_string(self.raw, field)) }
    }

    pub fn snapshot(&self) -> SymbolInfo {
        SymbolInfo {
            name: self.name().to_string_lossy().into_owned(),
            usr: self.usr().to_string_lossy().into_owned(),
            kind: self.kind(),
            language: self.language(),
            properties: self.properties(),
            roles: self.roles(),
        }
    }
}

impl fmt::Debug for Symbol<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Symbol")
            .field("name", &self.name())
            .field("usr", &self.usr())
            .field("kind", &self.kind())
            .finish()
    }
}

/// Owned copy of a [`Symbol`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct SymbolInfo {
    pub name: String,
    pub usr: String,
    pub kind: SymbolKind,
    pub language: SymbolLanguage,
    pub properties: SymbolProperties,
    pub roles: SymbolRoles,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_raw_values_are_preserved() {
        assert_eq!(SymbolKind::from(12), SymbolKind::Function);
        assert_eq!(SymbolKind::from(4242), SymbolKind::Other(4242));
        assert_eq!(SymbolLanguage::from(100), SymbolLanguage::Swift);
        assert_eq!(SymbolLanguage::from(7), SymbolLanguage::Other(7));
    }

    #[test]
    fn test_roles_combine_and_test_as_bit_sets() {
        let roles = SymbolRoles::DEFINITION | SymbolRoles::CALL;
        assert!(roles.contains(SymbolRoles::DEFINITION));
        assert!(!roles.contains(SymbolRoles::DEFINITION | SymbolRoles::READ));
        assert!(roles.intersects(SymbolRoles::READ | SymbolRoles::CALL));
        assert_eq!(roles.bits(), 0b10_0010);
        assert_eq!(format!("{roles:?}"), "SymbolRoles(DEFINITION | CALL)");
    }

    #[test]
    fn test_swift_async_property_uses_bit_sixteen() {
        assert_eq!(SymbolProperties::SWIFT_ASYNC.bits(), 1 << 16);
    }
}
