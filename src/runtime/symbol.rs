//! Symbols and the well-known symbol registry

use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::{Arc, LazyLock};

struct SymbolData {
    description: Option<Box<str>>,
}

/// A unique identity token with an optional description.
///
/// Two symbols are equal only if they are the same symbol; the description
/// plays no part in equality or hashing.
#[derive(Clone)]
pub struct Symbol(Arc<SymbolData>);

impl Symbol {
    /// Create a fresh symbol
    pub fn new(description: Option<&str>) -> Self {
        Symbol(Arc::new(SymbolData {
            description: description.map(Into::into),
        }))
    }

    /// The description given at creation
    pub fn description(&self) -> Option<&str> {
        self.0.description.as_deref()
    }

    /// Symbol.iterator
    pub fn iterator() -> Symbol {
        well_known().iterator.clone()
    }

    /// Symbol.species
    pub fn species() -> Symbol {
        well_known().species.clone()
    }

    /// Symbol.toPrimitive
    pub fn to_primitive() -> Symbol {
        well_known().to_primitive.clone()
    }

    /// Symbol.toStringTag
    pub fn to_string_tag() -> Symbol {
        well_known().to_string_tag.clone()
    }

    /// Symbol.isConcatSpreadable
    pub fn is_concat_spreadable() -> Symbol {
        well_known().is_concat_spreadable.clone()
    }

    /// Symbol.hasInstance
    pub fn has_instance() -> Symbol {
        well_known().has_instance.clone()
    }

    /// Symbol.unscopables
    pub fn unscopables() -> Symbol {
        well_known().unscopables.clone()
    }
}

impl PartialEq for Symbol {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl Eq for Symbol {}

impl Hash for Symbol {
    fn hash<H: Hasher>(&self, state: &mut H) {
        (Arc::as_ptr(&self.0) as usize).hash(state);
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Symbol({})", self.description().unwrap_or(""))
    }
}

impl fmt::Debug for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

/// The process-wide well-known symbols.
pub struct WellKnownSymbols {
    pub async_iterator: Symbol,
    pub has_instance: Symbol,
    pub is_concat_spreadable: Symbol,
    pub iterator: Symbol,
    pub match_: Symbol,
    pub match_all: Symbol,
    pub replace: Symbol,
    pub search: Symbol,
    pub species: Symbol,
    pub split: Symbol,
    pub to_primitive: Symbol,
    pub to_string_tag: Symbol,
    pub unscopables: Symbol,
}

impl WellKnownSymbols {
    fn new() -> Self {
        Self {
            async_iterator: Symbol::new(Some("Symbol.asyncIterator")),
            has_instance: Symbol::new(Some("Symbol.hasInstance")),
            is_concat_spreadable: Symbol::new(Some("Symbol.isConcatSpreadable")),
            iterator: Symbol::new(Some("Symbol.iterator")),
            match_: Symbol::new(Some("Symbol.match")),
            match_all: Symbol::new(Some("Symbol.matchAll")),
            replace: Symbol::new(Some("Symbol.replace")),
            search: Symbol::new(Some("Symbol.search")),
            species: Symbol::new(Some("Symbol.species")),
            split: Symbol::new(Some("Symbol.split")),
            to_primitive: Symbol::new(Some("Symbol.toPrimitive")),
            to_string_tag: Symbol::new(Some("Symbol.toStringTag")),
            unscopables: Symbol::new(Some("Symbol.unscopables")),
        }
    }

    /// Look up a well-known symbol by its short name (`"iterator"`, `"species"`, ...)
    pub fn by_name(&self, name: &str) -> Option<&Symbol> {
        Some(match name {
            "asyncIterator" => &self.async_iterator,
            "hasInstance" => &self.has_instance,
            "isConcatSpreadable" => &self.is_concat_spreadable,
            "iterator" => &self.iterator,
            "match" => &self.match_,
            "matchAll" => &self.match_all,
            "replace" => &self.replace,
            "search" => &self.search,
            "species" => &self.species,
            "split" => &self.split,
            "toPrimitive" => &self.to_primitive,
            "toStringTag" => &self.to_string_tag,
            "unscopables" => &self.unscopables,
            _ => return None,
        })
    }
}

static WELL_KNOWN: LazyLock<WellKnownSymbols> = LazyLock::new(WellKnownSymbols::new);

/// Access the well-known symbol registry
pub fn well_known() -> &'static WellKnownSymbols {
    &WELL_KNOWN
}
