use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use crate::datatype::DataType;

/// Named output column of a plan operator.
///
/// Symbols are opaque identifiers. The allocator guarantees uniqueness, so
/// comparing names is comparing identity.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Symbol(Arc<str>);

impl Symbol {
    pub fn new(name: impl Into<String>) -> Self {
        Symbol(name.into().into())
    }

    pub fn name(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Symbol {
    fn from(name: &str) -> Self {
        Symbol::new(name)
    }
}

/// Hands out fresh symbols and remembers their types.
///
/// Single-owner for the duration of a planning pass. Name hints are made
/// unique with a numeric suffix.
#[derive(Debug, Default)]
pub struct SymbolAllocator {
    types: BTreeMap<Symbol, DataType>,
}

impl SymbolAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn new_symbol(&mut self, name_hint: &str, datatype: DataType) -> Symbol {
        let mut attempt = 0;
        loop {
            let name = if attempt == 0 {
                name_hint.to_string()
            } else {
                format!("{name_hint}_{attempt}")
            };
            let symbol = Symbol::new(name);
            if !self.types.contains_key(&symbol) {
                self.types.insert(symbol.clone(), datatype);
                return symbol;
            }
            attempt += 1;
        }
    }

    pub fn symbol_type(&self, symbol: &Symbol) -> Option<DataType> {
        self.types.get(symbol).copied()
    }

    pub fn types(&self) -> &BTreeMap<Symbol, DataType> {
        &self.types
    }
}
