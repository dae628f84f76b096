//! Interned names for expression trees.
//!
//! Expression trees refer to names (functions, constructors, pattern
//! variables, literal values) by [`Symbol`], which keeps them `Copy` and
//! cheap to compare while the builder walks a graph. An interner lives as
//! long as the expressions built with it; symbols from one interner mean
//! nothing to another.

use string_interner::{self, backend, symbol};

/// Names a fresh [`StringInterner`] has room for before it reallocates.
/// Block labels are short and a workspace rarely holds more distinct names.
const NAME_CAPACITY: usize = 256;

/// A name interned by a [`StringInterner`].
#[derive(Debug, Hash, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Symbol(symbol::SymbolU32);

/// Maps names to [`Symbol`]s and back.
#[derive(Debug, Clone)]
pub struct StringInterner(
    string_interner::StringInterner<backend::StringBackend<symbol::SymbolU32>>,
);

impl StringInterner {
    pub fn new() -> Self {
        Self(string_interner::StringInterner::with_capacity(NAME_CAPACITY))
    }

    pub fn intern(&mut self, name: &str) -> Symbol {
        Symbol(self.0.get_or_intern(name))
    }

    /// Interns one of the fixed names of the prelude without copying it.
    pub fn intern_static(&mut self, name: &'static str) -> Symbol {
        Symbol(self.0.get_or_intern_static(name))
    }

    pub fn resolve(&self, symbol: Symbol) -> Option<&str> {
        self.0.resolve(symbol.0)
    }

    /// Returns the symbol for `name` if it has already been interned.
    pub fn get(&self, name: &str) -> Option<Symbol> {
        self.0.get(name).map(Symbol)
    }
}

impl Default for StringInterner {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interning_is_idempotent() {
        let mut interner = StringInterner::new();
        let a = interner.intern("Circle");
        let b = interner.intern_static("Circle");

        assert_eq!(a, b);
        assert_eq!(interner.resolve(a), Some("Circle"));
        assert_eq!(interner.get("Circle"), Some(a));
        assert_eq!(interner.get("Square"), None);
    }
}
