//! Name index for the types of a descriptor set.

use super::model::{EnumId, MessageId};
use std::collections::HashMap;

/// A type registered in the pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Symbol {
    Message(MessageId),
    Enum(EnumId),
}

/// Registry of message and enum types keyed by dot-prefixed fully-qualified
/// name (`.foo.bar.Baz`).
///
/// Lookups never fail loudly: a name that does not resolve is `None` and the
/// caller decides what that means.
#[derive(Debug, Default)]
pub struct SymbolPool {
    symbols: HashMap<String, Symbol>,
}

impl SymbolPool {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a symbol, returning the one already bound to that name, if any.
    /// An existing binding is left untouched.
    pub fn insert(&mut self, full_name: &str, symbol: Symbol) -> Option<Symbol> {
        let key = fully_qualify(full_name);
        match self.symbols.get(&key) {
            Some(existing) => Some(*existing),
            None => {
                self.symbols.insert(key, symbol);
                None
            }
        }
    }

    pub fn get(&self, full_name: &str) -> Option<Symbol> {
        self.symbols.get(&fully_qualify(full_name)).copied()
    }

    pub fn find_message(&self, full_name: &str) -> Option<MessageId> {
        match self.get(full_name)? {
            Symbol::Message(id) => Some(id),
            Symbol::Enum(_) => None,
        }
    }

    pub fn find_enum(&self, full_name: &str) -> Option<EnumId> {
        match self.get(full_name)? {
            Symbol::Enum(id) => Some(id),
            Symbol::Message(_) => None,
        }
    }

    /// Resolves a type reference written inside `scope`.
    ///
    /// Dot-prefixed names are looked up as-is. Other names are tried against
    /// each enclosing scope from the innermost outward: the scope itself, then
    /// each shorter dotted prefix of it, and finally the root. `scope` is the
    /// fully-qualified name of the enclosing message, or the package for
    /// top-level declarations.
    pub fn resolve(&self, name: &str, scope: &str) -> Option<Symbol> {
        if name.starts_with('.') {
            return self.get(name);
        }
        let mut scope = scope.trim_start_matches('.');
        loop {
            let candidate = if scope.is_empty() {
                format!(".{name}")
            } else {
                format!(".{scope}.{name}")
            };
            if let Some(symbol) = self.symbols.get(&candidate) {
                return Some(*symbol);
            }
            if scope.is_empty() {
                return None;
            }
            scope = match scope.rfind('.') {
                Some(pos) => &scope[..pos],
                None => "",
            };
        }
    }

    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }
}

/// Adds the leading dot used for pool keys, if missing.
pub fn fully_qualify(name: &str) -> String {
    if name.starts_with('.') {
        name.to_string()
    } else {
        format!(".{name}")
    }
}
