use crate::lang::ast::RegisterKind;
use std::collections::HashMap;
use std::fmt::Write;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SymbolKind {
    Vector { register: RegisterKind, width: usize },
    Gate { parameters: usize, arguments: usize },
    GateParameter { position: usize },
    GateArgument { position: usize },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Symbol {
    pub name: String,
    pub line: usize,
    pub kind: SymbolKind,
}

impl Symbol {
    pub fn new(name: impl Into<String>, line: usize, kind: SymbolKind) -> Self {
        Symbol {
            name: name.into(),
            line,
            kind,
        }
    }

    /// Quantum registers and gate arguments are qubits, nothing else is.
    pub fn is_qubit(&self) -> bool {
        match self.kind {
            SymbolKind::Vector { register, .. } => register == RegisterKind::Qubit,
            SymbolKind::GateArgument { .. } => true,
            SymbolKind::Gate { .. } | SymbolKind::GateParameter { .. } => false,
        }
    }

    pub fn describe(&self) -> String {
        match &self.kind {
            SymbolKind::Vector { register, width } => format!("{} of width {}", register, width),
            SymbolKind::Gate {
                parameters,
                arguments,
            } => format!("gate with {} parameters and {} arguments", parameters, arguments),
            SymbolKind::GateParameter { position } => format!("gate parameter #{}", position),
            SymbolKind::GateArgument { position } => format!("gate argument #{}", position),
        }
    }
}

/// Index of a scope in the table's arena.
pub type ScopeId = usize;

#[derive(Debug, Default)]
struct Scope {
    symbols: HashMap<String, Symbol>,
    outer: Option<ScopeId>,
    saved: HashMap<String, ScopeId>,
}

/// Lexically nested scopes kept in an arena.
///
/// Popped scopes are never freed; they stay in the arena and can be saved
/// under a name in their parent so a later pass can re-enter them.
#[derive(Debug, Default)]
pub struct SymbolTable {
    scopes: Vec<Scope>,
    current: Option<ScopeId>,
}

impl SymbolTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current(&self) -> Option<ScopeId> {
        self.current
    }

    /// Opens a scope nested in the current one and makes it current.
    pub fn push_scope(&mut self) -> ScopeId {
        let id = self.scopes.len();
        self.scopes.push(Scope {
            outer: self.current,
            ..Scope::default()
        });
        self.current = Some(id);
        id
    }

    /// Binds `symbol` in the current scope.
    ///
    /// An existing binding of the same name is replaced and returned; callers
    /// that forbid redeclaration check with `lookup(name, true)` first. Returns
    /// `Err` with the symbol when there is no current scope.
    pub fn declare(&mut self, symbol: Symbol) -> Result<Option<Symbol>, Symbol> {
        match self.current {
            Some(id) => Ok(self.scopes[id].symbols.insert(symbol.name.clone(), symbol)),
            None => Err(symbol),
        }
    }

    pub fn lookup(&self, name: &str, this_scope_only: bool) -> Option<&Symbol> {
        let mut scope = self.current;
        while let Some(id) = scope {
            if let Some(symbol) = self.scopes[id].symbols.get(name) {
                return Some(symbol);
            }
            if this_scope_only {
                return None;
            }
            scope = self.scopes[id].outer;
        }
        None
    }

    /// Leaves the current scope and files it under `name` in the scope that
    /// becomes current. The first scope saved under a name is kept.
    pub fn pop_and_save(&mut self, name: &str) {
        let Some(id) = self.current else {
            return;
        };
        let outer = self.scopes[id].outer.take();
        self.current = outer;
        if let Some(parent) = outer {
            self.scopes[parent]
                .saved
                .entry(name.to_string())
                .or_insert(id);
        }
    }

    /// Re-enters the scope saved under `name` in the current scope.
    pub fn restore(&mut self, name: &str) -> bool {
        let Some(parent) = self.current else {
            return false;
        };
        match self.scopes[parent].saved.get(name) {
            Some(&id) => {
                self.scopes[id].outer = Some(parent);
                self.current = Some(id);
                true
            }
            None => false,
        }
    }

    /// Symbols of the current scope sorted by name.
    pub fn symbols(&self) -> Vec<&Symbol> {
        let mut symbols: Vec<&Symbol> = self
            .current
            .map(|id| self.scopes[id].symbols.values().collect())
            .unwrap_or_default();
        symbols.sort_by(|a, b| a.name.cmp(&b.name));
        symbols
    }

    /// Renders the current scope and, recursively, every scope saved in it.
    pub fn dump(&self) -> String {
        let mut out = String::new();
        if let Some(id) = self.current {
            self.dump_scope(id, "<global>", 0, &mut out);
        }
        out
    }

    fn dump_scope(&self, id: ScopeId, title: &str, depth: usize, out: &mut String) {
        let indent = "  ".repeat(depth);
        let scope = &self.scopes[id];
        let _ = writeln!(out, "{}scope {}", indent, title);
        let mut symbols: Vec<&Symbol> = scope.symbols.values().collect();
        symbols.sort_by_key(|s| (s.line, s.name.clone()));
        for symbol in symbols {
            let _ = writeln!(
                out,
                "{}  {} : {} (line {})",
                indent,
                symbol.name,
                symbol.describe(),
                symbol.line
            );
        }
        let mut saved: Vec<(&String, &ScopeId)> = scope.saved.iter().collect();
        saved.sort();
        for (name, &child) in saved {
            self.dump_scope(child, name, depth + 1, out);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn register(name: &str, line: usize) -> Symbol {
        Symbol::new(
            name,
            line,
            SymbolKind::Vector {
                register: RegisterKind::Qubit,
                width: 2,
            },
        )
    }

    fn parameter(name: &str, position: usize) -> Symbol {
        Symbol::new(name, 1, SymbolKind::GateParameter { position })
    }

    #[test]
    fn declare_without_scope_fails() {
        let mut table = SymbolTable::new();
        assert!(table.declare(register("q", 1)).is_err());
        assert!(table.lookup("q", false).is_none());
    }

    #[test]
    fn declare_overwrites_and_returns_previous() {
        let mut table = SymbolTable::new();
        table.push_scope();
        assert_eq!(table.declare(register("q", 1)), Ok(None));
        let previous = table.declare(register("q", 7)).unwrap();
        assert_eq!(previous.map(|s| s.line), Some(1));
        assert_eq!(table.lookup("q", true).map(|s| s.line), Some(7));
    }

    #[test]
    fn inner_scope_shadows_until_popped() {
        let mut table = SymbolTable::new();
        table.push_scope();
        table.declare(register("x", 1)).unwrap();
        table.push_scope();
        table.declare(parameter("x", 0)).unwrap();

        let found = table.lookup("x", false).unwrap();
        assert_eq!(found.kind, SymbolKind::GateParameter { position: 0 });

        table.pop_and_save("g");
        let found = table.lookup("x", false).unwrap();
        assert!(found.is_qubit());
    }

    #[test]
    fn this_scope_only_does_not_walk_outward() {
        let mut table = SymbolTable::new();
        table.push_scope();
        table.declare(register("q", 1)).unwrap();
        table.push_scope();
        assert!(table.lookup("q", true).is_none());
        assert!(table.lookup("q", false).is_some());
    }

    #[test]
    fn restore_brings_back_exactly_the_saved_symbols() {
        let mut table = SymbolTable::new();
        table.push_scope();
        table.push_scope();
        table.declare(parameter("theta", 0)).unwrap();
        table.declare(Symbol::new("a", 1, SymbolKind::GateArgument { position: 0 })).unwrap();
        let before: Vec<Symbol> = table.symbols().into_iter().cloned().collect();
        table.pop_and_save("rot");

        assert!(table.lookup("theta", false).is_none());
        assert!(table.restore("rot"));
        let after: Vec<Symbol> = table.symbols().into_iter().cloned().collect();
        assert_eq!(before, after);
    }

    #[test]
    fn restore_of_unknown_name_leaves_scope_alone() {
        let mut table = SymbolTable::new();
        let global = table.push_scope();
        assert!(!table.restore("nope"));
        assert_eq!(table.current(), Some(global));
    }

    #[test]
    fn first_save_wins() {
        let mut table = SymbolTable::new();
        table.push_scope();
        table.push_scope();
        table.declare(parameter("first", 0)).unwrap();
        table.pop_and_save("g");
        table.push_scope();
        table.declare(parameter("second", 0)).unwrap();
        table.pop_and_save("g");

        assert!(table.restore("g"));
        assert!(table.lookup("first", true).is_some());
        assert!(table.lookup("second", true).is_none());
    }

    #[test]
    fn dump_lists_saved_scopes() {
        let mut table = SymbolTable::new();
        table.push_scope();
        table.declare(register("q", 2)).unwrap();
        table.push_scope();
        table.declare(parameter("t", 0)).unwrap();
        table.pop_and_save("g");
        let text = table.dump();
        assert!(text.contains("scope <global>"));
        assert!(text.contains("q : qreg of width 2 (line 2)"));
        assert!(text.contains("  scope g"));
        assert!(text.contains("t : gate parameter #0"));
    }
}
