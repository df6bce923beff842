//! In-memory name lookup over the canonical symbol set.

use crate::{Symbol, SymbolKind};
use std::collections::{HashMap, HashSet};
use std::path::Path;

/// Symbol name to every declaration with that name, in insertion order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SymbolIndex {
    definitions: HashMap<String, Vec<Symbol>>,
}

impl SymbolIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_symbols(symbols: impl IntoIterator<Item = Symbol>) -> Self {
        let mut index = Self::new();
        for symbol in symbols {
            index.insert(symbol);
        }
        index
    }

    pub fn insert(&mut self, symbol: Symbol) {
        self.definitions
            .entry(symbol.name.clone())
            .or_default()
            .push(symbol);
    }

    /// Every declaration named `name`; empty when the name is unknown.
    pub fn find_by_name(&self, name: &str) -> &[Symbol] {
        self.definitions
            .get(name)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    pub fn find_by_name_and_kind(&self, name: &str, kind: SymbolKind) -> Vec<&Symbol> {
        self.find_by_name(name)
            .iter()
            .filter(|symbol| symbol.kind == kind)
            .collect()
    }

    /// Names starting with `prefix`, compared case-insensitively, sorted by name.
    pub fn search_prefix(&self, prefix: &str) -> Vec<(&str, &[Symbol])> {
        let prefix_lower = prefix.to_lowercase();
        let mut matches: Vec<_> = self
            .definitions
            .iter()
            .filter(|(name, _)| name.to_lowercase().starts_with(&prefix_lower))
            .map(|(name, defs)| (name.as_str(), defs.as_slice()))
            .collect();
        matches.sort_by(|a, b| a.0.cmp(b.0));
        matches
    }

    pub fn symbols_in_file<'a>(&'a self, path: &'a Path) -> impl Iterator<Item = &'a Symbol> + 'a {
        self.iter().filter(move |symbol| symbol.file_path == path)
    }

    /// Number of distinct names.
    pub fn symbol_count(&self) -> usize {
        self.definitions.len()
    }

    /// Number of declarations across all names.
    pub fn definition_count(&self) -> usize {
        self.definitions.values().map(Vec::len).sum()
    }

    pub fn file_count(&self) -> usize {
        self.iter()
            .map(|symbol| symbol.file_path.as_path())
            .collect::<HashSet<_>>()
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }

    pub fn clear(&mut self) {
        self.definitions.clear();
    }

    pub fn iter(&self) -> impl Iterator<Item = &Symbol> {
        self.definitions.values().flatten()
    }

    pub fn into_symbols(self) -> Vec<Symbol> {
        self.definitions.into_values().flatten().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> SymbolIndex {
        SymbolIndex::from_symbols([
            Symbol::new("init", SymbolKind::Function, "a.c", 3, 1),
            Symbol::new("Init", SymbolKind::Struct, "a.h", 1, 1),
            Symbol::new("init", SymbolKind::Function, "a.c", 40, 1),
            Symbol::new("teardown", SymbolKind::Function, "b.c", 7, 1),
            Symbol::new("init", SymbolKind::Typedef, "b.h", 2, 1),
        ])
    }

    #[test]
    fn lookup_preserves_insertion_order() {
        let index = sample();
        let lines: Vec<_> = index.find_by_name("init").iter().map(|s| s.line).collect();
        assert_eq!(lines, vec![3, 40, 2]);
        assert!(index.find_by_name("missing").is_empty());
    }

    #[test]
    fn lookup_by_kind() {
        let index = sample();
        let typedefs = index.find_by_name_and_kind("init", SymbolKind::Typedef);
        assert_eq!(typedefs.len(), 1);
        assert_eq!(typedefs[0].file_path, Path::new("b.h"));
    }

    #[test]
    fn counts() {
        let index = sample();
        assert_eq!(index.symbol_count(), 3);
        assert_eq!(index.definition_count(), 5);
        assert_eq!(index.file_count(), 4);
        assert_eq!(index.symbols_in_file(Path::new("a.c")).count(), 2);
    }

    #[test]
    fn prefix_search_ignores_case() {
        let index = sample();
        let names: Vec<_> = index.search_prefix("IN").into_iter().map(|(n, _)| n).collect();
        assert_eq!(names, vec!["Init", "init"]);
    }

    #[test]
    fn clear_and_flatten() {
        let mut index = sample();
        assert_eq!(index.clone().into_symbols().len(), 5);
        index.clear();
        assert!(index.is_empty());
        assert_eq!(index.iter().count(), 0);
    }
}
