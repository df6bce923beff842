//! Canonicalization of raw extraction output.
//!
//! Types are single declarations: per `(name, kind, file)` only the earliest
//! line is kept. Functions may legitimately appear at several positions in a
//! file (prototype and definition), so only exact position duplicates collapse.

use crate::{Symbol, SymbolKind};
use std::collections::hash_map::Entry;
use std::collections::{HashMap, HashSet};
use std::path::PathBuf;

/// Kinds that survive canonicalization.
pub const INDEXED_KINDS: &[SymbolKind] = &[
    SymbolKind::Function,
    SymbolKind::Class,
    SymbolKind::Typedef,
    SymbolKind::Struct,
];

/// Names the matchers are known to pick up by mistake.
pub const NAME_BLOCKLIST: &[&str] = &[
    // primitive and library type names
    "void", "int", "char", "float", "double", "long", "short", "unsigned", "signed", "bool",
    "size_t", "u8", "u16", "u32", "s8", "s16", "s32",
    // control keywords
    "if",
    // storage qualifiers
    "volatile", "__volatile__",
    // macros that look like declarations
    "__attribute__", "__declspec", "EXPORT_SYMBOL", "EXPORT_SYMBOL_GPL", "MODULE_LICENSE",
    "MODULE_AUTHOR", "DEFINE_MUTEX", "LIST_HEAD",
];

pub(crate) fn is_indexed(symbol: &Symbol) -> bool {
    INDEXED_KINDS.contains(&symbol.kind) && !NAME_BLOCKLIST.contains(&symbol.name.as_str())
}

/// Filter and collapse raw symbols into the canonical set.
///
/// Survivors keep the order in which their group was first seen.
pub fn dedup(symbols: Vec<Symbol>) -> Vec<Symbol> {
    let mut kept: Vec<Symbol> = Vec::with_capacity(symbols.len());
    let mut type_slots: HashMap<(String, SymbolKind, PathBuf), usize> = HashMap::new();
    let mut function_positions: HashSet<(String, PathBuf, usize, usize)> = HashSet::new();

    for symbol in symbols {
        if !is_indexed(&symbol) {
            continue;
        }

        if symbol.kind == SymbolKind::Function {
            let key = (
                symbol.name.clone(),
                symbol.file_path.clone(),
                symbol.line,
                symbol.column,
            );
            if function_positions.insert(key) {
                kept.push(symbol);
            }
            continue;
        }

        let key = (symbol.name.clone(), symbol.kind, symbol.file_path.clone());
        match type_slots.entry(key) {
            Entry::Occupied(slot) => {
                let existing = &mut kept[*slot.get()];
                if symbol.line < existing.line {
                    *existing = symbol;
                }
            }
            Entry::Vacant(slot) => {
                slot.insert(kept.len());
                kept.push(symbol);
            }
        }
    }

    kept
}
