//! Identifier lookup under a cursor, the entry point of go-to-definition.

use memchr::{memchr_iter, memrchr};
use srcnav_workspace::SourceLanguage;
use std::ops::Range;
use tree_sitter::{Parser, Point, TreeCursor};

/// The identifier found at a cursor position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CursorSymbol {
    /// Name to look up, e.g. `bar` for `foo::bar`
    pub name: String,
    /// Text of the whole node, e.g. `foo::bar`
    pub full_text: String,
    pub byte_range: Range<usize>,
}

impl CursorSymbol {
    fn plain(content: &str, range: Range<usize>) -> Option<Self> {
        let name = content.get(range.clone())?.to_string();
        Some(Self {
            full_text: name.clone(),
            name,
            byte_range: range,
        })
    }
}

/// Find the identifier at `byte_offset`.
///
/// C and C++ sources are parsed with tree-sitter; Python falls back to a
/// lexical scan. Returns `None` for primitive types, punctuation, binary
/// content and offsets past the end.
pub fn symbol_at_offset(
    content: &str,
    byte_offset: usize,
    language: SourceLanguage,
) -> Option<CursorSymbol> {
    if content.is_empty() || byte_offset >= content.len() {
        return None;
    }
    if memchr::memchr(0, content.as_bytes()).is_some() {
        return None;
    }

    match language {
        SourceLanguage::C | SourceLanguage::Cpp => c_family_symbol(content, byte_offset),
        SourceLanguage::Python => lexical_symbol(content, byte_offset),
    }
}

fn c_family_symbol(content: &str, byte_offset: usize) -> Option<CursorSymbol> {
    // The C++ grammar accepts the C code we care about here.
    let mut parser = Parser::new();
    parser.set_language(&tree_sitter_cpp::LANGUAGE.into()).ok()?;
    let tree = parser.parse(content, None)?;

    let mut cursor = tree.walk();
    descend_to_point(&mut cursor, offset_to_point(content, byte_offset));

    loop {
        let node = cursor.node();
        match node.kind() {
            "identifier" | "type_identifier" | "field_identifier" | "namespace_identifier" => {
                return CursorSymbol::plain(content, node.byte_range());
            }
            "qualified_identifier" => {
                let full_text = content.get(node.byte_range())?.to_string();
                let name = match node.child_by_field_name("name") {
                    Some(name_node) => content.get(name_node.byte_range())?.to_string(),
                    None => full_text.rsplit("::").next().unwrap_or(&full_text).to_string(),
                };
                return Some(CursorSymbol {
                    name,
                    full_text,
                    byte_range: node.byte_range(),
                });
            }
            "template_type" => {
                if let Some(name_node) = node.child_by_field_name("name") {
                    let name = content.get(name_node.byte_range())?.to_string();
                    return Some(CursorSymbol {
                        name,
                        full_text: content.get(node.byte_range())?.to_string(),
                        byte_range: node.byte_range(),
                    });
                }
            }
            "primitive_type" => return None,
            _ => {}
        }

        if !cursor.goto_parent() {
            return None;
        }
    }
}

fn is_ident_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_'
}

/// Expands around the offset over identifier bytes. A cursor sitting just
/// after a word still resolves to that word.
fn lexical_symbol(content: &str, byte_offset: usize) -> Option<CursorSymbol> {
    let bytes = content.as_bytes();
    let anchor = if is_ident_byte(bytes[byte_offset]) {
        byte_offset
    } else if byte_offset > 0 && is_ident_byte(bytes[byte_offset - 1]) {
        byte_offset - 1
    } else {
        return None;
    };

    let start = bytes[..anchor]
        .iter()
        .rposition(|&b| !is_ident_byte(b))
        .map_or(0, |i| i + 1);
    let end = bytes[anchor..]
        .iter()
        .position(|&b| !is_ident_byte(b))
        .map_or(bytes.len(), |i| anchor + i);

    if bytes[start].is_ascii_digit() {
        return None;
    }
    CursorSymbol::plain(content, start..end)
}

fn offset_to_point(content: &str, byte_offset: usize) -> Point {
    let prefix = &content.as_bytes()[..byte_offset.min(content.len())];
    let row = memchr_iter(b'\n', prefix).count();
    let line_start = memrchr(b'\n', prefix).map_or(0, |i| i + 1);
    Point::new(row, byte_offset - line_start)
}

fn contains(start: Point, end: Point, point: Point) -> bool {
    let after_start =
        start.row < point.row || (start.row == point.row && start.column <= point.column);
    let before_end = end.row > point.row || (end.row == point.row && end.column >= point.column);
    after_start && before_end
}

/// Move the cursor to the deepest node containing `point`.
fn descend_to_point(cursor: &mut TreeCursor, point: Point) {
    while cursor.goto_first_child() {
        let mut found = false;
        loop {
            let node = cursor.node();
            if contains(node.start_position(), node.end_position(), point) {
                found = true;
                break;
            }
            if !cursor.goto_next_sibling() {
                break;
            }
        }
        if !found {
            cursor.goto_parent();
            return;
        }
    }
}
