//! Pattern-based declaration extraction.
//!
//! Matching runs over the raw file text. Comments, string literals and
//! signatures split across lines are not special-cased, so a commented-out
//! `struct foo` is reported like a real one.

use crate::position::LineIndex;
use crate::{Symbol, SymbolKind};
use regex::{Captures, Regex};
use srcnav_workspace::SourceLanguage;
use std::collections::HashMap;
use std::path::Path;

/// Turns the text of one file into raw symbol candidates.
pub trait SymbolExtractor: Send + Sync {
    fn extract(&self, path: &Path, text: &str) -> Vec<Symbol>;
}

/// Qualifiers, a return-type-like token run, then `name(`.
const C_FUNCTION: &str = r"(?m)^[ \t]*(?P<decl>(?:(?:static|inline|extern|virtual|const|volatile|__inline|__inline__)[ \t]+)*(?P<lead>[A-Za-z_][\w:<>]*)(?:[ \t]*[*&]+[ \t]*|[ \t]+)(?:[A-Za-z_][\w:<>]*(?:[ \t]*[*&]+[ \t]*|[ \t]+))*(?:[A-Za-z_]\w*::)*(?P<name>[A-Za-z_]\w*)\()";
const C_AGGREGATE: &str = r"\b(?P<kind>class|struct)[ \t]+(?P<name>[A-Za-z_]\w*)";
/// The aliased type may contain one level of braces, which covers
/// `typedef struct { ... } name;`.
const C_TYPEDEF: &str = r"\btypedef\s+(?P<type>(?:[^;{}]|\{[^{}]*\})+?)\s*\b(?P<name>[A-Za-z_]\w*)\s*;";
const PY_FUNCTION: &str = r"(?m)^[ \t]*(?P<decl>(?:async[ \t]+)?def[ \t]+(?P<name>[A-Za-z_]\w*)[ \t]*\()";
const PY_CLASS: &str = r"(?m)^[ \t]*(?P<decl>class[ \t]+(?P<name>[A-Za-z_]\w*))";

/// Leading tokens that start a statement rather than a return type.
const STATEMENT_KEYWORDS: &[&str] = &[
    "return", "else", "case", "goto", "throw", "new", "delete", "sizeof",
];

#[derive(Debug, Clone, Copy)]
enum Rule {
    Function,
    Aggregate,
    Typedef,
    Definition(SymbolKind),
}

#[derive(Debug)]
struct Matcher {
    rule: Rule,
    regex: Regex,
}

impl Matcher {
    fn new(rule: Rule, pattern: &str) -> Self {
        Self {
            rule,
            regex: Regex::new(pattern).expect("valid declaration pattern"),
        }
    }

    fn symbol(&self, captures: &Captures<'_>, path: &Path, lines: &LineIndex) -> Option<Symbol> {
        let whole = captures.get(0)?;
        let name = captures.name("name")?;
        let decl_start = captures.name("decl").map_or(whole.start(), |decl| decl.start());

        let (kind, signature) = match self.rule {
            Rule::Function => {
                let lead = captures.name("lead").map(|lead| lead.as_str());
                if lead.is_some_and(|lead| STATEMENT_KEYWORDS.contains(&lead)) {
                    return None;
                }
                (SymbolKind::Function, None)
            }
            Rule::Aggregate => {
                let kind = if &captures["kind"] == "class" {
                    SymbolKind::Class
                } else {
                    SymbolKind::Struct
                };
                (kind, None)
            }
            Rule::Typedef => (
                SymbolKind::Typedef,
                Some(typedef_signature(&captures["type"], name.as_str())),
            ),
            Rule::Definition(kind) => (kind, None),
        };

        let start = lines.position(decl_start);
        let end = lines.position(whole.end());
        Some(Symbol {
            name: name.as_str().to_string(),
            kind,
            file_path: path.to_path_buf(),
            line: start.line,
            column: start.column,
            end_line: Some(end.line),
            end_column: Some(end.column),
            signature,
        })
    }
}

fn typedef_signature(aliased: &str, name: &str) -> String {
    let aliased = aliased.split_whitespace().collect::<Vec<_>>().join(" ");
    let separator = if aliased.ends_with(['*', '&']) { "" } else { " " };
    format!("typedef {aliased}{separator}{name};")
}

/// Ordered declaration matchers for one language.
///
/// Each matcher scans the whole text independently, so the output is grouped
/// by matcher, not sorted by position.
#[derive(Debug)]
pub struct PatternExtractor {
    matchers: Vec<Matcher>,
}

impl PatternExtractor {
    pub fn for_language(language: SourceLanguage) -> Self {
        let matchers = match language {
            SourceLanguage::C | SourceLanguage::Cpp => vec![
                Matcher::new(Rule::Function, C_FUNCTION),
                Matcher::new(Rule::Aggregate, C_AGGREGATE),
                Matcher::new(Rule::Typedef, C_TYPEDEF),
            ],
            SourceLanguage::Python => vec![
                Matcher::new(Rule::Definition(SymbolKind::Function), PY_FUNCTION),
                Matcher::new(Rule::Definition(SymbolKind::Class), PY_CLASS),
            ],
        };
        Self { matchers }
    }
}

impl SymbolExtractor for PatternExtractor {
    fn extract(&self, path: &Path, text: &str) -> Vec<Symbol> {
        let lines = LineIndex::new(text);
        let mut symbols = Vec::new();
        for matcher in &self.matchers {
            symbols.extend(
                matcher
                    .regex
                    .captures_iter(text)
                    .filter_map(|captures| matcher.symbol(&captures, path, &lines)),
            );
        }
        symbols
    }
}

/// Extractors keyed by language.
pub struct ExtractorRegistry {
    extractors: HashMap<SourceLanguage, Box<dyn SymbolExtractor>>,
}

impl ExtractorRegistry {
    pub fn empty() -> Self {
        Self {
            extractors: HashMap::new(),
        }
    }

    /// Replace the extractor for `language`.
    pub fn register(&mut self, language: SourceLanguage, extractor: Box<dyn SymbolExtractor>) {
        self.extractors.insert(language, extractor);
    }

    pub fn get(&self, language: SourceLanguage) -> Option<&dyn SymbolExtractor> {
        self.extractors.get(&language).map(|extractor| extractor.as_ref())
    }
}

impl Default for ExtractorRegistry {
    fn default() -> Self {
        let mut registry = Self::empty();
        for language in [SourceLanguage::C, SourceLanguage::Cpp, SourceLanguage::Python] {
            registry.register(language, Box::new(PatternExtractor::for_language(language)));
        }
        registry
    }
}
