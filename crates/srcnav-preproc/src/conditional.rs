//! Single-pass evaluation of `#if`/`#ifdef`/`#ifndef`/`#else`/`#endif` regions.

use crate::Defines;
use regex::Regex;
use std::ops::RangeInclusive;
use std::sync::LazyLock;

/// A closed conditional region, in zero-based line numbers.
///
/// The directive lines themselves sit at `start_line` and `end_line`; only
/// the lines strictly between them are content.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConditionalBlock {
    pub start_line: usize,
    pub end_line: usize,
    pub is_active: bool,
}

impl ConditionalBlock {
    pub fn content_lines(&self) -> Option<RangeInclusive<usize>> {
        let content_start = self.start_line + 1;
        let content_end = self.end_line.checked_sub(1)?;
        (content_start <= content_end).then_some(content_start..=content_end)
    }
}

/// Per-line flags, indexed by zero-based line number; `true` marks a line
/// inside a disabled region.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct InactiveLines {
    flags: Vec<bool>,
}

impl InactiveLines {
    pub fn is_inactive(&self, line: usize) -> bool {
        self.flags.get(line).copied().unwrap_or(false)
    }

    pub fn line_count(&self) -> usize {
        self.flags.len()
    }

    pub fn as_slice(&self) -> &[bool] {
        &self.flags
    }

    pub fn inactive_lines(&self) -> impl Iterator<Item = usize> + '_ {
        self.flags
            .iter()
            .enumerate()
            .filter_map(|(line, inactive)| inactive.then_some(line))
    }
}

impl From<Vec<bool>> for InactiveLines {
    fn from(flags: Vec<bool>) -> Self {
        Self { flags }
    }
}

#[derive(Debug, Clone, Copy)]
struct Frame {
    start_line: usize,
    is_active: bool,
}

#[derive(Debug, PartialEq, Eq)]
enum Directive<'a> {
    IfDef(&'a str),
    IfNDef(&'a str),
    If(&'a str),
    Else,
    EndIf,
}

/// Flag every line that sits inside a disabled conditional region.
pub fn analyze(text: &str, defines: &Defines) -> InactiveLines {
    let line_count = text.split('\n').count();
    let mut flags = vec![false; line_count];

    for block in conditional_blocks(text, defines) {
        if block.is_active {
            continue;
        }
        if let Some(lines) = block.content_lines() {
            for line in lines {
                flags[line] = true;
            }
        }
    }

    InactiveLines { flags }
}

/// Every region closed by an `#else` or `#endif`, in closing order.
///
/// An `#else` closes the open region at the line before it and opens the
/// opposite branch with the inverted activity of the closed one. Regions still
/// open at the end of the text are dropped, and `#else`/`#endif` with nothing
/// open are ignored.
pub fn conditional_blocks(text: &str, defines: &Defines) -> Vec<ConditionalBlock> {
    let mut stack: Vec<Frame> = Vec::new();
    let mut blocks = Vec::new();

    for (line_no, raw_line) in text.split('\n').enumerate() {
        let line = raw_line.strip_suffix('\r').unwrap_or(raw_line);
        let Some(directive) = parse_directive(line) else {
            continue;
        };

        match directive {
            Directive::IfDef(name) => {
                push_frame(&mut stack, line_no, defines.is_defined(name));
            }
            Directive::IfNDef(name) => {
                push_frame(&mut stack, line_no, !defines.is_defined(name));
            }
            Directive::If(expr) => {
                push_frame(&mut stack, line_no, evaluate_condition(expr, defines));
            }
            Directive::Else => {
                let Some(frame) = stack.pop() else {
                    tracing::trace!(line = line_no, "#else without open conditional");
                    continue;
                };
                blocks.push(ConditionalBlock {
                    start_line: frame.start_line,
                    end_line: line_no - 1,
                    is_active: frame.is_active,
                });
                stack.push(Frame {
                    start_line: line_no,
                    is_active: !frame.is_active,
                });
            }
            Directive::EndIf => {
                let Some(frame) = stack.pop() else {
                    tracing::trace!(line = line_no, "#endif without open conditional");
                    continue;
                };
                blocks.push(ConditionalBlock {
                    start_line: frame.start_line,
                    end_line: line_no,
                    is_active: frame.is_active,
                });
            }
        }
    }

    if !stack.is_empty() {
        tracing::debug!(unclosed = stack.len(), "dropping unterminated conditionals");
    }

    blocks
}

fn push_frame(stack: &mut Vec<Frame>, line_no: usize, condition: bool) {
    let ancestors_active = stack.iter().all(|frame| frame.is_active);
    stack.push(Frame {
        start_line: line_no,
        is_active: condition && ancestors_active,
    });
}

fn parse_directive(line: &str) -> Option<Directive<'_>> {
    let rest = line.trim_start().strip_prefix('#')?.trim_start();
    let keyword_len = rest
        .find(|ch: char| !(ch.is_ascii_alphanumeric() || ch == '_'))
        .unwrap_or(rest.len());
    let (keyword, args) = rest.split_at(keyword_len);
    let args = strip_comment(args).trim();

    match keyword {
        "ifdef" => Some(Directive::IfDef(first_word(args))),
        "ifndef" => Some(Directive::IfNDef(first_word(args))),
        "if" => Some(Directive::If(args)),
        "else" => Some(Directive::Else),
        "endif" => Some(Directive::EndIf),
        _ => None,
    }
}

/// Drop a trailing `//` or `/* */` comment.
fn strip_comment(args: &str) -> &str {
    match [args.find("//"), args.find("/*")].into_iter().flatten().min() {
        Some(start) => &args[..start],
        None => args,
    }
}

fn first_word(args: &str) -> &str {
    args.split_whitespace().next().unwrap_or("")
}

static DEFINED: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^defined\s*\(\s*([A-Za-z_][A-Za-z0-9_]*)\s*\)$").expect("valid defined() pattern")
});

static NOT_DEFINED: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^!\s*defined\s*\(\s*([A-Za-z_][A-Za-z0-9_]*)\s*\)$")
        .expect("valid !defined() pattern")
});

/// `defined(X)` and `!defined(X)` are evaluated; any other expression is
/// assumed true.
fn evaluate_condition(expr: &str, defines: &Defines) -> bool {
    if let Some(captures) = DEFINED.captures(expr) {
        return defines.is_defined(&captures[1]);
    }
    if let Some(captures) = NOT_DEFINED.captures(expr) {
        return !defines.is_defined(&captures[1]);
    }
    true
}
