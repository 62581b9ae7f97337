//! Statement splitting and classification for PostgreSQL schema dumps.

mod lexer;

pub use lexer::{parse_ident_list, split_items, strip_comments, OpenSpan};
pub(crate) use lexer::{tokenize, Token, TokenKind};

use lexer::scan_opaque;
use once_cell::sync::Lazy;
use regex::Regex;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatementType {
    Unknown,
    CreateTable,
    AlterTable,
}

static CREATE_TABLE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)^\s*CREATE\s+(?:(?:GLOBAL|LOCAL)\s+)?(?:(?:TEMP|TEMPORARY|UNLOGGED)\s+)?TABLE\b",
    )
    .unwrap()
});

static ALTER_TABLE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^\s*ALTER\s+TABLE\b").unwrap());

impl StatementType {
    /// Classify a statement whose comments have already been stripped.
    pub fn classify(stmt: &str) -> Self {
        if CREATE_TABLE_RE.is_match(stmt) {
            StatementType::CreateTable
        } else if ALTER_TABLE_RE.is_match(stmt) {
            StatementType::AlterTable
        } else {
            StatementType::Unknown
        }
    }
}

/// Lazily splits dump text into statements at top-level semicolons.
///
/// Literals, quoted identifiers, comments and dollar-quoted bodies are opaque,
/// and a `;` inside parentheses never ends a statement. Each yielded slice
/// includes its terminating `;` (the trailing statement at end of input may
/// have none). Statements made only of whitespace and comments are skipped.
pub struct Splitter<'a> {
    input: &'a str,
    pos: usize,
    unterminated: Option<OpenSpan>,
}

impl<'a> Splitter<'a> {
    pub fn new(input: &'a str) -> Self {
        Self {
            input,
            pos: 0,
            unterminated: None,
        }
    }

    /// The span left open at end of input, if splitting stopped inside one.
    pub fn unterminated(&self) -> Option<OpenSpan> {
        self.unterminated
    }

    fn read_statement(&mut self) -> Option<&'a str> {
        let bytes = self.input.as_bytes();
        let start = self.pos;
        let mut depth = 0usize;
        let mut i = start;

        while i < bytes.len() {
            if let Some(span) = scan_opaque(bytes, i) {
                match span {
                    Ok(o) => {
                        i = o.end;
                        continue;
                    }
                    Err(open) => {
                        self.unterminated = Some(open);
                        break;
                    }
                }
            }

            match bytes[i] {
                b'(' => depth += 1,
                b')' => depth = depth.saturating_sub(1),
                b';' if depth == 0 => {
                    self.pos = i + 1;
                    return Some(&self.input[start..=i]);
                }
                _ => {}
            }
            i += 1;
        }

        self.pos = bytes.len();
        if start < bytes.len() {
            Some(&self.input[start..])
        } else {
            None
        }
    }
}

impl<'a> Iterator for Splitter<'a> {
    type Item = &'a str;

    fn next(&mut self) -> Option<Self::Item> {
        while let Some(stmt) = self.read_statement() {
            if !is_blank_statement(stmt) {
                return Some(stmt);
            }
        }
        None
    }
}

fn is_blank_statement(stmt: &str) -> bool {
    strip_comments(stmt)
        .trim()
        .trim_end_matches(';')
        .trim()
        .is_empty()
}

/// Split a full dump into statements.
pub fn split_statements(input: &str) -> Vec<&str> {
    Splitter::new(input).collect()
}
