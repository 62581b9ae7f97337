//! Byte-level lexing shared by the statement splitter and the DDL parsers.
//!
//! Every offset reported here sits on an ASCII byte (a quote, a paren, a
//! semicolon, a newline), so slicing the original `&str` at those offsets is
//! always on a char boundary.

use std::fmt;

/// A quoted or commented span that was still open when the input ran out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpenSpan {
    /// `'...` or `E'...`
    StringLiteral,
    /// `"...`
    QuotedIdentifier,
    /// `/* ...`
    BlockComment,
    /// `$tag$ ...`
    DollarQuote,
}

impl fmt::Display for OpenSpan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OpenSpan::StringLiteral => write!(f, "string literal"),
            OpenSpan::QuotedIdentifier => write!(f, "quoted identifier"),
            OpenSpan::BlockComment => write!(f, "block comment"),
            OpenSpan::DollarQuote => write!(f, "dollar-quoted string"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum OpaqueKind {
    String,
    Identifier,
    Comment,
    DollarQuote,
}

/// A span whose contents never affect nesting or statement boundaries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Opaque {
    pub end: usize,
    pub kind: OpaqueKind,
}

#[inline]
pub(crate) fn is_ident_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_' || b == b'$' || b >= 0x80
}

/// If an opaque span (literal, quoted identifier, comment) starts at `i`,
/// return where it ends, or which kind of span was left open at end of input.
pub(crate) fn scan_opaque(bytes: &[u8], i: usize) -> Option<Result<Opaque, OpenSpan>> {
    let b = *bytes.get(i)?;
    match b {
        b'\'' => {
            // E'...' strings honour backslash escapes
            let escape_string = i > 0
                && matches!(bytes[i - 1], b'E' | b'e')
                && (i < 2 || !is_ident_byte(bytes[i - 2]));
            Some(
                scan_quoted(bytes, i, b'\'', escape_string)
                    .map(|end| Opaque {
                        end,
                        kind: OpaqueKind::String,
                    })
                    .ok_or(OpenSpan::StringLiteral),
            )
        }
        b'"' => Some(
            scan_quoted(bytes, i, b'"', false)
                .map(|end| Opaque {
                    end,
                    kind: OpaqueKind::Identifier,
                })
                .ok_or(OpenSpan::QuotedIdentifier),
        ),
        b'-' if bytes.get(i + 1) == Some(&b'-') => {
            let end = memchr::memchr(b'\n', &bytes[i..])
                .map(|p| i + p + 1)
                .unwrap_or(bytes.len());
            Some(Ok(Opaque {
                end,
                kind: OpaqueKind::Comment,
            }))
        }
        b'/' if bytes.get(i + 1) == Some(&b'*') => Some(
            scan_block_comment(bytes, i)
                .map(|end| Opaque {
                    end,
                    kind: OpaqueKind::Comment,
                })
                .ok_or(OpenSpan::BlockComment),
        ),
        b'$' => scan_dollar_quote(bytes, i),
        _ => None,
    }
}

/// Quoted run with doubled-quote escapes; returns the offset after the closing quote.
fn scan_quoted(bytes: &[u8], start: usize, quote: u8, backslash_escapes: bool) -> Option<usize> {
    let mut i = start + 1;
    while i < bytes.len() {
        let b = bytes[i];
        if backslash_escapes && b == b'\\' {
            i += 2;
            continue;
        }
        if b == quote {
            if bytes.get(i + 1) == Some(&quote) {
                i += 2;
                continue;
            }
            return Some(i + 1);
        }
        i += 1;
    }
    None
}

/// Block comments nest, as they do in PostgreSQL.
fn scan_block_comment(bytes: &[u8], start: usize) -> Option<usize> {
    let mut depth = 0usize;
    let mut i = start;
    while i + 1 < bytes.len() {
        if bytes[i] == b'/' && bytes[i + 1] == b'*' {
            depth += 1;
            i += 2;
        } else if bytes[i] == b'*' && bytes[i + 1] == b'/' {
            depth -= 1;
            i += 2;
            if depth == 0 {
                return Some(i);
            }
        } else {
            i += 1;
        }
    }
    None
}

fn scan_dollar_quote(bytes: &[u8], start: usize) -> Option<Result<Opaque, OpenSpan>> {
    // `$` inside an identifier (foo$bar) is not a quote
    if start > 0 && is_ident_byte(bytes[start - 1]) {
        return None;
    }

    let mut i = start + 1;
    while i < bytes.len() && (bytes[i].is_ascii_alphanumeric() || bytes[i] == b'_') {
        i += 1;
    }
    if bytes.get(i) != Some(&b'$') {
        return None;
    }
    // $1 is a positional parameter
    if i > start + 1 && bytes[start + 1].is_ascii_digit() {
        return None;
    }

    let tag = &bytes[start..=i];
    let body = i + 1;
    match memchr::memmem::find(&bytes[body..], tag) {
        Some(p) => Some(Ok(Opaque {
            end: body + p + tag.len(),
            kind: OpaqueKind::DollarQuote,
        })),
        None => Some(Err(OpenSpan::DollarQuote)),
    }
}

/// Find the end of the parenthesized group opening at `open`.
///
/// Returns the offset just past the matching `)` and whether it was found;
/// an unclosed group runs to end of input.
pub(crate) fn matching_paren(bytes: &[u8], open: usize) -> (usize, bool) {
    let mut depth = 0usize;
    let mut i = open;
    while i < bytes.len() {
        if let Some(span) = scan_opaque(bytes, i) {
            match span {
                Ok(o) => {
                    i = o.end;
                    continue;
                }
                Err(_) => return (bytes.len(), false),
            }
        }
        match bytes[i] {
            b'(' => depth += 1,
            b')' => {
                depth -= 1;
                if depth == 0 {
                    return (i + 1, true);
                }
            }
            _ => {}
        }
        i += 1;
    }
    (bytes.len(), false)
}

/// Split on commas that sit outside parentheses, literals and comments.
pub fn split_items(src: &str) -> Vec<&str> {
    let bytes = src.as_bytes();
    let mut items = Vec::new();
    let mut depth = 0usize;
    let mut start = 0;
    let mut i = 0;

    while i < bytes.len() {
        if let Some(span) = scan_opaque(bytes, i) {
            i = span.map(|o| o.end).unwrap_or(bytes.len());
            continue;
        }
        match bytes[i] {
            b'(' => depth += 1,
            b')' => depth = depth.saturating_sub(1),
            b',' if depth == 0 => {
                items.push(src[start..i].trim());
                start = i + 1;
            }
            _ => {}
        }
        i += 1;
    }
    items.push(src[start..].trim());

    items.retain(|s| !s.is_empty());
    items
}

/// Replace every comment with a single space, leaving literals untouched.
pub fn strip_comments(src: &str) -> String {
    let bytes = src.as_bytes();
    let mut out = String::with_capacity(src.len());
    let mut last = 0;
    let mut i = 0;

    while i < bytes.len() {
        match scan_opaque(bytes, i) {
            Some(Ok(o)) => {
                if o.kind == OpaqueKind::Comment {
                    out.push_str(&src[last..i]);
                    out.push(' ');
                    last = o.end;
                }
                i = o.end;
            }
            Some(Err(OpenSpan::BlockComment)) => {
                out.push_str(&src[last..i]);
                last = bytes.len();
                break;
            }
            Some(Err(_)) => break,
            None => i += 1,
        }
    }
    if last < bytes.len() {
        out.push_str(&src[last..]);
    }
    out
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum TokenKind {
    /// Bare word: keyword, unquoted identifier, number
    Word,
    /// `"Quoted"` identifier
    QuotedIdent,
    /// String or dollar-quoted literal
    Literal,
    /// A whole parenthesized group, parens included
    Group,
    /// Any other single character
    Punct,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Token<'a> {
    pub kind: TokenKind,
    pub text: &'a str,
    pub start: usize,
    pub end: usize,
}

impl<'a> Token<'a> {
    pub fn is_keyword(&self, kw: &str) -> bool {
        self.kind == TokenKind::Word && self.text.eq_ignore_ascii_case(kw)
    }

    pub fn is_punct(&self, c: char) -> bool {
        self.kind == TokenKind::Punct && self.text.starts_with(c)
    }

    /// Inner text of a group token, without the outer parentheses
    pub fn inner(&self) -> &'a str {
        let s = self.text.strip_prefix('(').unwrap_or(self.text);
        s.strip_suffix(')').unwrap_or(s)
    }

    /// Identifier value: unquoted words fold to lowercase, quoted ones keep case
    pub fn ident(&self) -> Option<String> {
        match self.kind {
            TokenKind::Word => Some(self.text.to_lowercase()),
            TokenKind::QuotedIdent => {
                let s = self.text.strip_prefix('"').unwrap_or(self.text);
                let s = s.strip_suffix('"').unwrap_or(s);
                Some(s.replace("\"\"", "\""))
            }
            _ => None,
        }
    }
}

/// Tokenize a statement fragment at the top nesting level.
///
/// Parenthesized groups come back as one `Group` token; comments are dropped.
pub(crate) fn tokenize(src: &str) -> Vec<Token<'_>> {
    let bytes = src.as_bytes();
    let mut tokens = Vec::new();
    let mut i = 0;

    while i < bytes.len() {
        let b = bytes[i];
        if b.is_ascii_whitespace() {
            i += 1;
            continue;
        }

        let start = i;

        if let Some(span) = scan_opaque(bytes, i) {
            let (end, kind) = match span {
                Ok(o) => (
                    o.end,
                    match o.kind {
                        OpaqueKind::Comment => None,
                        OpaqueKind::Identifier => Some(TokenKind::QuotedIdent),
                        OpaqueKind::String | OpaqueKind::DollarQuote => Some(TokenKind::Literal),
                    },
                ),
                Err(open) => (
                    bytes.len(),
                    match open {
                        OpenSpan::BlockComment => None,
                        OpenSpan::QuotedIdentifier => Some(TokenKind::QuotedIdent),
                        OpenSpan::StringLiteral | OpenSpan::DollarQuote => {
                            Some(TokenKind::Literal)
                        }
                    },
                ),
            };
            if let Some(kind) = kind {
                tokens.push(Token {
                    kind,
                    text: &src[start..end],
                    start,
                    end,
                });
            }
            i = end;
            continue;
        }

        if b == b'(' {
            let (end, _) = matching_paren(bytes, i);
            tokens.push(Token {
                kind: TokenKind::Group,
                text: &src[start..end],
                start,
                end,
            });
            i = end;
            continue;
        }

        if is_ident_byte(b) && b != b'$' {
            while i < bytes.len() && is_ident_byte(bytes[i]) {
                i += 1;
            }
            // E'...' escape string prefix belongs to the literal
            if src[start..i].eq_ignore_ascii_case("e") && bytes.get(i) == Some(&b'\'') {
                let end = match scan_opaque(bytes, i) {
                    Some(Ok(o)) => o.end,
                    _ => bytes.len(),
                };
                tokens.push(Token {
                    kind: TokenKind::Literal,
                    text: &src[start..end],
                    start,
                    end,
                });
                i = end;
                continue;
            }
            tokens.push(Token {
                kind: TokenKind::Word,
                text: &src[start..i],
                start,
                end: i,
            });
            continue;
        }

        let len = src[i..].chars().next().map(char::len_utf8).unwrap_or(1);
        i += len;
        tokens.push(Token {
            kind: TokenKind::Punct,
            text: &src[start..i],
            start,
            end: i,
        });
    }

    tokens
}

/// Parse a comma-separated identifier list such as the inside of `(a, "B", c)`.
pub fn parse_ident_list(src: &str) -> Vec<String> {
    split_items(src)
        .into_iter()
        .filter_map(|item| tokenize(item).first().and_then(|t| t.ident()))
        .collect()
}
