//! Minimal lexer for brace-family source files.
//!
//! Produces just enough structure to find documentation comments and scan
//! declaration headers: identifiers, literals, comments and single-character
//! punctuation. Every byte of the input belongs to exactly one token, and a
//! token never splits a multi-byte character.

use std::ops::Range;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    Whitespace,
    LineComment,
    BlockComment,
    /// `/** ... */`
    DocComment,
    Ident,
    Number,
    Str,
    Char,
    Punct(char),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub span: Range<usize>,
}

impl Token {
    pub fn text<'a>(&self, source: &'a str) -> &'a str {
        &source[self.span.clone()]
    }

    /// Whitespace and non-documentation comments
    pub fn is_trivia(&self) -> bool {
        matches!(
            self.kind,
            TokenKind::Whitespace | TokenKind::LineComment | TokenKind::BlockComment
        )
    }

    pub fn is_punct(&self, c: char) -> bool {
        self.kind == TokenKind::Punct(c)
    }
}

/// Split `source` into tokens.
pub fn tokenize(source: &str) -> Vec<Token> {
    let bytes = source.as_bytes();
    let mut tokens = Vec::new();
    let mut pos = 0;

    while pos < bytes.len() {
        let start = pos;
        let b = bytes[pos];
        let kind = match b {
            b' ' | b'\t' | b'\n' | b'\r' | 0x0c => {
                while pos < bytes.len() && matches!(bytes[pos], b' ' | b'\t' | b'\n' | b'\r' | 0x0c) {
                    pos += 1;
                }
                TokenKind::Whitespace
            }
            b'/' if bytes.get(pos + 1) == Some(&b'/') => {
                while pos < bytes.len() && bytes[pos] != b'\n' {
                    pos += 1;
                }
                TokenKind::LineComment
            }
            b'/' if bytes.get(pos + 1) == Some(&b'*') => {
                let is_doc = bytes.get(pos + 2) == Some(&b'*') && bytes.get(pos + 3) != Some(&b'/');
                pos = match find(bytes, pos + 2, b"*/") {
                    Some(end) => end + 2,
                    None => bytes.len(),
                };
                if is_doc {
                    TokenKind::DocComment
                } else {
                    TokenKind::BlockComment
                }
            }
            b'"' if bytes[pos..].starts_with(b"\"\"\"") => {
                pos = skip_quoted(bytes, pos + 3, b"\"\"\"", false);
                TokenKind::Str
            }
            b'"' => {
                pos = skip_quoted(bytes, pos + 1, b"\"", true);
                TokenKind::Str
            }
            b'\'' => {
                pos = skip_quoted(bytes, pos + 1, b"'", true);
                TokenKind::Char
            }
            b'0'..=b'9' => {
                while pos < bytes.len() && (bytes[pos].is_ascii_alphanumeric() || matches!(bytes[pos], b'_' | b'.')) {
                    pos += 1;
                }
                TokenKind::Number
            }
            _ if is_ident_byte(b) => {
                while pos < bytes.len() && (is_ident_byte(bytes[pos]) || bytes[pos].is_ascii_digit()) {
                    pos += 1;
                }
                TokenKind::Ident
            }
            _ => {
                pos += 1;
                TokenKind::Punct(b as char)
            }
        };
        tokens.push(Token {
            kind,
            span: start..pos,
        });
    }

    tokens
}

/// Identifier start bytes; every non-ASCII byte counts so multi-byte
/// identifiers stay in one token.
fn is_ident_byte(b: u8) -> bool {
    b.is_ascii_alphabetic() || b == b'_' || b == b'$' || b >= 0x80
}

fn find(bytes: &[u8], from: usize, needle: &[u8]) -> Option<usize> {
    if from > bytes.len() {
        return None;
    }
    bytes[from..]
        .windows(needle.len())
        .position(|window| window == needle)
        .map(|offset| from + offset)
}

/// Position just past the closing quote. Escapes are honoured; single-line
/// literals also stop at a newline so an unbalanced quote cannot swallow the
/// rest of the file.
fn skip_quoted(bytes: &[u8], mut pos: usize, close: &[u8], single_line: bool) -> usize {
    while pos < bytes.len() {
        if bytes[pos] == b'\\' {
            pos += 2;
            continue;
        }
        if single_line && bytes[pos] == b'\n' {
            return pos;
        }
        if bytes[pos..].starts_with(close) {
            return pos + close.len();
        }
        pos += 1;
    }
    bytes.len()
}

/// Whether `word` is shaped like an identifier
pub fn is_identifier(word: &str) -> bool {
    word.bytes().next().is_some_and(is_ident_byte)
}
