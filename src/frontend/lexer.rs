//! Tokenizer for the C-like subset accepted inside a scop region.

use super::ExtractError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Tok {
    Ident(String),
    Int(i64),
    /// Floating-point literal (kept as text).
    Float(String),
    /// String or character literal.
    Literal,
    Punct(&'static str),
}

impl std::fmt::Display for Tok {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Tok::Ident(name) => write!(f, "'{}'", name),
            Tok::Int(value) => write!(f, "'{}'", value),
            Tok::Float(text) => write!(f, "'{}'", text),
            Tok::Literal => write!(f, "literal"),
            Tok::Punct(p) => write!(f, "'{}'", p),
        }
    }
}

/// A token with its byte span in the source and its 1-based line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub tok: Tok,
    pub start: usize,
    pub end: usize,
    pub line: usize,
}

// Longest first.
const PUNCTS: &[&str] = &[
    "<<=", ">>=", "...", "->", "++", "--", "<=", ">=", "==", "!=", "&&", "||", "+=", "-=", "*=", "/=", "%=", "&=",
    "|=", "^=", "<<", ">>", "+", "-", "*", "/", "%", "<", ">", "=", "!", "&", "|", "^", "~", "?", ":", ";", ",",
    ".", "(", ")", "[", "]", "{", "}",
];

/// Splits `src` into tokens, skipping whitespace, comments and preprocessor lines.
///
/// `first_line` is the line number of the first byte of `src`.
pub fn tokenize(src: &str, first_line: usize) -> Result<Vec<Token>, ExtractError> {
    let bytes = src.as_bytes();
    let mut tokens = Vec::new();
    let mut pos = 0;
    let mut line = first_line;
    let mut line_start = true;

    while pos < bytes.len() {
        let c = bytes[pos];

        if c == b'\n' {
            line += 1;
            line_start = true;
            pos += 1;
            continue;
        }
        if c.is_ascii_whitespace() {
            pos += 1;
            continue;
        }
        if c == b'#' && line_start {
            while pos < bytes.len() && bytes[pos] != b'\n' {
                pos += 1;
            }
            continue;
        }
        line_start = false;

        if src[pos..].starts_with("//") {
            while pos < bytes.len() && bytes[pos] != b'\n' {
                pos += 1;
            }
            continue;
        }
        if src[pos..].starts_with("/*") {
            let end = src[pos + 2..]
                .find("*/")
                .map(|k| pos + 2 + k + 2)
                .ok_or(ExtractError::UnexpectedEof {
                    expected: "end of comment".to_string(),
                })?;
            line += src[pos..end].matches('\n').count();
            pos = end;
            continue;
        }

        let start = pos;
        let tok = if c.is_ascii_alphabetic() || c == b'_' {
            while pos < bytes.len() && (bytes[pos].is_ascii_alphanumeric() || bytes[pos] == b'_') {
                pos += 1;
            }
            Tok::Ident(src[start..pos].to_string())
        } else if c.is_ascii_digit() || (c == b'.' && bytes.get(pos + 1).is_some_and(|b| b.is_ascii_digit())) {
            pos = scan_number(bytes, pos);
            number(&src[start..pos], line)?
        } else if c == b'"' || c == b'\'' {
            pos = scan_quoted(bytes, pos, line)?;
            Tok::Literal
        } else {
            let p = PUNCTS
                .iter()
                .find(|p| src[pos..].starts_with(**p))
                .ok_or_else(|| ExtractError::BadChar {
                    line,
                    ch: src[pos..].chars().next().unwrap_or('?'),
                })?;
            pos += p.len();
            Tok::Punct(*p)
        };

        tokens.push(Token {
            tok,
            start,
            end: pos,
            line,
        });
    }

    Ok(tokens)
}

fn scan_number(bytes: &[u8], mut pos: usize) -> usize {
    while pos < bytes.len() {
        let b = bytes[pos];
        let exponent_sign =
            (b == b'+' || b == b'-') && pos > 0 && matches!(bytes[pos - 1], b'e' | b'E') && !is_hex(bytes, pos);
        if b.is_ascii_alphanumeric() || b == b'.' || exponent_sign {
            pos += 1;
        } else {
            break;
        }
    }
    pos
}

fn is_hex(bytes: &[u8], pos: usize) -> bool {
    let mut k = pos;
    while k > 0 && (bytes[k - 1].is_ascii_alphanumeric() || bytes[k - 1] == b'.') {
        k -= 1;
    }
    bytes[k..pos].starts_with(b"0x") || bytes[k..pos].starts_with(b"0X")
}

fn number(text: &str, line: usize) -> Result<Tok, ExtractError> {
    let lower = text.to_ascii_lowercase();
    if let Some(hex) = lower.strip_prefix("0x") {
        let digits = hex.trim_end_matches(&['u', 'l'][..]);
        return i64::from_str_radix(digits, 16)
            .map(Tok::Int)
            .map_err(|_| ExtractError::BadNumber {
                line,
                text: text.to_string(),
            });
    }
    if lower.contains(&['.', 'e'][..]) || lower.ends_with('f') {
        return Ok(Tok::Float(text.to_string()));
    }
    lower
        .trim_end_matches(&['u', 'l'][..])
        .parse::<i64>()
        .map(Tok::Int)
        .map_err(|_| ExtractError::BadNumber {
            line,
            text: text.to_string(),
        })
}

fn scan_quoted(bytes: &[u8], pos: usize, line: usize) -> Result<usize, ExtractError> {
    let quote = bytes[pos];
    let mut k = pos + 1;
    while k < bytes.len() {
        match bytes[k] {
            b'\\' => k += 2,
            b'\n' => break,
            b if b == quote => return Ok(k + 1),
            _ => k += 1,
        }
    }
    Err(ExtractError::Unexpected {
        line,
        expected: "closing quote".to_string(),
        found: "end of line".to_string(),
    })
}
