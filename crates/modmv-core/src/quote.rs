//! Go string literal quoting.
//!
//! Follows the escaping rules of Go's `strconv.Quote` and `strconv.Unquote` for the two
//! literal forms an import path may use: interpreted (`"..."`) and raw (`` `...` ``).
//! Printability is decided without Unicode tables, so code points that are unassigned in the
//! current Unicode version are written raw where `strconv.Quote` would escape them.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UnquoteError {
    #[error("literal is not quoted: {0}")]
    NotQuoted(String),
    #[error("invalid escape sequence `\\{0}`")]
    InvalidEscape(char),
    #[error("unterminated escape sequence")]
    UnterminatedEscape,
    #[error("unescaped quote or newline inside literal")]
    UnescapedQuote,
    #[error("literal does not decode to UTF-8")]
    InvalidUtf8,
}

/// Quote `s` as an interpreted Go string literal.
pub fn quote(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('"');
    for c in s.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            c if is_print(c) => out.push(c),
            '\u{07}' => out.push_str("\\a"),
            '\u{08}' => out.push_str("\\b"),
            '\u{0C}' => out.push_str("\\f"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            '\u{0B}' => out.push_str("\\v"),
            c if (c as u32) < 0x20 || c == '\u{7F}' => {
                out.push_str(&format!("\\x{:02x}", c as u32));
            }
            c if (c as u32) < 0x10000 => out.push_str(&format!("\\u{:04x}", c as u32)),
            c => out.push_str(&format!("\\U{:08x}", c as u32)),
        }
    }
    out.push('"');
    out
}

/// Decode an interpreted or raw Go string literal, quotes included.
pub fn unquote(literal: &str) -> Result<String, UnquoteError> {
    let not_quoted = || UnquoteError::NotQuoted(literal.to_string());
    if literal.len() < 2 {
        return Err(not_quoted());
    }

    if let Some(body) = literal
        .strip_prefix('`')
        .and_then(|rest| rest.strip_suffix('`'))
    {
        if body.contains('`') {
            return Err(UnquoteError::UnescapedQuote);
        }
        return Ok(body.replace('\r', ""));
    }

    let body = literal
        .strip_prefix('"')
        .and_then(|rest| rest.strip_suffix('"'))
        .ok_or_else(not_quoted)?;

    let mut bytes: Vec<u8> = Vec::with_capacity(body.len());
    let mut chars = body.chars();
    while let Some(c) = chars.next() {
        match c {
            '"' | '\n' => return Err(UnquoteError::UnescapedQuote),
            '\\' => {
                let esc = chars.next().ok_or(UnquoteError::UnterminatedEscape)?;
                match esc {
                    'a' => bytes.push(0x07),
                    'b' => bytes.push(0x08),
                    'f' => bytes.push(0x0C),
                    'n' => bytes.push(b'\n'),
                    'r' => bytes.push(b'\r'),
                    't' => bytes.push(b'\t'),
                    'v' => bytes.push(0x0B),
                    '\\' => bytes.push(b'\\'),
                    '"' => bytes.push(b'"'),
                    'x' => bytes.push(hex_value(&mut chars, 2)? as u8),
                    'u' | 'U' => {
                        let digits = if esc == 'u' { 4 } else { 8 };
                        let value = hex_value(&mut chars, digits)?;
                        let decoded =
                            char::from_u32(value).ok_or(UnquoteError::InvalidEscape(esc))?;
                        push_char(&mut bytes, decoded);
                    }
                    '0'..='7' => {
                        let mut value = esc.to_digit(8).unwrap_or_default();
                        for _ in 0..2 {
                            let digit = chars
                                .next()
                                .and_then(|d| d.to_digit(8))
                                .ok_or(UnquoteError::InvalidEscape(esc))?;
                            value = value * 8 + digit;
                        }
                        if value > 0xFF {
                            return Err(UnquoteError::InvalidEscape(esc));
                        }
                        bytes.push(value as u8);
                    }
                    other => return Err(UnquoteError::InvalidEscape(other)),
                }
            }
            c => push_char(&mut bytes, c),
        }
    }

    String::from_utf8(bytes).map_err(|_| UnquoteError::InvalidUtf8)
}

fn push_char(bytes: &mut Vec<u8>, c: char) {
    let mut buf = [0u8; 4];
    bytes.extend_from_slice(c.encode_utf8(&mut buf).as_bytes());
}

fn hex_value(chars: &mut std::str::Chars<'_>, digits: usize) -> Result<u32, UnquoteError> {
    let mut value = 0u32;
    for _ in 0..digits {
        let c = chars.next().ok_or(UnquoteError::UnterminatedEscape)?;
        let digit = c.to_digit(16).ok_or(UnquoteError::InvalidEscape(c))?;
        value = (value << 4) | digit;
    }
    Ok(value)
}

/// Go's `strconv.IsPrint` minus the unassigned code points: graphic characters plus the
/// ASCII space. Private-use characters and noncharacters are not printable.
fn is_print(c: char) -> bool {
    if c == ' ' {
        return true;
    }
    if c.is_control() || c.is_whitespace() {
        return false;
    }
    !matches!(
        c,
        '\u{00AD}'
            | '\u{200B}'..='\u{200F}'
            | '\u{202A}'..='\u{202E}'
            | '\u{2060}'..='\u{2064}'
            | '\u{FEFF}'
            | '\u{E000}'..='\u{F8FF}'
            | '\u{FDD0}'..='\u{FDEF}'
            | '\u{F0000}'..='\u{10FFFF}'
    ) && (c as u32) & 0xFFFE != 0xFFFE
}
