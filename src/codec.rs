//! Reversible line encoding for TTB payloads.
//!
//! A TTB file is a single physical line: top-level fields separated by `,`
//! and subfields separated by NUL. Line-based merge tools see such a file as
//! one opaque line, so [`encode`] breaks it after every separator and
//! [`decode`] puts it back together.
//!
//! ## Encoding
//!
//! The backslash is the only escape character:
//!
//! | raw byte(s)                       | encoded      |
//! |-----------------------------------|--------------|
//! | `\`                               | `\\`         |
//! | NUL separator                     | `\0` + LF    |
//! | `,` separator                     | `\,` + LF    |
//! | LF / CR inside a field            | `\n` / `\r`  |
//! | byte outside valid UTF-8          | `\xHH`       |
//! | `<` `=` `>` `\|` starting a line  | `\<` etc.    |
//!
//! Real line breaks in encoded text are layout only and are dropped on
//! decode. Every literal backslash is escaped, so the separator tokens can
//! never be confused with payload text, and no encoded line can start with
//! conflict-marker characters.

use crate::error::CodecError;
use std::fmt::Write;

const ESCAPE: char = '\\';

/// Encodes raw file bytes into mergeable multi-line text.
///
/// The result always ends with a line break.
pub fn encode(raw: &[u8]) -> String {
    let mut out = String::with_capacity(raw.len() + raw.len() / 2 + 1);
    let mut line_start = true;

    for chunk in raw.utf8_chunks() {
        for ch in chunk.valid().chars() {
            match ch {
                '\0' => out.push_str("\\0\n"),
                ',' => out.push_str("\\,\n"),
                '\\' => out.push_str("\\\\"),
                '\n' => out.push_str("\\n"),
                '\r' => out.push_str("\\r"),
                '<' | '=' | '>' | '|' if line_start => {
                    out.push(ESCAPE);
                    out.push(ch);
                }
                _ => out.push(ch),
            }
            line_start = matches!(ch, '\0' | ',');
        }
        for byte in chunk.invalid() {
            // Writing to a String cannot fail
            let _ = write!(out, "\\x{byte:02X}");
            line_start = false;
        }
    }

    if !out.ends_with('\n') {
        out.push('\n');
    }
    out
}

/// Decodes text produced by [`encode`] back into the original bytes.
pub fn decode(text: &str) -> Result<Vec<u8>, CodecError> {
    let mut out = Vec::with_capacity(text.len());
    let mut chars = text.char_indices();

    while let Some((offset, ch)) = chars.next() {
        match ch {
            '\n' | '\r' => {}
            ESCAPE => {
                let (_, escape) = chars
                    .next()
                    .ok_or(CodecError::TruncatedEscape { offset })?;
                match escape {
                    '\\' => out.push(b'\\'),
                    '0' => out.push(0),
                    ',' => out.push(b','),
                    'n' => out.push(b'\n'),
                    'r' => out.push(b'\r'),
                    '<' | '=' | '>' | '|' => out.push(escape as u8),
                    'x' => {
                        let high = hex_digit(chars.next(), offset)?;
                        let low = hex_digit(chars.next(), offset)?;
                        out.push(high << 4 | low);
                    }
                    other => {
                        return Err(CodecError::UnknownEscape {
                            escape: other,
                            offset,
                        });
                    }
                }
            }
            _ => {
                let mut buf = [0u8; 4];
                out.extend_from_slice(ch.encode_utf8(&mut buf).as_bytes());
            }
        }
    }

    Ok(out)
}

fn hex_digit(next: Option<(usize, char)>, offset: usize) -> Result<u8, CodecError> {
    let (_, ch) = next.ok_or(CodecError::TruncatedEscape { offset })?;
    ch.to_digit(16)
        .map(|d| d as u8)
        .ok_or(CodecError::InvalidByteEscape { offset })
}

/// Renders encoded text for people: separators become visible symbols and
/// layout line breaks are kept.
///
/// Falls back to the encoded text itself when it does not decode.
pub fn readable(text: &str) -> String {
    let mut lines = Vec::new();
    for line in text.lines() {
        match decode(line) {
            Ok(bytes) => lines.push(String::from_utf8_lossy(&bytes).replace('\0', "␀")),
            Err(_) => return text.trim_end_matches('\n').to_string(),
        }
    }
    lines.join("\n")
}
