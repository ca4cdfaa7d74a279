//! FITS header value parsing and formatting.

use core::str;

/// A parsed FITS header value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// FITS logical value (`T` or `F`).
    Logical(bool),
    /// FITS integer value.
    Integer(i64),
    /// FITS floating-point value.
    Float(f64),
    /// FITS character string (content between single quotes).
    String(String),
}

/// Split a value field at the comment separator.
///
/// The FITS standard uses ` / ` (space-slash-space) but real-world files
/// omit the trailing space, so ` /` is accepted as well.
fn split_comment(field: &[u8]) -> (&[u8], Option<String>) {
    let len = field.len();
    let mut i = 0;
    while i + 1 < len {
        if field[i] == b' ' && field[i + 1] == b'/' {
            let value_part = &field[..i];
            // Skip the slash; also skip one optional space after it.
            let mut comment_start = i + 2;
            if comment_start < len && field[comment_start] == b' ' {
                comment_start += 1;
            }
            let comment = str::from_utf8(&field[comment_start..])
                .ok()
                .map(|s| s.trim_end())
                .filter(|s| !s.is_empty())
                .map(String::from);
            return (value_part, comment);
        }
        i += 1;
    }
    (field, None)
}

/// Parse a FITS character-string value.
///
/// String values begin with `'` at the first byte. Doubled single-quotes
/// inside the string represent a literal `'`. Everything after the closing
/// quote is whitespace or a comment separator.
fn parse_string(field: &[u8]) -> Option<(Value, Option<String>)> {
    if field.is_empty() || field[0] != b'\'' {
        return None;
    }

    let mut value = String::new();
    let mut i = 1;
    let len = field.len();

    loop {
        if i >= len {
            // Unterminated string, be lenient and accept what we have.
            break;
        }
        if field[i] == b'\'' {
            if i + 1 < len && field[i + 1] == b'\'' {
                value.push('\'');
                i += 2;
            } else {
                i += 1;
                break;
            }
        } else {
            value.push(field[i] as char);
            i += 1;
        }
    }

    // FITS pads strings to a minimum of 8 characters with trailing spaces.
    let trimmed = value.trim_end().to_string();
    let (_, comment) = split_comment(&field[i..]);
    Some((Value::String(trimmed), comment))
}

/// Parse a float string, handling FITS `D` exponent notation.
fn parse_float_str(s: &str) -> Option<f64> {
    let normalized = s.replace(['D', 'd'], "E");
    normalized.parse::<f64>().ok()
}

/// Parse a FITS header value from the value portion of a card.
///
/// Returns the parsed [`Value`] and an optional comment string. The caller
/// is responsible for checking the `= ` value indicator before calling.
pub fn parse_value(value_bytes: &[u8]) -> Option<(Value, Option<String>)> {
    if value_bytes.is_empty() {
        return None;
    }

    if value_bytes[0] == b'\'' {
        return parse_string(value_bytes);
    }

    let (val_part, comment) = split_comment(value_bytes);
    let val_text = str::from_utf8(val_part).ok()?.trim();
    if val_text.is_empty() {
        return None;
    }

    if val_text == "T" {
        return Some((Value::Logical(true), comment));
    }
    if val_text == "F" {
        return Some((Value::Logical(false), comment));
    }

    // Integer: no decimal point or exponent characters.
    if !val_text.contains(['.', 'E', 'e', 'D', 'd']) {
        if let Ok(n) = val_text.parse::<i64>() {
            return Some((Value::Integer(n), comment));
        }
    }

    if let Some(f) = parse_float_str(val_text) {
        return Some((Value::Float(f), comment));
    }

    None
}

/// Format a value as its compact FITS text representation.
///
/// Used for HIERARCH cards, where the value field is free-form rather than
/// fixed-column.
pub fn format_value_compact(value: &Value) -> String {
    match value {
        Value::Logical(b) => String::from(if *b { "T" } else { "F" }),
        Value::Integer(n) => format!("{n}"),
        Value::Float(f) => format_float(*f),
        Value::String(s) => format!("'{}'", s.replace('\'', "''")),
    }
}

/// Serialize a [`Value`] into a 70-byte field suitable for bytes 10..80 of
/// an 80-byte FITS card.
///
/// Numeric and logical values are right-justified in the first 20 bytes
/// (columns 11-30 of the card). String values start at byte 0 with a single
/// quote.
pub fn format_value(value: &Value) -> [u8; 70] {
    let mut buf = [b' '; 70];

    match value {
        Value::Logical(b) => {
            // Standard: logical value in column 30 = index 20 of value field.
            buf[19] = if *b { b'T' } else { b'F' };
        }
        Value::Integer(n) => {
            right_justify(format!("{n}").as_bytes(), &mut buf[..20]);
        }
        Value::Float(f) => {
            right_justify(format_float(*f).as_bytes(), &mut buf[..20]);
        }
        Value::String(s) => {
            write_string(s, &mut buf);
        }
    }

    buf
}

/// Right-justify `src` within `dest`, padding the left with spaces.
fn right_justify(src: &[u8], dest: &mut [u8]) {
    let len = src.len().min(dest.len());
    let start = dest.len() - len;
    dest[start..start + len].copy_from_slice(&src[..len]);
}

/// Format a float so that it fits in 20 characters, reducing precision as
/// needed.
fn format_float(f: f64) -> String {
    if f == 0.0 {
        return String::from("0.0");
    }
    let mut precision = 15usize;
    loop {
        let s = format!("{f:.precision$E}");
        if s.len() <= 20 || precision == 0 {
            return s;
        }
        precision -= 1;
    }
}

fn write_string(s: &str, buf: &mut [u8; 70]) {
    let mut pos = 0;
    buf[pos] = b'\'';
    pos += 1;

    for ch in s.bytes() {
        if pos >= 69 {
            break; // Leave room for closing quote.
        }
        if ch == b'\'' {
            if pos + 1 >= 69 {
                break;
            }
            buf[pos] = b'\'';
            buf[pos + 1] = b'\'';
            pos += 2;
        } else {
            buf[pos] = ch;
            pos += 1;
        }
    }

    // Pad to minimum 8 characters between quotes.
    while pos < 9 {
        buf[pos] = b' ';
        pos += 1;
    }

    if pos < 70 {
        buf[pos] = b'\'';
    }
}
