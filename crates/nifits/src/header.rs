//! FITS header card parsing and serialization.
//!
//! A header is a sequence of 80-byte cards terminated by an END card, padded
//! with spaces to a 2880-byte block boundary. Keyword names longer than
//! eight characters are carried with the ESO HIERARCH convention.

use core::str;

use crate::block::{padded_byte_len, BLOCK_SIZE, CARD_SIZE, HEADER_PAD_BYTE};
use crate::error::{Error, Result};
use crate::value::{format_value, format_value_compact, parse_value, Value};

/// A single header card: keyword, optional value, optional comment.
///
/// Commentary cards (COMMENT, HISTORY, blank keyword) carry their text in
/// `comment` with `value` set to `None`.
#[derive(Debug, Clone, PartialEq)]
pub struct Card {
    /// Keyword name, trimmed. May exceed 8 characters (HIERARCH convention).
    pub keyword: String,
    pub value: Option<Value>,
    pub comment: Option<String>,
}

impl Card {
    /// Create a value card without a comment.
    pub fn new(keyword: &str, value: Value) -> Self {
        Card {
            keyword: keyword.to_string(),
            value: Some(value),
            comment: None,
        }
    }

    /// Create a value card with a comment.
    pub fn with_comment(keyword: &str, value: Value, comment: &str) -> Self {
        Card {
            keyword: keyword.to_string(),
            value: Some(value),
            comment: Some(comment.to_string()),
        }
    }
}

/// An ordered collection of header cards with keyed access.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Header {
    cards: Vec<Card>,
}

impl Header {
    pub fn new() -> Self {
        Header { cards: Vec::new() }
    }

    pub fn from_cards(cards: Vec<Card>) -> Self {
        Header { cards }
    }

    pub fn cards(&self) -> &[Card] {
        &self.cards
    }

    pub fn into_cards(self) -> Vec<Card> {
        self.cards
    }

    pub fn len(&self) -> usize {
        self.cards.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cards.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Card> {
        self.cards.iter()
    }

    /// First card with the given keyword, if any.
    pub fn get(&self, keyword: &str) -> Option<&Card> {
        self.cards.iter().find(|c| c.keyword == keyword)
    }

    pub fn contains(&self, keyword: &str) -> bool {
        self.get(keyword).is_some()
    }

    /// Value of the first card with the given keyword.
    pub fn value(&self, keyword: &str) -> Option<&Value> {
        self.get(keyword).and_then(|c| c.value.as_ref())
    }

    pub fn str_value(&self, keyword: &str) -> Option<&str> {
        match self.value(keyword) {
            Some(Value::String(s)) => Some(s),
            _ => None,
        }
    }

    /// Integer value of a keyword; accepts Integer cards only.
    pub fn int_value(&self, keyword: &str) -> Option<i64> {
        match self.value(keyword) {
            Some(Value::Integer(n)) => Some(*n),
            _ => None,
        }
    }

    /// Float value of a keyword; Integer cards are widened to f64.
    pub fn float_value(&self, keyword: &str) -> Option<f64> {
        match self.value(keyword) {
            Some(Value::Float(f)) => Some(*f),
            Some(Value::Integer(n)) => Some(*n as f64),
            _ => None,
        }
    }

    pub fn logical_value(&self, keyword: &str) -> Option<bool> {
        match self.value(keyword) {
            Some(Value::Logical(b)) => Some(*b),
            _ => None,
        }
    }

    /// Required-keyword variants that return an error when absent.
    pub fn require_int(&self, keyword: &'static str) -> Result<i64> {
        self.int_value(keyword)
            .ok_or(Error::MissingKeyword(keyword))
    }

    pub fn require_str(&self, keyword: &'static str) -> Result<&str> {
        self.str_value(keyword)
            .ok_or(Error::MissingKeyword(keyword))
    }

    /// Replace the value of an existing card in place, or append a new one.
    pub fn set(&mut self, keyword: &str, value: Value) {
        if let Some(card) = self.cards.iter_mut().find(|c| c.keyword == keyword) {
            card.value = Some(value);
        } else {
            self.cards.push(Card::new(keyword, value));
        }
    }

    pub fn push(&mut self, card: Card) {
        self.cards.push(card);
    }

    /// Remove every card with the given keyword.
    pub fn remove(&mut self, keyword: &str) {
        self.cards.retain(|c| c.keyword != keyword);
    }
}

/// Check a standard (non-HIERARCH) keyword against the FITS character set.
fn keyword_charset_ok(kw: &str) -> bool {
    kw.bytes()
        .all(|b| b.is_ascii_uppercase() || b.is_ascii_digit() || b == b'-' || b == b'_')
}

/// Parse one 80-byte card.
///
/// Returns `Ok(None)` for the END card and for all-blank padding cards.
pub fn parse_card(bytes: &[u8; CARD_SIZE]) -> Result<Option<Card>> {
    let keyword_raw = str::from_utf8(&bytes[..8])
        .map_err(|_| Error::InvalidKeyword)?
        .trim_end();

    if keyword_raw == "END" {
        return Ok(None);
    }

    // Commentary cards carry free text in bytes 8..80 with no value.
    if keyword_raw == "COMMENT" || keyword_raw == "HISTORY" || keyword_raw.is_empty() {
        let text = str::from_utf8(&bytes[8..])
            .map_err(|_| Error::InvalidValue)?
            .trim_end();
        if keyword_raw.is_empty() && text.is_empty() {
            return Ok(None);
        }
        return Ok(Some(Card {
            keyword: keyword_raw.to_string(),
            value: None,
            comment: Some(text.to_string()),
        }));
    }

    if keyword_raw == "HIERARCH" {
        return parse_hierarch_card(bytes).map(Some);
    }

    if !keyword_charset_ok(keyword_raw) {
        return Err(Error::InvalidKeyword);
    }

    // Value cards have the indicator "= " at bytes 8..10.
    if bytes[8] == b'=' && bytes[9] == b' ' {
        let (value, comment) =
            parse_value(&bytes[10..]).ok_or(Error::InvalidValue)?;
        return Ok(Some(Card {
            keyword: keyword_raw.to_string(),
            value: Some(value),
            comment,
        }));
    }

    // Keyword without value indicator: treat the rest as commentary text.
    let text = str::from_utf8(&bytes[8..])
        .map_err(|_| Error::InvalidValue)?
        .trim_end();
    Ok(Some(Card {
        keyword: keyword_raw.to_string(),
        value: None,
        comment: if text.is_empty() {
            None
        } else {
            Some(text.to_string())
        },
    }))
}

/// Parse a `HIERARCH <long keyword> = <value>` card.
fn parse_hierarch_card(bytes: &[u8; CARD_SIZE]) -> Result<Card> {
    let text = str::from_utf8(&bytes[8..]).map_err(|_| Error::InvalidValue)?;
    let eq = text.find('=').ok_or(Error::InvalidValue)?;
    let keyword = text[..eq].trim();
    if keyword.is_empty() {
        return Err(Error::InvalidKeyword);
    }

    let mut value_field = [b' '; 70];
    let value_text = text[eq + 1..].trim_start();
    let copy_len = value_text.len().min(70);
    value_field[..copy_len].copy_from_slice(&value_text.as_bytes()[..copy_len]);

    let (value, comment) = parse_value(&value_field).ok_or(Error::InvalidValue)?;
    Ok(Card {
        keyword: keyword.to_string(),
        value: Some(value),
        comment,
    })
}

/// Serialize one card to its 80-byte on-disk form.
pub fn format_card(card: &Card) -> [u8; CARD_SIZE] {
    let mut out = [b' '; CARD_SIZE];

    let value = match &card.value {
        Some(value) => value,
        None => {
            // Commentary card: keyword then free text from byte 8.
            let kw = card.keyword.as_bytes();
            let kw_len = kw.len().min(8);
            out[..kw_len].copy_from_slice(&kw[..kw_len]);
            if let Some(text) = &card.comment {
                let text = text.as_bytes();
                let len = text.len().min(CARD_SIZE - 8);
                out[8..8 + len].copy_from_slice(&text[..len]);
            }
            return out;
        }
    };

    if card.keyword.len() > 8 {
        // ESO HIERARCH convention for long keywords.
        let body = format!("HIERARCH {} = {}", card.keyword, format_value_compact(value));
        let bytes = body.as_bytes();
        let len = bytes.len().min(CARD_SIZE);
        out[..len].copy_from_slice(&bytes[..len]);
        return out;
    }

    let kw = card.keyword.as_bytes();
    out[..kw.len()].copy_from_slice(kw);
    out[8] = b'=';
    out[9] = b' ';
    out[10..80].copy_from_slice(&format_value(value));

    if let Some(comment) = &card.comment {
        // Comment follows the value field after " / ".
        let value_end = 10 + trimmed_value_width(&out[10..80]);
        if value_end + 3 < CARD_SIZE {
            out[value_end + 1] = b'/';
            let text = comment.as_bytes();
            let avail = CARD_SIZE - (value_end + 3);
            let len = text.len().min(avail);
            out[value_end + 3..value_end + 3 + len].copy_from_slice(&text[..len]);
        }
    }

    out
}

/// Width of the used portion of a value field (fixed 20 columns for
/// numeric/logical values, through the closing quote for strings).
fn trimmed_value_width(field: &[u8]) -> usize {
    if field[0] == b'\'' {
        let mut i = 1;
        while i < field.len() {
            if field[i] == b'\'' {
                if i + 1 < field.len() && field[i + 1] == b'\'' {
                    i += 2;
                    continue;
                }
                return i + 1;
            }
            i += 1;
        }
        field.len()
    } else {
        20
    }
}

/// Parse header blocks starting at the beginning of `data`.
///
/// Reads whole 2880-byte blocks until the END card. Returns the cards
/// (END excluded, blank padding dropped) and the number of bytes consumed.
pub fn parse_header_blocks(data: &[u8]) -> Result<(Vec<Card>, usize)> {
    let mut cards = Vec::new();
    let mut offset = 0;

    loop {
        if offset + BLOCK_SIZE > data.len() {
            return Err(Error::UnexpectedEof);
        }
        let block = &data[offset..offset + BLOCK_SIZE];
        offset += BLOCK_SIZE;

        let mut found_end = false;
        for card_bytes in block.chunks_exact(CARD_SIZE) {
            let mut arr = [0u8; CARD_SIZE];
            arr.copy_from_slice(card_bytes);
            if &arr[..3] == b"END" && arr[3..].iter().all(|&b| b == b' ') {
                found_end = true;
                break;
            }
            if let Some(card) = parse_card(&arr)? {
                cards.push(card);
            }
        }

        if found_end {
            return Ok((cards, offset));
        }
    }
}

/// Serialize cards plus END, padded with spaces to a block boundary.
pub fn serialize_header(cards: &[Card]) -> Vec<u8> {
    let raw_len = (cards.len() + 1) * CARD_SIZE;
    let mut out = Vec::with_capacity(padded_byte_len(raw_len));

    for card in cards {
        out.extend_from_slice(&format_card(card));
    }

    let mut end = [HEADER_PAD_BYTE; CARD_SIZE];
    end[..3].copy_from_slice(b"END");
    out.extend_from_slice(&end);

    out.resize(padded_byte_len(out.len()), HEADER_PAD_BYTE);
    out
}
