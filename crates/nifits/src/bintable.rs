//! BINTABLE extension codec.
//!
//! Reads and writes the binary-table wire format: TFORMn field descriptors,
//! optional TDIMn cell shapes, and big-endian row-major heap-free payloads.
//!
//! Supported field types: `K` (64-bit int), `J` (32-bit int, widened on
//! read), `D` (64-bit float), `E` (32-bit float, widened on read), `M`
//! (complex with 64-bit components) and `A` (character). Variable-length
//! arrays are not supported.

use num_complex::Complex64;

use crate::endian::{read_f32_be, read_f64_be, read_i32_be, read_i64_be};
use crate::error::{Error, Result};
use crate::header::{Card, Header};
use crate::table::{Column, ColumnData, Table};
use crate::value::Value;

/// A parsed TFORM descriptor: repeat count and type letter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldForm {
    pub repeat: usize,
    pub kind: char,
}

impl FieldForm {
    /// Byte width of one field on disk.
    pub fn byte_width(&self) -> usize {
        let per_element = match self.kind {
            'K' | 'D' => 8,
            'J' | 'E' => 4,
            'M' => 16,
            'A' => 1,
            _ => 0,
        };
        self.repeat * per_element
    }
}

/// Parse a TFORM value such as `"12D"`, `"K"` or `"16A"`.
pub fn parse_tform(tform: &str) -> Result<FieldForm> {
    let tform = tform.trim();
    let split = tform
        .find(|c: char| !c.is_ascii_digit())
        .ok_or(Error::InvalidValue)?;
    let repeat = if split == 0 {
        1
    } else {
        tform[..split].parse::<usize>().map_err(|_| Error::InvalidValue)?
    };
    let kind = tform[split..].chars().next().ok_or(Error::InvalidValue)?;
    match kind {
        'K' | 'J' | 'D' | 'E' | 'M' | 'A' => Ok(FieldForm { repeat, kind }),
        other => Err(Error::UnsupportedExtension(format!(
            "TFORM type {other}"
        ))),
    }
}

/// Parse a TDIM value such as `"(3,5)"` into a row-major cell shape.
///
/// TDIM lists axes fastest-varying first; the returned shape is reversed so
/// the slowest axis comes first.
pub fn parse_tdim(tdim: &str) -> Result<Vec<usize>> {
    let inner = tdim
        .trim()
        .strip_prefix('(')
        .and_then(|s| s.strip_suffix(')'))
        .ok_or(Error::InvalidValue)?;
    let mut dims = Vec::new();
    for part in inner.split(',') {
        dims.push(part.trim().parse::<usize>().map_err(|_| Error::InvalidValue)?);
    }
    dims.reverse();
    Ok(dims)
}

/// Format a row-major cell shape as a TDIM value (fastest axis first).
pub fn format_tdim(cell_shape: &[usize]) -> String {
    let dims: Vec<String> = cell_shape.iter().rev().map(|d| d.to_string()).collect();
    format!("({})", dims.join(","))
}

struct FieldLayout {
    name: String,
    form: FieldForm,
    cell_shape: Vec<usize>,
    offset: usize,
}

fn read_layout(header: &Header) -> Result<(Vec<FieldLayout>, usize, usize)> {
    let nrows = header.require_int("NAXIS2")? as usize;
    let row_width = header.require_int("NAXIS1")? as usize;
    let tfields = header.require_int("TFIELDS")? as usize;

    let mut fields = Vec::with_capacity(tfields);
    let mut offset = 0;
    for i in 1..=tfields {
        let tform = header
            .str_value(&format!("TFORM{i}"))
            .ok_or(Error::MissingKeyword("TFORM"))?;
        let form = parse_tform(tform)?;
        let name = header
            .str_value(&format!("TTYPE{i}"))
            .unwrap_or("")
            .to_string();
        let cell_shape = match header.str_value(&format!("TDIM{i}")) {
            Some(tdim) => parse_tdim(tdim)?,
            // Without TDIM, a repeat count above 1 still means a 1-D cell
            // (except for text, where it is the field width).
            None if form.repeat > 1 && form.kind != 'A' => vec![form.repeat],
            None => Vec::new(),
        };
        if form.kind != 'A' && !cell_shape.is_empty() {
            let tdim_len: usize = cell_shape.iter().product();
            if tdim_len != form.repeat {
                return Err(Error::Structural(format!(
                    "TDIM{i} covers {tdim_len} elements, TFORM{i} repeat is {}",
                    form.repeat
                )));
            }
        }
        fields.push(FieldLayout {
            name,
            form,
            cell_shape,
            offset,
        });
        offset += form.byte_width();
    }

    if offset != row_width {
        return Err(Error::Structural(format!(
            "column widths sum to {offset} bytes, NAXIS1 is {row_width}"
        )));
    }

    Ok((fields, nrows, row_width))
}

/// Decode a BINTABLE payload using its header cards.
pub fn read_table(header: &Header, data: &[u8]) -> Result<Table> {
    let (fields, nrows, row_width) = read_layout(header)?;
    if data.len() < nrows * row_width {
        return Err(Error::UnexpectedEof);
    }

    let mut table = Table::new();
    for field in &fields {
        let repeat = field.form.repeat;
        let data_col = match field.form.kind {
            'K' => {
                let mut v = Vec::with_capacity(nrows * repeat);
                for row in 0..nrows {
                    let base = row * row_width + field.offset;
                    for k in 0..repeat {
                        v.push(read_i64_be(&data[base + 8 * k..]));
                    }
                }
                ColumnData::Int(v)
            }
            'J' => {
                let mut v = Vec::with_capacity(nrows * repeat);
                for row in 0..nrows {
                    let base = row * row_width + field.offset;
                    for k in 0..repeat {
                        v.push(read_i32_be(&data[base + 4 * k..]) as i64);
                    }
                }
                ColumnData::Int(v)
            }
            'D' => {
                let mut v = Vec::with_capacity(nrows * repeat);
                for row in 0..nrows {
                    let base = row * row_width + field.offset;
                    for k in 0..repeat {
                        v.push(read_f64_be(&data[base + 8 * k..]));
                    }
                }
                ColumnData::Float(v)
            }
            'E' => {
                let mut v = Vec::with_capacity(nrows * repeat);
                for row in 0..nrows {
                    let base = row * row_width + field.offset;
                    for k in 0..repeat {
                        v.push(read_f32_be(&data[base + 4 * k..]) as f64);
                    }
                }
                ColumnData::Float(v)
            }
            'M' => {
                let mut v = Vec::with_capacity(nrows * repeat);
                for row in 0..nrows {
                    let base = row * row_width + field.offset;
                    for k in 0..repeat {
                        let re = read_f64_be(&data[base + 16 * k..]);
                        let im = read_f64_be(&data[base + 16 * k + 8..]);
                        v.push(Complex64::new(re, im));
                    }
                }
                ColumnData::Complex(v)
            }
            'A' => {
                let mut values = Vec::with_capacity(nrows);
                for row in 0..nrows {
                    let base = row * row_width + field.offset;
                    let raw = &data[base..base + repeat];
                    let text: String = raw
                        .iter()
                        .map(|&b| if b == 0 { ' ' } else { b as char })
                        .collect();
                    values.push(text.trim_end().to_string());
                }
                ColumnData::Text {
                    width: repeat,
                    values,
                }
            }
            _ => unreachable!("parse_tform rejects other types"),
        };
        table.push_column(Column {
            name: field.name.clone(),
            cell_shape: field.cell_shape.clone(),
            data: data_col,
        })?;
    }

    Ok(table)
}

/// Effective on-disk field width for a text column.
fn text_width(width: usize, values: &[String]) -> usize {
    values
        .iter()
        .map(|s| s.len())
        .max()
        .unwrap_or(0)
        .max(width)
        .max(1)
}

fn column_byte_width(col: &Column) -> usize {
    match &col.data {
        ColumnData::Int(_) => 8 * col.cell_len(),
        ColumnData::Float(_) => 8 * col.cell_len(),
        ColumnData::Complex(_) => 16 * col.cell_len(),
        ColumnData::Text { width, values } => text_width(*width, values),
    }
}

fn column_tform(col: &Column) -> String {
    match &col.data {
        ColumnData::Int(_) => format!("{}K", col.cell_len()),
        ColumnData::Float(_) => format!("{}D", col.cell_len()),
        ColumnData::Complex(_) => format!("{}M", col.cell_len()),
        ColumnData::Text { width, values } => format!("{}A", text_width(*width, values)),
    }
}

/// Build the structural header cards for a table.
///
/// Produces XTENSION through TFIELDS plus per-column TFORM, TTYPE and
/// (for multi-dimensional cells) TDIM cards.
pub fn build_table_cards(table: &Table) -> Vec<Card> {
    let row_width: usize = table.columns().iter().map(column_byte_width).sum();

    let mut cards = vec![
        Card::with_comment(
            "XTENSION",
            Value::String(String::from("BINTABLE")),
            "binary table extension",
        ),
        Card::new("BITPIX", Value::Integer(8)),
        Card::new("NAXIS", Value::Integer(2)),
        Card::with_comment(
            "NAXIS1",
            Value::Integer(row_width as i64),
            "width of table in bytes",
        ),
        Card::with_comment(
            "NAXIS2",
            Value::Integer(table.nrows() as i64),
            "number of rows in table",
        ),
        Card::new("PCOUNT", Value::Integer(0)),
        Card::new("GCOUNT", Value::Integer(1)),
        Card::new("TFIELDS", Value::Integer(table.ncols() as i64)),
    ];

    for (i, col) in table.columns().iter().enumerate() {
        let n = i + 1;
        cards.push(Card::new(
            &format!("TFORM{n}"),
            Value::String(column_tform(col)),
        ));
        cards.push(Card::new(
            &format!("TTYPE{n}"),
            Value::String(col.name.clone()),
        ));
        if col.cell_shape.len() > 1 {
            cards.push(Card::new(
                &format!("TDIM{n}"),
                Value::String(format_tdim(&col.cell_shape)),
            ));
        }
    }

    cards
}

/// Encode a table payload (unpadded; block padding is applied by the caller).
pub fn serialize_table(table: &Table) -> Vec<u8> {
    let widths: Vec<usize> = table.columns().iter().map(column_byte_width).collect();
    let row_width: usize = widths.iter().sum();
    let mut out = vec![0u8; table.nrows() * row_width];

    let mut offset = 0;
    for (col, &width) in table.columns().iter().zip(&widths) {
        let cell_len = col.cell_len();
        match &col.data {
            ColumnData::Int(v) => {
                for row in 0..table.nrows() {
                    let base = row * row_width + offset;
                    for k in 0..cell_len {
                        out[base + 8 * k..base + 8 * k + 8]
                            .copy_from_slice(&v[row * cell_len + k].to_be_bytes());
                    }
                }
            }
            ColumnData::Float(v) => {
                for row in 0..table.nrows() {
                    let base = row * row_width + offset;
                    for k in 0..cell_len {
                        out[base + 8 * k..base + 8 * k + 8]
                            .copy_from_slice(&v[row * cell_len + k].to_be_bytes());
                    }
                }
            }
            ColumnData::Complex(v) => {
                for row in 0..table.nrows() {
                    let base = row * row_width + offset;
                    for k in 0..cell_len {
                        let z = v[row * cell_len + k];
                        out[base + 16 * k..base + 16 * k + 8]
                            .copy_from_slice(&z.re.to_be_bytes());
                        out[base + 16 * k + 8..base + 16 * k + 16]
                            .copy_from_slice(&z.im.to_be_bytes());
                    }
                }
            }
            ColumnData::Text { values, .. } => {
                for (row, value) in values.iter().enumerate() {
                    let base = row * row_width + offset;
                    let field = &mut out[base..base + width];
                    field.fill(b' ');
                    let bytes = value.as_bytes();
                    let len = bytes.len().min(width);
                    field[..len].copy_from_slice(&bytes[..len]);
                }
            }
        }
        offset += width;
    }

    out
}
