//! IMAGE extension codec.
//!
//! Reads BITPIX -32 and -64 floating-point arrays (both decoded to `f64`)
//! and writes BITPIX -64. The FITS axis order is fastest-varying first, so
//! NAXISn keywords are the reverse of the in-memory row-major shape.

use ndarray::{ArrayD, IxDyn};

use crate::endian::{f32_vec_from_be, f64_vec_from_be, f64_vec_to_be};
use crate::error::{Error, Result};
use crate::header::{Card, Header};
use crate::value::Value;

/// Read the NAXISn keywords into a row-major shape.
fn read_shape(header: &Header) -> Result<Vec<usize>> {
    let naxis = header.require_int("NAXIS")? as usize;
    let mut shape = Vec::with_capacity(naxis);
    for i in 1..=naxis {
        let len = header
            .int_value(&format!("NAXIS{i}"))
            .ok_or(Error::MissingKeyword("NAXIS"))?;
        shape.push(len as usize);
    }
    shape.reverse();
    Ok(shape)
}

/// Decode an IMAGE payload into an f64 array using its header cards.
pub fn read_array(header: &Header, data: &[u8]) -> Result<ArrayD<f64>> {
    let bitpix = header.require_int("BITPIX")?;
    let shape = read_shape(header)?;
    let n_elem: usize = shape.iter().product();

    let values = match bitpix {
        -64 => {
            if data.len() < 8 * n_elem {
                return Err(Error::UnexpectedEof);
            }
            f64_vec_from_be(&data[..8 * n_elem])
        }
        -32 => {
            if data.len() < 4 * n_elem {
                return Err(Error::UnexpectedEof);
            }
            f32_vec_from_be(&data[..4 * n_elem])
                .into_iter()
                .map(f64::from)
                .collect()
        }
        other => return Err(Error::InvalidBitpix(other)),
    };

    ArrayD::from_shape_vec(IxDyn(&shape), values)
        .map_err(|e| Error::Structural(format!("image shape: {e}")))
}

/// Build the structural header cards for an f64 image of the given
/// row-major shape.
pub fn build_array_cards(shape: &[usize]) -> Vec<Card> {
    let mut cards = vec![
        Card::with_comment(
            "XTENSION",
            Value::String(String::from("IMAGE")),
            "image extension",
        ),
        Card::with_comment("BITPIX", Value::Integer(-64), "IEEE double precision"),
        Card::new("NAXIS", Value::Integer(shape.len() as i64)),
    ];
    for (i, &len) in shape.iter().rev().enumerate() {
        cards.push(Card::new(
            &format!("NAXIS{}", i + 1),
            Value::Integer(len as i64),
        ));
    }
    cards.push(Card::new("PCOUNT", Value::Integer(0)));
    cards.push(Card::new("GCOUNT", Value::Integer(1)));
    cards
}

/// Encode an f64 array payload (unpadded; block padding is applied by the
/// caller).
pub fn serialize_array(array: &ArrayD<f64>) -> Vec<u8> {
    // Logical (row-major) iteration order matches the on-disk layout
    // given the reversed NAXISn convention.
    let values: Vec<f64> = array.iter().copied().collect();
    f64_vec_to_be(&values)
}
