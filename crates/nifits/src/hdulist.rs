//! Whole-file HDU sequencing.
//!
//! A FITS file is a primary HDU followed by any number of extension HDUs,
//! each a header plus an optional block-padded data segment. This module
//! walks the byte stream, dispatches payload decoding to the table and
//! image codecs, and serializes HDU sequences back to bytes.

use std::fs;
use std::io;
use std::path::Path;

use ndarray::ArrayD;

use crate::bintable;
use crate::block::{padded_byte_len, DATA_PAD_BYTE};
use crate::error::{Error, Result};
use crate::header::{parse_header_blocks, serialize_header, Header};
use crate::image;
use crate::table::Table;

/// Decoded data segment of an HDU.
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    Empty,
    Array(ArrayD<f64>),
    Table(Table),
}

/// One header-data unit.
#[derive(Debug, Clone, PartialEq)]
pub struct Hdu {
    pub header: Header,
    pub payload: Payload,
}

impl Hdu {
    /// EXTNAME keyword value, if present.
    pub fn extname(&self) -> Option<&str> {
        self.header.str_value("EXTNAME")
    }
}

/// Size in bytes of the data segment described by a header.
fn data_byte_len(header: &Header) -> Result<usize> {
    let naxis = header.require_int("NAXIS")?;
    if naxis == 0 {
        return Ok(0);
    }

    let mut n_elem: usize = 1;
    for i in 1..=naxis {
        let len = header
            .int_value(&format!("NAXIS{i}"))
            .ok_or(Error::MissingKeyword("NAXIS"))?;
        n_elem = n_elem.saturating_mul(len as usize);
    }

    let bitpix = header.require_int("BITPIX")?;
    let elem_bytes = (bitpix.unsigned_abs() / 8) as usize;
    let pcount = header.int_value("PCOUNT").unwrap_or(0) as usize;
    Ok(n_elem * elem_bytes + pcount)
}

fn decode_payload(header: &Header, data: &[u8]) -> Result<Payload> {
    if header.require_int("NAXIS")? == 0 {
        return Ok(Payload::Empty);
    }

    match header.str_value("XTENSION") {
        None => {
            // Primary HDU with data is treated as an image.
            Ok(Payload::Array(image::read_array(header, data)?))
        }
        Some("IMAGE") => Ok(Payload::Array(image::read_array(header, data)?)),
        Some("BINTABLE") => Ok(Payload::Table(bintable::read_table(header, data)?)),
        Some(other) => Err(Error::UnsupportedExtension(other.to_string())),
    }
}

/// Parse a complete FITS byte stream into its HDUs.
pub fn parse(data: &[u8]) -> Result<Vec<Hdu>> {
    let mut hdus = Vec::new();
    let mut offset = 0;

    while offset < data.len() {
        // Trailing padding after the last HDU is all spaces or zeros.
        if data[offset..]
            .iter()
            .all(|&b| b == b' ' || b == DATA_PAD_BYTE)
        {
            break;
        }

        let (cards, header_len) = parse_header_blocks(&data[offset..])?;
        let header = Header::from_cards(cards);
        offset += header_len;

        if hdus.is_empty() {
            if header.logical_value("SIMPLE") != Some(true) {
                return Err(Error::InvalidHeader("missing SIMPLE in primary header"));
            }
        } else if header.str_value("XTENSION").is_none() {
            return Err(Error::InvalidHeader("extension without XTENSION keyword"));
        }

        let data_len = data_byte_len(&header)?;
        if offset + data_len > data.len() {
            return Err(Error::UnexpectedEof);
        }
        let payload = decode_payload(&header, &data[offset..offset + data_len])?;
        offset += padded_byte_len(data_len);

        hdus.push(Hdu { header, payload });
    }

    if hdus.is_empty() {
        return Err(Error::UnexpectedEof);
    }
    Ok(hdus)
}

/// Serialize an HDU sequence to FITS bytes.
///
/// Headers are written as stored; callers are expected to keep structural
/// cards in sync with payloads (the extension encoders do this).
pub fn to_bytes(hdus: &[Hdu]) -> Result<Vec<u8>> {
    let mut out = Vec::new();
    for hdu in hdus {
        out.extend_from_slice(&serialize_header(hdu.header.cards()));
        let data = match &hdu.payload {
            Payload::Empty => Vec::new(),
            Payload::Array(array) => image::serialize_array(array),
            Payload::Table(table) => bintable::serialize_table(table),
        };
        let padded = padded_byte_len(data.len());
        out.extend_from_slice(&data);
        out.resize(out.len() + (padded - data.len()), DATA_PAD_BYTE);
    }
    Ok(out)
}

/// Read and parse a FITS file.
pub fn open<P: AsRef<Path>>(path: P) -> Result<Vec<Hdu>> {
    let data = fs::read(path)?;
    parse(&data)
}

/// Serialize HDUs and write them to a file.
///
/// Refuses to replace an existing file unless `overwrite` is set.
pub fn write<P: AsRef<Path>>(path: P, hdus: &[Hdu], overwrite: bool) -> Result<()> {
    let path = path.as_ref();
    if !overwrite && path.exists() {
        return Err(Error::Io(io::Error::new(
            io::ErrorKind::AlreadyExists,
            format!("{} already exists", path.display()),
        )));
    }
    let bytes = to_bytes(hdus)?;
    fs::write(path, bytes)?;
    Ok(())
}
