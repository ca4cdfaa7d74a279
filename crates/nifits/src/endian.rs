//! Big-endian byte conversion for FITS data.
//!
//! FITS stores all binary data in big-endian (most-significant byte first)
//! format. This module provides single-value readers and writers plus bulk
//! conversion routines for f64 data segments.

/// Read a big-endian `i64` from the first 8 bytes of the slice.
#[inline]
pub fn read_i64_be(buf: &[u8]) -> i64 {
    i64::from_be_bytes([
        buf[0], buf[1], buf[2], buf[3], buf[4], buf[5], buf[6], buf[7],
    ])
}

/// Read a big-endian `i32` from the first 4 bytes of the slice.
#[inline]
pub fn read_i32_be(buf: &[u8]) -> i32 {
    i32::from_be_bytes([buf[0], buf[1], buf[2], buf[3]])
}

/// Read a big-endian `f32` (IEEE 754) from the first 4 bytes of the slice.
#[inline]
pub fn read_f32_be(buf: &[u8]) -> f32 {
    f32::from_be_bytes([buf[0], buf[1], buf[2], buf[3]])
}

/// Read a big-endian `f64` (IEEE 754) from the first 8 bytes of the slice.
#[inline]
pub fn read_f64_be(buf: &[u8]) -> f64 {
    f64::from_be_bytes([
        buf[0], buf[1], buf[2], buf[3], buf[4], buf[5], buf[6], buf[7],
    ])
}

/// Write an `i64` in big-endian format into the first 8 bytes of the slice.
#[inline]
pub fn write_i64_be(buf: &mut [u8], val: i64) {
    buf[..8].copy_from_slice(&val.to_be_bytes());
}

/// Write an `f64` in big-endian format into the first 8 bytes of the slice.
#[inline]
pub fn write_f64_be(buf: &mut [u8], val: f64) {
    buf[..8].copy_from_slice(&val.to_be_bytes());
}

/// Convert a big-endian byte buffer into a vector of native `f64`.
///
/// # Panics
///
/// Panics if `bytes.len()` is not a multiple of 8.
pub fn f64_vec_from_be(bytes: &[u8]) -> Vec<f64> {
    let raw: Vec<u64> = bytemuck::pod_collect_to_vec(bytes);
    raw.into_iter()
        .map(|v| f64::from_bits(u64::from_be(v)))
        .collect()
}

/// Convert a big-endian byte buffer into a vector of native `f32`.
///
/// # Panics
///
/// Panics if `bytes.len()` is not a multiple of 4.
pub fn f32_vec_from_be(bytes: &[u8]) -> Vec<f32> {
    let raw: Vec<u32> = bytemuck::pod_collect_to_vec(bytes);
    raw.into_iter()
        .map(|v| f32::from_bits(u32::from_be(v)))
        .collect()
}

/// Serialize a slice of native `f64` into big-endian bytes.
pub fn f64_vec_to_be(values: &[f64]) -> Vec<u8> {
    let mut out = Vec::with_capacity(values.len() * 8);
    for &v in values {
        out.extend_from_slice(&v.to_be_bytes());
    }
    out
}
