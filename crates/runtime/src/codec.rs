//! Byte codecs for the memory image.
//!
//! Little-endian, fixed per build. Two families, mirroring the split in the
//! wire format: the *atomic* codec handles fixed-width scalars that the hot
//! paths decode in place (`bool`, `u8`, `i32`, `u32`); the *raw* codec
//! handles wider scalars and length-prefixed aggregates (strings, `f32`
//! slices).
//!
//! Decoding from a short buffer is a programming error in the caller, not a
//! runtime condition: decoders panic rather than return a `Result`.

// Atomic codec.

pub fn encode_bool(v: bool) -> [u8; 1] {
    [u8::from(v)]
}

pub fn decode_bool(bytes: &[u8]) -> bool {
    bytes[0] != 0
}

pub fn encode_u8(v: u8) -> [u8; 1] {
    [v]
}

pub fn decode_u8(bytes: &[u8]) -> u8 {
    bytes[0]
}

pub fn encode_i32(v: i32) -> [u8; 4] {
    v.to_le_bytes()
}

pub fn decode_i32(bytes: &[u8]) -> i32 {
    i32::from_le_bytes(bytes[..4].try_into().expect("decode_i32: short buffer"))
}

pub fn encode_u32(v: u32) -> [u8; 4] {
    v.to_le_bytes()
}

pub fn decode_u32(bytes: &[u8]) -> u32 {
    u32::from_le_bytes(bytes[..4].try_into().expect("decode_u32: short buffer"))
}

// Raw codec.

pub fn encode_i64(v: i64) -> [u8; 8] {
    v.to_le_bytes()
}

pub fn decode_i64(bytes: &[u8]) -> i64 {
    i64::from_le_bytes(bytes[..8].try_into().expect("decode_i64: short buffer"))
}

pub fn encode_f32(v: f32) -> [u8; 4] {
    v.to_le_bytes()
}

pub fn decode_f32(bytes: &[u8]) -> f32 {
    f32::from_le_bytes(bytes[..4].try_into().expect("decode_f32: short buffer"))
}

pub fn encode_f64(v: f64) -> [u8; 8] {
    v.to_le_bytes()
}

pub fn decode_f64(bytes: &[u8]) -> f64 {
    f64::from_le_bytes(bytes[..8].try_into().expect("decode_f64: short buffer"))
}

/// Strings serialize as a 32-bit LE byte count followed by UTF-8.
pub fn encode_str(v: &str) -> Vec<u8> {
    let mut out = Vec::with_capacity(4 + v.len());
    out.extend_from_slice(&(v.len() as u32).to_le_bytes());
    out.extend_from_slice(v.as_bytes());
    out
}

pub fn decode_str(bytes: &[u8]) -> String {
    let len = decode_u32(bytes) as usize;
    let payload = &bytes[4..4 + len];
    String::from_utf8(payload.to_vec()).expect("decode_str: invalid utf-8")
}

/// `f32` slices serialize as a 32-bit LE element count followed by the
/// elements.
pub fn encode_f32_slice(v: &[f32]) -> Vec<u8> {
    let mut out = Vec::with_capacity(4 + v.len() * 4);
    out.extend_from_slice(&(v.len() as u32).to_le_bytes());
    for elem in v {
        out.extend_from_slice(&elem.to_le_bytes());
    }
    out
}

pub fn decode_f32_slice(bytes: &[u8]) -> Vec<f32> {
    let count = decode_u32(bytes) as usize;
    bytes[4..4 + count * 4]
        .chunks_exact(4)
        .map(|chunk| f32::from_le_bytes(chunk.try_into().expect("decode_f32_slice: short chunk")))
        .collect()
}
