//! ASCII hex to fixed-width binary fields and back.
//!
//! Decoding is all or nothing: the text must be exactly twice the field width
//! and made of hex digits only, otherwise no bytes are produced.

use crate::Error;

pub fn encode(bytes: &[u8]) -> String {
    hex::encode(bytes)
}

/// Decodes `text` into exactly `len` bytes. `field` names the argument in the
/// resulting [`Error::MalformedInput`].
pub fn decode(field: &'static str, text: &str, len: usize) -> Result<Vec<u8>, Error> {
    let mut out = vec![0u8; len];
    hex::decode_to_slice(text, &mut out).map_err(|source| Error::MalformedInput { field, source })?;
    Ok(out)
}

pub fn decode_array<const N: usize>(field: &'static str, text: &str) -> Result<[u8; N], Error> {
    let mut out = [0u8; N];
    hex::decode_to_slice(text, &mut out).map_err(|source| Error::MalformedInput { field, source })?;
    Ok(out)
}

pub fn decode_u8(field: &'static str, text: &str) -> Result<u8, Error> {
    decode_array::<1>(field, text).map(|[b]| b)
}
