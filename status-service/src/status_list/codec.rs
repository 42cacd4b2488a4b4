//! # Bitstring Codec
//!
//! Packs a status bitstring 8 bits per byte (index 0 is the least
//! significant bit of byte 0), compresses it with gzip and encodes the
//! result for transport as hex, base64 or unpadded base64url.
//!
//! The compression and transport layers are exposed separately so that the
//! cipher can sit between them when a list is published encrypted.

use std::io::{Read, Write};

use base64::engine::general_purpose::{STANDARD, URL_SAFE_NO_PAD};
use base64::Engine;
use bitvec::order::Lsb0;
use bitvec::slice::BitSlice;
use bitvec::vec::BitVec;
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use sha2::{Digest, Sha256};
use tracing::debug;

use shared::constants::MAX_STATUS_LIST_LENGTH;
use shared::error::{StatusError, StatusResult};
use shared::types::Encoding;

/// Bit storage used by every status list
pub type Bits = BitVec<u8, Lsb0>;

/// Upper bound on decompressed size, in bytes
const MAX_PACKED_BYTES: usize = MAX_STATUS_LIST_LENGTH / 8 + 1;

/// Pack, compress and transport-encode a bitstring
pub fn encode(bits: &BitSlice<u8, Lsb0>, encoding: Encoding) -> StatusResult<String> {
    let compressed = compress(bits)?;
    Ok(to_transport(&compressed, encoding))
}

/// Inverse of [`encode`]. The returned length is byte-aligned.
pub fn decode(payload: &str, encoding: Encoding) -> StatusResult<Bits> {
    let compressed = from_transport(payload, encoding)?;
    decompress(&compressed)
}

/// Decode and truncate to exactly `length` bits
pub fn decode_exact(payload: &str, encoding: Encoding, length: usize) -> StatusResult<Bits> {
    let bits = decode(payload, encoding)?;
    truncate(bits, length)
}

/// Truncate a byte-aligned bitstring to its declared length
pub fn truncate(mut bits: Bits, length: usize) -> StatusResult<Bits> {
    if bits.len() < length {
        return Err(StatusError::DecodingError(format!(
            "payload carries {} bits, expected at least {length}",
            bits.len()
        )));
    }
    bits.truncate(length);
    Ok(bits)
}

/// Pack bits into bytes and gzip them
pub fn compress(bits: &BitSlice<u8, Lsb0>) -> StatusResult<Vec<u8>> {
    let mut packed = Bits::from_bitslice(bits);
    packed.set_uninitialized(false);
    let raw = packed.into_vec();

    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder
        .write_all(&raw)
        .map_err(|e| StatusError::EncodingError(e.to_string()))?;
    let compressed = encoder
        .finish()
        .map_err(|e| StatusError::EncodingError(e.to_string()))?;

    debug!(
        bits = bits.len(),
        packed_bytes = raw.len(),
        compressed_bytes = compressed.len(),
        "Compressed status bitstring"
    );

    Ok(compressed)
}

/// Gunzip and unpack bytes into bits
pub fn decompress(compressed: &[u8]) -> StatusResult<Bits> {
    let mut raw = Vec::new();
    GzDecoder::new(compressed)
        .take(MAX_PACKED_BYTES as u64 + 1)
        .read_to_end(&mut raw)
        .map_err(|e| StatusError::DecodingError(format!("corrupt gzip stream: {e}")))?;

    if raw.is_empty() {
        return Err(StatusError::DecodingError("empty bitstring".into()));
    }
    if raw.len() > MAX_PACKED_BYTES {
        return Err(StatusError::DecodingError(format!(
            "bitstring exceeds {MAX_STATUS_LIST_LENGTH} bits"
        )));
    }

    Ok(Bits::from_vec(raw))
}

/// Encode bytes with the transport encoding
pub fn to_transport(bytes: &[u8], encoding: Encoding) -> String {
    match encoding {
        Encoding::Hex => hex::encode(bytes),
        Encoding::Base64 => STANDARD.encode(bytes),
        Encoding::Base64Url => URL_SAFE_NO_PAD.encode(bytes),
    }
}

/// Decode bytes from the transport encoding
pub fn from_transport(payload: &str, encoding: Encoding) -> StatusResult<Vec<u8>> {
    let payload = payload.trim();
    let bytes = match encoding {
        Encoding::Hex => hex::decode(payload.strip_prefix("0x").unwrap_or(payload))?,
        Encoding::Base64 => STANDARD.decode(payload)?,
        Encoding::Base64Url => URL_SAFE_NO_PAD.decode(payload.trim_end_matches('='))?,
    };
    Ok(bytes)
}

/// SHA-256 (hex) of the transport-decoded payload
pub fn checksum(payload: &str, encoding: Encoding) -> StatusResult<String> {
    let bytes = from_transport(payload, encoding)?;
    Ok(hex::encode(Sha256::digest(&bytes)))
}
