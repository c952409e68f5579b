//! Transfer codec between raw file bytes and the remote's base64 payloads.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;

use crate::error::Result;

/// Encode raw bytes for transport.
pub fn encode(data: &[u8]) -> String {
    STANDARD.encode(data)
}

/// Decode a transport payload. The remote wraps long payloads with newlines,
/// so all ASCII whitespace is dropped before decoding.
pub fn decode(text: &str) -> Result<Vec<u8>> {
    let compact: Vec<u8> = text
        .bytes()
        .filter(|b| !b.is_ascii_whitespace())
        .collect();
    Ok(STANDARD.decode(compact)?)
}
