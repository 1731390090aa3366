//! Base58check in the Ripple alphabet.
//!
//! Same checksum scheme as Bitcoin (4 bytes of double SHA-256), different
//! alphabet, so `r` lands where Bitcoin has `1`. Every human-readable ledger
//! string we produce goes through [`encode_check`].

use thiserror::Error;
use zeroize::Zeroizing;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum Base58Error {
    #[error("empty input")]
    Empty,

    #[error("base58 decode failed: {0}")]
    Decode(String),

    #[error("unexpected version byte: expected {expected:#04x}, got {got:#04x}")]
    WrongVersion { expected: u8, got: u8 },

    #[error("unexpected payload length: expected {expected} bytes, got {got}")]
    WrongLength { expected: usize, got: usize },
}

/// Encode `payload` behind a version byte with a checksum.
pub fn encode_check(version: u8, payload: &[u8]) -> String {
    bs58::encode(payload)
        .with_alphabet(bs58::Alphabet::RIPPLE)
        .with_check_version(version)
        .into_string()
}

/// Decode a checksummed string, verify its version byte, and return the
/// payload (without the version byte). `expected_len` pins the payload size.
///
/// Seeds come through here too, so every buffer is wiped on drop.
pub fn decode_check(
    input: &str,
    version: u8,
    expected_len: usize,
) -> Result<Zeroizing<Vec<u8>>, Base58Error> {
    if input.is_empty() {
        return Err(Base58Error::Empty);
    }

    let decoded = Zeroizing::new(
        bs58::decode(input)
            .with_alphabet(bs58::Alphabet::RIPPLE)
            .with_check(None)
            .into_vec()
            .map_err(|e| Base58Error::Decode(e.to_string()))?,
    );

    let got = decoded.first().copied().ok_or(Base58Error::Empty)?;
    if got != version {
        return Err(Base58Error::WrongVersion {
            expected: version,
            got,
        });
    }

    let payload = &decoded[1..];
    if payload.len() != expected_len {
        return Err(Base58Error::WrongLength {
            expected: expected_len,
            got: payload.len(),
        });
    }
    Ok(Zeroizing::new(payload.to_vec()))
}
