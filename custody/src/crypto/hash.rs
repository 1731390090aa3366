//! # Hashing Utilities
//!
//! The XRP Ledger uses exactly three hash constructions, and this module
//! exposes exactly three (plus the prefixed convenience wrapper):
//!
//! - **SHA-512Half** — the first 256 bits of SHA-512. Key derivation,
//!   signing digests, and transaction ids all go through it. Truncated
//!   SHA-512 is faster than SHA-256 on 64-bit hardware and immune to length
//!   extension, which is why the ledger picked it.
//!
//! - **SHA-256** — the inner half of the account id hash.
//!
//! - **RIPEMD-160(SHA-256(x))** — the account id hash itself, the same
//!   construction Bitcoin uses for `HASH160`.
//!
//! Base58check checksums use double SHA-256 too, but `bs58` handles those
//! internally.

use ripemd::Ripemd160;
use sha2::{Digest, Sha256, Sha512};

/// Compute the SHA-256 hash of the input data.
pub fn sha256(data: &[u8]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(data);
    let mut output = [0u8; 32];
    output.copy_from_slice(&hasher.finalize());
    output
}

/// First 32 bytes of the SHA-512 digest of the concatenated inputs.
///
/// Takes a slice of parts so callers can hash `seed || counter` style
/// inputs without building an intermediate buffer that would then need
/// zeroizing.
pub fn sha512_half(parts: &[&[u8]]) -> [u8; 32] {
    let mut hasher = Sha512::new();
    for part in parts {
        hasher.update(part);
    }
    let digest = hasher.finalize();
    let mut output = [0u8; 32];
    output.copy_from_slice(&digest[..32]);
    output
}

/// SHA-512Half over a 4-byte ledger hash prefix followed by `data`.
///
/// ```
/// use xrpl_custody::config::HASH_PREFIX_TX_ID;
/// use xrpl_custody::crypto::hash::{prefixed_hash, sha512_half};
///
/// let blob = [0x12, 0x00, 0x00];
/// assert_eq!(
///     prefixed_hash(HASH_PREFIX_TX_ID, &blob),
///     sha512_half(&[&HASH_PREFIX_TX_ID, &blob]),
/// );
/// ```
pub fn prefixed_hash(prefix: [u8; 4], data: &[u8]) -> [u8; 32] {
    sha512_half(&[&prefix, data])
}

/// RIPEMD-160 of SHA-256: the account id of a public key.
pub fn account_id_hash(public_key: &[u8]) -> [u8; 20] {
    let inner = sha256(public_key);
    let mut hasher = Ripemd160::new();
    hasher.update(inner);
    let mut output = [0u8; 20];
    output.copy_from_slice(&hasher.finalize());
    output
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sha256_known_vector() {
        // SHA-256("abc")
        assert_eq!(
            hex::encode(sha256(b"abc")),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn sha512_half_is_prefix_of_sha512() {
        // SHA-512("abc") starts with ddaf35a1...
        let half = sha512_half(&[b"abc"]);
        assert_eq!(
            hex::encode(half),
            "ddaf35a193617abacc417349ae20413112e6fa4e89a97ea20a9eeee64b55d39a"
        );
    }

    #[test]
    fn sha512_half_parts_equal_concatenation() {
        assert_eq!(sha512_half(&[b"ab", b"c"]), sha512_half(&[b"abc"]));
        assert_eq!(sha512_half(&[b"", b"abc", b""]), sha512_half(&[b"abc"]));
    }

    #[test]
    fn account_id_hash_length_and_determinism() {
        let pk = [0x02u8; 33];
        let a = account_id_hash(&pk);
        let b = account_id_hash(&pk);
        assert_eq!(a, b);
        assert_ne!(a, account_id_hash(&[0x03u8; 33]));
    }

    #[test]
    fn prefixed_hash_depends_on_prefix() {
        let data = b"payload";
        assert_ne!(
            prefixed_hash(crate::config::HASH_PREFIX_TX_SIGN, data),
            prefixed_hash(crate::config::HASH_PREFIX_TX_ID, data)
        );
    }
}
