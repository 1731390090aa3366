//! # Cryptographic Primitives
//!
//! Everything that touches key material or hashes flows through here:
//!
//! - **hash** — SHA-512Half, SHA-256, and the RIPEMD-160 account id hash.
//! - **base58** — Ripple-alphabet base58check for addresses and seeds.
//! - **keys** — family seeds, secp256k1 derivation, ECDSA signing.
//! - **secret** — the redacted string wrapper for secrets at rest.
//!
//! ## A note on "rolling your own crypto"
//!
//! We don't. The curve arithmetic is `k256`, the hashes are RustCrypto, and
//! the code below only arranges bytes the way the XRP Ledger expects them.
//! If you are tempted to optimize any of it, go read about timing attacks
//! first and come back when the urge has passed.

pub mod base58;
pub mod hash;
pub mod keys;
pub mod secret;

pub use hash::{account_id_hash, prefixed_hash, sha256, sha512_half};
pub use keys::{FamilySeed, KeyError, KeyPair, PrivateKey, PublicKey};
pub use secret::SecretString;
