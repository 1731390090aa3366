//! # Key Management
//!
//! secp256k1 key derivation and signing for custodied XRP Ledger accounts.
//!
//! Every custodied account starts life as a 16-byte **family seed**. From it
//! the ledger's derivation function produces a *root* generator and then the
//! first *account* key under that root:
//!
//! ```text
//! seed (16 bytes)
//!     -> SHA512Half(seed || i)                      first valid scalar: root_priv
//!     -> root_pub = compress(root_priv * G)
//!     -> SHA512Half(root_pub || 0u32 || j)          first valid scalar: tweak
//!     -> account_priv = root_priv + tweak (mod n)
//!     -> account_pub  = compress(account_priv * G)
//! ```
//!
//! "Valid" means `0 < k < n`. In practice the first counter always wins; the
//! loop exists because the ledger's reference implementation has one and we
//! must agree with it bit for bit.
//!
//! ## Security considerations
//!
//! - Seeds and private keys live in `Zeroizing` buffers and are wiped on drop,
//!   on every path, including `?` early returns.
//! - Neither type implements `Clone`, `Serialize`, or a leaking `Debug`.
//!   Writing key material anywhere should be a deliberate act.
//! - Signatures are RFC 6979 deterministic and low-S normalised, which the
//!   ledger requires (high-S signatures are malleable and rejected).

use crate::config::{ACCOUNT_KEY_INDEX, PUBLIC_KEY_LENGTH, SEED_LENGTH, VERSION_FAMILY_SEED};
use crate::crypto::base58::{self, Base58Error};
use crate::crypto::hash::sha512_half;
use crate::crypto::secret::SecretString;
use k256::ecdsa::signature::hazmat::{PrehashSigner, PrehashVerifier};
use k256::ecdsa::{Signature, SigningKey, VerifyingKey};
use k256::elliptic_curve::PrimeField;
use k256::{FieldBytes, Scalar};
use rand::rngs::OsRng;
use rand::RngCore;
use std::fmt;
use thiserror::Error;
use zeroize::{Zeroize, Zeroizing};

/// Errors that can occur during key operations.
///
/// Deliberately silent about the offending bytes.
#[derive(Debug, Error)]
pub enum KeyError {
    #[error("failed to read entropy from the OS: {0}")]
    Entropy(String),

    #[error("family seed must be {SEED_LENGTH} bytes, got {0}")]
    InvalidSeedLength(usize),

    #[error("malformed family seed: {0}")]
    InvalidSeed(#[source] Base58Error),

    #[error("invalid private key: not a valid secp256k1 scalar")]
    InvalidPrivateKey,

    #[error("invalid public key: not a compressed secp256k1 point")]
    InvalidPublicKey,

    #[error("key derivation exhausted its counter without a valid scalar")]
    DerivationExhausted,

    #[error("keypair validation failed: {0} does not match the secret")]
    KeypairMismatch(&'static str),

    #[error("ECDSA signing failed")]
    Signing,
}

// ---------------------------------------------------------------------------
// FamilySeed
// ---------------------------------------------------------------------------

/// The 16 bytes every custodied key pair is derived from.
pub struct FamilySeed {
    entropy: Zeroizing<[u8; SEED_LENGTH]>,
}

impl FamilySeed {
    /// Wrap caller-supplied entropy. Anything but exactly 16 bytes is refused.
    pub fn from_entropy(bytes: &[u8]) -> Result<Self, KeyError> {
        if bytes.len() != SEED_LENGTH {
            return Err(KeyError::InvalidSeedLength(bytes.len()));
        }
        let mut entropy = Zeroizing::new([0u8; SEED_LENGTH]);
        entropy.copy_from_slice(bytes);
        Ok(Self { entropy })
    }

    /// Fresh entropy from `OsRng`.
    pub fn generate() -> Result<Self, KeyError> {
        let mut entropy = Zeroizing::new([0u8; SEED_LENGTH]);
        OsRng
            .try_fill_bytes(entropy.as_mut())
            .map_err(|e| KeyError::Entropy(e.to_string()))?;
        Ok(Self { entropy })
    }

    /// Parse the recoverable `s...` secret format.
    pub fn from_encoded(secret: &str) -> Result<Self, KeyError> {
        let bytes = base58::decode_check(secret, VERSION_FAMILY_SEED, SEED_LENGTH)
            .map_err(KeyError::InvalidSeed)?;
        Self::from_entropy(&bytes)
    }

    /// Render the recoverable `s...` secret format.
    pub fn encode(&self) -> SecretString {
        SecretString::new(base58::encode_check(VERSION_FAMILY_SEED, self.entropy.as_ref()))
    }

    /// Run the ledger's secp256k1 derivation for account key index 0.
    ///
    /// Every intermediate scalar is wiped before this returns, on the error
    /// paths too.
    pub fn derive_keypair(&self) -> Result<KeyPair, KeyError> {
        let root = Zeroizing::new(derive_scalar(&[self.entropy.as_ref()])?);
        let root_public = public_key_of(&root)?;

        let index = ACCOUNT_KEY_INDEX.to_be_bytes();
        let tweak = Zeroizing::new(derive_scalar(&[root_public.as_bytes(), &index])?);

        let account = Zeroizing::new(*root + *tweak);
        if bool::from(account.is_zero()) {
            return Err(KeyError::InvalidPrivateKey);
        }

        let mut bytes = Zeroizing::new([0u8; 32]);
        let mut repr = account.to_bytes();
        bytes.copy_from_slice(&repr);
        repr.as_mut_slice().zeroize();

        let private = PrivateKey { bytes };
        let public = private.public_key()?;
        Ok(KeyPair { private, public })
    }

    #[cfg(test)]
    pub(crate) fn entropy_hex(&self) -> String {
        hex::encode_upper(&self.entropy[..])
    }
}

impl fmt::Debug for FamilySeed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("FamilySeed([REDACTED])")
    }
}

/// First `SHA512Half(parts || counter)` that is a valid non-zero scalar.
fn derive_scalar(parts: &[&[u8]]) -> Result<Scalar, KeyError> {
    for counter in 0..=u32::MAX {
        let counter_bytes = counter.to_be_bytes();
        let mut input: Vec<&[u8]> = parts.to_vec();
        input.push(&counter_bytes);

        let candidate = Zeroizing::new(sha512_half(&input));
        let mut repr = FieldBytes::default();
        repr.copy_from_slice(candidate.as_ref());
        let scalar: Option<Scalar> = Scalar::from_repr(repr).into();
        repr.as_mut_slice().zeroize();
        if let Some(scalar) = scalar {
            if !bool::from(scalar.is_zero()) {
                return Ok(scalar);
            }
        }
    }
    Err(KeyError::DerivationExhausted)
}

fn public_key_of(scalar: &Scalar) -> Result<PublicKey, KeyError> {
    let mut repr = scalar.to_bytes();
    let signing_key = SigningKey::from_bytes(&repr);
    repr.as_mut_slice().zeroize();
    let signing_key = signing_key.map_err(|_| KeyError::InvalidPrivateKey)?;
    PublicKey::from_bytes(signing_key.verifying_key().to_encoded_point(true).as_bytes())
}

// ---------------------------------------------------------------------------
// PrivateKey
// ---------------------------------------------------------------------------

/// A secp256k1 account private key.
///
/// The only things you can do with one: sign a digest, compute its public
/// key, render it for the persisted record, or zeroize it.
pub struct PrivateKey {
    bytes: Zeroizing<[u8; 32]>,
}

impl PrivateKey {
    /// Parse the hex form stored in account records.
    pub fn from_hex(encoded: &str) -> Result<Self, KeyError> {
        let decoded = Zeroizing::new(hex::decode(encoded).map_err(|_| KeyError::InvalidPrivateKey)?);
        if decoded.len() != 32 {
            return Err(KeyError::InvalidPrivateKey);
        }
        let mut bytes = Zeroizing::new([0u8; 32]);
        bytes.copy_from_slice(&decoded);
        SigningKey::from_slice(bytes.as_ref()).map_err(|_| KeyError::InvalidPrivateKey)?;
        Ok(Self { bytes })
    }

    /// Uppercase hex, wrapped so it cannot be logged by accident.
    pub fn to_hex(&self) -> SecretString {
        SecretString::new(hex::encode_upper(&self.bytes[..]))
    }

    pub fn public_key(&self) -> Result<PublicKey, KeyError> {
        let signing_key = self.signing_key()?;
        PublicKey::from_bytes(signing_key.verifying_key().to_encoded_point(true).as_bytes())
    }

    /// Sign a 32-byte prehashed digest. Returns a DER-encoded, low-S signature.
    pub fn sign_digest(&self, digest: &[u8; 32]) -> Result<Vec<u8>, KeyError> {
        let signing_key = self.signing_key()?;
        let signature: Signature = signing_key
            .sign_prehash(digest)
            .map_err(|_| KeyError::Signing)?;
        let signature = signature.normalize_s().unwrap_or(signature);
        Ok(signature.to_der().as_bytes().to_vec())
    }

    // `SigningKey` wipes itself on drop.
    fn signing_key(&self) -> Result<SigningKey, KeyError> {
        SigningKey::from_slice(self.bytes.as_ref()).map_err(|_| KeyError::InvalidPrivateKey)
    }
}

impl Zeroize for PrivateKey {
    fn zeroize(&mut self) {
        self.bytes.zeroize();
    }
}

impl fmt::Debug for PrivateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("PrivateKey([REDACTED])")
    }
}

// ---------------------------------------------------------------------------
// PublicKey
// ---------------------------------------------------------------------------

/// A compressed secp256k1 public key. Safe to share with the world; this is
/// what lands in a transaction's `SigningPubKey` field.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct PublicKey([u8; PUBLIC_KEY_LENGTH]);

impl PublicKey {
    /// Accepts only 33-byte compressed points that lie on the curve.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, KeyError> {
        if bytes.len() != PUBLIC_KEY_LENGTH {
            return Err(KeyError::InvalidPublicKey);
        }
        VerifyingKey::from_sec1_bytes(bytes).map_err(|_| KeyError::InvalidPublicKey)?;
        let mut out = [0u8; PUBLIC_KEY_LENGTH];
        out.copy_from_slice(bytes);
        Ok(Self(out))
    }

    pub fn from_hex(encoded: &str) -> Result<Self, KeyError> {
        let bytes = hex::decode(encoded).map_err(|_| KeyError::InvalidPublicKey)?;
        Self::from_bytes(&bytes)
    }

    pub fn as_bytes(&self) -> &[u8; PUBLIC_KEY_LENGTH] {
        &self.0
    }

    /// Uppercase hex, the ledger's customary rendering.
    pub fn to_hex(&self) -> String {
        hex::encode_upper(self.0)
    }

    /// Verify a DER signature over a prehashed digest. Malformed input is
    /// simply `false`.
    pub fn verify_digest(&self, digest: &[u8; 32], der_signature: &[u8]) -> bool {
        let Ok(key) = VerifyingKey::from_sec1_bytes(&self.0) else {
            return false;
        };
        let Ok(signature) = Signature::from_der(der_signature) else {
            return false;
        };
        key.verify_prehash(digest, &signature).is_ok()
    }
}

impl fmt::Debug for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PublicKey({})", self.to_hex())
    }
}

impl fmt::Display for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

// ---------------------------------------------------------------------------
// KeyPair
// ---------------------------------------------------------------------------

/// A derived account key pair.
#[derive(Debug)]
pub struct KeyPair {
    private: PrivateKey,
    public: PublicKey,
}

impl KeyPair {
    pub fn public_key(&self) -> PublicKey {
        self.public
    }

    pub fn private_key(&self) -> &PrivateKey {
        &self.private
    }

    pub fn sign_digest(&self, digest: &[u8; 32]) -> Result<Vec<u8>, KeyError> {
        self.private.sign_digest(digest)
    }

    pub fn into_parts(self) -> (PrivateKey, PublicKey) {
        (self.private, self.public)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    // The ledger's genesis account, derived from the passphrase
    // "masterpassphrase". Published in every wallet_propose example.
    const GENESIS_SECRET: &str = "snoPBrXtMeMyMHUVTgbuqAfg1SUTb";
    const GENESIS_SEED_HEX: &str = "DEDCE9CE67B451D852FD4E846FCDE31C";
    const GENESIS_PUBLIC_KEY: &str =
        "0330E7FC9D56BB25D6893BA3F317AE5BCF33B3291BD63DB32654A313222F7FD020";
    const GENESIS_PRIVATE_KEY: &str =
        "1ACAAEDECE405B2A958212629E16F2EB46B153EEE94CDD350FDEFF52795525B7";

    #[test]
    fn genesis_seed_decodes_to_known_entropy() {
        let seed = FamilySeed::from_encoded(GENESIS_SECRET).unwrap();
        assert_eq!(seed.entropy_hex(), GENESIS_SEED_HEX);
    }

    #[test]
    fn genesis_entropy_encodes_to_known_secret() {
        let entropy = hex::decode(GENESIS_SEED_HEX).unwrap();
        let seed = FamilySeed::from_entropy(&entropy).unwrap();
        assert_eq!(seed.encode().expose_secret(), GENESIS_SECRET);
    }

    #[test]
    fn genesis_seed_derives_known_public_key() {
        let seed = FamilySeed::from_encoded(GENESIS_SECRET).unwrap();
        let keypair = seed.derive_keypair().unwrap();
        assert_eq!(keypair.public_key().to_hex(), GENESIS_PUBLIC_KEY);
    }

    #[test]
    fn genesis_seed_derives_known_private_key() {
        let seed = FamilySeed::from_encoded(GENESIS_SECRET).unwrap();
        let keypair = seed.derive_keypair().unwrap();
        assert_eq!(
            keypair.private_key().to_hex().expose_secret(),
            GENESIS_PRIVATE_KEY
        );
    }

    #[test]
    fn derivation_is_deterministic() {
        let seed = FamilySeed::from_entropy(&[0x42; 16]).unwrap();
        let a = seed.derive_keypair().unwrap();
        let b = seed.derive_keypair().unwrap();
        assert_eq!(a.public_key(), b.public_key());
        assert_eq!(
            a.private_key().to_hex().expose_secret(),
            b.private_key().to_hex().expose_secret()
        );
    }

    #[test]
    fn generated_seeds_differ() {
        let a = FamilySeed::generate().unwrap();
        let b = FamilySeed::generate().unwrap();
        assert_ne!(a.encode().expose_secret(), b.encode().expose_secret());
        assert!(a.encode().expose_secret().starts_with('s'));
    }

    #[test]
    fn wrong_seed_length_is_rejected() {
        assert!(matches!(
            FamilySeed::from_entropy(&[1u8; 15]),
            Err(KeyError::InvalidSeedLength(15))
        ));
        assert!(matches!(
            FamilySeed::from_entropy(&[1u8; 32]),
            Err(KeyError::InvalidSeedLength(32))
        ));
    }

    #[test]
    fn malformed_secret_is_rejected() {
        assert!(matches!(
            FamilySeed::from_encoded("rHb9CJAWyB4rj91VRWn96DkukG4bwdtyTh"),
            Err(KeyError::InvalidSeed(_))
        ));
        assert!(FamilySeed::from_encoded("not a secret").is_err());
    }

    #[test]
    fn sign_and_verify_digest() {
        let keypair = FamilySeed::generate().unwrap().derive_keypair().unwrap();
        let digest = sha512_half(&[b"pay 35 drops"]);
        let signature = keypair.sign_digest(&digest).unwrap();
        assert!(keypair.public_key().verify_digest(&digest, &signature));

        let other = sha512_half(&[b"pay 36 drops"]);
        assert!(!keypair.public_key().verify_digest(&other, &signature));
    }

    #[test]
    fn signatures_are_deterministic_and_low_s() {
        let keypair = FamilySeed::from_entropy(&[7u8; 16])
            .unwrap()
            .derive_keypair()
            .unwrap();
        let digest = sha512_half(&[b"deterministic"]);
        let a = keypair.sign_digest(&digest).unwrap();
        let b = keypair.sign_digest(&digest).unwrap();
        assert_eq!(a, b);

        let parsed = Signature::from_der(&a).unwrap();
        assert!(parsed.normalize_s().is_none(), "signature must already be low-S");
    }

    #[test]
    fn private_key_hex_roundtrip() {
        let keypair = FamilySeed::generate().unwrap().derive_keypair().unwrap();
        let hex = keypair.private_key().to_hex();
        let restored = PrivateKey::from_hex(hex.expose_secret()).unwrap();
        assert_eq!(restored.public_key().unwrap(), keypair.public_key());
    }

    #[test]
    fn zeroized_private_key_cannot_sign() {
        let mut key = FamilySeed::generate()
            .unwrap()
            .derive_keypair()
            .unwrap()
            .private;
        key.zeroize();
        assert!(matches!(
            key.sign_digest(&[1u8; 32]),
            Err(KeyError::InvalidPrivateKey)
        ));
    }

    #[test]
    fn debug_output_does_not_leak() {
        let seed = FamilySeed::from_encoded(GENESIS_SECRET).unwrap();
        let keypair = seed.derive_keypair().unwrap();
        let rendered = format!("{:?} {:?}", seed, keypair);
        assert!(!rendered.contains(GENESIS_SECRET));
        assert!(!rendered.contains(keypair.private_key().to_hex().expose_secret()));
        assert!(rendered.contains("REDACTED"));
    }

    #[test]
    fn public_key_rejects_garbage() {
        assert!(PublicKey::from_bytes(&[0u8; 33]).is_err());
        assert!(PublicKey::from_bytes(&[2u8; 32]).is_err());
        assert!(PublicKey::from_hex("zz").is_err());
    }
}
