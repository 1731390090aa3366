//! Redacted, zeroize-on-drop holder for secret strings.
//!
//! Family seeds (`s...`) and hex private keys are strings, and strings love
//! to end up in logs, error messages, and JSON responses. [`SecretString`]
//! has no `Display`, no `Serialize`, no `Clone`, and a `Debug` that prints
//! nothing useful. The only way to read it is [`SecretString::expose_secret`],
//! which is easy to grep for in review.
//!
//! The persisted account record is the one place secrets must be written
//! out; it opts in field by field through [`serde_exposed`].

use std::fmt;
use zeroize::{Zeroize, Zeroizing};

pub struct SecretString(Zeroizing<String>);

impl SecretString {
    pub fn new(value: String) -> Self {
        Self(Zeroizing::new(value))
    }

    /// Borrow the secret. Every call site is a place a secret can leak.
    pub fn expose_secret(&self) -> &str {
        self.0.as_str()
    }
}

impl Zeroize for SecretString {
    fn zeroize(&mut self) {
        self.0.zeroize();
    }
}

impl From<String> for SecretString {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

impl fmt::Debug for SecretString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SecretString([REDACTED])")
    }
}

/// Field-level serde adapter for the persisted account record:
/// `#[serde(with = "crate::crypto::secret::serde_exposed")]`.
pub mod serde_exposed {
    use super::SecretString;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(secret: &SecretString, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(secret.expose_secret())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<SecretString, D::Error> {
        String::deserialize(deserializer).map(SecretString::new)
    }
}
