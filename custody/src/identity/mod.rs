//! # Identity Module
//!
//! Turns 16 bytes of entropy into a custodied ledger identity. The stack is
//! layered:
//!
//! 1. **Family seed**: 128 bits of entropy, recoverable as an `s...` secret
//!    (see [`crate::crypto::keys`]).
//! 2. **Key pair**: the secp256k1 account key derived from the seed.
//! 3. **Account id / address**: RIPEMD-160 of SHA-256 of the compressed
//!    public key, base58check-encoded as `r...`.
//! 4. **Account**: the above plus the transfer policy the custodian enforces.
//!
//! ## Design Decisions
//!
//! - Identity never generates entropy on its own; [`derive`] takes the seed
//!   from its caller and insists on the length. The service pulls it from
//!   `OsRng`.
//! - Identity never touches storage. Persisting an account is the caller's
//!   job, and the persisted form lives next to the storage code.

pub mod account;
pub mod address;

pub use account::{derive, Account, AccountView};
pub use address::{AccountId, AddressError};
