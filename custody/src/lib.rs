// Copyright (c) 2026 ALAS Technology. MIT License.
// See LICENSE for details.

//! # XRPL Custody — Core Library
//!
//! A custodial signer for the XRP Ledger. We hold account keys so that
//! callers never have to, and we refuse to sign anything the account's
//! policy does not allow.
//!
//! The library speaks the ledger's own formats end to end: secp256k1 keys
//! derived from family seeds, base58check addresses in the Ripple alphabet,
//! and the canonical binary encoding the network actually hashes and
//! verifies. No JSON-to-binary hop through an external tool.
//!
//! ## Architecture
//!
//! - **crypto** — Hashes, base58check, seeds and secp256k1 keys.
//! - **identity** — Account ids, addresses and custodied accounts.
//! - **transaction** — Requests, the builder, sequencing and signing.
//! - **codec** — Canonical binary serialization, both directions.
//! - **policy** — Spend limits, blacklists and whitelists.
//! - **ledger** — JSON-RPC client, faucet client and an in-memory ledger.
//! - **storage** — Versioned secret storage over sled.
//! - **service** — The facade that strings all of the above together.
//! - **config** — Network constants and the TOML configuration file.
//!
//! ## Design Philosophy
//!
//! 1. Key material never leaves the process in a response or a log line.
//! 2. Policy runs before the network does. A refused payment costs nothing.
//! 3. One account, one in-flight sequence. Different accounts never wait
//!    on each other.
//! 4. If it touches money, it has tests. Plural.

pub mod codec;
pub mod config;
pub mod crypto;
pub mod error;
pub mod identity;
pub mod ledger;
pub mod policy;
pub mod service;
pub mod storage;
pub mod transaction;

pub use error::{CustodyError, CustodyResult};
pub use service::{
    CreateAccountRequest, CustodyService, SignedTransaction, SubmitResponse, SubmittedTransaction,
};
