//! # Custody Configuration & Constants
//!
//! Every magic number the custody core depends on lives here. Most of them
//! are not ours to choose: the XRP Ledger fixes its base58 alphabet, its
//! version bytes, its hash prefixes, and its amount limits, and a custody
//! service that disagrees with the ledger about any of them produces
//! signatures nobody will ever accept.
//!
//! The second half of the file is the runtime [`CustodyConfig`], loaded from
//! TOML by the server binary. Every field has a default so an empty file is
//! a valid (testnet) configuration.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

// ---------------------------------------------------------------------------
// Native Asset
// ---------------------------------------------------------------------------

/// Ticker of the ledger-native asset.
pub const NATIVE_CURRENCY: &str = "XRP";

/// Alias accepted at the request boundary for the native asset.
pub const NATIVE_ASSET_ALIAS: &str = "native";

/// Drops per XRP. Native amounts are always handled in drops.
pub const DROPS_PER_XRP: u64 = 1_000_000;

/// Largest native amount the ledger can represent: 100 billion XRP.
pub const MAX_NATIVE_DROPS: u64 = 100_000_000_000 * DROPS_PER_XRP;

/// Canonical transaction cost in drops. Every transaction we build pays
/// exactly this; fee escalation is not exposed.
pub const MIN_TX_FEE_DROPS: u64 = 10;

// ---------------------------------------------------------------------------
// Key Material & Encodings
// ---------------------------------------------------------------------------

/// Family seeds are 128 bits of entropy.
pub const SEED_LENGTH: usize = 16;

/// Account ids are 160-bit public key hashes.
pub const ACCOUNT_ID_LENGTH: usize = 20;

/// Compressed secp256k1 public keys.
pub const PUBLIC_KEY_LENGTH: usize = 33;

/// Index of the derived account key under a family seed. Single-key accounts
/// always use the first one.
pub const ACCOUNT_KEY_INDEX: u32 = 0;

/// Base58check version byte for account addresses (`r...`).
pub const VERSION_ACCOUNT_ID: u8 = 0x00;

/// Base58check version byte for family seeds (`s...`).
pub const VERSION_FAMILY_SEED: u8 = 0x21;

/// Hash prefix for single-signature signing data: `"STX\0"`.
pub const HASH_PREFIX_TX_SIGN: [u8; 4] = [0x53, 0x54, 0x58, 0x00];

/// Hash prefix for transaction ids: `"TXN\0"`.
pub const HASH_PREFIX_TX_ID: [u8; 4] = [0x54, 0x58, 0x4E, 0x00];

// ---------------------------------------------------------------------------
// Issued Currency Amounts
// ---------------------------------------------------------------------------

/// Smallest normalised mantissa of an issued amount (10^15).
pub const IOU_MIN_MANTISSA: u64 = 1_000_000_000_000_000;

/// Largest normalised mantissa of an issued amount (10^16 - 1).
pub const IOU_MAX_MANTISSA: u64 = 9_999_999_999_999_999;

/// Exponent range of a normalised issued amount.
pub const IOU_MIN_EXPONENT: i32 = -96;
pub const IOU_MAX_EXPONENT: i32 = 80;

// ---------------------------------------------------------------------------
// Requests & Storage
// ---------------------------------------------------------------------------

/// Upper bound on a payment memo, in bytes.
pub const MAX_MEMO_LENGTH: usize = 1024;

/// Upper bound on an `AccountSet` domain, in bytes.
pub const MAX_DOMAIN_LENGTH: usize = 256;

/// MemoType attached to plain-text payment memos.
pub const MEMO_TYPE_TEXT: &str = "text/plain";

/// Storage prefix under which custodied accounts live.
pub const ACCOUNTS_PREFIX: &str = "accounts/";

// ---------------------------------------------------------------------------
// Endpoints & Ports
// ---------------------------------------------------------------------------

pub const MAINNET_RPC_URL: &str = "https://s1.ripple.com:51234";
pub const TESTNET_RPC_URL: &str = "https://s.altnet.rippletest.net:51234";
pub const DEVNET_RPC_URL: &str = "https://s.devnet.rippletest.net:51234";

pub const TESTNET_FAUCET_URL: &str = "https://faucet.altnet.rippletest.net/accounts";
pub const DEVNET_FAUCET_URL: &str = "https://faucet.devnet.rippletest.net/accounts";

/// Drops paid from a faucet account to a freshly created custody account.
pub const DEFAULT_FAUCET_FUNDING_DROPS: u64 = 1_000 * DROPS_PER_XRP;

/// HTTP timeout for every ledger and faucet round trip.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

pub const DEFAULT_API_PORT: u16 = 8420;
pub const DEFAULT_METRICS_PORT: u16 = 9420;

// ---------------------------------------------------------------------------
// Runtime Configuration
// ---------------------------------------------------------------------------

/// Errors raised while loading a [`CustodyConfig`].
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("failed to render config: {0}")]
    Render(#[from] toml::ser::Error),

    #[error("unknown network '{0}' (expected mainnet, testnet or devnet)")]
    UnknownNetwork(String),
}

/// Which XRP Ledger network the service talks to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Network {
    Mainnet,
    #[default]
    Testnet,
    Devnet,
}

impl Network {
    pub fn default_rpc_url(self) -> &'static str {
        match self {
            Network::Mainnet => MAINNET_RPC_URL,
            Network::Testnet => TESTNET_RPC_URL,
            Network::Devnet => DEVNET_RPC_URL,
        }
    }

    /// Mainnet has no faucet, and nothing in this crate will pretend otherwise.
    pub fn default_faucet_url(self) -> Option<&'static str> {
        match self {
            Network::Mainnet => None,
            Network::Testnet => Some(TESTNET_FAUCET_URL),
            Network::Devnet => Some(DEVNET_FAUCET_URL),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Network::Mainnet => "mainnet",
            Network::Testnet => "testnet",
            Network::Devnet => "devnet",
        }
    }
}

impl fmt::Display for Network {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Network {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "mainnet" => Ok(Network::Mainnet),
            "testnet" => Ok(Network::Testnet),
            "devnet" => Ok(Network::Devnet),
            _ => Err(ConfigError::UnknownNetwork(s.to_string())),
        }
    }
}

/// Faucet funding applied to newly created accounts on test networks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FundingConfig {
    #[serde(default = "default_funding_enabled")]
    pub enabled: bool,

    #[serde(default = "default_funding_drops")]
    pub amount_drops: u64,

    #[serde(default)]
    pub faucet_url: Option<String>,
}

/// Runtime configuration for the custody service and its server.
///
/// ```toml
/// network = "testnet"
/// data_dir = "./data"
///
/// [funding]
/// enabled = true
/// amount_drops = 1000000000
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustodyConfig {
    #[serde(default)]
    pub network: Network,

    /// Overrides the network's public JSON-RPC endpoint.
    #[serde(default)]
    pub rpc_url: Option<String>,

    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    #[serde(default)]
    pub funding: FundingConfig,

    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    #[serde(default = "default_api_port")]
    pub api_port: u16,

    #[serde(default = "default_metrics_port")]
    pub metrics_port: u16,

    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// `pretty` or `json`.
    #[serde(default = "default_log_format")]
    pub log_format: String,
}

fn default_funding_enabled() -> bool {
    true
}

fn default_funding_drops() -> u64 {
    DEFAULT_FAUCET_FUNDING_DROPS
}

fn default_request_timeout_secs() -> u64 {
    DEFAULT_REQUEST_TIMEOUT.as_secs()
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("./data")
}

fn default_api_port() -> u16 {
    DEFAULT_API_PORT
}

fn default_metrics_port() -> u16 {
    DEFAULT_METRICS_PORT
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

impl Default for FundingConfig {
    fn default() -> Self {
        Self {
            enabled: default_funding_enabled(),
            amount_drops: default_funding_drops(),
            faucet_url: None,
        }
    }
}

impl Default for CustodyConfig {
    fn default() -> Self {
        Self {
            network: Network::default(),
            rpc_url: None,
            request_timeout_secs: default_request_timeout_secs(),
            funding: FundingConfig::default(),
            data_dir: default_data_dir(),
            api_port: default_api_port(),
            metrics_port: default_metrics_port(),
            log_level: default_log_level(),
            log_format: default_log_format(),
        }
    }
}

impl CustodyConfig {
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(s)?)
    }

    pub fn from_toml_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&content)
    }

    pub fn to_toml_string(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// The JSON-RPC endpoint, honouring the override.
    pub fn rpc_endpoint(&self) -> &str {
        self.rpc_url
            .as_deref()
            .unwrap_or_else(|| self.network.default_rpc_url())
    }

    /// The faucet endpoint to fund new accounts from, if funding applies.
    ///
    /// Always `None` on mainnet, even when an override URL is configured.
    pub fn faucet_endpoint(&self) -> Option<&str> {
        if !self.funding.enabled || self.network == Network::Mainnet {
            return None;
        }
        self.funding
            .faucet_url
            .as_deref()
            .or_else(|| self.network.default_faucet_url())
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Location of the sled secret store.
    pub fn store_path(&self) -> PathBuf {
        self.data_dir.join("secrets")
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
