//! Identities and pre-existing modules supplied by the caller.

use std::{collections::BTreeMap, path::Path, sync::OnceLock};

use alloy_json_abi::JsonAbi;
use alloy_primitives::Address;
use serde::Deserialize;

use crate::{ConfigError, DeployError, DeployResult};

/// Human-readable ABI used to call environment tokens.
const ERC20_SIGNATURES: [&str; 6] = [
    "function approve(address spender, uint256 amount) returns (bool)",
    "function allowance(address owner, address spender) view returns (uint256)",
    "function balanceOf(address account) view returns (uint256)",
    "function transfer(address to, uint256 amount) returns (bool)",
    "function decimals() view returns (uint8)",
    "function symbol() view returns (string)",
];

/// ABI shared by every environment token.
pub fn erc20_abi() -> &'static JsonAbi {
    static ABI: OnceLock<JsonAbi> = OnceLock::new();
    ABI.get_or_init(|| JsonAbi::parse(ERC20_SIGNATURES).expect("static ERC-20 signatures parse"))
}

/// The deployment environment: who submits, who administers proxies, and the
/// token and price-oracle modules that already exist on the ledger.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Environment {
    /// Identity that submits every transaction.
    pub deployer: Address,
    /// Administrator written into every proxy.
    pub admin: Address,
    /// Token address by currency symbol.
    pub tokens: BTreeMap<String, Address>,
    /// Price oracle address by currency symbol.
    pub oracles: BTreeMap<String, Address>,
}

impl Environment {
    /// Creates an environment with no tokens or oracles.
    pub const fn new(deployer: Address, admin: Address) -> Self {
        Self { deployer, admin, tokens: BTreeMap::new(), oracles: BTreeMap::new() }
    }

    /// Adds a token.
    pub fn with_token(mut self, symbol: impl Into<String>, address: Address) -> Self {
        self.tokens.insert(symbol.into(), address);
        self
    }

    /// Adds a price oracle.
    pub fn with_oracle(mut self, symbol: impl Into<String>, address: Address) -> Self {
        self.oracles.insert(symbol.into(), address);
        self
    }

    /// Token address for `symbol`.
    pub fn token(&self, symbol: &str) -> DeployResult<Address> {
        self.tokens
            .get(symbol)
            .copied()
            .ok_or_else(|| DeployError::UnknownExternal { kind: "token", symbol: symbol.into() })
    }

    /// Price oracle address for `symbol`.
    pub fn oracle(&self, symbol: &str) -> DeployResult<Address> {
        self.oracles
            .get(symbol)
            .copied()
            .ok_or_else(|| DeployError::UnknownExternal { kind: "oracle", symbol: symbol.into() })
    }

    /// Builds the environment from a file, with `deployer` taken from the signing key.
    pub fn from_file(path: &Path, deployer: Address) -> Result<Self, ConfigError> {
        let file = EnvironmentFile::load(path)?;
        Ok(Self { deployer, admin: file.admin, tokens: file.tokens, oracles: file.oracles })
    }
}

/// On-disk form of an [`Environment`].
///
/// ```json
/// {
///   "admin": "0x…",
///   "tokens": { "DAI": "0x…" },
///   "oracles": { "DAI": "0x…" }
/// }
/// ```
#[derive(Debug, Clone, Deserialize)]
pub struct EnvironmentFile {
    /// Proxy administrator.
    pub admin: Address,
    /// Token address by currency symbol.
    #[serde(default)]
    pub tokens: BTreeMap<String, Address>,
    /// Price oracle address by currency symbol.
    #[serde(default)]
    pub oracles: BTreeMap<String, Address>,
}

impl EnvironmentFile {
    /// Reads and parses the file at `path`.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|e| ConfigError::Environment {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        serde_json::from_str(&contents).map_err(|e| ConfigError::Environment {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })
    }
}
