//! Configuration types and validation for the deployer.

use std::{
    path::PathBuf,
    str::FromStr,
    time::Duration,
};

use alloy_signer_local::PrivateKeySigner;
use thiserror::Error;
use url::Url;

use crate::{Cli, LogConfig, OrchestratorConfig, V1Config};

/// Errors that can occur during configuration validation.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Invalid URL format.
    #[error("invalid {field} URL: {reason}")]
    InvalidUrl {
        /// The field name that contains the invalid URL.
        field: &'static str,
        /// The reason the URL is invalid.
        reason: String,
    },
    /// A field value is out of the allowed range.
    #[error("{field} must be {constraint}, got {value}")]
    OutOfRange {
        /// The field name that is out of range.
        field: &'static str,
        /// The constraint description.
        constraint: &'static str,
        /// The actual value.
        value: String,
    },
    /// Invalid signing configuration.
    #[error("invalid signing config: {0}")]
    Signing(String),
    /// The environment file could not be read or parsed.
    #[error("invalid environment file {}: {reason}", path.display())]
    Environment {
        /// Path of the file.
        path: PathBuf,
        /// Read or parse failure.
        reason: String,
    },
    /// The market currency is not among the listed currencies.
    #[error("market currency {market} is not listed (listed: {listed})")]
    UnlistedMarketCurrency {
        /// Requested market currency.
        market: String,
        /// Listed currencies, comma separated.
        listed: String,
    },
}

/// Validated deployer configuration.
#[derive(Debug, Clone)]
pub struct DeployerConfig {
    /// URL of the ledger's JSON-RPC endpoint.
    pub rpc_url: Url,
    /// Key every transaction is signed with.
    pub signer: PrivateKeySigner,
    /// Directory holding `<name>.json` artifacts.
    pub artifacts_dir: PathBuf,
    /// Environment file with the admin, tokens, and oracles.
    pub environment: PathBuf,
    /// Proxy artifact and initializer names.
    pub orchestrator: OrchestratorConfig,
    /// How long to wait for each receipt.
    pub receipt_timeout: Duration,
    /// Where to write the deployment manifest.
    pub output: Option<PathBuf>,
    /// Stop after preflight.
    pub dry_run: bool,
    /// Module graph options.
    pub v1: V1Config,
    /// Logging configuration.
    pub log: LogConfig,
}

impl DeployerConfig {
    /// Validates parsed CLI arguments.
    pub fn from_cli(cli: Cli) -> Result<Self, ConfigError> {
        let args = cli.deployer;

        validate_url(&args.rpc_url, "rpc-url")?;
        let signer = parse_private_key(&args.private_key)?;

        if args.receipt_timeout.is_zero() {
            return Err(ConfigError::OutOfRange {
                field: "receipt-timeout",
                constraint: "greater than 0",
                value: humantime::format_duration(args.receipt_timeout).to_string(),
            });
        }

        let v1 = V1Config {
            listed_currencies: args.list_currency,
            market_currency: args.market_currency,
        };
        if v1.market_currency_id().is_none() {
            return Err(ConfigError::UnlistedMarketCurrency {
                market: v1.market_currency,
                listed: v1.listed_currencies.join(", "),
            });
        }

        Ok(Self {
            rpc_url: args.rpc_url,
            signer,
            artifacts_dir: args.artifacts_dir,
            environment: args.environment,
            orchestrator: OrchestratorConfig {
                proxy_artifact: args.proxy_artifact,
                initializer: args.initializer,
            },
            receipt_timeout: args.receipt_timeout,
            output: args.output,
            dry_run: args.dry_run,
            v1,
            log: cli.logging.into(),
        })
    }
}

/// Validate that a URL has a scheme and host.
pub fn validate_url(url: &Url, field: &'static str) -> Result<(), ConfigError> {
    if url.scheme().is_empty() {
        return Err(ConfigError::InvalidUrl { field, reason: "missing scheme".to_string() });
    }

    if url.host().is_none() {
        return Err(ConfigError::InvalidUrl { field, reason: "missing host".to_string() });
    }

    Ok(())
}

/// Parses a hex private key, with or without `0x`.
pub fn parse_private_key(key: &str) -> Result<PrivateKeySigner, ConfigError> {
    let hex_str = key.strip_prefix("0x").unwrap_or(key);
    PrivateKeySigner::from_str(hex_str)
        .map_err(|e| ConfigError::Signing(format!("invalid private key: {e}")))
}

#[cfg(test)]
mod tests {
    use alloy_primitives::address;
    use clap::Parser;
    use rstest::rstest;

    use super::*;

    const KEY: &str = "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";

    fn cli(extra: &[&str]) -> Cli {
        let mut args = vec!["deployer", "--rpc-url", "http://localhost:8545", "--private-key", KEY];
        args.extend_from_slice(extra);
        Cli::try_parse_from(args).unwrap()
    }

    #[test]
    fn test_url_without_host() {
        let url = Url::parse("file:///some/path").unwrap();
        let result = validate_url(&url, "test-field");
        assert!(matches!(result, Err(ConfigError::InvalidUrl { field: "test-field", .. })));
    }

    #[test]
    fn test_config_error_display() {
        let error =
            ConfigError::InvalidUrl { field: "rpc-url", reason: "missing host".to_string() };
        assert_eq!(error.to_string(), "invalid rpc-url URL: missing host");

        let error = ConfigError::OutOfRange {
            field: "receipt-timeout",
            constraint: "greater than 0",
            value: "0s".to_string(),
        };
        assert_eq!(error.to_string(), "receipt-timeout must be greater than 0, got 0s");

        let error =
            ConfigError::Environment { path: "env.json".into(), reason: "missing field".into() };
        assert_eq!(error.to_string(), "invalid environment file env.json: missing field");

        let error = ConfigError::UnlistedMarketCurrency {
            market: "ETH".into(),
            listed: "DAI, USDC".into(),
        };
        assert_eq!(error.to_string(), "market currency ETH is not listed (listed: DAI, USDC)");
    }

    #[rstest]
    #[case::prefixed(KEY)]
    #[case::bare(&KEY[2..])]
    fn test_parse_private_key(#[case] key: &str) {
        let signer = parse_private_key(key).unwrap();
        assert_eq!(signer.address(), address!("0xf39Fd6e51aad88F6F4ce6aB8827279cffFb92266"));
    }

    #[rstest]
    #[case::not_hex("0xnothex")]
    #[case::short("0x1234")]
    #[case::zero("0x0000000000000000000000000000000000000000000000000000000000000000")]
    fn test_parse_private_key_invalid(#[case] key: &str) {
        assert!(matches!(parse_private_key(key), Err(ConfigError::Signing(_))));
    }

    #[test]
    fn test_from_cli_defaults() {
        let config = DeployerConfig::from_cli(cli(&[])).unwrap();

        assert_eq!(config.rpc_url.as_str(), "http://localhost:8545/");
        assert_eq!(config.artifacts_dir, PathBuf::from("artifacts"));
        assert_eq!(config.environment, PathBuf::from("environment.json"));
        assert_eq!(config.orchestrator, OrchestratorConfig::default());
        assert_eq!(config.receipt_timeout, Duration::from_secs(120));
        assert_eq!(config.v1, V1Config::default());
        assert!(config.output.is_none());
        assert!(!config.dry_run);
        assert_eq!(config.log, LogConfig::default());
    }

    #[test]
    fn test_from_cli_rejects_zero_timeout() {
        let result = DeployerConfig::from_cli(cli(&["--receipt-timeout", "0s"]));
        assert!(matches!(result, Err(ConfigError::OutOfRange { field: "receipt-timeout", .. })));
    }

    #[test]
    fn test_from_cli_rejects_unlisted_market_currency() {
        let result = DeployerConfig::from_cli(cli(&["--market-currency", "ETH"]));
        assert!(matches!(result, Err(ConfigError::UnlistedMarketCurrency { .. })));
    }

    #[test]
    fn test_from_cli_rejects_url_without_host() {
        let cli = Cli::try_parse_from([
            "deployer",
            "--rpc-url",
            "file:///tmp/ledger",
            "--private-key",
            KEY,
        ])
        .unwrap();
        let result = DeployerConfig::from_cli(cli);
        assert!(matches!(result, Err(ConfigError::InvalidUrl { field: "rpc-url", .. })));
    }

    #[test]
    fn test_from_cli_custom_graph() {
        let config = DeployerConfig::from_cli(cli(&[
            "--list-currency",
            "USDC",
            "--list-currency",
            "DAI",
            "--market-currency",
            "DAI",
        ]))
        .unwrap();
        assert_eq!(config.v1.listed_currencies, ["USDC", "DAI"]);
        assert_eq!(config.v1.market_currency_id(), Some(2));
    }
}
