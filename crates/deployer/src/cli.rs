//! CLI argument definitions for the deployer.

use std::{path::PathBuf, time::Duration};

use clap::{
    ArgAction, Parser,
    builder::{
        Styles,
        styling::{AnsiColor, Color, Style},
    },
};
use url::Url;

use crate::{
    LogConfig, LogFormat, StdoutLogConfig,
    constants::{DEFAULT_INITIALIZER, DEFAULT_PROXY_ARTIFACT},
    logging::verbosity_to_level_filter,
};

/// Deployer - deploys, links, and wires the lending-protocol modules.
#[derive(Debug, Clone, Parser)]
#[command(name = "deployer")]
#[command(version, about, long_about = None)]
#[command(styles = CliStyles::init())]
pub struct Cli {
    /// Deployment arguments.
    #[command(flatten)]
    pub deployer: DeployerArgs,

    /// Logging configuration arguments.
    #[command(flatten)]
    pub logging: LogArgs,
}

/// Core deployment arguments.
#[derive(Debug, Clone, Parser)]
#[command(next_help_heading = "Deployment")]
pub struct DeployerArgs {
    /// URL of the ledger's JSON-RPC endpoint.
    #[arg(long = "rpc-url", env = "DEPLOYER_RPC_URL", value_parser = parse_url)]
    pub rpc_url: Url,

    /// Private key every transaction is signed with (hex-encoded).
    #[arg(long = "private-key", env = "DEPLOYER_PRIVATE_KEY", hide_env_values = true)]
    pub private_key: String,

    /// Directory holding `<name>.json` artifacts.
    #[arg(long = "artifacts-dir", env = "DEPLOYER_ARTIFACTS_DIR", default_value = "artifacts")]
    pub artifacts_dir: PathBuf,

    /// Environment file with the proxy admin, tokens, and oracles.
    #[arg(long = "environment", env = "DEPLOYER_ENVIRONMENT", default_value = "environment.json")]
    pub environment: PathBuf,

    /// Artifact of the transparent upgradeable proxy.
    #[arg(
        long = "proxy-artifact",
        env = "DEPLOYER_PROXY_ARTIFACT",
        default_value = DEFAULT_PROXY_ARTIFACT
    )]
    pub proxy_artifact: String,

    /// Initializer entrypoint called through each proxy.
    #[arg(long = "initializer", env = "DEPLOYER_INITIALIZER", default_value = DEFAULT_INITIALIZER)]
    pub initializer: String,

    /// How long to wait for each receipt (e.g., "30s", "2m").
    #[arg(
        long = "receipt-timeout",
        env = "DEPLOYER_RECEIPT_TIMEOUT",
        default_value = "120s",
        value_parser = parse_duration
    )]
    pub receipt_timeout: Duration,

    /// Write the deployment manifest to this path.
    #[arg(long = "output", short = 'o', env = "DEPLOYER_OUTPUT")]
    pub output: Option<PathBuf>,

    /// Validate the graph against the artifacts and environment without sending transactions.
    #[arg(long = "dry-run", env = "DEPLOYER_DRY_RUN", default_value = "false")]
    pub dry_run: bool,

    /// Currency to list with the escrow, in listing order. Repeatable.
    #[arg(
        long = "list-currency",
        env = "DEPLOYER_LIST_CURRENCIES",
        value_delimiter = ',',
        default_values = ["DAI", "USDC", "WBTC"]
    )]
    pub list_currency: Vec<String>,

    /// Listed currency that gets a cash market and initial liquidity.
    #[arg(long = "market-currency", env = "DEPLOYER_MARKET_CURRENCY", default_value = "DAI")]
    pub market_currency: String,
}

/// Logging configuration arguments.
#[derive(Debug, Clone, Parser)]
#[command(next_help_heading = "Logging")]
pub struct LogArgs {
    /// Increase logging verbosity (1=ERROR, 2=WARN, 3=INFO, 4=DEBUG, 5=TRACE).
    #[arg(
        short = 'v',
        long = "verbose",
        action = ArgAction::Count,
        default_value = "3",
        env = "DEPLOYER_LOG_LEVEL",
        global = true
    )]
    pub level: u8,

    /// Suppress stdout logging.
    #[arg(long = "quiet", short = 'q', global = true)]
    pub stdout_quiet: bool,

    /// Stdout log format.
    #[arg(long = "log-format", default_value = "full", env = "DEPLOYER_LOG_FORMAT", global = true)]
    pub stdout_format: LogFormat,
}

impl From<LogArgs> for LogConfig {
    fn from(args: LogArgs) -> Self {
        Self {
            global_level: verbosity_to_level_filter(args.level),
            stdout_logs: (!args.stdout_quiet)
                .then_some(StdoutLogConfig { format: args.stdout_format }),
        }
    }
}

/// A wrapper type for CLI styles.
#[derive(Debug, Clone, Copy)]
pub struct CliStyles;

impl CliStyles {
    /// Initialize the CLI styles, returning a [`Styles`] instance.
    pub const fn init() -> Styles {
        Styles::styled()
            .usage(Style::new().bold().underline().fg_color(Some(Color::Ansi(AnsiColor::Yellow))))
            .header(Style::new().bold().underline().fg_color(Some(Color::Ansi(AnsiColor::Yellow))))
            .literal(Style::new().fg_color(Some(Color::Ansi(AnsiColor::Green))))
            .invalid(Style::new().bold().fg_color(Some(Color::Ansi(AnsiColor::Red))))
            .error(Style::new().bold().fg_color(Some(Color::Ansi(AnsiColor::Red))))
            .valid(Style::new().bold().underline().fg_color(Some(Color::Ansi(AnsiColor::Green))))
            .placeholder(Style::new().fg_color(Some(Color::Ansi(AnsiColor::White))))
    }
}

/// Parse a duration string like "12s", "5m", "1h".
fn parse_duration(s: &str) -> Result<Duration, humantime::DurationError> {
    humantime::parse_duration(s)
}

/// Parse a URL string.
fn parse_url(s: &str) -> Result<Url, url::ParseError> {
    Url::parse(s)
}
