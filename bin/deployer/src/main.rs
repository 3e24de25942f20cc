//! Deployer binary entry point.

use clap::Parser;
use ledger_deployer::{Cli, DeployerConfig};

#[tokio::main]
async fn main() -> eyre::Result<()> {
    let cli = Cli::parse();
    let config = DeployerConfig::from_cli(cli)?;

    ledger_deployer::run(config).await
}
