//! Full deployment run.

use std::sync::Arc;

use eyre::{Result, WrapErr};
use tracing::{error, info};

use crate::{
    DeployerConfig, DirArtifactStore, Environment, Ledger, Manifest, Orchestrator, RpcLedger, v1,
};

/// Deploys the v1 module graph.
///
/// Steps:
/// 1. Initialise logging
/// 2. Connect the ledger and load the environment
/// 3. Build the v1 pipeline and run preflight
/// 4. Stop here on a dry run
/// 5. Execute every phase, logging the registry in deployment order
/// 6. Write the manifest, if requested
pub async fn run(config: DeployerConfig) -> Result<()> {
    config.log.init_tracing_subscriber()?;

    info!(version = env!("CARGO_PKG_VERSION"), "Deployer starting");

    let deployer = config.signer.address();
    let ledger =
        Arc::new(RpcLedger::new(config.rpc_url.clone(), config.signer, config.receipt_timeout));
    let environment = Environment::from_file(&config.environment, deployer)?;
    let artifacts = DirArtifactStore::new(&config.artifacts_dir);
    info!(artifacts_dir = %artifacts.dir().display(), "Reading artifacts");

    let orchestrator = Orchestrator::new(Arc::clone(&ledger), artifacts, environment)
        .with_config(config.orchestrator);
    let environment = orchestrator.environment();
    info!(
        %deployer,
        admin = %environment.admin,
        tokens = environment.tokens.len(),
        oracles = environment.oracles.len(),
        "Environment loaded"
    );

    let pipeline = v1::pipeline(&config.v1).wrap_err("invalid v1 module graph")?;
    orchestrator.preflight(&pipeline)?;
    info!(steps = pipeline.len(), market = %config.v1.market_name(), "Preflight passed");

    if config.dry_run {
        info!("Dry run, no transactions sent");
        return Ok(());
    }

    let chain_id = ledger.chain_id().await.wrap_err("failed to read chain id")?;
    info!(chain_id, rpc_url = %config.rpc_url, "Connected to ledger");

    let registry = match orchestrator.run(&pipeline).await {
        Ok(registry) => registry,
        Err(err) => {
            for handle in err.registry.iter() {
                error!(module = %handle.name, address = %handle.address, "Deployed before failure");
            }
            return Err(err.into());
        }
    };

    for handle in registry.iter() {
        match handle.implementation {
            Some(implementation) => {
                info!(module = %handle.name, address = %handle.address, %implementation, "Deployed")
            }
            None => info!(module = %handle.name, address = %handle.address, "Deployed"),
        }
    }

    if let Some(path) = &config.output {
        Manifest::new(chain_id, &registry)
            .write(path)
            .wrap_err_with(|| format!("failed to write manifest to {}", path.display()))?;
        info!(path = %path.display(), modules = registry.len(), "Manifest written");
    }

    Ok(())
}
