//! Constructor deployment of a single linked module.

use std::sync::Arc;

use alloy_dyn_abi::DynSolValue;
use alloy_json_abi::JsonAbi;
use alloy_primitives::Address;
use tracing::{debug, info, warn};

use crate::{
    DeployError, DeployResult, DeployedHandle, LinkedBytecode, encoding,
    ledger::{Confirmation, Ledger},
};

/// Submits contract creations for one identity.
///
/// Each call to [`deploy`](Self::deploy) sends exactly one transaction and
/// waits for it. Deploying the same module twice creates two instances.
#[derive(Debug)]
pub struct ModuleDeployer<L> {
    ledger: Arc<L>,
    from: Address,
}

impl<L> Clone for ModuleDeployer<L> {
    fn clone(&self) -> Self {
        Self { ledger: Arc::clone(&self.ledger), from: self.from }
    }
}

impl<L: Ledger> ModuleDeployer<L> {
    /// Creates a deployer submitting as `from`.
    pub const fn new(ledger: Arc<L>, from: Address) -> Self {
        Self { ledger, from }
    }

    /// The submitting identity.
    pub const fn submitter(&self) -> Address {
        self.from
    }

    /// Deploys `bytecode` with `constructor_args` encoded against `abi`.
    ///
    /// The returned handle carries `name`; registering it is up to the caller.
    pub async fn deploy(
        &self,
        name: &str,
        bytecode: &LinkedBytecode,
        abi: Arc<JsonAbi>,
        constructor_args: &[DynSolValue],
    ) -> DeployResult<DeployedHandle> {
        let mut code = bytecode.to_bytes()?.to_vec();
        code.extend(encoding::encode_constructor(&abi, name, constructor_args)?);

        debug!(
            module = name,
            artifact = bytecode.module(),
            code_size = code.len(),
            "Submitting deployment"
        );
        let confirmation = self.submit(name, code).await?;

        let Some(address) = confirmation.contract_address else {
            warn!(
                module = name,
                tx_hash = %confirmation.tx_hash,
                "Deployment receipt has no contract address"
            );
            return Err(DeployError::AddressExtraction {
                module: name.to_string(),
                tx_hash: confirmation.tx_hash,
            });
        };

        info!(
            module = name,
            %address,
            tx_hash = %confirmation.tx_hash,
            gas_used = confirmation.gas_used,
            "Module deployed"
        );
        Ok(DeployedHandle::new(name, address, abi))
    }

    async fn submit(&self, name: &str, code: Vec<u8>) -> DeployResult<Confirmation> {
        self.ledger
            .deploy(self.from, code.into())
            .await
            .map_err(|e| DeployError::transaction(format!("deployment of `{name}`"), e))
    }
}
