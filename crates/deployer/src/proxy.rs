//! Upgradeable-proxy deployment.
//!
//! A proxied module costs two transactions: the implementation, then a
//! transparent upgradeable proxy constructed with
//! `(implementation, admin, initializer calldata)`. The proxy runs the
//! initializer against its own storage during construction, so the module is
//! never observable uninitialized. The returned handle points at the proxy and
//! carries the implementation ABI.

use std::sync::Arc;

use alloy_dyn_abi::DynSolValue;
use alloy_primitives::{Address, Bytes};
use tracing::info;

use crate::{
    Artifact, DeployResult, DeployedHandle, Registry, encoding, ledger::Ledger, link,
    deployer::ModuleDeployer,
};

/// Deploys modules behind transparent upgradeable proxies.
#[derive(Debug)]
pub struct ProxyDeployer<'a, L> {
    modules: &'a ModuleDeployer<L>,
    proxy: Arc<Artifact>,
    admin: Address,
    initializer: &'a str,
}

impl<'a, L: Ledger> ProxyDeployer<'a, L> {
    /// Creates a proxy deployer using `proxy` as the proxy artifact, `admin` as
    /// the proxy administrator, and `initializer` as the entrypoint name.
    pub const fn new(
        modules: &'a ModuleDeployer<L>,
        proxy: Arc<Artifact>,
        admin: Address,
        initializer: &'a str,
    ) -> Self {
        Self { modules, proxy, admin, initializer }
    }

    /// Deploys `artifact` as module `name` behind a new proxy.
    ///
    /// Both bytecodes are linked and both payloads encoded before the first
    /// transaction, so argument and linking errors never leave a stray
    /// implementation behind. A failure of the proxy deployment itself does.
    pub async fn deploy(
        &self,
        name: &str,
        artifact: &Artifact,
        registry: &Registry,
        initializer_args: &[DynSolValue],
    ) -> DeployResult<DeployedHandle> {
        let implementation_code = link(artifact, registry)?;
        let proxy_code = link(&self.proxy, registry)?;

        let initializer = encoding::select_function(
            &artifact.abi,
            name,
            self.initializer,
            initializer_args.len(),
        )?;
        let init_data = encoding::encode_call(initializer, name, initializer_args)?;
        encoding::encode_constructor(
            &self.proxy.abi,
            &self.proxy.name,
            &self.proxy_args(Address::ZERO, init_data.clone()),
        )?;

        let implementation = self
            .modules
            .deploy(name, &implementation_code, Arc::clone(&artifact.abi), &[])
            .await?;

        let proxy = self
            .modules
            .deploy(
                &format!("{name} proxy"),
                &proxy_code,
                Arc::clone(&self.proxy.abi),
                &self.proxy_args(implementation.address, init_data),
            )
            .await?;

        info!(
            module = name,
            proxy = %proxy.address,
            implementation = %implementation.address,
            initializer = %initializer.signature(),
            "Proxied module deployed"
        );
        Ok(DeployedHandle {
            name: name.to_string(),
            address: proxy.address,
            abi: Arc::clone(&artifact.abi),
            implementation: Some(implementation.address),
        })
    }

    fn proxy_args(&self, implementation: Address, init_data: Bytes) -> [DynSolValue; 3] {
        [
            DynSolValue::Address(implementation),
            DynSolValue::Address(self.admin),
            DynSolValue::Bytes(init_data.to_vec()),
        ]
    }
}
