//! Deployment manifest written after a successful run.

use std::{collections::BTreeMap, path::Path};

use alloy_primitives::Address;
use serde::{Deserialize, Serialize};

use crate::Registry;

/// Addresses of everything a run deployed.
///
/// Modules map to the address calls go to, which is the proxy for proxied
/// modules; `implementations` lists what sits behind each proxy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Manifest {
    /// Chain the run targeted.
    pub chain_id: u64,
    /// Module name to address.
    pub modules: BTreeMap<String, Address>,
    /// Proxied module name to implementation address.
    pub implementations: BTreeMap<String, Address>,
}

impl Manifest {
    /// Builds the manifest for `registry`.
    pub fn new(chain_id: u64, registry: &Registry) -> Self {
        let modules = registry.iter().map(|handle| (handle.name.clone(), handle.address)).collect();
        let implementations = registry
            .iter()
            .filter_map(|handle| {
                handle.implementation.map(|address| (handle.name.clone(), address))
            })
            .collect();
        Self { chain_id, modules, implementations }
    }

    /// Writes the manifest as pretty-printed JSON.
    pub fn write(&self, path: &Path) -> std::io::Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json + "\n")
    }
}
