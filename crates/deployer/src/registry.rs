//! Registry of modules deployed during one run.

use std::{collections::HashMap, sync::Arc};

use alloy_json_abi::JsonAbi;
use alloy_primitives::Address;

use crate::{DeployError, DeployResult};

/// A deployed module, the only way later steps address it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeployedHandle {
    /// Registry name.
    pub name: String,
    /// Address calls are sent to. For proxied modules this is the proxy.
    pub address: Address,
    /// ABI calls are encoded against. For proxied modules this is the implementation's.
    pub abi: Arc<JsonAbi>,
    /// Implementation behind the proxy, if the module is proxied.
    pub implementation: Option<Address>,
}

impl DeployedHandle {
    /// Creates a handle for a constructor-deployed module.
    pub fn new(name: impl Into<String>, address: Address, abi: Arc<JsonAbi>) -> Self {
        Self { name: name.into(), address, abi, implementation: None }
    }

    /// Returns `true` if the handle points at a proxy.
    pub const fn is_proxied(&self) -> bool {
        self.implementation.is_some()
    }
}

/// Append-only map of module name to [`DeployedHandle`].
///
/// Iteration follows insertion order, which is deployment order.
#[derive(Debug, Clone, Default)]
pub struct Registry {
    handles: Vec<DeployedHandle>,
    index: HashMap<String, usize>,
}

impl Registry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a handle. Fails if the name is already taken.
    pub fn insert(&mut self, handle: DeployedHandle) -> DeployResult<()> {
        if self.index.contains_key(&handle.name) {
            return Err(DeployError::DuplicateModule(handle.name));
        }
        self.index.insert(handle.name.clone(), self.handles.len());
        self.handles.push(handle);
        Ok(())
    }

    /// Looks up a handle by name.
    pub fn get(&self, name: &str) -> Option<&DeployedHandle> {
        self.index.get(name).map(|&i| &self.handles[i])
    }

    /// Looks up a handle by name, failing with [`DeployError::UnknownModule`].
    pub fn require(&self, name: &str) -> DeployResult<&DeployedHandle> {
        self.get(name).ok_or_else(|| DeployError::UnknownModule(name.to_string()))
    }

    /// Address of the module called `name`, if deployed.
    pub fn address(&self, name: &str) -> Option<Address> {
        self.get(name).map(|handle| handle.address)
    }

    /// Returns `true` if `name` has been deployed.
    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    /// Handles in deployment order.
    pub fn iter(&self) -> impl Iterator<Item = &DeployedHandle> {
        self.handles.iter()
    }

    /// Module names in deployment order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.handles.iter().map(|handle| handle.name.as_str())
    }

    /// Number of deployed modules.
    pub fn len(&self) -> usize {
        self.handles.len()
    }

    /// Returns `true` if nothing has been deployed.
    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }
}

impl<'a> IntoIterator for &'a Registry {
    type Item = &'a DeployedHandle;
    type IntoIter = std::slice::Iter<'a, DeployedHandle>;

    fn into_iter(self) -> Self::IntoIter {
        self.handles.iter()
    }
}
