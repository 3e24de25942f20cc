//! Compiled module artifacts.
//!
//! An artifact is the read-only description of one module: its ABI, its raw
//! bytecode as a `0x`-prefixed hex string, and the byte ranges inside that
//! bytecode that must be patched with library addresses before deployment.
//!
//! Artifact files follow the truffle/hardhat layout. `linkReferences` may be
//! nested by source file (`{file: {library: [..]}}`, as solc emits it) or flat
//! (`{library: [..]}`); both are flattened into library → occurrences.

use std::{
    collections::{BTreeMap, HashMap},
    fmt,
    path::{Path, PathBuf},
    sync::Arc,
};

use alloy_json_abi::JsonAbi;
use parking_lot::RwLock;
use serde::Deserialize;
use tracing::debug;

use crate::{DeployError, DeployResult};

/// One placeholder region inside an artifact's bytecode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Deserialize)]
pub struct LinkOccurrence {
    /// Byte offset of the placeholder within the bytecode payload.
    pub start: usize,
    /// Placeholder length in bytes.
    pub length: usize,
}

impl LinkOccurrence {
    /// Creates a new occurrence.
    pub const fn new(start: usize, length: usize) -> Self {
        Self { start, length }
    }
}

/// Compiled description of a module.
#[derive(Debug, Clone)]
pub struct Artifact {
    /// Artifact name, which is also its file stem.
    pub name: String,
    /// ABI description.
    pub abi: Arc<JsonAbi>,
    /// Raw bytecode, always `0x`-prefixed, possibly containing placeholders.
    pub bytecode: String,
    /// Library name → placeholder regions, sorted by offset.
    pub link_references: BTreeMap<String, Vec<LinkOccurrence>>,
}

impl Artifact {
    /// Creates an artifact without link references.
    ///
    /// A bytecode string without the `0x` prefix gets one, so link offsets always
    /// account for exactly two leading characters.
    pub fn new(name: impl Into<String>, abi: JsonAbi, bytecode: impl Into<String>) -> Self {
        let bytecode = bytecode.into();
        let bytecode =
            if bytecode.starts_with("0x") { bytecode } else { format!("0x{bytecode}") };
        Self { name: name.into(), abi: Arc::new(abi), bytecode, link_references: BTreeMap::new() }
    }

    /// Adds placeholder regions for `library`.
    pub fn with_link(
        mut self,
        library: impl Into<String>,
        occurrences: impl IntoIterator<Item = LinkOccurrence>,
    ) -> Self {
        let entry = self.link_references.entry(library.into()).or_default();
        entry.extend(occurrences);
        entry.sort_unstable();
        self
    }

    /// Parses an artifact from its JSON file contents.
    pub fn from_json(name: impl Into<String>, json: &str) -> DeployResult<Self> {
        let name = name.into();
        let raw: RawArtifact =
            serde_json::from_str(json).map_err(|e| DeployError::artifact(&name, e))?;

        let mut artifact = Self::new(name, raw.abi, raw.bytecode);
        for (key, entry) in raw.link_references {
            match entry {
                RawLinkEntry::Flat(occurrences) => {
                    artifact = artifact.with_link(key, occurrences);
                }
                RawLinkEntry::BySource(libraries) => {
                    for (library, occurrences) in libraries {
                        artifact = artifact.with_link(library, occurrences);
                    }
                }
            }
        }

        artifact.validate()?;
        Ok(artifact)
    }

    /// Names of every library this artifact links against, in sorted order.
    pub fn libraries(&self) -> impl Iterator<Item = &str> {
        self.link_references.keys().map(String::as_str)
    }

    /// Returns `true` if the bytecode has placeholders to patch.
    pub fn needs_linking(&self) -> bool {
        !self.link_references.is_empty()
    }

    fn validate(&self) -> DeployResult<()> {
        let payload = &self.bytecode[2..];
        if payload.is_empty() {
            return Err(DeployError::artifact(&self.name, "bytecode is empty"));
        }
        if !payload.is_ascii() {
            return Err(DeployError::artifact(&self.name, "bytecode is not an ASCII hex string"));
        }
        if payload.len() % 2 != 0 {
            return Err(DeployError::artifact(&self.name, "bytecode has an odd number of digits"));
        }
        Ok(())
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawArtifact {
    abi: JsonAbi,
    bytecode: String,
    #[serde(default)]
    link_references: BTreeMap<String, RawLinkEntry>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawLinkEntry {
    Flat(Vec<LinkOccurrence>),
    BySource(BTreeMap<String, Vec<LinkOccurrence>>),
}

/// Read-only lookup of artifacts by name.
pub trait ArtifactSource: Send + Sync + fmt::Debug {
    /// Loads the artifact called `name`.
    fn load(&self, name: &str) -> DeployResult<Arc<Artifact>>;
}

/// Artifacts read from `<dir>/<name>.json`, cached after the first load.
#[derive(Debug)]
pub struct DirArtifactStore {
    dir: PathBuf,
    cache: RwLock<HashMap<String, Arc<Artifact>>>,
}

impl DirArtifactStore {
    /// Creates a store rooted at `dir`.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into(), cache: RwLock::new(HashMap::new()) }
    }

    /// Directory the store reads from.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, name: &str) -> PathBuf {
        self.dir.join(format!("{name}.json"))
    }
}

impl ArtifactSource for DirArtifactStore {
    fn load(&self, name: &str) -> DeployResult<Arc<Artifact>> {
        if let Some(artifact) = self.cache.read().get(name) {
            return Ok(Arc::clone(artifact));
        }

        let path = self.path_for(name);
        let json = std::fs::read_to_string(&path)
            .map_err(|e| DeployError::artifact(name, format!("{}: {e}", path.display())))?;
        let artifact = Arc::new(Artifact::from_json(name, &json)?);
        debug!(
            artifact = name,
            path = %path.display(),
            libraries = artifact.link_references.len(),
            "Loaded artifact"
        );

        self.cache.write().insert(name.to_string(), Arc::clone(&artifact));
        Ok(artifact)
    }
}

/// Artifacts held in memory, keyed by name.
#[derive(Debug, Default, Clone)]
pub struct MemoryArtifacts {
    artifacts: HashMap<String, Arc<Artifact>>,
}

impl MemoryArtifacts {
    /// Creates an empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an artifact, replacing any artifact with the same name.
    pub fn insert(&mut self, artifact: Artifact) {
        self.artifacts.insert(artifact.name.clone(), Arc::new(artifact));
    }

    /// Builder-style [`Self::insert`].
    pub fn with(mut self, artifact: Artifact) -> Self {
        self.insert(artifact);
        self
    }
}

impl ArtifactSource for MemoryArtifacts {
    fn load(&self, name: &str) -> DeployResult<Arc<Artifact>> {
        self.artifacts
            .get(name)
            .cloned()
            .ok_or_else(|| DeployError::artifact(name, "no such artifact"))
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    const NESTED: &str = r#"{
        "contractName": "Escrow",
        "abi": [],
        "bytecode": "0x6080__$abcdef$__6040",
        "linkReferences": {
            "contracts/Liquidation.sol": {
                "Liquidation": [{ "start": 2, "length": 20 }, { "start": 1, "length": 20 }]
            },
            "contracts/RiskFramework.sol": {
                "RiskFramework": [{ "start": 40, "length": 20 }]
            }
        }
    }"#;

    #[test]
    fn test_from_json_flattens_nested_link_references() {
        let artifact = Artifact::from_json("Escrow", NESTED).unwrap();
        assert_eq!(artifact.libraries().collect::<Vec<_>>(), ["Liquidation", "RiskFramework"]);
        assert_eq!(
            artifact.link_references["Liquidation"],
            [LinkOccurrence::new(1, 20), LinkOccurrence::new(2, 20)]
        );
        assert!(artifact.needs_linking());
    }

    #[test]
    fn test_from_json_accepts_flat_link_references() {
        let json = r#"{
            "abi": [],
            "bytecode": "0x00",
            "linkReferences": { "Liquidation": [{ "start": 0, "length": 20 }] }
        }"#;
        let artifact = Artifact::from_json("Portfolios", json).unwrap();
        assert_eq!(artifact.link_references["Liquidation"], [LinkOccurrence::new(0, 20)]);
    }

    #[test]
    fn test_missing_link_references_means_no_linking() {
        let artifact =
            Artifact::from_json("WETH", r#"{ "abi": [], "bytecode": "0x6080" }"#).unwrap();
        assert!(!artifact.needs_linking());
    }

    #[test]
    fn test_bytecode_prefix_is_normalized() {
        let artifact = Artifact::from_json("WETH", r#"{ "abi": [], "bytecode": "6080" }"#).unwrap();
        assert_eq!(artifact.bytecode, "0x6080");
    }

    #[rstest]
    #[case::not_json("not json")]
    #[case::missing_bytecode(r#"{ "abi": [] }"#)]
    #[case::empty_bytecode(r#"{ "abi": [], "bytecode": "0x" }"#)]
    #[case::odd_digits(r#"{ "abi": [], "bytecode": "0x608" }"#)]
    fn test_malformed_artifacts_are_rejected(#[case] json: &str) {
        let err = Artifact::from_json("Broken", json).unwrap_err();
        assert!(matches!(err, DeployError::ArtifactLoad { ref name, .. } if name == "Broken"));
    }

    #[test]
    fn test_memory_artifacts_missing_name() {
        let store = MemoryArtifacts::new();
        assert!(matches!(store.load("Nope"), Err(DeployError::ArtifactLoad { .. })));
    }
}
