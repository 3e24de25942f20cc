//! Loading, linking, and preflighting artifacts read from disk.

use std::{fs, path::Path, sync::Arc};

use alloy_json_abi::JsonAbi;
use alloy_primitives::{Address, Bytes};
use async_trait::async_trait;
use ledger_deployer::{
    Arg, ArtifactSource, Confirmation, DeployError, DeployedHandle, DirArtifactStore, Environment,
    Ledger, LedgerError, LedgerResult, ModuleDescriptor, Orchestrator, Phase, Pipeline, Registry,
    V1Config, link, v1,
};
use serde_json::json;

const PLACEHOLDER: &str = "__$5f1e2d3c4b5a69788796a5b4c3d2e1f0a9$__";
const LIQUIDATION: Address = Address::repeat_byte(0x11);

/// Refuses everything; preflight must not reach it.
#[derive(Debug)]
struct OfflineLedger;

#[async_trait]
impl Ledger for OfflineLedger {
    async fn deploy(&self, _from: Address, _code: Bytes) -> LedgerResult<Confirmation> {
        Err(LedgerError::Rejected("offline".into()))
    }

    async fn send(
        &self,
        _from: Address,
        _to: Address,
        _input: Bytes,
    ) -> LedgerResult<Confirmation> {
        Err(LedgerError::Rejected("offline".into()))
    }

    async fn call(&self, _to: Address, _input: Bytes) -> LedgerResult<Bytes> {
        Err(LedgerError::Call("offline".into()))
    }

    async fn chain_id(&self) -> LedgerResult<u64> {
        Err(LedgerError::Call("offline".into()))
    }
}

fn write_artifact(
    dir: &Path,
    name: &str,
    signatures: &[&str],
    bytecode: &str,
    links: serde_json::Value,
) {
    let abi = JsonAbi::parse(signatures.iter().copied()).unwrap();
    let artifact = json!({
        "contractName": name,
        "abi": abi,
        "bytecode": bytecode,
        "linkReferences": links,
    });
    fs::write(dir.join(format!("{name}.json")), artifact.to_string()).unwrap();
}

fn escrow_bytecode() -> String {
    format!("0x{}{}{}", "60".repeat(10), PLACEHOLDER, "00".repeat(12))
}

#[test]
fn test_load_and_link_from_directory() {
    let dir = tempfile::tempdir().unwrap();
    write_artifact(
        dir.path(),
        "Escrow",
        &["function deposit(address token, uint128 amount)"],
        &escrow_bytecode(),
        json!({ "contracts/Liquidation.sol": { "Liquidation": [{ "start": 10, "length": 20 }] } }),
    );

    let store = DirArtifactStore::new(dir.path());
    assert_eq!(store.dir(), dir.path());
    let escrow = store.load("Escrow").unwrap();
    assert!(escrow.needs_linking());
    assert_eq!(escrow.libraries().collect::<Vec<_>>(), ["Liquidation"]);

    let err = link(&escrow, &Registry::new()).unwrap_err();
    assert!(matches!(
        err,
        DeployError::UnresolvedLibrary { ref library, .. } if library == "Liquidation"
    ));

    let mut registry = Registry::new();
    registry
        .insert(DeployedHandle::new("Liquidation", LIQUIDATION, Arc::new(JsonAbi::new())))
        .unwrap();
    let code = link(&escrow, &registry).unwrap().to_bytes().unwrap();
    assert_eq!(code.len(), 42);
    assert_eq!(&code[10..30], LIQUIDATION.as_slice());
    assert!(code[..10].iter().all(|&b| b == 0x60));

    // Cached: removing the file does not affect later loads.
    fs::remove_file(dir.path().join("Escrow.json")).unwrap();
    assert!(Arc::ptr_eq(&escrow, &store.load("Escrow").unwrap()));
}

#[test]
fn test_missing_and_malformed_artifacts() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("Broken.json"), "{ \"abi\": [] }").unwrap();
    let store = DirArtifactStore::new(dir.path());

    assert!(matches!(store.load("Missing"), Err(DeployError::ArtifactLoad { .. })));
    assert!(matches!(store.load("Broken"), Err(DeployError::ArtifactLoad { .. })));
}

#[tokio::test]
async fn test_preflight_reads_artifacts_without_submitting() {
    let dir = tempfile::tempdir().unwrap();
    write_artifact(dir.path(), "Liquidation", &[], "0x6080604052", json!({}));
    write_artifact(
        dir.path(),
        "Escrow",
        &["constructor(address owner)"],
        &escrow_bytecode(),
        json!({ "Liquidation": [{ "start": 10, "length": 20 }] }),
    );

    let environment = Environment::new(Address::repeat_byte(0xde), Address::repeat_byte(0xad));
    let orchestrator =
        Orchestrator::new(Arc::new(OfflineLedger), DirArtifactStore::new(dir.path()), environment);

    let ordered = Pipeline::builder()
        .deploy(ModuleDescriptor::plain("Liquidation"))
        .deploy(ModuleDescriptor::plain("Escrow").with_constructor_args([Arg::Deployer]))
        .build()
        .unwrap();
    orchestrator.preflight(&ordered).unwrap();

    let reversed = Pipeline::builder()
        .deploy(ModuleDescriptor::plain("Escrow").with_constructor_args([Arg::Deployer]))
        .deploy(ModuleDescriptor::plain("Liquidation"))
        .build()
        .unwrap();
    let err = orchestrator.preflight(&reversed).unwrap_err();
    assert_eq!(err.index, 0);
    assert!(matches!(err.source, DeployError::UnresolvedLibrary { .. }));
    assert!(err.registry.is_empty());
}

#[tokio::test]
async fn test_v1_preflight_reports_first_missing_artifact() {
    ledger_deployer::init_test_tracing();

    let dir = tempfile::tempdir().unwrap();
    let environment = Environment::new(Address::repeat_byte(0xde), Address::repeat_byte(0xad));
    let orchestrator =
        Orchestrator::new(Arc::new(OfflineLedger), DirArtifactStore::new(dir.path()), environment);

    let pipeline = v1::pipeline(&V1Config::default()).unwrap();
    let err = orchestrator.run(&pipeline).await.unwrap_err();

    assert_eq!(err.phase, Phase::LeafDeploys);
    assert_eq!(err.index, 0);
    assert!(matches!(
        err.source,
        DeployError::ArtifactLoad { ref name, .. } if name == "ERC1820Registry"
    ));
    assert!(err.registry.is_empty());
}
