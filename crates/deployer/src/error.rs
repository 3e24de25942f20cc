//! Error types for the deployment core.

use alloy_primitives::TxHash;
use thiserror::Error;

use crate::{pipeline::Phase, registry::Registry};

/// Errors raised while loading, linking, deploying, or configuring a module.
///
/// None of these are recovered locally: the orchestrator aborts the run on the
/// first occurrence and surfaces it wrapped in a [`PipelineError`].
#[derive(Debug, Error)]
pub enum DeployError {
    /// The artifact is missing, unreadable, or structurally corrupt.
    #[error("artifact `{name}`: {reason}")]
    ArtifactLoad {
        /// Artifact name.
        name: String,
        /// What was wrong with it.
        reason: String,
    },

    /// A library referenced by the bytecode has not been deployed yet.
    #[error("module `{module}` links against `{library}` which is not in the registry")]
    UnresolvedLibrary {
        /// Module being linked.
        module: String,
        /// Library that could not be resolved.
        library: String,
    },

    /// The ledger rejected, failed to confirm, or reverted a transaction.
    #[error("transaction for {context} failed: {reason}")]
    Transaction {
        /// What the transaction was doing.
        context: String,
        /// Underlying failure.
        reason: String,
    },

    /// A deployment was confirmed but the receipt carries no contract address.
    #[error("deployment of `{module}` confirmed in {tx_hash} without a contract address")]
    AddressExtraction {
        /// Module whose deployment was confirmed.
        module: String,
        /// Hash of the confirming transaction.
        tx_hash: TxHash,
    },

    /// A module name was deployed twice in one run.
    #[error("module `{0}` is already registered")]
    DuplicateModule(String),

    /// A step referenced a module that is not in the registry.
    #[error("module `{0}` is not in the registry")]
    UnknownModule(String),

    /// A step referenced a token or oracle the environment does not provide.
    #[error("environment has no {kind} for `{symbol}`")]
    UnknownExternal {
        /// `token` or `oracle`.
        kind: &'static str,
        /// Currency symbol.
        symbol: String,
    },

    /// Arguments did not fit the target's ABI, or the ABI lacks the entrypoint.
    #[error("{target}.{function}: {reason}")]
    Abi {
        /// Module or token being called.
        target: String,
        /// Function, `constructor`, or initializer name.
        function: String,
        /// Mismatch description.
        reason: String,
    },
}

impl DeployError {
    /// Shorthand for an [`DeployError::ArtifactLoad`] error.
    pub fn artifact(name: impl Into<String>, reason: impl ToString) -> Self {
        Self::ArtifactLoad { name: name.into(), reason: reason.to_string() }
    }

    /// Shorthand for a [`DeployError::Transaction`] error.
    pub fn transaction(context: impl Into<String>, reason: impl ToString) -> Self {
        Self::Transaction { context: context.into(), reason: reason.to_string() }
    }

    /// Shorthand for an [`DeployError::Abi`] error.
    pub fn abi(
        target: impl Into<String>,
        function: impl Into<String>,
        reason: impl ToString,
    ) -> Self {
        Self::Abi { target: target.into(), function: function.into(), reason: reason.to_string() }
    }
}

/// Result type alias for deployment operations.
pub type DeployResult<T> = Result<T, DeployError>;

/// The first unrecoverable failure of a pipeline run.
///
/// Carries the registry as it stood when the run stopped: every module in it
/// was confirmed on the ledger and stays there, since nothing is rolled back.
#[derive(Debug, Error)]
#[error("{phase} step {index} ({step}) failed: {source}")]
pub struct PipelineError {
    /// Phase that was executing.
    pub phase: Phase,
    /// Index of the failing step within its phase.
    pub index: usize,
    /// Label of the failing step.
    pub step: String,
    /// Modules confirmed before the failure, in deployment order.
    pub registry: Registry,
    /// Underlying error.
    #[source]
    pub source: DeployError,
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case::artifact(
        DeployError::artifact("Escrow", "missing file"),
        "artifact `Escrow`: missing file"
    )]
    #[case::library(
        DeployError::UnresolvedLibrary { module: "Escrow".into(), library: "Liquidation".into() },
        "module `Escrow` links against `Liquidation` which is not in the registry"
    )]
    #[case::transaction(
        DeployError::transaction("deploy WETH", "reverted"),
        "transaction for deploy WETH failed: reverted"
    )]
    #[case::duplicate(
        DeployError::DuplicateModule("WETH".into()),
        "module `WETH` is already registered"
    )]
    #[case::external(
        DeployError::UnknownExternal { kind: "oracle", symbol: "DAI".into() },
        "environment has no oracle for `DAI`"
    )]
    fn test_deploy_error_display(#[case] error: DeployError, #[case] expected: &str) {
        assert_eq!(error.to_string(), expected);
    }

    #[test]
    fn test_pipeline_error_display_names_phase_and_step() {
        let err = PipelineError {
            phase: Phase::Wiring,
            index: 2,
            step: "Directory.setContract".into(),
            registry: Registry::new(),
            source: DeployError::UnknownModule("Escrow".into()),
        };
        assert_eq!(
            err.to_string(),
            "wiring step 2 (Directory.setContract) failed: module `Escrow` is not in the registry"
        );
    }
}
