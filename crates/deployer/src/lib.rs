//! Dependency-ordered deployment of linked on-chain modules.
//!
//! A [`Pipeline`] lists typed steps in five phases: leaf deployments, proxied
//! core modules, directory wiring, domain configuration, and bootstrap. The
//! [`Orchestrator`] validates the whole pipeline against the artifacts and the
//! [`Environment`] before sending anything, then executes each step to
//! confirmation through a [`Ledger`], recording deployed modules in a
//! [`Registry`] that later steps resolve their arguments against.
//!
//! Library placeholders are patched by [`link`], plain deployments go through
//! [`ModuleDeployer`], and proxied ones through [`ProxyDeployer`]. The
//! lending-protocol graph itself lives in [`v1`].
#![doc(issue_tracker_base_url = "https://github.com/base/base/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![cfg_attr(not(test), warn(unused_crate_dependencies))]

#[cfg(not(any(test, feature = "test-utils")))]
use parking_lot as _;

mod artifact;
pub use artifact::{Artifact, ArtifactSource, DirArtifactStore, LinkOccurrence, MemoryArtifacts};

mod cli;
pub use cli::{Cli, CliStyles, DeployerArgs, LogArgs};

mod config;
pub use config::{ConfigError, DeployerConfig, parse_private_key, validate_url};

mod constants;
pub use constants::*;

mod deployer;
pub use deployer::ModuleDeployer;

mod descriptor;
pub use descriptor::{Arg, CallSpec, DeployKind, ModuleDescriptor, Target};

mod encoding;

mod environment;
pub use environment::{Environment, EnvironmentFile, erc20_abi};

mod error;
pub use error::*;

mod ledger;
pub use ledger::{Confirmation, Ledger, LedgerError, LedgerResult, RpcLedger};

mod linker;
pub use linker::{LinkedBytecode, link};

mod logging;
pub use logging::{
    LogConfig, LogFormat, StdoutLogConfig, init_test_tracing, verbosity_to_level_filter,
};

mod manifest;
pub use manifest::Manifest;

mod orchestrator;
pub use orchestrator::{Orchestrator, OrchestratorConfig};

mod pipeline;
pub use pipeline::{
    Phase, Pipeline, PipelineBuildError, PipelineBuilder, SET_CONTRACT, SET_DEPENDENCIES, Step,
    Wiring,
};

mod proxy;
pub use proxy::ProxyDeployer;

mod registry;
pub use registry::{DeployedHandle, Registry};

mod service;
pub use service::run;

pub mod v1;
pub use v1::V1Config;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;
