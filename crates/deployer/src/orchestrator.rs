//! Sequential execution of a [`Pipeline`].
//!
//! A run walks the five phases in order and executes each step to
//! confirmation before starting the next. The registry is created fresh for
//! the run and threaded through every step. The first failure stops the run;
//! confirmed deployments stay on the ledger and are returned with the error.

use std::{
    collections::{HashMap, HashSet},
    sync::Arc,
};

use alloy_dyn_abi::DynSolValue;
use alloy_json_abi::JsonAbi;
use alloy_primitives::Address;
use tracing::{debug, error, info};

use crate::{
    ArtifactSource, DeployError, DeployResult, DeployedHandle, Environment, PipelineError, Registry,
    constants::{DEFAULT_INITIALIZER, DEFAULT_PROXY_ARTIFACT},
    deployer::ModuleDeployer,
    descriptor::{Arg, CallSpec, DeployKind, ModuleDescriptor, Scope, Target},
    encoding,
    environment::erc20_abi,
    ledger::Ledger,
    link,
    pipeline::{Phase, Pipeline, Step},
    proxy::ProxyDeployer,
};

/// Names used for proxied deployments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrchestratorConfig {
    /// Artifact of the transparent upgradeable proxy.
    pub proxy_artifact: String,
    /// Name of the initializer entrypoint on proxied modules.
    pub initializer: String,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            proxy_artifact: DEFAULT_PROXY_ARTIFACT.into(),
            initializer: DEFAULT_INITIALIZER.into(),
        }
    }
}

/// Executes pipelines against a ledger.
#[derive(Debug)]
pub struct Orchestrator<L, A> {
    modules: ModuleDeployer<L>,
    ledger: Arc<L>,
    artifacts: A,
    environment: Environment,
    config: OrchestratorConfig,
}

impl<L: Ledger, A: ArtifactSource> Orchestrator<L, A> {
    /// Creates an orchestrator submitting as `environment.deployer`.
    pub fn new(ledger: Arc<L>, artifacts: A, environment: Environment) -> Self {
        Self {
            modules: ModuleDeployer::new(Arc::clone(&ledger), environment.deployer),
            ledger,
            artifacts,
            environment,
            config: OrchestratorConfig::default(),
        }
    }

    /// Overrides the proxy artifact and initializer name.
    pub fn with_config(mut self, config: OrchestratorConfig) -> Self {
        self.config = config;
        self
    }

    /// The environment the orchestrator resolves against.
    pub const fn environment(&self) -> &Environment {
        &self.environment
    }

    /// Checks a pipeline without submitting anything.
    ///
    /// Loads every artifact and walks the steps in order, verifying that each
    /// module, library, token, and oracle a step needs is available by the time
    /// the step runs, that no name is deployed twice, and that every called
    /// function exists with the given number of arguments.
    pub fn preflight(&self, pipeline: &Pipeline) -> Result<(), PipelineError> {
        let mut known: HashMap<String, Arc<JsonAbi>> = HashMap::new();
        let mut deployed: HashSet<String> = HashSet::new();

        for (phase, index, step) in pipeline.iter() {
            self.check_step(step, &mut known, &mut deployed).map_err(|source| PipelineError {
                phase,
                index,
                step: step.to_string(),
                registry: Registry::new(),
                source,
            })?;
        }
        debug!(steps = pipeline.len(), "Preflight passed");
        Ok(())
    }

    /// Runs `pipeline` and returns the registry of everything it deployed.
    ///
    /// The pipeline is preflighted first, so ordering and artifact errors are
    /// reported before the first transaction.
    pub async fn run(&self, pipeline: &Pipeline) -> Result<Registry, PipelineError> {
        self.preflight(pipeline)?;
        let mut registry = Registry::new();

        for phase in Phase::ALL {
            let steps = pipeline.steps(phase);
            if steps.is_empty() {
                info!(%phase, "Phase has no steps, skipping");
                continue;
            }
            info!(%phase, steps = steps.len(), "Starting phase");

            for (index, step) in steps.iter().enumerate() {
                debug!(%phase, index, %step, "Executing step");
                if let Err(source) = self.execute(step, &mut registry).await {
                    error!(
                        %phase,
                        index,
                        %step,
                        error = %source,
                        deployed = registry.len(),
                        "Step failed"
                    );
                    let step = step.to_string();
                    return Err(PipelineError { phase, index, step, registry, source });
                }
            }

            info!(%phase, deployed = registry.len(), "Phase complete");
        }

        Ok(registry)
    }

    async fn execute(&self, step: &Step, registry: &mut Registry) -> DeployResult<()> {
        match step {
            Step::Deploy(descriptor) => {
                let handle = self.deploy_module(descriptor, registry).await?;
                registry.insert(handle)
            }
            Step::Call(call) => self.send(call, registry, None).await,
            Step::CallForEach { query, call } => {
                let items = self.query_array(query, registry).await?;
                info!(%query, %call, count = items.len(), "Calling once per element");
                for item in &items {
                    self.send(call, registry, Some(item)).await?;
                }
                Ok(())
            }
        }
    }

    async fn deploy_module(
        &self,
        descriptor: &ModuleDescriptor,
        registry: &Registry,
    ) -> DeployResult<DeployedHandle> {
        if registry.contains(&descriptor.name) {
            return Err(DeployError::DuplicateModule(descriptor.name.clone()));
        }
        for dependency in descriptor.dependencies() {
            registry.require(dependency)?;
        }

        let artifact = self.artifacts.load(&descriptor.artifact)?;
        let scope = self.scope(registry, None);

        match &descriptor.kind {
            DeployKind::Plain { constructor_args } => {
                let bytecode = link(&artifact, registry)?;
                let values = encoding::resolve_args(
                    encoding::constructor_params(&artifact.abi),
                    constructor_args,
                    &scope,
                    &descriptor.name,
                    "constructor",
                )?;
                let abi = Arc::clone(&artifact.abi);
                self.modules.deploy(&descriptor.name, &bytecode, abi, &values).await
            }
            DeployKind::Proxied { initializer_args } => {
                let initializer = encoding::select_function(
                    &artifact.abi,
                    &descriptor.name,
                    &self.config.initializer,
                    initializer_args.len(),
                )?;
                let values = encoding::resolve_args(
                    &initializer.inputs,
                    initializer_args,
                    &scope,
                    &descriptor.name,
                    &self.config.initializer,
                )?;
                let proxy = self.artifacts.load(&self.config.proxy_artifact)?;
                let admin = self.environment.admin;
                ProxyDeployer::new(&self.modules, proxy, admin, &self.config.initializer)
                    .deploy(&descriptor.name, &artifact, registry, &values)
                    .await
            }
        }
    }

    async fn send(
        &self,
        call: &CallSpec,
        registry: &Registry,
        item: Option<&DynSolValue>,
    ) -> DeployResult<()> {
        let (to, abi) = self.target(&call.target, registry)?;
        let label = call.target.to_string();
        let function = encoding::select_function(abi, &label, &call.function, call.args.len())?;
        let scope = self.scope(registry, item);
        let values =
            encoding::resolve_args(&function.inputs, &call.args, &scope, &label, &call.function)?;
        let input = encoding::encode_call(function, &label, &values)?;

        debug!(%call, %to, "Submitting call");
        let confirmation = self
            .ledger
            .send(self.modules.submitter(), to, input)
            .await
            .map_err(|e| DeployError::transaction(call.to_string(), e))?;

        info!(
            %call,
            tx_hash = %confirmation.tx_hash,
            gas_used = confirmation.gas_used,
            "Call confirmed"
        );
        Ok(())
    }

    async fn query_array(
        &self,
        query: &CallSpec,
        registry: &Registry,
    ) -> DeployResult<Vec<DynSolValue>> {
        let (to, abi) = self.target(&query.target, registry)?;
        let label = query.target.to_string();
        let function = encoding::select_function(abi, &label, &query.function, query.args.len())?;
        let scope = self.scope(registry, None);
        let values =
            encoding::resolve_args(&function.inputs, &query.args, &scope, &label, &query.function)?;
        let input = encoding::encode_call(function, &label, &values)?;

        let output = self
            .ledger
            .call(to, input)
            .await
            .map_err(|e| DeployError::transaction(query.to_string(), e))?;

        match encoding::decode_output(function, &label, &output)?.as_slice() {
            [DynSolValue::Array(items) | DynSolValue::FixedArray(items)] => Ok(items.clone()),
            _ => Err(DeployError::abi(label, &query.function, "expected a single array output")),
        }
    }

    fn target<'r>(
        &self,
        target: &Target,
        registry: &'r Registry,
    ) -> DeployResult<(Address, &'r JsonAbi)> {
        match target {
            Target::Module(name) => {
                let handle = registry.require(name)?;
                Ok((handle.address, &*handle.abi))
            }
            Target::Token(symbol) => Ok((self.environment.token(symbol)?, erc20_abi())),
        }
    }

    const fn scope<'s>(
        &'s self,
        registry: &'s Registry,
        item: Option<&'s DynSolValue>,
    ) -> Scope<'s> {
        Scope { registry, environment: &self.environment, item }
    }

    fn check_step(
        &self,
        step: &Step,
        known: &mut HashMap<String, Arc<JsonAbi>>,
        deployed: &mut HashSet<String>,
    ) -> DeployResult<()> {
        match step {
            Step::Deploy(descriptor) => {
                if deployed.contains(&descriptor.name) {
                    return Err(DeployError::DuplicateModule(descriptor.name.clone()));
                }
                for dependency in descriptor.dependencies() {
                    if !known.contains_key(dependency) {
                        return Err(DeployError::UnknownModule(dependency.to_string()));
                    }
                }
                let entrypoint = if descriptor.is_proxied() {
                    self.config.initializer.as_str()
                } else {
                    "constructor"
                };
                self.check_args(descriptor.args(), false, &descriptor.name, entrypoint)?;

                let artifact = self.artifacts.load(&descriptor.artifact)?;
                let mut libraries: Vec<&str> = artifact.libraries().collect();
                let proxy = if descriptor.is_proxied() {
                    let proxy = self.artifacts.load(&self.config.proxy_artifact)?;
                    encoding::select_function(
                        &artifact.abi,
                        &descriptor.name,
                        &self.config.initializer,
                        descriptor.args().len(),
                    )?;
                    Some(proxy)
                } else {
                    let params = encoding::constructor_params(&artifact.abi);
                    if params.len() != descriptor.args().len() {
                        return Err(DeployError::abi(
                            &descriptor.name,
                            "constructor",
                            format!(
                                "expected {} arguments, got {}",
                                params.len(),
                                descriptor.args().len()
                            ),
                        ));
                    }
                    None
                };
                if let Some(proxy) = &proxy {
                    libraries.extend(proxy.libraries());
                }
                let missing = libraries.into_iter().find(|library| !known.contains_key(*library));
                if let Some(library) = missing {
                    return Err(DeployError::UnresolvedLibrary {
                        module: descriptor.name.clone(),
                        library: library.to_string(),
                    });
                }

                deployed.insert(descriptor.name.clone());
                known.insert(descriptor.name.clone(), Arc::clone(&artifact.abi));
                Ok(())
            }
            Step::Call(call) => self.check_call(call, known, false),
            Step::CallForEach { query, call } => {
                self.check_call(query, known, false)?;
                self.check_call(call, known, true)
            }
        }
    }

    fn check_call(
        &self,
        call: &CallSpec,
        known: &HashMap<String, Arc<JsonAbi>>,
        item_bound: bool,
    ) -> DeployResult<()> {
        let missing = call.modules().into_iter().find(|module| !known.contains_key(*module));
        if let Some(module) = missing {
            return Err(DeployError::UnknownModule(module.to_string()));
        }
        let abi = match &call.target {
            Target::Module(name) => known
                .get(name)
                .map(|abi| &**abi)
                .ok_or_else(|| DeployError::UnknownModule(name.clone()))?,
            Target::Token(symbol) => {
                self.environment.token(symbol)?;
                erc20_abi()
            }
        };
        let label = call.target.to_string();
        encoding::select_function(abi, &label, &call.function, call.args.len())?;
        self.check_args(&call.args, item_bound, &label, &call.function)
    }

    /// Checks environment lookups and [`Arg::Item`] placement. Module
    /// references are checked by the caller.
    fn check_args(
        &self,
        args: &[Arg],
        item_bound: bool,
        target: &str,
        function: &str,
    ) -> DeployResult<()> {
        if !item_bound && args.iter().any(Arg::uses_item) {
            return Err(DeployError::abi(
                target,
                function,
                "element placeholder outside a per-element call",
            ));
        }
        for arg in args {
            match arg {
                Arg::Token(symbol) => {
                    self.environment.token(symbol)?;
                }
                Arg::Oracle(symbol) => {
                    self.environment.oracle(symbol)?;
                }
                Arg::List(items) => self.check_args(items, item_bound, target, function)?,
                _ => {}
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use alloy_primitives::U256;
    use rstest::rstest;

    use super::*;
    use crate::{
        MemoryArtifacts,
        pipeline::Wiring,
        test_utils::{LedgerCall, MockLedger, artifact, linked_artifact, proxy_artifact},
    };

    const DEPLOYER: Address = Address::repeat_byte(0xde);
    const ADMIN: Address = Address::repeat_byte(0xad);
    const DAI: Address = Address::repeat_byte(0xda);

    fn environment() -> Environment {
        Environment::new(DEPLOYER, ADMIN)
            .with_token("DAI", DAI)
            .with_oracle("DAI", Address::repeat_byte(0x0a))
    }

    fn artifacts() -> MemoryArtifacts {
        MemoryArtifacts::new()
            .with(proxy_artifact(DEFAULT_PROXY_ARTIFACT))
            .with(artifact("A", &[]))
            .with(linked_artifact(
                "B",
                "A",
                &["function initialize(address owner)", "function poke(uint8 slot)"],
            ))
            .with(artifact(
                "Directory",
                &[
                    "function initialize(address owner)",
                    "function setContract(uint8 slot, address module)",
                    "function setDependencies(uint8 slot, uint8[] on)",
                ],
            ))
            .with(artifact(
                "Market",
                &[
                    "function initialize(address directory)",
                    "function getActiveMaturities() view returns (uint32[])",
                    "function addLiquidity(uint32 maturity, uint128 cash)",
                ],
            ))
    }

    fn orchestrator(ledger: &Arc<MockLedger>) -> Orchestrator<MockLedger, MemoryArtifacts> {
        Orchestrator::new(Arc::clone(ledger), artifacts(), environment())
    }

    fn a_then_b() -> Pipeline {
        Pipeline::builder()
            .deploy(ModuleDescriptor::plain("A"))
            .phase(Phase::ProxiedCore)
            .deploy(ModuleDescriptor::proxied("B", [Arg::Deployer]))
            .build()
            .unwrap()
    }

    #[tokio::test]
    async fn test_linked_proxied_module_end_to_end() {
        crate::init_test_tracing();

        let ledger = Arc::new(MockLedger::new());
        let registry = orchestrator(&ledger).run(&a_then_b()).await.unwrap();

        let a = DEPLOYER.create(0);
        assert_eq!(registry.names().collect::<Vec<_>>(), ["A", "B"]);
        assert_eq!(registry.address("A"), Some(a));

        let b = registry.get("B").unwrap();
        assert_eq!(b.address, DEPLOYER.create(2));
        assert_eq!(b.implementation, Some(DEPLOYER.create(1)));

        let calls = ledger.calls();
        let LedgerCall::Deploy { code, .. } = &calls[1] else {
            panic!("expected implementation deployment")
        };
        assert_eq!(&code[10..30], a.as_slice());
    }

    #[tokio::test]
    async fn test_unresolved_library_fails_before_any_transaction() {
        let ledger = Arc::new(MockLedger::new());
        let pipeline = Pipeline::builder()
            .deploy(ModuleDescriptor::plain("Directory"))
            .phase(Phase::ProxiedCore)
            .deploy(ModuleDescriptor::proxied("B", [Arg::Deployer]))
            .build()
            .unwrap();

        let err = orchestrator(&ledger).run(&pipeline).await.unwrap_err();
        assert_eq!(err.phase, Phase::ProxiedCore);
        assert_eq!(err.index, 0);
        assert!(matches!(
            err.source,
            DeployError::UnresolvedLibrary { ref library, .. } if library == "A"
        ));
        assert!(ledger.calls().is_empty());
    }

    #[tokio::test]
    async fn test_missing_artifact_fails_preflight() {
        let ledger = Arc::new(MockLedger::new());
        let pipeline = Pipeline::builder().deploy(ModuleDescriptor::plain("Nope")).build().unwrap();

        let err = orchestrator(&ledger).run(&pipeline).await.unwrap_err();
        assert!(matches!(err.source, DeployError::ArtifactLoad { .. }));
        assert!(ledger.calls().is_empty());
    }

    #[tokio::test]
    async fn test_duplicate_module_fails_preflight() {
        let ledger = Arc::new(MockLedger::new());
        let pipeline = Pipeline::builder()
            .deploy(ModuleDescriptor::plain("A"))
            .deploy(ModuleDescriptor::plain("A"))
            .build()
            .unwrap();

        let err = orchestrator(&ledger).preflight(&pipeline).unwrap_err();
        assert_eq!(err.index, 1);
        assert!(matches!(err.source, DeployError::DuplicateModule(ref name) if name == "A"));
    }

    #[tokio::test]
    async fn test_reference_to_later_module_fails_preflight() {
        let ledger = Arc::new(MockLedger::new());
        let pipeline = Pipeline::builder()
            .deploy(ModuleDescriptor::proxied("Market", [Arg::module("Directory")]))
            .deploy(ModuleDescriptor::proxied("Directory", [Arg::Deployer]))
            .build()
            .unwrap();

        let err = orchestrator(&ledger).preflight(&pipeline).unwrap_err();
        assert!(matches!(err.source, DeployError::UnknownModule(ref name) if name == "Directory"));
    }

    #[tokio::test]
    async fn test_unknown_token_fails_preflight() {
        let ledger = Arc::new(MockLedger::new());
        let pipeline = Pipeline::builder()
            .phase(Phase::Bootstrap)
            .call(CallSpec::token("USDC", "approve", [Arg::Deployer, Arg::uint(1u8)]))
            .build()
            .unwrap();

        let err = orchestrator(&ledger).preflight(&pipeline).unwrap_err();
        assert!(matches!(err.source, DeployError::UnknownExternal { kind: "token", .. }));
    }

    #[tokio::test]
    async fn test_calls_target_proxy_address() {
        let ledger = Arc::new(MockLedger::new());
        let pipeline = Pipeline::builder()
            .deploy(ModuleDescriptor::plain("A"))
            .phase(Phase::ProxiedCore)
            .deploy(ModuleDescriptor::proxied("Directory", [Arg::Deployer]))
            .deploy(ModuleDescriptor::proxied("B", [Arg::Deployer]))
            .phase(Phase::Wiring)
            .wiring(Wiring::new("Directory").register(0, "B").register(1, "A").depends(0, [1]))
            .build()
            .unwrap();

        let registry = orchestrator(&ledger).run(&pipeline).await.unwrap();
        let directory = registry.get("Directory").unwrap();

        let sends: Vec<_> = ledger
            .calls()
            .into_iter()
            .filter_map(|call| match call {
                LedgerCall::Send { from, to, .. } => Some((from, to)),
                _ => None,
            })
            .collect();
        assert_eq!(sends.len(), 3);
        assert!(sends.iter().all(|&(from, to)| from == DEPLOYER && to == directory.address));
        assert_ne!(Some(directory.address), directory.implementation);
    }

    #[tokio::test]
    async fn test_token_call_uses_environment_address() {
        let ledger = Arc::new(MockLedger::new());
        let pipeline = Pipeline::builder()
            .deploy(ModuleDescriptor::plain("A"))
            .phase(Phase::Bootstrap)
            .call(CallSpec::token("DAI", "approve", [Arg::module("A"), Arg::Uint(U256::MAX)]))
            .build()
            .unwrap();

        orchestrator(&ledger).run(&pipeline).await.unwrap();
        let calls = ledger.calls();
        assert!(matches!(calls.last(), Some(LedgerCall::Send { to, .. }) if *to == DAI));
        assert_eq!(
            calls.last().and_then(LedgerCall::selector),
            Some(erc20_abi().function("approve").unwrap()[0].selector())
        );
    }

    #[tokio::test]
    async fn test_call_for_each_element() {
        let maturities = DynSolValue::Tuple(vec![DynSolValue::Array(vec![
            DynSolValue::Uint(U256::from(1_000u32), 32),
            DynSolValue::Uint(U256::from(2_000u32), 32),
            DynSolValue::Uint(U256::from(3_000u32), 32),
        ])])
        .abi_encode_params();
        let ledger = Arc::new(MockLedger::new().respond("getActiveMaturities()", maturities));

        let pipeline = Pipeline::builder()
            .phase(Phase::ProxiedCore)
            .deploy(ModuleDescriptor::proxied("Directory", [Arg::Deployer]))
            .deploy(ModuleDescriptor::proxied("Market", [Arg::module("Directory")]))
            .phase(Phase::Bootstrap)
            .call_for_each(
                CallSpec::module("Market", "getActiveMaturities", []),
                CallSpec::module("Market", "addLiquidity", [Arg::Item, Arg::uint(5u8)]),
            )
            .build()
            .unwrap();

        orchestrator(&ledger).run(&pipeline).await.unwrap();

        let market = artifacts().load("Market").unwrap();
        let add_liquidity = market.abi.function("addLiquidity").unwrap()[0].selector();
        let liquidity: Vec<_> = ledger
            .calls()
            .into_iter()
            .filter_map(|call| match call {
                LedgerCall::Send { input, .. } if input[..4] == add_liquidity[..] => {
                    Some(U256::from_be_slice(&input[4..36]))
                }
                _ => None,
            })
            .collect();
        assert_eq!(liquidity, [U256::from(1_000), U256::from(2_000), U256::from(3_000)]);
    }

    #[tokio::test]
    async fn test_item_outside_per_element_call_fails_preflight() {
        let ledger = Arc::new(MockLedger::new());
        let pipeline = Pipeline::builder()
            .deploy(ModuleDescriptor::proxied("Directory", [Arg::Deployer]))
            .call(CallSpec::module("Directory", "setContract", [Arg::uint(0u8), Arg::Item]))
            .build()
            .unwrap();

        assert!(matches!(
            orchestrator(&ledger).preflight(&pipeline).unwrap_err().source,
            DeployError::Abi { .. }
        ));
    }

    #[rstest]
    #[case::nested_in_call(
        Step::Call(CallSpec::module(
            "Directory",
            "setDependencies",
            [Arg::uint(0u8), Arg::list([Arg::Item])],
        ))
    )]
    #[case::in_initializer(Step::Deploy(ModuleDescriptor::proxied("Market", [Arg::Item])))]
    fn test_item_outside_per_element_call_is_rejected_at_any_depth(#[case] step: Step) {
        let ledger = Arc::new(MockLedger::new());
        let mut builder =
            Pipeline::builder().deploy(ModuleDescriptor::proxied("Directory", [Arg::Deployer]));
        builder = match step {
            Step::Deploy(descriptor) => builder.deploy(descriptor),
            Step::Call(call) => builder.call(call),
            Step::CallForEach { .. } => unreachable!(),
        };

        let err = orchestrator(&ledger).preflight(&builder.build().unwrap()).unwrap_err();
        assert_eq!(err.index, 1);
        assert!(matches!(err.source, DeployError::Abi { .. }));
    }

    #[rstest]
    #[case::target(CallSpec::module("Escrow", "poke", [Arg::uint(1u8)]), "Escrow")]
    #[case::argument(
        CallSpec::module("Directory", "setContract", [Arg::uint(0u8), Arg::module("Escrow")]),
        "Escrow"
    )]
    #[case::nested_argument(
        CallSpec::token("DAI", "approve", [Arg::list([Arg::module("Vault")]), Arg::uint(1u8)]),
        "Vault"
    )]
    fn test_call_on_undeployed_module_fails_preflight(
        #[case] call: CallSpec,
        #[case] missing: &str,
    ) {
        let ledger = Arc::new(MockLedger::new());
        let pipeline = Pipeline::builder()
            .deploy(ModuleDescriptor::proxied("Directory", [Arg::Deployer]))
            .call(call)
            .build()
            .unwrap();

        let err = orchestrator(&ledger).preflight(&pipeline).unwrap_err();
        assert!(matches!(err.source, DeployError::UnknownModule(ref name) if name == missing));
        assert!(ledger.calls().is_empty());
    }

    #[test]
    fn test_environment_accessor() {
        let ledger = Arc::new(MockLedger::new());
        let orchestrator = orchestrator(&ledger);
        assert_eq!(orchestrator.environment().deployer, DEPLOYER);
        assert_eq!(orchestrator.environment().token("DAI").unwrap(), DAI);
    }

    #[tokio::test]
    async fn test_failure_returns_confirmed_prefix() {
        crate::init_test_tracing();

        let ledger = Arc::new(MockLedger::new().revert_at(3));
        let pipeline = Pipeline::builder()
            .deploy(ModuleDescriptor::plain("A"))
            .phase(Phase::ProxiedCore)
            .deploy(ModuleDescriptor::proxied("Directory", [Arg::Deployer]))
            .deploy(ModuleDescriptor::proxied("B", [Arg::Deployer]))
            .build()
            .unwrap();

        let err = orchestrator(&ledger).run(&pipeline).await.unwrap_err();
        assert_eq!(err.phase, Phase::ProxiedCore);
        assert_eq!(err.index, 1);
        assert_eq!(err.step, "deploy B (proxied)");
        assert_eq!(err.registry.names().collect::<Vec<_>>(), ["A", "Directory"]);
        assert!(matches!(err.source, DeployError::Transaction { .. }));
        assert_eq!(ledger.transaction_count(), 4);
    }

    #[tokio::test]
    async fn test_runs_are_deterministic() {
        let first = Arc::new(MockLedger::new());
        let second = Arc::new(MockLedger::new());

        orchestrator(&first).run(&a_then_b()).await.unwrap();
        orchestrator(&second).run(&a_then_b()).await.unwrap();
        assert_eq!(first.calls(), second.calls());
    }

    #[tokio::test]
    async fn test_custom_proxy_artifact_and_initializer() {
        let ledger = Arc::new(MockLedger::new());
        let artifacts = MemoryArtifacts::new()
            .with(proxy_artifact("Proxy"))
            .with(artifact("Vault", &["function setup(address owner)"]));
        let orchestrator = Orchestrator::new(Arc::clone(&ledger), artifacts, environment())
            .with_config(OrchestratorConfig {
                proxy_artifact: "Proxy".into(),
                initializer: "setup".into(),
            });
        let pipeline = Pipeline::builder()
            .deploy(ModuleDescriptor::proxied("Vault", [Arg::Admin]))
            .build()
            .unwrap();

        let registry = orchestrator.run(&pipeline).await.unwrap();
        assert!(registry.get("Vault").unwrap().is_proxied());
    }
}
