//! The ordered list of steps a run executes.

use std::{collections::BTreeMap, fmt};

use thiserror::Error;

use crate::descriptor::{Arg, CallSpec, ModuleDescriptor};

/// Deployment phases, in execution order.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Phase {
    /// Modules with no dependencies on other new modules.
    #[default]
    LeafDeploys,
    /// Proxied core modules, initialized at construction.
    ProxiedCore,
    /// Registration of core modules with the directory.
    Wiring,
    /// Parameters, listed currencies, and per-currency markets.
    DomainConfiguration,
    /// Initial deposits and liquidity.
    Bootstrap,
}

impl Phase {
    /// Every phase in execution order.
    pub const ALL: [Self; 5] = [
        Self::LeafDeploys,
        Self::ProxiedCore,
        Self::Wiring,
        Self::DomainConfiguration,
        Self::Bootstrap,
    ];

    /// Human-readable name.
    pub const fn name(self) -> &'static str {
        match self {
            Self::LeafDeploys => "leaf deploys",
            Self::ProxiedCore => "proxied core",
            Self::Wiring => "wiring",
            Self::DomainConfiguration => "domain configuration",
            Self::Bootstrap => "bootstrap",
        }
    }

    const fn index(self) -> usize {
        self as usize
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// One unit of work.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step {
    /// Deploy a module and register it.
    Deploy(ModuleDescriptor),
    /// Submit one configuration transaction.
    Call(CallSpec),
    /// Read an array with `query`, then submit `call` once per element with
    /// [`Arg::Item`] bound to it.
    CallForEach {
        /// Read-only call returning a single array.
        query: CallSpec,
        /// Call issued per element.
        call: CallSpec,
    },
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Deploy(descriptor) if descriptor.is_proxied() => {
                write!(f, "deploy {} (proxied)", descriptor.name)
            }
            Self::Deploy(descriptor) => write!(f, "deploy {}", descriptor.name),
            Self::Call(call) => write!(f, "{call}"),
            Self::CallForEach { query, call } => write!(f, "{call} for each {query}"),
        }
    }
}

/// Errors detected while assembling a [`Pipeline`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PipelineBuildError {
    /// A step was appended to a phase that has already been passed.
    #[error("cannot return to {requested} after {current}")]
    PhaseOrder {
        /// Phase being built.
        current: Phase,
        /// Earlier phase that was requested.
        requested: Phase,
    },

    /// A wiring slot was registered twice.
    #[error("wiring slot {0} is registered twice")]
    DuplicateSlot(u8),

    /// A dependency edge references a slot with no registered module.
    #[error("wiring slot {0} has no registered module")]
    UnknownSlot(u8),

    /// The currency given a cash market is not among the listed currencies.
    #[error("market currency {0} is not a listed currency")]
    UnlistedMarketCurrency(String),
}

/// Steps grouped by phase.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Pipeline {
    phases: [Vec<Step>; 5],
}

impl Pipeline {
    /// Starts a builder positioned at [`Phase::LeafDeploys`].
    pub fn builder() -> PipelineBuilder {
        PipelineBuilder::default()
    }

    /// Steps of `phase`, in order.
    pub fn steps(&self, phase: Phase) -> &[Step] {
        &self.phases[phase.index()]
    }

    /// Every step with its phase and index within the phase.
    pub fn iter(&self) -> impl Iterator<Item = (Phase, usize, &Step)> {
        Phase::ALL.into_iter().flat_map(|phase| {
            self.steps(phase).iter().enumerate().map(move |(i, step)| (phase, i, step))
        })
    }

    /// Total number of steps.
    pub fn len(&self) -> usize {
        self.phases.iter().map(Vec::len).sum()
    }

    /// Returns `true` if no phase has steps.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Appends steps phase by phase.
///
/// Phases may be skipped but never revisited; the first ordering error is
/// kept and reported by [`build`](Self::build).
#[derive(Debug, Default)]
pub struct PipelineBuilder {
    current: Phase,
    pipeline: Pipeline,
    error: Option<PipelineBuildError>,
}

impl PipelineBuilder {
    /// Moves to `phase`. Staying in the current phase is allowed.
    pub fn phase(mut self, phase: Phase) -> Self {
        if phase < self.current {
            self.fail(PipelineBuildError::PhaseOrder { current: self.current, requested: phase });
        } else {
            self.current = phase;
        }
        self
    }

    /// Appends a step to the current phase.
    pub fn step(mut self, step: Step) -> Self {
        self.pipeline.phases[self.current.index()].push(step);
        self
    }

    /// Appends a deployment.
    pub fn deploy(self, descriptor: ModuleDescriptor) -> Self {
        self.step(Step::Deploy(descriptor))
    }

    /// Appends a configuration call.
    pub fn call(self, call: CallSpec) -> Self {
        self.step(Step::Call(call))
    }

    /// Appends a per-element call driven by `query`.
    pub fn call_for_each(self, query: CallSpec, call: CallSpec) -> Self {
        self.step(Step::CallForEach { query, call })
    }

    /// Appends the calls `wiring` expands to.
    pub fn wiring(mut self, wiring: Wiring) -> Self {
        match wiring.into_steps() {
            Ok(steps) => {
                self.pipeline.phases[self.current.index()].extend(steps);
            }
            Err(err) => self.fail(err),
        }
        self
    }

    /// Finishes the pipeline.
    pub fn build(self) -> Result<Pipeline, PipelineBuildError> {
        match self.error {
            Some(err) => Err(err),
            None => Ok(self.pipeline),
        }
    }

    fn fail(&mut self, err: PipelineBuildError) {
        self.error.get_or_insert(err);
    }
}

/// Function on the directory that registers a module in a slot.
pub const SET_CONTRACT: &str = "setContract";

/// Function on the directory that declares a slot's dependencies.
pub const SET_DEPENDENCIES: &str = "setDependencies";

/// Directory registrations and dependency edges between numbered slots.
///
/// Expands to one `setContract(slot, module)` per registration in slot order,
/// followed by one `setDependencies(slot, slots)` per edge list in the order
/// declared.
#[derive(Debug, Clone)]
pub struct Wiring {
    directory: String,
    slots: BTreeMap<u8, String>,
    edges: Vec<(u8, Vec<u8>)>,
    duplicate: Option<u8>,
}

impl Wiring {
    /// Wiring performed on the module called `directory`.
    pub fn new(directory: impl Into<String>) -> Self {
        Self {
            directory: directory.into(),
            slots: BTreeMap::new(),
            edges: Vec::new(),
            duplicate: None,
        }
    }

    /// Registers `module` in `slot`.
    pub fn register(mut self, slot: u8, module: impl Into<String>) -> Self {
        if self.slots.insert(slot, module.into()).is_some() {
            self.duplicate.get_or_insert(slot);
        }
        self
    }

    /// Declares that the module in `slot` depends on the modules in `on`.
    pub fn depends(mut self, slot: u8, on: impl IntoIterator<Item = u8>) -> Self {
        self.edges.push((slot, on.into_iter().collect()));
        self
    }

    /// Expands into directory calls, checking that every slot is registered.
    pub fn into_steps(self) -> Result<Vec<Step>, PipelineBuildError> {
        if let Some(slot) = self.duplicate {
            return Err(PipelineBuildError::DuplicateSlot(slot));
        }
        for (slot, on) in &self.edges {
            if let Some(unknown) =
                std::iter::once(slot).chain(on).find(|slot| !self.slots.contains_key(*slot))
            {
                return Err(PipelineBuildError::UnknownSlot(*unknown));
            }
        }

        let registrations = self.slots.iter().map(|(slot, module)| {
            Step::Call(CallSpec::module(
                &self.directory,
                SET_CONTRACT,
                [Arg::uint(*slot), Arg::module(module)],
            ))
        });
        let dependencies = self.edges.iter().map(|(slot, on)| {
            Step::Call(CallSpec::module(
                &self.directory,
                SET_DEPENDENCIES,
                [Arg::uint(*slot), Arg::list(on.iter().copied().map(Arg::uint))],
            ))
        });
        Ok(registrations.chain(dependencies).collect())
    }
}
