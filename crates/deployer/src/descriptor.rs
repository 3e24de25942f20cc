//! Typed descriptions of what to deploy and what to call.
//!
//! Arguments are symbolic until the step that uses them runs: module names are
//! looked up in the registry, currency symbols in the environment, and literal
//! values are checked against the ABI parameter type they are encoded as.

use std::fmt;

use alloy_dyn_abi::{DynSolType, DynSolValue};
use alloy_primitives::{Address, B256, Bytes, I256, U256, ruint::UintTryFrom};

use crate::{DeployError, Environment, Registry};

/// A symbolic argument to a constructor, initializer, or call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Arg {
    /// Address of a module deployed earlier in the run.
    Module(String),
    /// Address of an environment token.
    Token(String),
    /// Address of an environment price oracle.
    Oracle(String),
    /// The submitting identity.
    Deployer,
    /// The proxy administrator.
    Admin,
    /// A literal address.
    Address(Address),
    /// An unsigned integer, narrowed to the parameter's width on encoding.
    Uint(U256),
    /// A boolean.
    Bool(bool),
    /// Dynamic or fixed-size bytes, depending on the parameter.
    Bytes(Bytes),
    /// A string.
    String(String),
    /// An array or tuple, depending on the parameter.
    List(Vec<Arg>),
    /// The element bound by a [`Step::CallForEach`](crate::Step::CallForEach).
    Item,
}

impl Arg {
    /// Address of the module called `name`.
    pub fn module(name: impl Into<String>) -> Self {
        Self::Module(name.into())
    }

    /// Address of the token for `symbol`.
    pub fn token(symbol: impl Into<String>) -> Self {
        Self::Token(symbol.into())
    }

    /// Address of the oracle for `symbol`.
    pub fn oracle(symbol: impl Into<String>) -> Self {
        Self::Oracle(symbol.into())
    }

    /// An unsigned integer literal.
    pub fn uint<T>(value: T) -> Self
    where
        U256: UintTryFrom<T>,
    {
        Self::Uint(U256::from(value))
    }

    /// An array or tuple of arguments.
    pub fn list(items: impl IntoIterator<Item = Self>) -> Self {
        Self::List(items.into_iter().collect())
    }

    /// Appends every module this argument refers to, depth first.
    pub fn collect_modules<'a>(&'a self, out: &mut Vec<&'a str>) {
        match self {
            Self::Module(name) => out.push(name),
            Self::List(items) => items.iter().for_each(|item| item.collect_modules(out)),
            _ => {}
        }
    }

    /// Returns `true` if this argument, or any nested one, is [`Arg::Item`].
    pub fn uses_item(&self) -> bool {
        match self {
            Self::Item => true,
            Self::List(items) => items.iter().any(Self::uses_item),
            _ => false,
        }
    }

    /// Resolves the argument into a value of type `ty`.
    pub(crate) fn resolve(
        &self,
        ty: &DynSolType,
        scope: &Scope<'_>,
    ) -> Result<DynSolValue, Unresolved> {
        let value = match (ty, self) {
            (DynSolType::Address, Self::Module(name)) => {
                DynSolValue::Address(scope.registry.require(name)?.address)
            }
            (DynSolType::Address, Self::Token(symbol)) => {
                DynSolValue::Address(scope.environment.token(symbol)?)
            }
            (DynSolType::Address, Self::Oracle(symbol)) => {
                DynSolValue::Address(scope.environment.oracle(symbol)?)
            }
            (DynSolType::Address, Self::Deployer) => {
                DynSolValue::Address(scope.environment.deployer)
            }
            (DynSolType::Address, Self::Admin) => DynSolValue::Address(scope.environment.admin),
            (DynSolType::Address, Self::Address(address)) => DynSolValue::Address(*address),
            (DynSolType::Uint(bits), Self::Uint(value)) => {
                if value.bit_len() > *bits {
                    return Err(Unresolved::Mismatch(format!("{value} does not fit in uint{bits}")));
                }
                DynSolValue::Uint(*value, *bits)
            }
            (DynSolType::Int(bits), Self::Uint(value)) => {
                if value.bit_len() >= *bits {
                    return Err(Unresolved::Mismatch(format!("{value} does not fit in int{bits}")));
                }
                DynSolValue::Int(I256::from_raw(*value), *bits)
            }
            (DynSolType::Bool, Self::Bool(value)) => DynSolValue::Bool(*value),
            (DynSolType::Bytes, Self::Bytes(bytes)) => DynSolValue::Bytes(bytes.to_vec()),
            (DynSolType::FixedBytes(size), Self::Bytes(bytes)) => {
                if bytes.len() != *size {
                    return Err(Unresolved::Mismatch(format!(
                        "{} bytes given for bytes{size}",
                        bytes.len()
                    )));
                }
                DynSolValue::FixedBytes(B256::right_padding_from(bytes), *size)
            }
            (DynSolType::String, Self::String(value)) => DynSolValue::String(value.clone()),
            (DynSolType::Array(inner), Self::List(items)) => DynSolValue::Array(
                items.iter().map(|item| item.resolve(inner, scope)).collect::<Result<_, _>>()?,
            ),
            (DynSolType::FixedArray(inner, len), Self::List(items)) => {
                if items.len() != *len {
                    return Err(Unresolved::Mismatch(format!(
                        "{} elements given for {}",
                        items.len(),
                        ty.sol_type_name()
                    )));
                }
                DynSolValue::FixedArray(
                    items.iter().map(|item| item.resolve(inner, scope)).collect::<Result<_, _>>()?,
                )
            }
            (DynSolType::Tuple(types), Self::List(items)) => {
                if items.len() != types.len() {
                    return Err(Unresolved::Mismatch(format!(
                        "{} fields given for {}",
                        items.len(),
                        ty.sol_type_name()
                    )));
                }
                DynSolValue::Tuple(
                    items
                        .iter()
                        .zip(types)
                        .map(|(item, ty)| item.resolve(ty, scope))
                        .collect::<Result<_, _>>()?,
                )
            }
            (_, Self::Item) => match scope.item {
                Some(item) if ty.matches(item) => item.clone(),
                Some(_) => {
                    return Err(Unresolved::Mismatch(format!(
                        "bound element is not a {}",
                        ty.sol_type_name()
                    )));
                }
                None => return Err(Unresolved::Mismatch("no element is bound".into())),
            },
            (ty, arg) => {
                return Err(Unresolved::Mismatch(format!(
                    "{arg} cannot be encoded as {}",
                    ty.sol_type_name()
                )));
            }
        };
        Ok(value)
    }
}

impl fmt::Display for Arg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Module(name) => write!(f, "module {name}"),
            Self::Token(symbol) => write!(f, "token {symbol}"),
            Self::Oracle(symbol) => write!(f, "oracle {symbol}"),
            Self::Deployer => f.write_str("deployer"),
            Self::Admin => f.write_str("admin"),
            Self::Address(address) => write!(f, "{address}"),
            Self::Uint(value) => write!(f, "{value}"),
            Self::Bool(value) => write!(f, "{value}"),
            Self::Bytes(bytes) => write!(f, "{bytes}"),
            Self::String(value) => write!(f, "{value:?}"),
            Self::List(items) => {
                f.write_str("[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{item}")?;
                }
                f.write_str("]")
            }
            Self::Item => f.write_str("item"),
        }
    }
}

/// What symbolic arguments resolve against.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Scope<'a> {
    pub(crate) registry: &'a Registry,
    pub(crate) environment: &'a Environment,
    pub(crate) item: Option<&'a DynSolValue>,
}

/// Why an argument could not be resolved.
#[derive(Debug)]
pub(crate) enum Unresolved {
    /// A name lookup failed.
    Lookup(DeployError),
    /// The argument does not fit the parameter type.
    Mismatch(String),
}

impl From<DeployError> for Unresolved {
    fn from(err: DeployError) -> Self {
        Self::Lookup(err)
    }
}

impl Unresolved {
    /// Attaches the call site to a mismatch.
    pub(crate) fn at(self, target: &str, function: &str) -> DeployError {
        match self {
            Self::Lookup(err) => err,
            Self::Mismatch(reason) => DeployError::abi(target, function, reason),
        }
    }
}

/// How a module is brought onto the ledger.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeployKind {
    /// Deployed directly; arguments go to the constructor.
    Plain {
        /// Constructor arguments.
        constructor_args: Vec<Arg>,
    },
    /// Deployed behind a transparent upgradeable proxy; arguments go to the
    /// initializer executed by the proxy constructor.
    Proxied {
        /// Initializer arguments.
        initializer_args: Vec<Arg>,
    },
}

/// One module of the deployment graph.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleDescriptor {
    /// Registry key.
    pub name: String,
    /// Artifact backing the module. Several modules may share one artifact.
    pub artifact: String,
    /// Plain or proxied deployment.
    pub kind: DeployKind,
    /// Modules that must be deployed first in addition to those referenced by
    /// the arguments.
    pub depends_on: Vec<String>,
}

impl ModuleDescriptor {
    /// A module deployed from the artifact of the same name with no constructor arguments.
    pub fn plain(name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            artifact: name.clone(),
            name,
            kind: DeployKind::Plain { constructor_args: Vec::new() },
            depends_on: Vec::new(),
        }
    }

    /// A proxied module deployed from the artifact of the same name.
    pub fn proxied(
        name: impl Into<String>,
        initializer_args: impl IntoIterator<Item = Arg>,
    ) -> Self {
        let name = name.into();
        Self {
            artifact: name.clone(),
            name,
            kind: DeployKind::Proxied { initializer_args: initializer_args.into_iter().collect() },
            depends_on: Vec::new(),
        }
    }

    /// Uses a different artifact than the module name.
    pub fn from_artifact(mut self, artifact: impl Into<String>) -> Self {
        self.artifact = artifact.into();
        self
    }

    /// Sets constructor arguments. Turns a proxied descriptor into a plain one.
    pub fn with_constructor_args(mut self, args: impl IntoIterator<Item = Arg>) -> Self {
        self.kind = DeployKind::Plain { constructor_args: args.into_iter().collect() };
        self
    }

    /// Adds an explicit ordering dependency.
    pub fn depends_on(mut self, module: impl Into<String>) -> Self {
        self.depends_on.push(module.into());
        self
    }

    /// Constructor or initializer arguments.
    pub fn args(&self) -> &[Arg] {
        match &self.kind {
            DeployKind::Plain { constructor_args } => constructor_args,
            DeployKind::Proxied { initializer_args } => initializer_args,
        }
    }

    /// Returns `true` if the module is deployed behind a proxy.
    pub const fn is_proxied(&self) -> bool {
        matches!(self.kind, DeployKind::Proxied { .. })
    }

    /// Every module that must be in the registry before this one is deployed,
    /// without duplicates, explicit dependencies first.
    ///
    /// Libraries the artifact links against are not included; they are known
    /// only once the artifact is loaded.
    pub fn dependencies(&self) -> Vec<&str> {
        let mut referenced = Vec::new();
        self.args().iter().for_each(|arg| arg.collect_modules(&mut referenced));

        let mut out: Vec<&str> = Vec::new();
        for name in self.depends_on.iter().map(String::as_str).chain(referenced) {
            if !out.contains(&name) {
                out.push(name);
            }
        }
        out
    }
}

/// The receiver of a configuration call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Target {
    /// A module in the registry.
    Module(String),
    /// An environment token, called through the ERC-20 ABI.
    Token(String),
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Module(name) => f.write_str(name),
            Self::Token(symbol) => write!(f, "token:{symbol}"),
        }
    }
}

/// A single function call on a target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallSpec {
    /// Receiver.
    pub target: Target,
    /// Function name. Overloads are disambiguated by argument count.
    pub function: String,
    /// Arguments.
    pub args: Vec<Arg>,
}

impl CallSpec {
    /// A call on a registry module.
    pub fn module(
        name: impl Into<String>,
        function: impl Into<String>,
        args: impl IntoIterator<Item = Arg>,
    ) -> Self {
        Self {
            target: Target::Module(name.into()),
            function: function.into(),
            args: args.into_iter().collect(),
        }
    }

    /// A call on an environment token.
    pub fn token(
        symbol: impl Into<String>,
        function: impl Into<String>,
        args: impl IntoIterator<Item = Arg>,
    ) -> Self {
        Self {
            target: Target::Token(symbol.into()),
            function: function.into(),
            args: args.into_iter().collect(),
        }
    }

    /// Modules the call depends on, the target included.
    pub fn modules(&self) -> Vec<&str> {
        let mut out = Vec::new();
        if let Target::Module(name) = &self.target {
            out.push(name.as_str());
        }
        self.args.iter().for_each(|arg| arg.collect_modules(&mut out));
        out
    }
}

impl fmt::Display for CallSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.target, self.function)
    }
}
