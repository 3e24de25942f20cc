//! ABI lookups and encoding against dynamically loaded ABIs.

use alloy_dyn_abi::{DynSolValue, FunctionExt, JsonAbiExt, Specifier};
use alloy_json_abi::{Function, JsonAbi, Param};
use alloy_primitives::Bytes;

use crate::{
    DeployError, DeployResult,
    descriptor::{Arg, Scope},
};

/// Label used for constructor errors.
const CONSTRUCTOR: &str = "constructor";

/// Finds the overload of `name` taking `arity` arguments.
pub(crate) fn select_function<'a>(
    abi: &'a JsonAbi,
    target: &str,
    name: &str,
    arity: usize,
) -> DeployResult<&'a Function> {
    let overloads = abi
        .function(name)
        .ok_or_else(|| DeployError::abi(target, name, "no such function in ABI"))?;
    overloads.iter().find(|function| function.inputs.len() == arity).ok_or_else(|| {
        DeployError::abi(target, name, format!("no overload takes {arity} arguments"))
    })
}

/// Parameters of the constructor, empty if the ABI declares none.
pub(crate) fn constructor_params(abi: &JsonAbi) -> &[Param] {
    abi.constructor.as_ref().map(|constructor| constructor.inputs.as_slice()).unwrap_or_default()
}

/// Resolves `args` against `params` positionally.
pub(crate) fn resolve_args(
    params: &[Param],
    args: &[Arg],
    scope: &Scope<'_>,
    target: &str,
    function: &str,
) -> DeployResult<Vec<DynSolValue>> {
    if params.len() != args.len() {
        return Err(DeployError::abi(
            target,
            function,
            format!("expected {} arguments, got {}", params.len(), args.len()),
        ));
    }
    params
        .iter()
        .zip(args)
        .map(|(param, arg)| {
            let ty = param.resolve().map_err(|e| DeployError::abi(target, function, e))?;
            arg.resolve(&ty, scope).map_err(|e| e.at(target, function))
        })
        .collect()
}

/// Encodes constructor arguments. A module without a constructor takes none.
pub(crate) fn encode_constructor(
    abi: &JsonAbi,
    target: &str,
    values: &[DynSolValue],
) -> DeployResult<Vec<u8>> {
    match &abi.constructor {
        Some(constructor) => constructor
            .abi_encode_input(values)
            .map_err(|e| DeployError::abi(target, CONSTRUCTOR, e)),
        None if values.is_empty() => Ok(Vec::new()),
        None => Err(DeployError::abi(
            target,
            CONSTRUCTOR,
            format!("ABI has no constructor but {} arguments were given", values.len()),
        )),
    }
}

/// Encodes a call, selector included.
pub(crate) fn encode_call(
    function: &Function,
    target: &str,
    values: &[DynSolValue],
) -> DeployResult<Bytes> {
    function
        .abi_encode_input(values)
        .map(Bytes::from)
        .map_err(|e| DeployError::abi(target, &function.name, e))
}

/// Decodes the return data of a read-only call.
pub(crate) fn decode_output(
    function: &Function,
    target: &str,
    data: &[u8],
) -> DeployResult<Vec<DynSolValue>> {
    function.abi_decode_output(data).map_err(|e| DeployError::abi(target, &function.name, e))
}
