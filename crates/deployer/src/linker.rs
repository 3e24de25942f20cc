//! Bytecode linking.
//!
//! Placeholders are patched directly in the hex string. An occurrence at byte
//! offset `o` with length `n` covers hex characters `[2o + 2, 2o + 2 + 2n)`; the
//! `+ 2` skips the `0x` prefix.

use alloy_primitives::{Address, Bytes, hex};

use crate::{Artifact, DeployError, DeployResult, Registry};

/// Number of hex characters before the bytecode payload.
const HEX_PREFIX_LEN: usize = 2;

/// Width of a placeholder, which is the width of an address.
const ADDRESS_LEN: usize = 20;

/// Bytecode with every placeholder replaced by a library address.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkedBytecode {
    module: String,
    hex: String,
}

impl LinkedBytecode {
    /// Name of the artifact the bytecode came from.
    pub fn module(&self) -> &str {
        &self.module
    }

    /// Linked bytecode as a `0x`-prefixed hex string.
    pub fn as_hex(&self) -> &str {
        &self.hex
    }

    /// Decodes the linked hex into raw bytes.
    ///
    /// Fails if a placeholder survived linking, which means the artifact's link
    /// references do not cover its bytecode.
    pub fn to_bytes(&self) -> DeployResult<Bytes> {
        hex::decode(&self.hex)
            .map(Bytes::from)
            .map_err(|e| DeployError::artifact(&self.module, format!("unlinked bytecode: {e}")))
    }
}

/// Replaces every placeholder in `artifact` with the address of the matching
/// library in `registry`.
///
/// Pure: the registry is only read. Libraries are resolved in name order, so a
/// missing library is reported deterministically.
pub fn link(artifact: &Artifact, registry: &Registry) -> DeployResult<LinkedBytecode> {
    if !artifact.bytecode.is_ascii() {
        return Err(DeployError::artifact(&artifact.name, "bytecode is not an ASCII hex string"));
    }
    let mut hex = artifact.bytecode.clone();
    if !artifact.needs_linking() {
        return Ok(LinkedBytecode { module: artifact.name.clone(), hex });
    }

    for (library, occurrences) in &artifact.link_references {
        let address = registry.address(library).ok_or_else(|| DeployError::UnresolvedLibrary {
            module: artifact.name.clone(),
            library: library.clone(),
        })?;
        let digits = address_digits(address);

        for occurrence in occurrences {
            if occurrence.length != ADDRESS_LEN {
                return Err(DeployError::artifact(
                    &artifact.name,
                    format!(
                        "link reference to `{library}` at byte {} spans {} bytes, expected {}",
                        occurrence.start,
                        occurrence.length,
                        ADDRESS_LEN
                    ),
                ));
            }

            let span = occurrence
                .start
                .checked_mul(2)
                .and_then(|offset| offset.checked_add(HEX_PREFIX_LEN))
                .and_then(|start| Some((start, start.checked_add(2 * occurrence.length)?)));
            let Some((start, end)) = span else {
                return Err(DeployError::artifact(
                    &artifact.name,
                    format!(
                        "link reference to `{library}` at byte {} is out of range",
                        occurrence.start
                    ),
                ));
            };
            if end > hex.len() {
                return Err(DeployError::artifact(
                    &artifact.name,
                    format!(
                        "link reference to `{library}` ends at hex index {end}, \
                         past bytecode length {}",
                        hex.len()
                    ),
                ));
            }

            hex.replace_range(start..end, &digits);
        }
    }

    debug_assert_eq!(hex.len(), artifact.bytecode.len());
    Ok(LinkedBytecode { module: artifact.name.clone(), hex })
}

/// The 40 lowercase hex digits of an address, without prefix.
fn address_digits(address: Address) -> String {
    hex::encode(address.as_slice())
}
