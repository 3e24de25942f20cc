//! Test utilities: an in-memory [`Ledger`] and artifact builders.

use std::collections::HashMap;

use alloy_json_abi::JsonAbi;
use alloy_primitives::{Address, Bytes, Selector, TxHash, keccak256};
use async_trait::async_trait;
use parking_lot::Mutex;

use crate::{
    Artifact, LinkOccurrence,
    ledger::{Confirmation, Ledger, LedgerError, LedgerResult},
};

/// Chain id reported by [`MockLedger`].
pub const MOCK_CHAIN_ID: u64 = 1337;

/// Gas reported for every mock transaction.
const MOCK_GAS_USED: u64 = 21_000;

/// A call the [`MockLedger`] received, in arrival order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LedgerCall {
    /// Contract creation.
    Deploy {
        /// Submitter.
        from: Address,
        /// Bytecode with constructor arguments appended.
        code: Bytes,
        /// Address the creation was assigned.
        address: Address,
    },
    /// State-changing call.
    Send {
        /// Submitter.
        from: Address,
        /// Receiver.
        to: Address,
        /// Calldata.
        input: Bytes,
    },
    /// Read-only call.
    Call {
        /// Receiver.
        to: Address,
        /// Calldata.
        input: Bytes,
    },
}

impl LedgerCall {
    /// Selector of a `Send` or `Call`.
    pub fn selector(&self) -> Option<Selector> {
        match self {
            Self::Send { input, .. } | Self::Call { input, .. } if input.len() >= 4 => {
                Some(Selector::from_slice(&input[..4]))
            }
            _ => None,
        }
    }

    /// Returns `true` for calls that submit a transaction.
    pub const fn is_transaction(&self) -> bool {
        matches!(self, Self::Deploy { .. } | Self::Send { .. })
    }
}

#[derive(Debug, Default)]
struct MockState {
    calls: Vec<LedgerCall>,
    transactions: usize,
    nonces: HashMap<Address, u64>,
    responses: HashMap<Selector, Bytes>,
    revert_at: Option<usize>,
    omit_contract_address: bool,
}

/// In-memory ledger that confirms everything instantly.
///
/// Creation addresses are derived from the sender and a per-sender nonce, so
/// two runs with the same inputs produce the same addresses.
#[derive(Debug, Default)]
pub struct MockLedger {
    state: Mutex<MockState>,
}

impl MockLedger {
    /// Creates a ledger that accepts every transaction.
    pub fn new() -> Self {
        Self::default()
    }

    /// Reverts the `index`-th submitted transaction (zero-based).
    pub fn revert_at(self, index: usize) -> Self {
        self.state.lock().revert_at = Some(index);
        self
    }

    /// Confirms deployments without reporting a contract address.
    pub fn omit_contract_address(self) -> Self {
        self.state.lock().omit_contract_address = true;
        self
    }

    /// Answers read-only calls to `signature` (e.g. `getActiveMaturities()`) with `output`.
    pub fn respond(self, signature: &str, output: impl Into<Bytes>) -> Self {
        let selector = Selector::from_slice(&keccak256(signature.as_bytes())[..4]);
        self.state.lock().responses.insert(selector, output.into());
        self
    }

    /// Every call received so far.
    pub fn calls(&self) -> Vec<LedgerCall> {
        self.state.lock().calls.clone()
    }

    /// Number of transactions submitted so far.
    pub fn transaction_count(&self) -> usize {
        self.state.lock().transactions
    }

    /// Addresses assigned to contract creations, in order.
    pub fn deployed(&self) -> Vec<Address> {
        self.state
            .lock()
            .calls
            .iter()
            .filter_map(|call| match call {
                LedgerCall::Deploy { address, .. } => Some(*address),
                _ => None,
            })
            .collect()
    }

    /// Records a transaction and returns its hash, or the revert it was scripted to hit.
    fn submit(state: &mut MockState, call: LedgerCall) -> LedgerResult<TxHash> {
        let index = state.transactions;
        state.transactions += 1;
        state.calls.push(call);

        let tx_hash = keccak256((index as u64).to_be_bytes());
        if state.revert_at == Some(index) {
            return Err(LedgerError::Reverted(tx_hash));
        }
        Ok(tx_hash)
    }
}

#[async_trait]
impl Ledger for MockLedger {
    async fn deploy(&self, from: Address, code: Bytes) -> LedgerResult<Confirmation> {
        let mut state = self.state.lock();
        let nonce = state.nonces.entry(from).or_default();
        let address = from.create(*nonce);
        *nonce += 1;

        let tx_hash = Self::submit(&mut state, LedgerCall::Deploy { from, code, address })?;
        let contract_address = (!state.omit_contract_address).then_some(address);
        Ok(Confirmation {
            tx_hash,
            block_number: Some(1),
            gas_used: MOCK_GAS_USED,
            contract_address,
        })
    }

    async fn send(&self, from: Address, to: Address, input: Bytes) -> LedgerResult<Confirmation> {
        let mut state = self.state.lock();
        *state.nonces.entry(from).or_default() += 1;

        let tx_hash = Self::submit(&mut state, LedgerCall::Send { from, to, input })?;
        Ok(Confirmation {
            tx_hash,
            block_number: Some(1),
            gas_used: MOCK_GAS_USED,
            contract_address: None,
        })
    }

    async fn call(&self, to: Address, input: Bytes) -> LedgerResult<Bytes> {
        let mut state = self.state.lock();
        let call = LedgerCall::Call { to, input };
        let response = call.selector().and_then(|selector| state.responses.get(&selector).cloned());
        state.calls.push(call);
        response.ok_or_else(|| LedgerError::Call("no scripted response".into()))
    }

    async fn chain_id(&self) -> LedgerResult<u64> {
        Ok(MOCK_CHAIN_ID)
    }
}

/// Parses a human-readable ABI.
///
/// # Panics
///
/// Panics if a signature does not parse.
pub fn abi(signatures: &[&str]) -> JsonAbi {
    JsonAbi::parse(signatures.iter().copied()).expect("valid human-readable ABI")
}

/// An artifact with `signatures` as its ABI and a short runtime-free bytecode.
pub fn artifact(name: &str, signatures: &[&str]) -> Artifact {
    Artifact::new(name, abi(signatures), "0x6080604052348015600f57600080fd5b50")
}

/// An artifact whose bytecode embeds one placeholder for `library` at byte 10.
pub fn linked_artifact(name: &str, library: &str, signatures: &[&str]) -> Artifact {
    let placeholder = "__$5f1e2d3c4b5a69788796a5b4c3d2e1f0a9$__";
    let payload = format!("{}{placeholder}{}", "60".repeat(10), "00".repeat(12));
    Artifact::new(name, abi(signatures), format!("0x{payload}"))
        .with_link(library, [LinkOccurrence::new(10, 20)])
}

/// The transparent upgradeable proxy artifact.
pub fn proxy_artifact(name: &str) -> Artifact {
    artifact(name, &["constructor(address logic, address admin, bytes data)"])
}
