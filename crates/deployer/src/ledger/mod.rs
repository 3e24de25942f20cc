//! Transaction submission seam.
//!
//! Everything that touches the chain goes through [`Ledger`]. Each submitting
//! method blocks until the transaction is confirmed, which is the only point at
//! which a deployment run suspends.

mod rpc;
pub use rpc::RpcLedger;

use alloy_primitives::{Address, Bytes, TxHash};
use async_trait::async_trait;
use thiserror::Error;

/// What the ledger reported for a confirmed transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Confirmation {
    /// Transaction hash.
    pub tx_hash: TxHash,
    /// Block the transaction was included in, when the node reports it.
    pub block_number: Option<u64>,
    /// Gas consumed.
    pub gas_used: u64,
    /// Address created by a contract-creation transaction.
    pub contract_address: Option<Address>,
}

/// Ledger-level failures.
#[derive(Debug, Error)]
pub enum LedgerError {
    /// The node refused the transaction.
    #[error("submission rejected: {0}")]
    Rejected(String),

    /// The transaction was sent but its receipt could not be obtained.
    #[error("no receipt for {tx_hash}: {reason}")]
    Receipt {
        /// Submitted transaction.
        tx_hash: TxHash,
        /// Underlying failure, including timeouts.
        reason: String,
    },

    /// The transaction was mined with a failing status.
    #[error("transaction {0} reverted")]
    Reverted(TxHash),

    /// A read-only call failed.
    #[error("call failed: {0}")]
    Call(String),
}

/// Result type alias for ledger operations.
pub type LedgerResult<T> = Result<T, LedgerError>;

/// A ledger that accepts transactions from the submitting identity.
#[async_trait]
pub trait Ledger: Send + Sync {
    /// Submits a contract creation with `code` (bytecode plus encoded constructor
    /// arguments) and waits for its confirmation.
    async fn deploy(&self, from: Address, code: Bytes) -> LedgerResult<Confirmation>;

    /// Submits a state-changing call to `to` and waits for its confirmation.
    async fn send(&self, from: Address, to: Address, input: Bytes) -> LedgerResult<Confirmation>;

    /// Executes a read-only call against the latest state.
    async fn call(&self, to: Address, input: Bytes) -> LedgerResult<Bytes>;

    /// Chain id of the ledger.
    async fn chain_id(&self) -> LedgerResult<u64>;
}
