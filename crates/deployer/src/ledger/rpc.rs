//! [`Ledger`] backed by a JSON-RPC node.

use std::time::Duration;

use alloy_network::{EthereumWallet, ReceiptResponse, TransactionBuilder};
use alloy_primitives::{Address, Bytes};
use alloy_provider::{DynProvider, Provider, ProviderBuilder};
use alloy_rpc_types_eth::{TransactionInput, TransactionReceipt, TransactionRequest};
use alloy_signer_local::PrivateKeySigner;
use async_trait::async_trait;
use tracing::debug;
use url::Url;

use super::{Confirmation, Ledger, LedgerError, LedgerResult};

/// Ledger that signs locally and submits over HTTP.
///
/// Nonce, gas, and fee values are filled by the provider. Receipt polling is
/// bounded by `receipt_timeout`; nothing is retried.
pub struct RpcLedger {
    provider: DynProvider,
    rpc_url: Url,
    signer_address: Address,
    receipt_timeout: Duration,
}

impl std::fmt::Debug for RpcLedger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RpcLedger")
            .field("rpc_url", &self.rpc_url.as_str())
            .field("signer_address", &self.signer_address)
            .field("receipt_timeout", &self.receipt_timeout)
            .finish_non_exhaustive()
    }
}

impl RpcLedger {
    /// Connects to `rpc_url`, signing with `signer`.
    pub fn new(rpc_url: Url, signer: PrivateKeySigner, receipt_timeout: Duration) -> Self {
        let signer_address = signer.address();
        let wallet = EthereumWallet::from(signer);
        let provider = ProviderBuilder::new().wallet(wallet).connect_http(rpc_url.clone()).erased();

        Self { provider, rpc_url, signer_address, receipt_timeout }
    }

    /// Address of the signing key, the only identity this ledger can submit from.
    pub const fn signer_address(&self) -> Address {
        self.signer_address
    }

    async fn submit(&self, tx: TransactionRequest) -> LedgerResult<Confirmation> {
        let pending = self
            .provider
            .send_transaction(tx)
            .await
            .map_err(|e| LedgerError::Rejected(e.to_string()))?;

        let tx_hash = *pending.tx_hash();
        debug!(%tx_hash, "Transaction sent, waiting for receipt");

        let receipt: TransactionReceipt = pending
            .with_timeout(Some(self.receipt_timeout))
            .get_receipt()
            .await
            .map_err(|e| LedgerError::Receipt { tx_hash, reason: e.to_string() })?;

        if !receipt.status() {
            return Err(LedgerError::Reverted(tx_hash));
        }

        Ok(Confirmation {
            tx_hash,
            block_number: receipt.block_number(),
            gas_used: receipt.gas_used(),
            contract_address: receipt.contract_address(),
        })
    }

    fn check_sender(&self, from: Address) -> LedgerResult<()> {
        if from != self.signer_address {
            return Err(LedgerError::Rejected(format!(
                "no signing key for {from}, ledger signs as {}",
                self.signer_address
            )));
        }
        Ok(())
    }
}

#[async_trait]
impl Ledger for RpcLedger {
    async fn deploy(&self, from: Address, code: Bytes) -> LedgerResult<Confirmation> {
        self.check_sender(from)?;
        let tx = TransactionRequest::default().from(from).with_deploy_code(code);
        self.submit(tx).await
    }

    async fn send(&self, from: Address, to: Address, input: Bytes) -> LedgerResult<Confirmation> {
        self.check_sender(from)?;
        let tx =
            TransactionRequest::default().from(from).to(to).input(TransactionInput::new(input));
        self.submit(tx).await
    }

    async fn call(&self, to: Address, input: Bytes) -> LedgerResult<Bytes> {
        let tx = TransactionRequest::default().to(to).input(TransactionInput::new(input));
        self.provider.call(tx).await.map_err(|e| LedgerError::Call(e.to_string()))
    }

    async fn chain_id(&self) -> LedgerResult<u64> {
        self.provider.get_chain_id().await.map_err(|e| LedgerError::Call(e.to_string()))
    }
}
