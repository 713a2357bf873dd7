//! Thin JSON-RPC façade shared by every higher component: balance query,
//! read-only contract call, gas estimation, and signed-transaction
//! submission. Transactions are signed locally; the private key never leaves
//! the process.

use alloy::consensus::{SignableTransaction, TxEnvelope, TxLegacy};
use alloy::network::{TransactionBuilder, TxSignerSync};
use alloy::primitives::{Address, Bytes, TxKind, B256, U256};
use alloy::providers::Provider;
use alloy::rpc::types::TransactionRequest;
use alloy_provider::{DynProvider, PendingTransactionConfig};
use alloy_signer_local::PrivateKeySigner;

use crate::error::WalletError;
use crate::eth::ChainContext;

/// Gas limit used when estimation fails.
pub const GAS_FALLBACK: u64 = 150_000;

#[derive(Debug, Clone)]
pub struct ChainClient {
    provider: DynProvider,
    chain_id: Option<u64>,
}

impl ChainClient {
    pub fn new(ctx: &ChainContext) -> Self {
        Self {
            provider: ctx.provider(),
            chain_id: ctx.chain_id(),
        }
    }

    pub fn provider(&self) -> DynProvider {
        self.provider.clone()
    }

    /// Native balance in wei.
    pub async fn native_balance(&self, address: Address) -> Result<U256, WalletError> {
        self.provider
            .get_balance(address)
            .await
            .map_err(|e| WalletError::ChainRequest(format!("failed to query balance: {}", e)))
    }

    /// Read-only `eth_call` against the latest block.
    pub async fn call(&self, to: Address, data: Bytes) -> Result<Bytes, WalletError> {
        let tx = TransactionRequest::default().with_to(to).with_input(data);
        self.provider
            .call(tx)
            .await
            .map_err(|e| WalletError::ChainRequest(format!("eth_call failed: {}", e)))
    }

    /// Gas estimate with a +20% safety buffer; [`GAS_FALLBACK`] when the node
    /// refuses to estimate.
    pub async fn estimate_gas(
        &self,
        from: Address,
        to: Address,
        value: U256,
        data: Bytes,
    ) -> u64 {
        let tx = TransactionRequest::default()
            .with_from(from)
            .with_to(to)
            .with_value(value)
            .with_input(data);
        match self.provider.estimate_gas(tx).await {
            Ok(gas) if gas > 0 => buffered(gas),
            Ok(_) => GAS_FALLBACK,
            Err(e) => {
                tracing::warn!("gas estimation failed, using fallback: {}", e);
                GAS_FALLBACK
            }
        }
    }

    /// Current flat gas price (`eth_gasPrice`).
    pub async fn gas_price(&self) -> Result<u128, WalletError> {
        self.provider
            .get_gas_price()
            .await
            .map_err(|e| WalletError::ChainRequest(format!("failed to get gas price: {}", e)))
    }

    /// Builds a legacy transaction, signs it in-process, and broadcasts it.
    pub async fn send_raw(
        &self,
        signer: &PrivateKeySigner,
        to: Address,
        data: Bytes,
        value: U256,
        gas_price: u128,
        gas_limit: u64,
    ) -> Result<B256, WalletError> {
        let nonce = self
            .provider
            .get_transaction_count(signer.address())
            .await
            .map_err(|e| WalletError::ChainRequest(format!("failed to get nonce: {}", e)))?;

        let mut tx = TxLegacy {
            chain_id: self.chain_id,
            nonce,
            gas_price,
            gas_limit,
            to: TxKind::Call(to),
            value,
            input: data,
        };
        let signature = signer
            .sign_transaction_sync(&mut tx)
            .map_err(|e| WalletError::ChainRequest(format!("failed to sign transaction: {}", e)))?;
        let envelope = TxEnvelope::Legacy(tx.into_signed(signature));

        let pending = self
            .provider
            .send_tx_envelope(envelope)
            .await
            .map_err(|e| classify_send_error(&e.to_string()))?;
        Ok(*pending.tx_hash())
    }

    /// Waits for the transaction to land and returns its status, or `None`
    /// when no receipt was observed.
    pub async fn wait_for_receipt(&self, tx_hash: B256) -> Result<Option<bool>, WalletError> {
        let watcher = self
            .provider
            .watch_pending_transaction(PendingTransactionConfig::new(tx_hash))
            .await
            .map_err(|e| WalletError::ChainRequest(format!("failed to watch transaction: {}", e)))?;
        if watcher.await.is_err() {
            return Ok(None);
        }
        match self.provider.get_transaction_receipt(tx_hash).await {
            Ok(Some(receipt)) => Ok(Some(receipt.status())),
            Ok(None) => Ok(None),
            Err(e) => {
                tracing::warn!("receipt lookup failed for {tx_hash}: {}", e);
                Ok(None)
            }
        }
    }
}

fn buffered(gas: u64) -> u64 {
    gas.saturating_mul(12) / 10
}

/// The node reports fund shortfalls only through its rejection text, so the
/// match is on a substring. Kept in one place should a structured error code
/// become available.
fn classify_send_error(message: &str) -> WalletError {
    if message.to_lowercase().contains("insufficient funds") {
        WalletError::InsufficientFunds(message.to_string())
    } else {
        WalletError::ChainRequest(format!("failed to send transaction: {}", message))
    }
}
