//! ERC-20 metadata discovery, balance reads, and token transfers.
//!
//! All on-chain money amounts pass through [`crate::eth::amount`]; a token
//! with unknown `decimals` can be stored and listed but never moved.

use alloy::primitives::{Address, Bytes, B256, U256};
use alloy::sol_types::SolCall;
use bigdecimal::{BigDecimal, Zero};

use crate::error::WalletError;
use crate::eth::abi::Erc20;
use crate::eth::amount::{from_raw_u256, to_raw_u256};
use crate::eth::{parse_address, ChainClient, ChainContext};
use crate::store::{TransactionLog, TxLogStore, TxStatus, WalletProfile};
use crate::token_repository::TokenMeta;
use crate::wallet_service::unlock_signer;

pub struct TokenService {
    client: ChainClient,
    network_id: String,
}

impl TokenService {
    pub fn new(ctx: &ChainContext) -> Self {
        Self {
            client: ChainClient::new(ctx),
            network_id: ctx.network().id.clone(),
        }
    }

    /// Queries name, symbol, and decimals concurrently. Any failing leg
    /// fails the whole lookup; a contract that is not a well-behaved ERC-20
    /// is not silently half-described.
    pub async fn fetch_meta(&self, token_address: &str) -> Result<TokenMeta, WalletError> {
        let address = parse_address(token_address)?;
        let (name, symbol, decimals) = tokio::try_join!(
            self.call_contract(address, Erc20::nameCall {}),
            self.call_contract(address, Erc20::symbolCall {}),
            self.call_contract(address, Erc20::decimalsCall {}),
        )?;
        Ok(TokenMeta {
            network_id: self.network_id.clone(),
            address: format!("{:#x}", address),
            name: Some(name),
            symbol: Some(symbol),
            decimals: Some(decimals),
        })
    }

    /// Token balance of `owner`, scaled to a decimal amount.
    pub async fn balance(&self, token: &TokenMeta, owner: &str) -> Result<BigDecimal, WalletError> {
        let decimals = known_decimals(token)?;
        let owner = parse_address(owner)?;
        let contract = parse_address(&token.address)?;
        let raw: U256 = self
            .call_contract(contract, Erc20::balanceOfCall { owner })
            .await?;
        Ok(from_raw_u256(raw, decimals))
    }

    /// Signs and broadcasts `transfer(to, amount)`, logging it as pending.
    pub async fn transfer(
        &self,
        profile: &WalletProfile,
        password: &str,
        token: &TokenMeta,
        recipient: &str,
        amount: &BigDecimal,
        tx_logs: &dyn TxLogStore,
    ) -> Result<B256, WalletError> {
        let to = parse_address(recipient)?;
        let (contract, raw) = checked_raw_amount(token, amount)?;
        let calldata: Bytes = Erc20::transferCall { to, value: raw }.abi_encode().into();
        self.submit(profile, password, token, contract, calldata, amount, tx_logs)
            .await
    }

    /// Signs and broadcasts `approve(spender, amount)`, logging it as pending.
    pub async fn approve(
        &self,
        profile: &WalletProfile,
        password: &str,
        token: &TokenMeta,
        spender: &str,
        amount: &BigDecimal,
        tx_logs: &dyn TxLogStore,
    ) -> Result<B256, WalletError> {
        let spender = parse_address(spender)?;
        let (contract, raw) = checked_raw_amount(token, amount)?;
        let calldata: Bytes = Erc20::approveCall {
            spender,
            value: raw,
        }
        .abi_encode()
        .into();
        self.submit(profile, password, token, contract, calldata, amount, tx_logs)
            .await
    }

    async fn submit(
        &self,
        profile: &WalletProfile,
        password: &str,
        token: &TokenMeta,
        contract: Address,
        calldata: Bytes,
        amount: &BigDecimal,
        tx_logs: &dyn TxLogStore,
    ) -> Result<B256, WalletError> {
        let signer = unlock_signer(&profile.encrypted_secret, password)?;
        let gas_limit = self
            .client
            .estimate_gas(signer.address(), contract, U256::ZERO, calldata.clone())
            .await;
        let gas_price = self.client.gas_price().await?;
        let hash = self
            .client
            .send_raw(&signer, contract, calldata, U256::ZERO, gas_price, gas_limit)
            .await?;
        tracing::info!(
            "broadcast token tx {:#x} ({} {})",
            hash,
            amount,
            token.symbol.as_deref().unwrap_or("?")
        );
        tx_logs.save(TransactionLog::new(
            profile.address.clone(),
            format!("{:#x}", hash),
            amount.clone(),
            token.symbol.clone().unwrap_or_else(|| "TOKEN".to_string()),
            TxStatus::Pending,
        ))?;
        Ok(hash)
    }

    async fn call_contract<C: SolCall>(
        &self,
        to: Address,
        call: C,
    ) -> Result<C::Return, WalletError> {
        let data = self.client.call(to, call.abi_encode().into()).await?;
        C::abi_decode_returns(&data).map_err(|e| {
            WalletError::ChainRequest(format!(
                "failed to decode {} response: {}",
                C::SIGNATURE,
                e
            ))
        })
    }
}

fn known_decimals(token: &TokenMeta) -> Result<u8, WalletError> {
    token.decimals.ok_or_else(|| {
        WalletError::InvalidInput(format!("token {} has unknown decimals", token.address))
    })
}

fn checked_raw_amount(token: &TokenMeta, amount: &BigDecimal) -> Result<(Address, U256), WalletError> {
    if amount <= &BigDecimal::zero() {
        return Err(WalletError::InvalidInput(
            "amount must be positive".to_string(),
        ));
    }
    let decimals = known_decimals(token)?;
    let contract = parse_address(&token.address)?;
    Ok((contract, to_raw_u256(amount, decimals)?))
}
