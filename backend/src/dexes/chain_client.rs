use alloy::network::{EthereumWallet, TransactionBuilder};
use alloy::primitives::{Address, Bytes, TxHash, U256};
use alloy::providers::{Provider, ProviderBuilder};
use alloy::rpc::types::TransactionRequest;
use alloy::signers::local::PrivateKeySigner;
use alloy::sol_types::SolCall;
use alloy::transports::{RpcError, TransportError};
use async_trait::async_trait;
use std::time::Duration;
use tokio::time::{sleep, timeout};
use tracing::{debug, info, instrument, warn};

use crate::dexes::{DexError, ProviderCache};

/// A transaction the executor wants mined.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransactionPlan {
    pub to: Address,
    pub calldata: Bytes,
    pub value: U256,
    /// `None` lets the node estimate.
    pub gas_limit: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TxReceiptSummary {
    pub tx_hash: TxHash,
    pub success: bool,
    pub block_number: Option<u64>,
    pub gas_used: u128,
}

/// On-chain read/write primitives the routing core consumes. Everything
/// behind this trait is an external collaborator.
#[async_trait]
pub trait ChainClient: Send + Sync {
    fn chain_id(&self) -> u64;

    /// Account that signs submitted transactions, if any.
    fn sender(&self) -> Option<Address>;

    /// Plain `eth_call` against a view function.
    async fn read_contract(&self, to: Address, calldata: Bytes) -> Result<Bytes, DexError>;

    /// `eth_call` of a state-mutating function (quoter simulations revert-and-report).
    async fn simulate_call(&self, to: Address, calldata: Bytes) -> Result<Bytes, DexError>;

    async fn submit_transaction(&self, plan: TransactionPlan) -> Result<TxHash, DexError>;

    async fn await_receipt(&self, tx_hash: TxHash) -> Result<TxReceiptSummary, DexError>;
}

/// Encode `call`, run it as a view read and decode the typed return.
pub async fn read_call<C: SolCall>(
    client: &dyn ChainClient,
    to: Address,
    call: C,
) -> Result<C::Return, DexError> {
    let calldata = Bytes::from(call.abi_encode());
    let data = client.read_contract(to, calldata).await?;
    decode_return::<C>(&data)
}

/// Encode `call`, simulate it and decode the typed return.
pub async fn simulate_call<C: SolCall>(
    client: &dyn ChainClient,
    to: Address,
    call: C,
) -> Result<C::Return, DexError> {
    let calldata = Bytes::from(call.abi_encode());
    let data = client.simulate_call(to, calldata).await?;
    decode_return::<C>(&data)
}

pub fn decode_return<C: SolCall>(data: &[u8]) -> Result<C::Return, DexError> {
    C::abi_decode_returns(data, true)
        .map_err(|e| DexError::Decode(format!("{}: {}", C::SIGNATURE, e)))
}

/// JSON-RPC backed client built on alloy's HTTP provider.
pub struct RpcChainClient {
    chain_id: u64,
    providers: ProviderCache,
    signer: Option<PrivateKeySigner>,
    receipt_poll_interval: Duration,
    receipt_timeout: Duration,
}

impl RpcChainClient {
    pub fn new(
        chain_id: u64,
        providers: ProviderCache,
        signer: Option<PrivateKeySigner>,
        receipt_poll_interval: Duration,
        receipt_timeout: Duration,
    ) -> Self {
        Self {
            chain_id,
            providers,
            signer,
            receipt_poll_interval,
            receipt_timeout,
        }
    }

    /// Reverts come back as JSON-RPC error payloads; everything else is transport.
    fn classify(&self, err: TransportError) -> DexError {
        match err {
            RpcError::ErrorResp(payload) => DexError::ContractCallFailed(payload.to_string()),
            other => {
                self.providers.report_failure(self.chain_id);
                DexError::Rpc(other.to_string())
            }
        }
    }

    async fn eth_call(&self, tx: TransactionRequest) -> Result<Bytes, DexError> {
        let provider = self.providers.get_provider(self.chain_id).await?;
        provider.call(&tx).await.map_err(|e| self.classify(e))
    }
}

#[async_trait]
impl ChainClient for RpcChainClient {
    fn chain_id(&self) -> u64 {
        self.chain_id
    }

    fn sender(&self) -> Option<Address> {
        self.signer.as_ref().map(|signer| signer.address())
    }

    async fn read_contract(&self, to: Address, calldata: Bytes) -> Result<Bytes, DexError> {
        let tx = TransactionRequest::default().with_to(to).with_input(calldata);
        self.eth_call(tx).await
    }

    async fn simulate_call(&self, to: Address, calldata: Bytes) -> Result<Bytes, DexError> {
        let mut tx = TransactionRequest::default().with_to(to).with_input(calldata);
        if let Some(from) = self.sender() {
            tx = tx.with_from(from);
        }
        self.eth_call(tx).await
    }

    #[instrument(skip(self, plan), fields(chain_id = self.chain_id, to = %plan.to))]
    async fn submit_transaction(&self, plan: TransactionPlan) -> Result<TxHash, DexError> {
        let signer = self.signer.clone().ok_or(DexError::SignerUnavailable(self.chain_id))?;
        let provider = self.providers.get_provider(self.chain_id).await?;
        let signing_provider = ProviderBuilder::new()
            .with_recommended_fillers()
            .wallet(EthereumWallet::from(signer))
            .on_provider(provider);

        let mut tx = TransactionRequest::default()
            .with_to(plan.to)
            .with_input(plan.calldata)
            .with_value(plan.value);
        if let Some(gas_limit) = plan.gas_limit {
            tx = tx.with_gas_limit(gas_limit.into());
        }

        let pending = signing_provider
            .send_transaction(tx)
            .await
            .map_err(|e| match e {
                RpcError::ErrorResp(payload) => DexError::TransactionFailed(payload.to_string()),
                other => DexError::Rpc(other.to_string()),
            })?;

        let tx_hash = *pending.tx_hash();
        info!(%tx_hash, "📤 Transaction submitted");
        Ok(tx_hash)
    }

    #[instrument(skip(self), fields(chain_id = self.chain_id))]
    async fn await_receipt(&self, tx_hash: TxHash) -> Result<TxReceiptSummary, DexError> {
        let provider = self.providers.get_provider(self.chain_id).await?;

        let poll = async {
            loop {
                match provider.get_transaction_receipt(tx_hash).await {
                    Ok(Some(receipt)) => {
                        return TxReceiptSummary {
                            tx_hash,
                            success: receipt.status(),
                            block_number: receipt.block_number,
                            gas_used: receipt.gas_used.into(),
                        };
                    }
                    Ok(None) => debug!(%tx_hash, "Receipt not yet available"),
                    Err(e) => warn!(%tx_hash, "Receipt poll failed: {}", e),
                }
                sleep(self.receipt_poll_interval).await;
            }
        };

        timeout(self.receipt_timeout, poll)
            .await
            .map_err(|_| DexError::Timeout(format!("receipt for {} not seen within {:?}", tx_hash, self.receipt_timeout)))
    }
}
