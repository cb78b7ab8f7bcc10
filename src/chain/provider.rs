//! Deadline-bound chain provider over an HTTP JSON-RPC endpoint

use super::ChainState;
use crate::error::{HarnessError, HarnessResult};

use async_trait::async_trait;
use ethers::prelude::*;
use ethers::providers::{Http, Provider};
use ethers::types::transaction::eip2718::TypedTransaction;
use serde_json::Value;
use std::future::Future;
use std::time::Duration;
use tokio::time::timeout;
use tracing::{debug, info, warn};

/// HTTP provider wrapper where every call carries a deadline
pub struct ChainProvider {
    /// Node URL
    url: String,
    /// Underlying ethers provider
    http: Provider<Http>,
    /// Per-request deadline
    request_timeout: Duration,
}

impl ChainProvider {
    /// Create a new chain provider
    pub fn new(url: &str, request_timeout: Duration) -> HarnessResult<Self> {
        let http = Provider::<Http>::try_from(url).map_err(|e| HarnessError::NodeUnreachable {
            url: url.to_string(),
            message: e.to_string(),
        })?;
        debug!("Created HTTP provider for {}", url);

        Ok(Self {
            url: url.to_string(),
            http: http.interval(Duration::from_millis(100)),
            request_timeout,
        })
    }

    /// Readiness probe: the node must answer `eth_chainId` within the deadline
    pub async fn ensure_ready(&self, expected_chain_id: u64) -> HarnessResult<()> {
        let chain_id = self
            .bounded("eth_chainId", self.http.get_chainid())
            .await
            .map_err(|e| HarnessError::NodeUnreachable {
                url: self.url.clone(),
                message: e.to_string(),
            })?;

        if chain_id.as_u64() != expected_chain_id {
            warn!(
                "Node at {} reports chain id {} but {} is configured; signatures use the configured id",
                self.url, chain_id, expected_chain_id
            );
        } else {
            info!("Node at {} is ready (chain id {})", self.url, chain_id);
        }
        Ok(())
    }

    async fn bounded<T, E, F>(&self, method: &str, call: F) -> HarnessResult<T>
    where
        F: Future<Output = Result<T, E>>,
        E: std::fmt::Display,
    {
        match timeout(self.request_timeout, call).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(e)) => Err(HarnessError::ChainQuery {
                method: method.to_string(),
                message: e.to_string(),
            }),
            Err(_) => Err(HarnessError::Timeout {
                operation: method.to_string(),
            }),
        }
    }
}

#[async_trait]
impl ChainState for ChainProvider {
    async fn pending_nonce(&self, address: Address) -> HarnessResult<u64> {
        let nonce = self
            .bounded(
                "eth_getTransactionCount",
                self.http
                    .get_transaction_count(address, Some(BlockNumber::Pending.into())),
            )
            .await?;
        Ok(nonce.low_u64())
    }

    async fn estimate_gas(
        &self,
        from: Address,
        to: Option<Address>,
        data: Bytes,
    ) -> HarnessResult<u64> {
        let mut request = TransactionRequest::new().from(from).data(data);
        if let Some(to) = to {
            request = request.to(to);
        }
        let tx = TypedTransaction::Legacy(request);

        let gas = self
            .bounded("eth_estimateGas", self.http.estimate_gas(&tx, None))
            .await?;
        Ok(gas.low_u64())
    }

    async fn gas_price(&self) -> HarnessResult<U256> {
        self.bounded("eth_gasPrice", self.http.get_gas_price()).await
    }

    async fn latest_base_fee(&self) -> HarnessResult<Option<U256>> {
        // Raw header probe: only the presence of baseFeePerGas matters here
        let header: Value = self
            .bounded(
                "eth_getBlockByNumber",
                self.http
                    .request::<_, Value>("eth_getBlockByNumber", ("latest", false)),
            )
            .await?;

        match header.get("baseFeePerGas") {
            None | Some(Value::Null) => Ok(None),
            Some(raw) => serde_json::from_value::<U256>(raw.clone())
                .map(Some)
                .map_err(|e| HarnessError::ChainQuery {
                    method: "eth_getBlockByNumber".to_string(),
                    message: format!("invalid baseFeePerGas {}: {}", raw, e),
                }),
        }
    }

    async fn balance(&self, address: Address) -> HarnessResult<U256> {
        self.bounded("eth_getBalance", self.http.get_balance(address, None))
            .await
    }

    async fn transaction_receipt(&self, tx_hash: H256) -> HarnessResult<Option<TransactionReceipt>> {
        self.bounded(
            "eth_getTransactionReceipt",
            self.http.get_transaction_receipt(tx_hash),
        )
        .await
    }
}
