//! Chain module - read access to the node under test
//!
//! This module provides:
//! - The `ChainState` seam used by the resolver, modifiers and confirmation waiter
//! - A deadline-bound HTTP provider implementing it
//! - Best-effort confirmation polling

pub mod confirmation;
pub mod provider;

pub use confirmation::{Confirmation, ConfirmationWaiter};
pub use provider::ChainProvider;

use crate::error::HarnessResult;

use async_trait::async_trait;
use ethers::types::{Address, Bytes, TransactionReceipt, H256, U256};

/// Live chain queries consumed by the transaction pipeline
#[async_trait]
pub trait ChainState: Send + Sync {
    /// Pending transaction count of `address`
    async fn pending_nonce(&self, address: Address) -> HarnessResult<u64>;

    /// Gas estimate for a call from `from` to `to` carrying `data`
    async fn estimate_gas(
        &self,
        from: Address,
        to: Option<Address>,
        data: Bytes,
    ) -> HarnessResult<u64>;

    /// Node-suggested legacy gas price
    async fn gas_price(&self) -> HarnessResult<U256>;

    /// `baseFeePerGas` of the latest block header, if the chain exposes one
    async fn latest_base_fee(&self) -> HarnessResult<Option<U256>>;

    async fn balance(&self, address: Address) -> HarnessResult<U256>;

    async fn transaction_receipt(&self, tx_hash: H256) -> HarnessResult<Option<TransactionReceipt>>;
}
