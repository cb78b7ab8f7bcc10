//! Mutable working state for one transaction scenario

use ethers::signers::{LocalWallet, Signer};
use ethers::types::{Address, Bytes, U256};
use std::fmt;

/// Fee model the signer will use
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeeMode {
    /// Single gas price, EIP-155 signature
    Legacy,
    /// Tip cap + fee cap, EIP-1559 signature
    FeeMarket,
}

/// Transaction parameters owned by the pipeline for the duration of one scenario
#[derive(Clone)]
pub struct TransactionParameters {
    pub nonce: u64,
    pub to: Option<Address>,
    pub value: U256,
    pub data: Bytes,
    pub gas_limit: u64,
    /// Authoritative only in legacy mode
    pub gas_price: U256,
    /// Authoritative only in fee-market mode
    pub max_priority_fee_per_gas: Option<U256>,
    /// Authoritative only in fee-market mode
    pub max_fee_per_gas: Option<U256>,
    pub fee_mode: FeeMode,
    pub chain_id: u64,
    wallet: LocalWallet,
    from: Address,
}

impl TransactionParameters {
    /// Legacy-mode parameters for `wallet`; the resolver fills in live values
    pub fn new(wallet: LocalWallet, chain_id: u64) -> Self {
        let wallet = wallet.with_chain_id(chain_id);
        let from = wallet.address();
        Self {
            nonce: 0,
            to: None,
            value: U256::zero(),
            data: Bytes::default(),
            gas_limit: 0,
            gas_price: U256::zero(),
            max_priority_fee_per_gas: None,
            max_fee_per_gas: None,
            fee_mode: FeeMode::Legacy,
            chain_id,
            wallet,
            from,
        }
    }

    /// Replace the signing key; the sender address follows the key
    pub fn set_wallet(&mut self, wallet: LocalWallet) {
        self.wallet = wallet.with_chain_id(self.chain_id);
        self.from = self.wallet.address();
    }

    pub fn wallet(&self) -> &LocalWallet {
        &self.wallet
    }

    pub fn from(&self) -> Address {
        self.from
    }

    pub fn is_fee_market(&self) -> bool {
        self.fee_mode == FeeMode::FeeMarket
    }
}

impl fmt::Debug for TransactionParameters {
    // Keeps key material out of logs
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransactionParameters")
            .field("nonce", &self.nonce)
            .field("from", &self.from)
            .field("to", &self.to)
            .field("value", &self.value)
            .field("data_len", &self.data.len())
            .field("gas_limit", &self.gas_limit)
            .field("gas_price", &self.gas_price)
            .field("max_priority_fee_per_gas", &self.max_priority_fee_per_gas)
            .field("max_fee_per_gas", &self.max_fee_per_gas)
            .field("fee_mode", &self.fee_mode)
            .field("chain_id", &self.chain_id)
            .finish()
    }
}
