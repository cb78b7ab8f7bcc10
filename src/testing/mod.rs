#![allow(non_snake_case)]
//! Shared test fixtures: a mocked chain, keys, sinks and a mock JSON-RPC node

pub mod mock_node;

use crate::chain::{ChainState, ConfirmationWaiter};
use crate::error::HarnessResult;
use crate::report::{ReportSink, Reporter};
use crate::rpc::RpcClient;
use crate::suite::RunContext;
use crate::tx::{FeeHeuristics, ParameterResolver};

use async_trait::async_trait;
use ethers::signers::LocalWallet;
use ethers::types::{Address, Bytes, TransactionReceipt, H256, U256, U64};
use mockall::*;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// First dev account of hardhat and anvil
pub const FIRST_KEY: &str = "ac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";

/// Second dev account of hardhat and anvil
pub const SECOND_KEY: &str = "59c6995e998f97a5a0044966f0945389dc9e86dae88c7a8412f4603b6b78690d";

pub const TEST_CHAIN_ID: u64 = 1337;

pub fn wallet() -> LocalWallet {
    FIRST_KEY.parse().unwrap()
}

pub fn receipt(hash: H256, block: u64, status: u64) -> TransactionReceipt {
    TransactionReceipt {
        transaction_hash: hash,
        block_number: Some(U64::from(block)),
        status: Some(U64::from(status)),
        ..Default::default()
    }
}

mock! {
    pub Chain {
        pub fn _pending_nonce(&self, address: Address) -> HarnessResult<u64>;

        pub fn _estimate_gas(
            &self,
            from: Address,
            to: Option<Address>,
            data: Bytes,
        ) -> HarnessResult<u64>;

        pub fn _gas_price(&self) -> HarnessResult<U256>;

        pub fn _latest_base_fee(&self) -> HarnessResult<Option<U256>>;

        pub fn _balance(&self, address: Address) -> HarnessResult<U256>;

        pub fn _transaction_receipt(&self, tx_hash: H256) -> HarnessResult<Option<TransactionReceipt>>;
    }
}

impl std::fmt::Debug for MockChain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "MockChain")
    }
}

#[async_trait]
impl ChainState for MockChain {
    async fn pending_nonce(&self, address: Address) -> HarnessResult<u64> {
        self._pending_nonce(address)
    }

    async fn estimate_gas(
        &self,
        from: Address,
        to: Option<Address>,
        data: Bytes,
    ) -> HarnessResult<u64> {
        self._estimate_gas(from, to, data)
    }

    async fn gas_price(&self) -> HarnessResult<U256> {
        self._gas_price()
    }

    async fn latest_base_fee(&self) -> HarnessResult<Option<U256>> {
        self._latest_base_fee()
    }

    async fn balance(&self, address: Address) -> HarnessResult<U256> {
        self._balance(address)
    }

    async fn transaction_receipt(&self, tx_hash: H256) -> HarnessResult<Option<TransactionReceipt>> {
        self._transaction_receipt(tx_hash)
    }
}

/// Report sink that keeps lines in memory
#[derive(Default)]
pub struct MemorySink {
    lines: Mutex<Vec<String>>,
}

impl MemorySink {
    pub fn lines(&self) -> Vec<String> {
        self.lines.lock().unwrap().clone()
    }
}

impl ReportSink for MemorySink {
    fn write_line(&self, line: &str) -> HarnessResult<()> {
        self.lines.lock().unwrap().push(line.to_string());
        Ok(())
    }
}

pub const STORAGE_ADDRESS: Address = Address::repeat_byte(0x5e);
pub const OPCODES_ADDRESS: Address = Address::repeat_byte(0x0c);

/// Run context over `chain` and the node at `url`, reporting into `sink`
pub fn run_context(chain: Arc<dyn ChainState>, url: &str, sink: Arc<MemorySink>) -> RunContext {
    RunContext {
        chain,
        rpc: RpcClient::new(url, Duration::from_secs(5)).unwrap(),
        reporter: Reporter::new(sink, 1000),
        resolver: ParameterResolver::new(FeeHeuristics::default()),
        waiter: ConfirmationWaiter::new(Duration::from_millis(100), Duration::from_millis(20)),
        wallet: wallet(),
        chain_id: TEST_CHAIN_ID,
        to_contract: Some(STORAGE_ADDRESS),
        invalid_contract: Address::zero(),
        contracts: HashMap::from([
            ("storage".to_string(), STORAGE_ADDRESS),
            ("opcodes".to_string(), OPCODES_ADDRESS),
        ]),
    }
}
