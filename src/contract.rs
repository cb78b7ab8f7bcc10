//! Minimal contract access: call encoding and result decoding over a JSON ABI
//!
//! Deployment and binding generation live outside the harness; deployed
//! addresses arrive through configuration.

use crate::error::{HarnessError, HarnessResult};

use ethers::abi::{Abi, Token};
use ethers::types::{Bytes, U256};
use sha3::{Digest, Keccak256};

const STORAGE_ABI: &str = r#"[{"inputs":[],"name":"retrieve","outputs":[{"internalType":"uint256","name":"","type":"uint256"}],"stateMutability":"view","type":"function"},{"inputs":[{"internalType":"uint256","name":"num","type":"uint256"}],"name":"store","outputs":[],"stateMutability":"nonpayable","type":"function"}]"#;

const OPCODES_ABI: &str = r#"[{"inputs":[],"payable":false,"stateMutability":"nonpayable","type":"constructor"},{"constant":false,"inputs":[],"name":"test","outputs":[],"payable":false,"stateMutability":"nonpayable","type":"function"},{"constant":false,"inputs":[],"name":"test_invalid","outputs":[],"payable":false,"stateMutability":"nonpayable","type":"function"},{"constant":false,"inputs":[],"name":"test_revert","outputs":[],"payable":false,"stateMutability":"nonpayable","type":"function"},{"constant":false,"inputs":[],"name":"test_stop","outputs":[],"payable":false,"stateMutability":"nonpayable","type":"function"}]"#;

/// Value passed to `Storage.store` by the default scenario payload
pub const DEFAULT_STORED_VALUE: u64 = 20;

/// Encode calls and decode results for a contract
pub trait ContractInterface {
    fn encode_call(&self, method: &str, args: &[Token]) -> HarnessResult<Bytes>;

    fn decode_result(&self, method: &str, data: &[u8]) -> HarnessResult<Vec<Token>>;
}

/// Contract described by a JSON ABI
#[derive(Debug, Clone)]
pub struct AbiContract {
    name: &'static str,
    abi: Abi,
}

impl AbiContract {
    pub fn from_json(name: &'static str, abi_json: &str) -> HarnessResult<Self> {
        let abi: Abi = serde_json::from_str(abi_json)
            .map_err(|e| HarnessError::Contract(format!("invalid ABI for {}: {}", name, e)))?;
        Ok(Self { name, abi })
    }

    /// Simple value store used as the default transaction target
    pub fn storage() -> HarnessResult<Self> {
        Self::from_json("storage", STORAGE_ABI)
    }

    /// Contract exposing INVALID, REVERT and STOP opcodes
    pub fn opcodes() -> HarnessResult<Self> {
        Self::from_json("opcodes", OPCODES_ABI)
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    fn function(&self, method: &str) -> HarnessResult<&ethers::abi::Function> {
        self.abi.function(method).map_err(|e| {
            HarnessError::Contract(format!("{}.{}: {}", self.name, method, e))
        })
    }
}

impl ContractInterface for AbiContract {
    fn encode_call(&self, method: &str, args: &[Token]) -> HarnessResult<Bytes> {
        let encoded = self
            .function(method)?
            .encode_input(args)
            .map_err(|e| HarnessError::Contract(format!("{}.{}: {}", self.name, method, e)))?;
        Ok(encoded.into())
    }

    fn decode_result(&self, method: &str, data: &[u8]) -> HarnessResult<Vec<Token>> {
        self.function(method)?
            .decode_output(data)
            .map_err(|e| HarnessError::Contract(format!("{}.{}: {}", self.name, method, e)))
    }
}

/// Payload of the default scenario transaction: `store(20)`
pub fn default_payload() -> HarnessResult<Bytes> {
    AbiContract::storage()?.encode_call(
        "store",
        &[Token::Uint(U256::from(DEFAULT_STORED_VALUE))],
    )
}

/// First four bytes of keccak256 over a function signature
pub fn selector(signature: &str) -> [u8; 4] {
    let digest = Keccak256::digest(signature.as_bytes());
    let mut out = [0u8; 4];
    out.copy_from_slice(&digest[..4]);
    out
}

/// Selector of an arbitrary signature followed by one left-padded 32 byte word
pub fn raw_call(signature: &str, argument: U256) -> Bytes {
    let mut word = [0u8; 32];
    argument.to_big_endian(&mut word);

    let mut data = Vec::with_capacity(36);
    data.extend_from_slice(&selector(signature));
    data.extend_from_slice(&word);
    data.into()
}
