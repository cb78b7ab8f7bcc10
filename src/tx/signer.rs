//! Signing and raw encoding of finalized parameters

use super::params::{FeeMode, TransactionParameters};
use crate::error::{HarnessError, HarnessResult};

use ethers::signers::Signer;
use ethers::types::transaction::eip2718::TypedTransaction;
use ethers::types::{Bytes, Eip1559TransactionRequest, TransactionRequest, H256};
use ethers::utils::keccak256;

/// Signed, serialized transaction
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedTransaction {
    pub raw: Bytes,
    pub hash: H256,
}

impl SignedTransaction {
    /// 0x-prefixed hex of the raw encoding, as sent in `eth_sendRawTransaction`
    pub fn to_hex(&self) -> String {
        format!("0x{}", hex::encode(&self.raw))
    }
}

/// Typed transaction for the parameters' fee mode
pub fn build_transaction(params: &TransactionParameters) -> HarnessResult<TypedTransaction> {
    let typed = match params.fee_mode {
        FeeMode::Legacy => {
            let mut tx = TransactionRequest::new()
                .from(params.from())
                .nonce(params.nonce)
                .gas(params.gas_limit)
                .gas_price(params.gas_price)
                .value(params.value)
                .data(params.data.clone())
                .chain_id(params.chain_id);
            if let Some(to) = params.to {
                tx = tx.to(to);
            }
            TypedTransaction::Legacy(tx)
        }
        FeeMode::FeeMarket => {
            let (tip_cap, fee_cap) = match (params.max_priority_fee_per_gas, params.max_fee_per_gas)
            {
                (Some(tip), Some(cap)) => (tip, cap),
                _ => {
                    return Err(HarnessError::Signing(
                        "fee-market transaction needs both tip cap and fee cap".to_string(),
                    ))
                }
            };
            let mut tx = Eip1559TransactionRequest::new()
                .from(params.from())
                .nonce(params.nonce)
                .gas(params.gas_limit)
                .max_priority_fee_per_gas(tip_cap)
                .max_fee_per_gas(fee_cap)
                .value(params.value)
                .data(params.data.clone())
                .chain_id(params.chain_id);
            if let Some(to) = params.to {
                tx = tx.to(to);
            }
            TypedTransaction::Eip1559(tx)
        }
    };
    Ok(typed)
}

/// Sign `params` with its wallet and produce the raw encoding
pub async fn sign(params: &TransactionParameters) -> HarnessResult<SignedTransaction> {
    let tx = build_transaction(params)?;
    let signature = params
        .wallet()
        .sign_transaction(&tx)
        .await
        .map_err(|e| HarnessError::Signing(e.to_string()))?;

    let raw = tx.rlp_signed(&signature);
    let hash = H256::from(keccak256(&raw));
    Ok(SignedTransaction { raw, hash })
}
