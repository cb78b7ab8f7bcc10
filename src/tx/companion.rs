//! Pre-send hooks run between the modifier pipeline and primary signing

use super::params::TransactionParameters;
use super::signer;
use crate::error::{HarnessError, HarnessResult};
use crate::rpc::{compact, JsonRpcRequest, RpcClient, RpcPayload};

use ethers::types::U256;
use serde_json::json;
use tracing::debug;

/// Hook attached to a scenario
#[derive(Debug, Clone, PartialEq)]
pub enum PreSend {
    /// Re-sign the resolved parameters, same sender and nonce, optionally
    /// with another value
    Duplicate { value: Option<U256> },
    /// Ask the node to estimate the resolved call and keep its answer
    EstimateGasProbe,
}

/// What a hook produced
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PreSendOutput {
    /// Raw 0x-hex companion transaction for the batch
    Companion(String),
    /// Text attached to the scenario's response line
    Annotation(String),
}

impl PreSend {
    pub fn name(&self) -> &'static str {
        match self {
            PreSend::Duplicate { .. } => "duplicate",
            PreSend::EstimateGasProbe => "estimate_gas_probe",
        }
    }

    /// Run the hook; failures are `HarnessError::Companion` and never fatal
    pub async fn build(
        &self,
        params: &TransactionParameters,
        rpc: &RpcClient,
    ) -> HarnessResult<PreSendOutput> {
        match self {
            PreSend::Duplicate { value } => {
                let mut companion = params.clone();
                if let Some(value) = value {
                    companion.value = *value;
                }
                let signed = signer::sign(&companion)
                    .await
                    .map_err(|e| HarnessError::Companion(format!("error signing companion: {}", e)))?;
                debug!(tx_hash = ?signed.hash, nonce = companion.nonce, "Built companion transaction");
                Ok(PreSendOutput::Companion(signed.to_hex()))
            }
            PreSend::EstimateGasProbe => {
                let mut call = json!({
                    "from": params.from(),
                    "data": params.data,
                });
                if let Some(to) = params.to {
                    call["to"] = json!(to);
                }
                let request = RpcPayload::Single(JsonRpcRequest::new(
                    1,
                    "eth_estimateGas",
                    vec![call],
                ));
                let body = rpc
                    .send(&request)
                    .await
                    .map_err(|e| HarnessError::Companion(format!("estimate probe failed: {}", e)))?;
                Ok(PreSendOutput::Annotation(compact(&body)))
            }
        }
    }
}
