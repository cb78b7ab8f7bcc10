//! JSON-RPC 2.0 request envelopes and permissive reply parsing

use crate::error::{HarnessError, HarnessResult};

use ethers::types::H256;
use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const JSONRPC_VERSION: &str = "2.0";

/// A single JSON-RPC request with positional parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonRpcRequest {
    pub jsonrpc: String,
    pub id: u64,
    pub method: String,
    pub params: Vec<Value>,
}

impl JsonRpcRequest {
    pub fn new(id: u64, method: impl Into<String>, params: Vec<Value>) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            id,
            method: method.into(),
            params,
        }
    }
}

/// Request body: a bare object, or an array for batch calls
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum RpcPayload {
    Single(JsonRpcRequest),
    Batch(Vec<JsonRpcRequest>),
}

impl RpcPayload {
    pub fn is_batch(&self) -> bool {
        matches!(self, RpcPayload::Batch(_))
    }

    pub fn len(&self) -> usize {
        match self {
            RpcPayload::Single(_) => 1,
            RpcPayload::Batch(requests) => requests.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Method of the first request, used for labelling
    pub fn method(&self) -> &str {
        match self {
            RpcPayload::Single(request) => &request.method,
            RpcPayload::Batch(requests) => requests
                .first()
                .map(|r| r.method.as_str())
                .unwrap_or_default(),
        }
    }

    pub fn to_json(&self) -> HarnessResult<String> {
        serde_json::to_string(self)
            .map_err(|e| HarnessError::Transport(format!("cannot serialize request: {}", e)))
    }
}

/// What a node answered, element by element
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParsedReply {
    /// String results, in array order
    pub results: Vec<String>,
    /// Error objects, verbatim
    pub errors: Vec<Value>,
    /// Whether the body was an array
    pub batch: bool,
}

impl ParsedReply {
    /// Results that parse as transaction hashes
    pub fn tx_hashes(&self) -> Vec<H256> {
        self.results
            .iter()
            .filter_map(|r| crate::chain::confirmation::parse_tx_hash(r))
            .collect()
    }
}

/// Parse a reply body that may be an object or an array of objects
///
/// Elements carrying neither a string `result` nor an `error` object are
/// skipped. Order and ids are not matched against the request.
pub fn parse_reply(body: &str) -> HarnessResult<ParsedReply> {
    let value: Value = serde_json::from_str(body)
        .map_err(|e| HarnessError::ResponseShape(format!("reply is not JSON: {}", e)))?;

    let mut reply = ParsedReply::default();
    match value {
        Value::Array(elements) => {
            reply.batch = true;
            for element in &elements {
                inspect(element, &mut reply);
            }
        }
        Value::Object(_) => inspect(&value, &mut reply),
        other => {
            return Err(HarnessError::ResponseShape(format!(
                "reply is neither an object nor an array: {}",
                other
            )))
        }
    }
    Ok(reply)
}

fn inspect(element: &Value, reply: &mut ParsedReply) {
    if let Some(error) = element.get("error").filter(|e| e.is_object()) {
        reply.errors.push(error.clone());
    } else if let Some(result) = element.get("result").and_then(Value::as_str) {
        reply.results.push(result.to_string());
    }
}

/// Re-serialize a reply compactly when it is JSON, otherwise return it as is
pub fn compact(body: &str) -> String {
    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|v| serde_json::to_string(&v).ok())
        .unwrap_or_else(|| body.to_string())
}
