//! In-process JSON-RPC node with just enough behaviour for end-to-end scenarios

use super::TEST_CHAIN_ID;

use axum::{extract::State, http::StatusCode, response::IntoResponse, routing::post, Json, Router};
use ethers::types::{Transaction, H256};
use ethers::utils::rlp;
use serde_json::{json, Value};
use std::collections::HashSet;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

const GWEI: u64 = 1_000_000_000;

#[derive(Default)]
struct NodeState {
    nonce: u64,
    base_fee: Option<u64>,
    balance: u64,
    fail_estimate: bool,
    raw_send_reply: Option<String>,
    known: Mutex<HashSet<H256>>,
    requests: Mutex<Vec<Value>>,
}

pub struct MockNodeBuilder {
    state: NodeState,
}

impl MockNodeBuilder {
    /// Pending nonce of every account
    pub fn nonce(mut self, nonce: u64) -> Self {
        self.state.nonce = nonce;
        self
    }

    /// Base fee of the latest header; `None` makes the chain look pre-London
    pub fn base_fee(mut self, base_fee: Option<u64>) -> Self {
        self.state.base_fee = base_fee;
        self
    }

    pub fn balance(mut self, balance: u64) -> Self {
        self.state.balance = balance;
        self
    }

    /// Answer `eth_estimateGas` with an execution-reverted error
    pub fn fail_estimate(mut self, fail: bool) -> Self {
        self.state.fail_estimate = fail;
        self
    }

    /// Replace every reply to a call containing `eth_sendRawTransaction` with `body`
    pub fn raw_send_reply(mut self, body: &str) -> Self {
        self.state.raw_send_reply = Some(body.to_string());
        self
    }

    pub async fn spawn(self) -> MockNode {
        let state = Arc::new(self.state);
        let app = Router::new()
            .route("/", post(handle))
            .with_state(state.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        MockNode { addr, state }
    }
}

pub struct MockNode {
    addr: SocketAddr,
    state: Arc<NodeState>,
}

impl MockNode {
    pub fn builder() -> MockNodeBuilder {
        MockNodeBuilder {
            state: NodeState {
                base_fee: Some(GWEI),
                balance: 10 * GWEI,
                ..Default::default()
            },
        }
    }

    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Request bodies received so far, in arrival order
    pub fn requests(&self) -> Vec<Value> {
        self.state.requests.lock().unwrap().clone()
    }
}

async fn handle(State(state): State<Arc<NodeState>>, Json(body): Json<Value>) -> impl IntoResponse {
    state.requests.lock().unwrap().push(body.clone());

    if let Some(reply) = &state.raw_send_reply {
        if body.to_string().contains("eth_sendRawTransaction") {
            return (StatusCode::OK, reply.clone()).into_response();
        }
    }

    match body {
        Value::Array(calls) => {
            let replies: Vec<Value> = calls.iter().map(|call| dispatch(&state, call)).collect();
            Json(Value::Array(replies)).into_response()
        }
        call => Json(dispatch(&state, &call)).into_response(),
    }
}

fn dispatch(state: &NodeState, call: &Value) -> Value {
    let id = call.get("id").cloned().unwrap_or(Value::Null);
    let params = call.get("params").cloned().unwrap_or(json!([]));
    let method = call.get("method").and_then(Value::as_str).unwrap_or_default();

    let outcome = match method {
        "eth_chainId" => Ok(json!(format!("{:#x}", TEST_CHAIN_ID))),
        "eth_getTransactionCount" => Ok(json!(format!("{:#x}", state.nonce))),
        "eth_estimateGas" if state.fail_estimate => Err((3, "execution reverted".to_string())),
        "eth_estimateGas" => Ok(json!("0x5208")),
        "eth_gasPrice" => Ok(json!(format!("{:#x}", GWEI))),
        "eth_getBalance" => Ok(json!(format!("{:#x}", state.balance))),
        "eth_getTransactionReceipt" => Ok(Value::Null),
        "eth_getBlockByNumber" => {
            let mut header = json!({"number": "0x10", "gasLimit": "0x1c9c380"});
            if let Some(base_fee) = state.base_fee {
                header["baseFeePerGas"] = json!(format!("{:#x}", base_fee));
            }
            Ok(header)
        }
        "eth_sendRawTransaction" => send_raw(state, &params),
        other => Err((-32601, format!("the method {} does not exist/is not available", other))),
    };

    match outcome {
        Ok(result) => json!({"jsonrpc": "2.0", "id": id, "result": result}),
        Err((code, message)) => {
            json!({"jsonrpc": "2.0", "id": id, "error": {"code": code, "message": message}})
        }
    }
}

fn send_raw(state: &NodeState, params: &Value) -> Result<Value, (i64, String)> {
    let raw = params
        .get(0)
        .and_then(Value::as_str)
        .and_then(|s| hex::decode(s.trim_start_matches("0x")).ok())
        .ok_or((-32602, "invalid argument 0".to_string()))?;
    let tx: Transaction =
        rlp::decode(&raw).map_err(|e| (-32602, format!("rlp: {}", e)))?;

    if tx.nonce.as_u64() < state.nonce {
        return Err((-32000, "nonce too low".to_string()));
    }
    if !state.known.lock().unwrap().insert(tx.hash) {
        return Err((-32000, "already known".to_string()));
    }
    Ok(json!(tx.hash))
}
