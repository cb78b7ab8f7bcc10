//! Request-only catalogs and the transaction scenario test case

use super::{RunContext, TestCase};
use crate::contract::{default_payload, selector};
use crate::error::HarnessResult;
use crate::rpc::{parse_reply, JsonRpcRequest, RpcPayload};
use crate::scenario::{
    send_raw_transaction_scenarios, ScenarioExecutor, ScenarioPhase, ScenarioReport,
    SEND_RAW_TRANSACTION,
};

use async_trait::async_trait;
use ethers::types::Address;
use serde_json::{json, Value};
use tracing::{debug, warn};

/// Address with no deployed code on any configured network
const UNRELATED_ADDRESS: &str = "0x742d35Cc6634C0532925a3b844Bc454e4438f44e";

/// What the catalogs may refer to
pub struct RequestInputs {
    pub from: Address,
    pub to_contract: Address,
    pub invalid_contract: Address,
}

/// A described request sent as is
pub struct CatalogRequest {
    pub description: &'static str,
    pub request: JsonRpcRequest,
}

fn entry(description: &'static str, id: u64, method: &str, params: Vec<Value>) -> CatalogRequest {
    CatalogRequest {
        description,
        request: JsonRpcRequest::new(id, method, params),
    }
}

/// Test case replaying a fixed catalog of single requests
pub struct RequestCase {
    name: &'static str,
    requires_contract: bool,
    catalog: fn(&RequestInputs) -> HarnessResult<Vec<CatalogRequest>>,
}

impl RequestCase {
    pub fn balance() -> Self {
        Self {
            name: "eth_getBalance",
            requires_contract: false,
            catalog: balance_requests,
        }
    }

    pub fn code_at() -> Self {
        Self {
            name: "eth_getCode",
            requires_contract: true,
            catalog: code_at_requests,
        }
    }

    pub fn call() -> Self {
        Self {
            name: "eth_call",
            requires_contract: true,
            catalog: call_requests,
        }
    }

    pub fn estimate_gas() -> Self {
        Self {
            name: "eth_estimateGas",
            requires_contract: true,
            catalog: estimate_gas_requests,
        }
    }

    pub fn requests(&self, inputs: &RequestInputs) -> HarnessResult<Vec<CatalogRequest>> {
        (self.catalog)(inputs)
    }
}

#[async_trait]
impl TestCase for RequestCase {
    fn name(&self) -> &'static str {
        self.name
    }

    fn requires_contract(&self) -> bool {
        self.requires_contract
    }

    async fn execute(&self, ctx: &RunContext) -> HarnessResult<Vec<ScenarioReport>> {
        let inputs = RequestInputs {
            from: ctx.from(),
            to_contract: ctx.to_contract.unwrap_or_default(),
            invalid_contract: ctx.invalid_contract,
        };

        let mut reports = Vec::new();
        for item in self.requests(&inputs)? {
            let description = item.description;
            let mut report = ScenarioReport::for_request(item.request.id, description);
            let payload = RpcPayload::Single(item.request);
            let request_json = payload.to_json()?;
            ctx.reporter.request(description, &request_json)?;
            report.request = Some(request_json);

            match ctx.rpc.send(&payload).await {
                Ok(body) => {
                    report.enter(ScenarioPhase::Submitted);
                    ctx.reporter.response(&body, None)?;
                    match parse_reply(&body) {
                        Ok(reply) => report.rpc_errors = reply.errors,
                        Err(e) => {
                            warn!(request = description, "{}", e);
                            report.inconclusive = true;
                        }
                    }
                    report.response = Some(body);
                }
                Err(e) => {
                    warn!(request = description, "Request failed: {}", e);
                    ctx.reporter.failure(&e.to_string())?;
                    report.fail(e.to_string());
                }
            }
            debug!(request = description, outcome = %report.outcome(), "Request finished");
            crate::metrics::record_scenario(report.outcome().as_str());
            reports.push(report);
        }
        Ok(reports)
    }
}

fn balance_requests(inputs: &RequestInputs) -> HarnessResult<Vec<CatalogRequest>> {
    Ok(vec![
        entry(
            "Valid account balance request",
            1,
            "eth_getBalance",
            vec![json!(inputs.from), json!("latest")],
        ),
        entry(
            "Invalid account format",
            2,
            "eth_getBalance",
            vec![json!("0x1234"), json!("latest")],
        ),
    ])
}

fn code_at_requests(inputs: &RequestInputs) -> HarnessResult<Vec<CatalogRequest>> {
    let to = json!(inputs.to_contract);
    Ok(vec![
        entry("Proper request", 1, "eth_getCode", vec![to.clone(), json!("latest")]),
        entry(
            "Invalid contract address",
            2,
            "eth_getCode",
            vec![json!(inputs.invalid_contract), json!("latest")],
        ),
        entry(
            "Unsupported block parameter",
            3,
            "eth_getCode",
            vec![to.clone(), json!("unsupported")],
        ),
        entry(
            "Incorrect method name",
            4,
            "eth_wrongGetCode",
            vec![to.clone(), json!("latest")],
        ),
        entry(
            "Invalid contract address format",
            5,
            "eth_getCode",
            vec![json!(0xabcdef), json!("latest")],
        ),
        entry(
            "Invalid block parameter format",
            6,
            "eth_getCode",
            vec![to.clone(), json!(0xabcdef)],
        ),
        entry(
            "Too many arguments",
            7,
            "eth_getCode",
            vec![to, json!("latest"), json!("latest")],
        ),
    ])
}

fn call_requests(inputs: &RequestInputs) -> HarnessResult<Vec<CatalogRequest>> {
    let retrieve = format!("0x{}", hex::encode(selector("retrieve()")));
    Ok(vec![
        entry(
            "Proper request",
            1,
            "eth_call",
            vec![json!({"to": inputs.to_contract, "data": retrieve}), json!("latest")],
        ),
        entry(
            "Invalid contract",
            3,
            "eth_call",
            vec![
                json!({"to": inputs.invalid_contract, "data": retrieve}),
                json!("latest"),
            ],
        ),
        entry("Invalid params types", 4, "eth_call", vec![json!("latest")]),
        entry(
            "Invalid 1st argument",
            5,
            "eth_call",
            vec![json!({"to": "0x1234"}), json!("latest")],
        ),
        entry(
            "Invalid 2nd argument",
            6,
            "eth_call",
            vec![json!({"to": UNRELATED_ADDRESS}), json!("unsupported")],
        ),
        entry(
            "Incorrect method name",
            7,
            "eth_wrongCall",
            vec![json!({"to": UNRELATED_ADDRESS}), json!("latest")],
        ),
        entry(
            "Missing 'data' field for contract function call",
            8,
            "eth_call",
            vec![json!({"to": UNRELATED_ADDRESS}), json!("latest")],
        ),
        entry(
            "Invalid 'data' field",
            9,
            "eth_call",
            vec![
                json!({"to": UNRELATED_ADDRESS, "data": "0x123invalid"}),
                json!("latest"),
            ],
        ),
        entry(
            "Invalid block parameter format",
            10,
            "eth_call",
            vec![
                json!({"to": UNRELATED_ADDRESS, "data": "0x12345678"}),
                json!(0xabcdef),
            ],
        ),
    ])
}

fn estimate_gas_requests(inputs: &RequestInputs) -> HarnessResult<Vec<CatalogRequest>> {
    let store = default_payload()?;
    let call = |to: Address| json!({"from": inputs.from, "to": to, "data": store});
    Ok(vec![
        entry(
            "Proper request",
            1,
            "eth_estimateGas",
            vec![call(inputs.to_contract)],
        ),
        entry(
            "Invalid contract",
            3,
            "eth_estimateGas",
            vec![call(inputs.invalid_contract)],
        ),
        entry("Invalid params types", 4, "eth_estimateGas", vec![json!("latest")]),
        entry(
            "Incorrect method name",
            5,
            "eth_wrongEstimateGas",
            vec![call(inputs.to_contract)],
        ),
        entry(
            "Invalid 1st argument",
            6,
            "eth_estimateGas",
            vec![json!({"to": "0x1234"})],
        ),
        entry(
            "Invalid data field",
            7,
            "eth_estimateGas",
            vec![json!({"to": UNRELATED_ADDRESS, "data": "0x123invalid"})],
        ),
        entry(
            "Missing from field",
            8,
            "eth_estimateGas",
            vec![json!({"to": UNRELATED_ADDRESS, "data": "0x12345678"})],
        ),
    ])
}

/// Drives every transaction scenario through the pipeline
pub struct SendRawTransactionCase;

#[async_trait]
impl TestCase for SendRawTransactionCase {
    fn name(&self) -> &'static str {
        SEND_RAW_TRANSACTION
    }

    fn requires_contract(&self) -> bool {
        true
    }

    async fn execute(&self, ctx: &RunContext) -> HarnessResult<Vec<ScenarioReport>> {
        let executor = ScenarioExecutor::new(ctx);
        let mut reports = Vec::new();
        for scenario in send_raw_transaction_scenarios(ctx.invalid_contract)? {
            reports.push(executor.run(&scenario).await?);
        }
        Ok(reports)
    }
}
