//! Drives one scenario through resolve, mutate, companion, sign, submit, confirm

use super::{CompanionPosition, Scenario, ScenarioPhase, ScenarioReport};
use crate::chain::Confirmation;
use crate::contract;
use crate::error::{HarnessError, HarnessResult};
use crate::metrics;
use crate::report::Annotation;
use crate::rpc::{parse_reply, JsonRpcRequest, RpcPayload};
use crate::suite::RunContext;
use crate::tx::{apply_all, signer, ModifierContext, PreSendOutput};

use serde_json::json;
use tokio::time::Instant;
use tracing::{info, warn};

pub struct ScenarioExecutor<'a> {
    ctx: &'a RunContext,
}

impl<'a> ScenarioExecutor<'a> {
    pub fn new(ctx: &'a RunContext) -> Self {
        Self { ctx }
    }

    /// Run `scenario` to a terminal phase
    ///
    /// Scenario-level problems end up in the report; only fatal errors are
    /// returned.
    pub async fn run(&self, scenario: &Scenario) -> HarnessResult<ScenarioReport> {
        let mut report = ScenarioReport::new(scenario);

        if let Err(e) = self.pipeline(scenario, &mut report).await {
            if e.is_fatal() {
                return Err(e);
            }
            warn!(
                scenario = scenario.id,
                description = %scenario.description,
                "Scenario failed: {}",
                e
            );
            report.fail(e.to_string());
        }

        let outcome = report.outcome();
        metrics::record_scenario(outcome.as_str());
        info!(
            scenario = scenario.id,
            description = %scenario.description,
            outcome = %outcome,
            hashes = report.tx_hashes.len(),
            "Scenario finished"
        );
        Ok(report)
    }

    async fn pipeline(&self, scenario: &Scenario, report: &mut ScenarioReport) -> HarnessResult<()> {
        let ctx = self.ctx;
        let to = ctx
            .to_contract
            .ok_or_else(|| HarnessError::Config("no default contract configured".to_string()))?;

        let mut params = ctx
            .resolver
            .resolve(
                ctx.chain.as_ref(),
                ctx.wallet.clone(),
                ctx.chain_id,
                to,
                contract::default_payload()?,
            )
            .await?;
        report.enter(ScenarioPhase::Resolved);

        let modifier_ctx = ModifierContext {
            chain: ctx.chain.as_ref(),
            contracts: &ctx.contracts,
        };
        apply_all(&scenario.modifiers, &mut params, &modifier_ctx).await?;
        report.enter(ScenarioPhase::Mutated);

        let mut companion = None;
        if let Some(hook) = &scenario.pre_send {
            match hook.build(&params, &ctx.rpc).await {
                Ok(PreSendOutput::Companion(raw)) => {
                    metrics::record_companion("built");
                    report.enter(ScenarioPhase::CompanionBuilt);
                    companion = Some(raw);
                }
                Ok(PreSendOutput::Annotation(note)) => {
                    metrics::record_companion("note");
                    report.annotation = Some(Annotation::Note(note));
                }
                Err(e) => {
                    warn!(scenario = scenario.id, hook = hook.name(), "{}", e);
                    metrics::record_companion("failed");
                    report.annotation = Some(Annotation::CompanionFailed(e.to_string()));
                }
            }
        }

        let signed = signer::sign(&params).await?;
        report.enter(ScenarioPhase::Signed);

        let primary = JsonRpcRequest::new(
            scenario.id,
            scenario.method.as_str(),
            vec![json!(signed.to_hex())],
        );
        let payload = match companion.filter(|_| scenario.batch) {
            Some(raw) => {
                let companion =
                    JsonRpcRequest::new(scenario.id, scenario.method.as_str(), vec![json!(raw)]);
                match scenario.companion_position {
                    CompanionPosition::Before => RpcPayload::Batch(vec![companion, primary]),
                    CompanionPosition::After => RpcPayload::Batch(vec![primary, companion]),
                }
            }
            None => RpcPayload::Single(primary),
        };

        let request_json = payload.to_json()?;
        ctx.reporter.request(&scenario.description, &request_json)?;
        report.request = Some(request_json);

        let body = match ctx.rpc.send(&payload).await {
            Ok(body) => body,
            Err(e) => {
                ctx.reporter.failure(&e.to_string())?;
                return Err(e);
            }
        };
        report.enter(ScenarioPhase::Submitted);
        ctx.reporter.response(&body, report.annotation.as_ref())?;

        match parse_reply(&body) {
            Ok(reply) => {
                metrics::record_rejections(&scenario.method, reply.errors.len());
                report.tx_hashes = reply.tx_hashes();
                report.rpc_errors = reply.errors;
            }
            Err(e) => {
                warn!(scenario = scenario.id, "Reply left scenario inconclusive: {}", e);
                report.inconclusive = true;
            }
        }
        report.response = Some(body);

        self.confirm(report).await;
        Ok(())
    }

    async fn confirm(&self, report: &mut ScenarioReport) {
        if report.tx_hashes.is_empty() {
            return;
        }

        let deadline = Instant::now() + self.ctx.waiter.wait();
        let mut all_mined = true;
        for hash in report.tx_hashes.clone() {
            let confirmation = self
                .ctx
                .waiter
                .confirm_until(self.ctx.chain.as_ref(), hash, deadline)
                .await;
            all_mined &= confirmation != Confirmation::Pending;
            report.confirmations.push((hash, confirmation));
        }

        report.enter(if all_mined {
            ScenarioPhase::Confirmed
        } else {
            ScenarioPhase::TimedOut
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain::ChainProvider;
    use crate::scenario::{Outcome, SEND_RAW_TRANSACTION};
    use crate::testing::mock_node::MockNode;
    use crate::testing::{run_context, MemorySink, MockChain};
    use crate::tx::{Modifier, Override, PreSend, RecipientOverride};
    use serde_json::Value;
    use std::sync::Arc;
    use std::time::Duration;

    async fn node_context(node: &MockNode, sink: Arc<MemorySink>) -> RunContext {
        let chain = ChainProvider::new(&node.url(), Duration::from_secs(5)).unwrap();
        run_context(Arc::new(chain), &node.url(), sink)
    }

    fn sent_raw_transactions(node: &MockNode) -> Vec<Value> {
        node.requests()
            .into_iter()
            .filter(|body| body.to_string().contains(SEND_RAW_TRANSACTION))
            .collect()
    }

    #[tokio::test]
    async fn test_proper_request_is_accepted_and_left_pending() {
        let node = MockNode::builder().nonce(3).spawn().await;
        let sink = Arc::new(MemorySink::default());
        let ctx = node_context(&node, sink.clone()).await;

        let report = ScenarioExecutor::new(&ctx)
            .run(&Scenario::new(1, "Proper request"))
            .await
            .unwrap();

        assert_eq!(report.outcome(), Outcome::Accepted);
        assert_eq!(report.tx_hashes.len(), 1);
        assert_eq!(report.last_phase(), Some(&ScenarioPhase::TimedOut));
        assert_eq!(report.confirmations[0].1, Confirmation::Pending);

        let lines = sink.lines();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with("Scenario: Proper request  - Request: {"));
        assert!(lines[1].starts_with("Response: {"));
    }

    #[tokio::test]
    async fn test_nonce_below_account_nonce_is_protocol_error() {
        let node = MockNode::builder().nonce(5).spawn().await;
        let sink = Arc::new(MemorySink::default());
        let ctx = node_context(&node, sink.clone()).await;

        let scenario =
            Scenario::new(4, "NONCE_TOO_LOW").modifier(Modifier::Nonce(Override::literal(0)));
        let report = ScenarioExecutor::new(&ctx).run(&scenario).await.unwrap();

        assert_eq!(report.outcome(), Outcome::ProtocolError);
        assert!(report.tx_hashes.is_empty());
        assert_eq!(report.rpc_errors[0]["message"], "nonce too low");
        assert_eq!(report.last_phase(), Some(&ScenarioPhase::Submitted));
        assert!(sink.lines()[1].contains("nonce too low"));
    }

    #[tokio::test]
    async fn test_identical_companion_is_batched_and_both_replies_parsed() {
        let node = MockNode::builder().spawn().await;
        let sink = Arc::new(MemorySink::default());
        let ctx = node_context(&node, sink.clone()).await;

        let scenario = Scenario::new(22, "ALREADY_KNOWN")
            .batch(PreSend::Duplicate { value: None }, CompanionPosition::After);
        let report = ScenarioExecutor::new(&ctx).run(&scenario).await.unwrap();

        let sent = sent_raw_transactions(&node);
        assert_eq!(sent.len(), 1);
        let batch = sent[0].as_array().unwrap();
        assert_eq!(batch.len(), 2);
        assert_eq!(batch[0]["params"], batch[1]["params"]);
        assert_eq!(batch[0]["id"], 22);

        assert!(report.phases.contains(&ScenarioPhase::CompanionBuilt));
        assert_eq!(report.tx_hashes.len(), 1);
        assert_eq!(report.rpc_errors.len(), 1);
        assert_eq!(report.rpc_errors[0]["message"], "already known");
        assert_eq!(report.outcome(), Outcome::ProtocolError);
    }

    #[tokio::test]
    async fn test_companion_position_before_leads_the_batch() {
        let node = MockNode::builder().spawn().await;
        let sink = Arc::new(MemorySink::default());
        let ctx = node_context(&node, sink).await;

        let scenario = Scenario::new(21, "REPLACEMENT_TRANSACTION_UNDERPRICED").batch(
            PreSend::Duplicate {
                value: Some(ethers::types::U256::from(1000u64)),
            },
            CompanionPosition::Before,
        );
        let report = ScenarioExecutor::new(&ctx).run(&scenario).await.unwrap();
        assert_eq!(report.tx_hashes.len(), 2);

        let sent = sent_raw_transactions(&node);
        let batch = sent[0].as_array().unwrap();
        let companion = batch[0]["params"][0].as_str().unwrap();
        let raw = hex::decode(companion.trim_start_matches("0x")).unwrap();
        let tx: ethers::types::Transaction = ethers::utils::rlp::decode(&raw).unwrap();
        assert_eq!(tx.value, ethers::types::U256::from(1000u64));
        assert_eq!(report.tx_hashes[0], tx.hash);
    }

    #[tokio::test]
    async fn test_modifier_failure_ends_scenario_without_exchange() {
        let node = MockNode::builder().spawn().await;
        let sink = Arc::new(MemorySink::default());
        let ctx = node_context(&node, sink.clone()).await;

        let scenario = Scenario::new(20, "INVALID_OPCODE").modifier(Modifier::Recipient(
            RecipientOverride::Contract("missing".to_string()),
        ));
        let report = ScenarioExecutor::new(&ctx).run(&scenario).await.unwrap();

        assert_eq!(report.outcome(), Outcome::Failed);
        assert!(report.failure().unwrap().contains("recipient"));
        assert_eq!(
            report.phases,
            vec![
                ScenarioPhase::Resolved,
                ScenarioPhase::Failed(report.failure().unwrap().to_string())
            ]
        );
        assert!(sink.lines().is_empty());
        assert!(sent_raw_transactions(&node).is_empty());
    }

    #[tokio::test]
    async fn test_estimate_probe_note_is_appended_to_response() {
        let node = MockNode::builder().fail_estimate(true).spawn().await;
        let sink = Arc::new(MemorySink::default());
        let ctx = node_context(&node, sink.clone()).await;

        let scenario = Scenario::new(20, "REVERT_OPCODE").pre_send(PreSend::EstimateGasProbe);
        let report = ScenarioExecutor::new(&ctx).run(&scenario).await.unwrap();

        assert!(matches!(report.annotation, Some(Annotation::Note(_))));
        let lines = sink.lines();
        assert!(lines[1].contains(", PreSend Note: "));
        assert!(lines[1].contains("execution reverted"));
        assert!(!report.phases.contains(&ScenarioPhase::CompanionBuilt));
    }

    #[tokio::test]
    async fn test_unparseable_reply_is_inconclusive() {
        let node = MockNode::builder()
            .raw_send_reply("<html>502 Bad Gateway</html>")
            .spawn()
            .await;
        let sink = Arc::new(MemorySink::default());
        let ctx = node_context(&node, sink.clone()).await;

        let report = ScenarioExecutor::new(&ctx)
            .run(&Scenario::new(1, "Proper request"))
            .await
            .unwrap();
        assert_eq!(report.outcome(), Outcome::Inconclusive);
        assert_eq!(sink.lines()[1], "Response: <html>502 Bad Gateway</html>");
    }

    #[tokio::test]
    async fn test_nonce_query_failure_is_fatal() {
        let mut chain = MockChain::new();
        chain.expect__pending_nonce().returning(|_| {
            Err(HarnessError::Timeout {
                operation: "eth_getTransactionCount".into(),
            })
        });
        let sink = Arc::new(MemorySink::default());
        let ctx = run_context(Arc::new(chain), "http://127.0.0.1:1", sink);

        let err = ScenarioExecutor::new(&ctx)
            .run(&Scenario::new(1, "Proper request"))
            .await
            .unwrap_err();
        assert!(err.is_fatal());
    }

    #[tokio::test]
    async fn test_transport_failure_is_reported_and_not_fatal() {
        let mut chain = MockChain::new();
        chain.expect__pending_nonce().returning(|_| Ok(0));
        chain.expect__estimate_gas().returning(|_, _, _| Ok(30_000));
        chain
            .expect__gas_price()
            .returning(|| Ok(ethers::types::U256::from(1u64)));
        chain.expect__latest_base_fee().returning(|| Ok(None));
        let sink = Arc::new(MemorySink::default());
        let ctx = run_context(Arc::new(chain), "http://127.0.0.1:1", sink.clone());

        let report = ScenarioExecutor::new(&ctx)
            .run(&Scenario::new(1, "Proper request"))
            .await
            .unwrap();
        assert_eq!(report.outcome(), Outcome::Failed);
        let lines = sink.lines();
        assert_eq!(lines.len(), 2);
        assert!(lines[1].starts_with("Error: "));
    }
}
