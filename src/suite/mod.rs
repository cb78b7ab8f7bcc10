//! Test-case registry and run driver
//!
//! Test cases are looked up by RPC method name in an explicit map built at
//! startup. Each one either replays a catalog of hand-written requests or
//! drives the transaction scenario engine.

mod requests;

pub use requests::{RequestCase, SendRawTransactionCase};

use crate::chain::{ChainState, ConfirmationWaiter};
use crate::config::Settings;
use crate::error::{HarnessError, HarnessResult};
use crate::report::Reporter;
use crate::rpc::RpcClient;
use crate::scenario::{Outcome, ScenarioReport};
use crate::tx::{FeeHeuristics, ParameterResolver};

use async_trait::async_trait;
use ethers::signers::{LocalWallet, Signer};
use ethers::types::Address;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tracing::{error, info, warn};

/// Test cases run when none are selected
pub const DEFAULT_TESTS: &[&str] = &["eth_estimateGas", "eth_sendRawTransaction"];

/// Everything a test case needs to talk to the node under test
pub struct RunContext {
    pub chain: Arc<dyn ChainState>,
    pub rpc: RpcClient,
    pub reporter: Reporter,
    pub resolver: ParameterResolver,
    pub waiter: ConfirmationWaiter,
    pub wallet: LocalWallet,
    pub chain_id: u64,
    /// Default transaction recipient
    pub to_contract: Option<Address>,
    /// Address with no code, used by the invalid-contract cases
    pub invalid_contract: Address,
    /// Deployed contracts by name
    pub contracts: HashMap<String, Address>,
}

impl RunContext {
    pub fn from_settings(
        settings: &Settings,
        chain: Arc<dyn ChainState>,
        reporter: Reporter,
    ) -> HarnessResult<Self> {
        let network = settings
            .network()
            .map_err(|e| HarnessError::Config(e.to_string()))?;

        let wallet: LocalWallet = network
            .private_key
            .trim()
            .trim_start_matches("0x")
            .parse()
            .map_err(|e| HarnessError::Wallet(format!("failed to load private key: {}", e)))?;

        let mut contracts = HashMap::new();
        for (name, address) in &network.contracts {
            contracts.insert(name.clone(), parse_address(name, address)?);
        }

        let to_contract = if network.to_contract.is_empty() {
            contracts.get("storage").copied()
        } else {
            Some(parse_address("to_contract", &network.to_contract)?)
        };
        let invalid_contract = if network.invalid_contract.is_empty() {
            Address::zero()
        } else {
            parse_address("invalid_contract", &network.invalid_contract)?
        };

        Ok(Self {
            chain,
            rpc: RpcClient::new(&network.rpc_url, settings.harness.rpc_timeout())?,
            reporter,
            resolver: ParameterResolver::new(FeeHeuristics::from_config(&settings.fees)),
            waiter: ConfirmationWaiter::new(
                settings.harness.confirmation_timeout(),
                settings.harness.confirmation_poll(),
            ),
            wallet,
            chain_id: network.chain_id,
            to_contract,
            invalid_contract,
            contracts,
        })
    }

    /// Address of the configured signing key
    pub fn from(&self) -> Address {
        self.wallet.address()
    }
}

fn parse_address(name: &str, raw: &str) -> HarnessResult<Address> {
    raw.trim()
        .parse()
        .map_err(|e| HarnessError::Config(format!("invalid address for {}: {} ({})", name, raw, e)))
}

/// One named group of exchanges with the node
#[async_trait]
pub trait TestCase: Send + Sync {
    /// RPC method the case targets; also its registry key
    fn name(&self) -> &'static str;

    fn requires_contract(&self) -> bool;

    /// Run every exchange of the case; only fatal errors are returned
    async fn execute(&self, ctx: &RunContext) -> HarnessResult<Vec<ScenarioReport>>;
}

/// All known test cases by name
pub fn registry() -> HashMap<&'static str, Box<dyn TestCase>> {
    let cases: Vec<Box<dyn TestCase>> = vec![
        Box::new(RequestCase::balance()),
        Box::new(RequestCase::code_at()),
        Box::new(RequestCase::call()),
        Box::new(RequestCase::estimate_gas()),
        Box::new(SendRawTransactionCase),
    ];
    cases.into_iter().map(|case| (case.name(), case)).collect()
}

/// Per-outcome tally of a run
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RunSummary {
    pub outcomes: BTreeMap<&'static str, usize>,
    /// Selected test cases that could not run
    pub skipped: Vec<String>,
}

impl RunSummary {
    pub fn record(&mut self, outcome: Outcome) {
        *self.outcomes.entry(outcome.as_str()).or_default() += 1;
    }

    pub fn count(&self, outcome: Outcome) -> usize {
        self.outcomes.get(outcome.as_str()).copied().unwrap_or(0)
    }

    pub fn total(&self) -> usize {
        self.outcomes.values().sum()
    }
}

/// Run the selected test cases in order
///
/// Unknown names and cases missing a required contract are skipped. A fatal
/// error stops the run immediately.
pub async fn run_tests(ctx: &RunContext, selected: &[String]) -> HarnessResult<RunSummary> {
    let registry = registry();
    let names: Vec<String> = if selected.is_empty() {
        DEFAULT_TESTS.iter().map(|s| s.to_string()).collect()
    } else {
        selected.to_vec()
    };

    let mut summary = RunSummary::default();
    for (i, name) in names.iter().enumerate() {
        let Some(case) = registry.get(name.as_str()) else {
            error!("{}", HarnessError::TestCaseNotFound(name.clone()));
            summary.skipped.push(name.clone());
            continue;
        };

        if case.requires_contract() && ctx.to_contract.is_none() {
            warn!(test = %name, "No default contract configured, skipping");
            summary.skipped.push(name.clone());
            continue;
        }

        info!("[{}/{}] Running test: {}", i + 1, names.len(), name);
        ctx.reporter.test_case(name)?;

        let started = std::time::Instant::now();
        let reports = case.execute(ctx).await?;
        for report in &reports {
            summary.record(report.outcome());
        }
        info!(
            test = %name,
            exchanges = reports.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Test completed"
        );
    }

    Ok(summary)
}
