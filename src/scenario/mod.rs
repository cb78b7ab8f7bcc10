//! Declarative fault-injection scenarios and their execution records
//!
//! This module provides:
//! - `Scenario`, one declarative unit of the catalog
//! - `ScenarioReport`, the phase history and captured exchange of one run
//! - The `eth_sendRawTransaction` catalog
//! - The executor driving a scenario through the transaction pipeline

pub mod catalog;
pub mod executor;

pub use catalog::send_raw_transaction_scenarios;
pub use executor::ScenarioExecutor;

use crate::chain::Confirmation;
use crate::report::Annotation;
use crate::tx::{Modifier, PreSend};

use ethers::types::H256;
use serde_json::Value;
use std::fmt;

pub const SEND_RAW_TRANSACTION: &str = "eth_sendRawTransaction";

/// Where the companion sits in a batch body
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CompanionPosition {
    Before,
    #[default]
    After,
}

/// One declarative fault-injection unit
#[derive(Debug, Clone)]
pub struct Scenario {
    pub id: u64,
    pub description: String,
    /// Sent verbatim; may be deliberately wrong
    pub method: String,
    pub modifiers: Vec<Modifier>,
    pub pre_send: Option<PreSend>,
    /// Send the companion and the primary together as one batch
    pub batch: bool,
    pub companion_position: CompanionPosition,
}

impl Scenario {
    pub fn new(id: u64, description: impl Into<String>) -> Self {
        Self {
            id,
            description: description.into(),
            method: SEND_RAW_TRANSACTION.to_string(),
            modifiers: Vec::new(),
            pre_send: None,
            batch: false,
            companion_position: CompanionPosition::default(),
        }
    }

    pub fn method(mut self, method: impl Into<String>) -> Self {
        self.method = method.into();
        self
    }

    pub fn modifier(mut self, modifier: Modifier) -> Self {
        self.modifiers.push(modifier);
        self
    }

    /// Hook run before signing without batching its output
    pub fn pre_send(mut self, hook: PreSend) -> Self {
        self.pre_send = Some(hook);
        self
    }

    /// Batch scenario; the hook's companion goes at `position`
    pub fn batch(mut self, hook: PreSend, position: CompanionPosition) -> Self {
        self.pre_send = Some(hook);
        self.batch = true;
        self.companion_position = position;
        self
    }
}

/// Pipeline phases in the order they are reached
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScenarioPhase {
    Resolved,
    Mutated,
    CompanionBuilt,
    Signed,
    Submitted,
    Confirmed,
    TimedOut,
    Failed(String),
}

/// Overall classification of a scenario run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Node accepted every submitted transaction
    Accepted,
    /// Node returned at least one error object
    ProtocolError,
    /// Reply could not be interpreted
    Inconclusive,
    /// Pipeline stopped before or during submission
    Failed,
}

impl Outcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Outcome::Accepted => "accepted",
            Outcome::ProtocolError => "protocol_error",
            Outcome::Inconclusive => "inconclusive",
            Outcome::Failed => "failed",
        }
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Everything observed while running one scenario
#[derive(Debug, Clone)]
pub struct ScenarioReport {
    pub id: u64,
    pub description: String,
    pub phases: Vec<ScenarioPhase>,
    pub request: Option<String>,
    pub response: Option<String>,
    pub tx_hashes: Vec<H256>,
    pub rpc_errors: Vec<Value>,
    pub annotation: Option<Annotation>,
    pub confirmations: Vec<(H256, Confirmation)>,
    pub inconclusive: bool,
}

impl ScenarioReport {
    pub fn new(scenario: &Scenario) -> Self {
        Self::for_request(scenario.id, &scenario.description)
    }

    /// Report for a plain request exchange outside the transaction pipeline
    pub fn for_request(id: u64, description: &str) -> Self {
        Self {
            id,
            description: description.to_string(),
            phases: Vec::new(),
            request: None,
            response: None,
            tx_hashes: Vec::new(),
            rpc_errors: Vec::new(),
            annotation: None,
            confirmations: Vec::new(),
            inconclusive: false,
        }
    }

    pub fn enter(&mut self, phase: ScenarioPhase) {
        self.phases.push(phase);
    }

    pub fn fail(&mut self, reason: impl Into<String>) {
        self.phases.push(ScenarioPhase::Failed(reason.into()));
    }

    pub fn last_phase(&self) -> Option<&ScenarioPhase> {
        self.phases.last()
    }

    pub fn failure(&self) -> Option<&str> {
        self.phases.iter().find_map(|phase| match phase {
            ScenarioPhase::Failed(reason) => Some(reason.as_str()),
            _ => None,
        })
    }

    pub fn outcome(&self) -> Outcome {
        if self.failure().is_some() {
            Outcome::Failed
        } else if self.inconclusive {
            Outcome::Inconclusive
        } else if !self.rpc_errors.is_empty() {
            Outcome::ProtocolError
        } else {
            Outcome::Accepted
        }
    }
}
