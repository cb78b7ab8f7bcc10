//! Error types for the faultline harness

use thiserror::Error;

/// Main error type for the harness
#[derive(Error, Debug)]
pub enum HarnessError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Wallet error: {0}")]
    Wallet(String),

    #[error("Node at {url} is unreachable: {message}")]
    NodeUnreachable { url: String, message: String },

    #[error("Chain query {method} failed: {message}")]
    ChainQuery { method: String, message: String },

    #[error("Nonce error for {address}: {message}")]
    Nonce { address: String, message: String },

    #[error("Gas price error: {0}")]
    GasPrice(String),

    #[error("Modifier {name} (position {position}) failed: {message}")]
    Modifier {
        name: &'static str,
        position: usize,
        message: String,
    },

    #[error("Companion build failed: {0}")]
    Companion(String),

    #[error("Signing error: {0}")]
    Signing(String),

    #[error("Contract error: {0}")]
    Contract(String),

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Timeout waiting for {operation}")]
    Timeout { operation: String },

    #[error("Unexpected response shape: {0}")]
    ResponseShape(String),

    #[error("Test case {0} not found")]
    TestCaseNotFound(String),

    #[error("Report error: {0}")]
    Report(#[from] std::io::Error),
}

impl HarnessError {
    /// Fatal errors abort the whole run; everything else only ends the current scenario
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            HarnessError::Config(_)
                | HarnessError::Wallet(_)
                | HarnessError::NodeUnreachable { .. }
                | HarnessError::Nonce { .. }
                | HarnessError::GasPrice(_)
        )
    }

    /// Response-shape problems leave a scenario inconclusive rather than failed
    pub fn is_inconclusive(&self) -> bool {
        matches!(self, HarnessError::ResponseShape(_))
    }
}

/// Result type for harness operations
pub type HarnessResult<T> = Result<T, HarnessError>;
