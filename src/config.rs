//! Configuration management for the faultline harness
//!
//! Loads configuration from TOML files with environment variable substitution.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::collections::HashMap;
use std::env;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Root configuration structure
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub harness: HarnessConfig,
    #[serde(default)]
    pub fees: FeeConfig,
    #[serde(default)]
    pub report: ReportConfig,
    pub networks: HashMap<String, NetworkConfig>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct HarnessConfig {
    pub network: String,
    #[serde(default = "default_rpc_timeout_ms")]
    pub rpc_timeout_ms: u64,
    #[serde(default = "default_confirmation_timeout_secs")]
    pub confirmation_timeout_secs: u64,
    #[serde(default = "default_confirmation_poll_ms")]
    pub confirmation_poll_ms: u64,
    #[serde(default = "default_max_logged_request_len")]
    pub max_logged_request_len: usize,
    /// Test cases to run; empty selects the default set
    #[serde(default)]
    pub tests: Vec<String>,
}

/// Heuristics used when resolving default fee parameters
#[derive(Debug, Clone, Deserialize)]
pub struct FeeConfig {
    #[serde(default = "default_tip_cap_gwei")]
    pub tip_cap_gwei: u64,
    #[serde(default = "default_fee_cap_headroom_gwei")]
    pub fee_cap_headroom_gwei: u64,
    #[serde(default = "default_fallback_gas_limit")]
    pub fallback_gas_limit: u64,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ReportConfig {
    /// Report stream destination; stdout when absent
    pub path: Option<PathBuf>,
    /// Prometheus textfile written at the end of a run
    pub metrics_textfile: Option<PathBuf>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NetworkConfig {
    pub rpc_url: String,
    pub chain_id: u64,
    pub private_key: String,
    /// Default recipient for transaction scenarios
    #[serde(default)]
    pub to_contract: String,
    pub invalid_contract: String,
    pub local_node_type: Option<String>,
    #[serde(default)]
    pub contracts: HashMap<String, String>,
}

fn default_rpc_timeout_ms() -> u64 {
    10_000
}

fn default_confirmation_timeout_secs() -> u64 {
    5
}

fn default_confirmation_poll_ms() -> u64 {
    500
}

fn default_max_logged_request_len() -> usize {
    1000
}

fn default_tip_cap_gwei() -> u64 {
    2
}

fn default_fee_cap_headroom_gwei() -> u64 {
    10
}

fn default_fallback_gas_limit() -> u64 {
    100_000
}

impl Default for FeeConfig {
    fn default() -> Self {
        Self {
            tip_cap_gwei: default_tip_cap_gwei(),
            fee_cap_headroom_gwei: default_fee_cap_headroom_gwei(),
            fallback_gas_limit: default_fallback_gas_limit(),
        }
    }
}

impl HarnessConfig {
    pub fn rpc_timeout(&self) -> Duration {
        Duration::from_millis(self.rpc_timeout_ms)
    }

    pub fn confirmation_timeout(&self) -> Duration {
        Duration::from_secs(self.confirmation_timeout_secs)
    }

    pub fn confirmation_poll(&self) -> Duration {
        Duration::from_millis(self.confirmation_poll_ms)
    }
}

impl NetworkConfig {
    pub fn is_local_node(&self) -> bool {
        self.local_node_type.is_some()
    }
}

impl Settings {
    /// Load settings from the configured file, applying environment overrides
    pub fn load() -> Result<Self> {
        let config_path = env::var("FAULTLINE_CONFIG")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("config/default.toml"));

        let mut settings = Self::from_file(&config_path)?;
        settings.apply_env_overrides();
        settings.validate()?;

        Ok(settings)
    }

    /// Parse a settings file without environment overrides or validation
    pub fn from_file(path: &Path) -> Result<Self> {
        let config_str = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;

        // Substitute environment variables
        let config_str = substitute_env_vars(&config_str);

        toml::from_str(&config_str).with_context(|| "Failed to parse configuration")
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(network) = env::var("FAULTLINE_NETWORK") {
            if !network.trim().is_empty() {
                self.harness.network = network.trim().to_string();
            }
        }

        if let Ok(tests) = env::var("FAULTLINE_TESTS") {
            self.harness.tests = split_test_names(&tests);
        }
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        let network = self.network()?;

        if network.rpc_url.is_empty() {
            anyhow::bail!("Network {} has no RPC URL configured", self.harness.network);
        }
        if network.private_key.trim().is_empty() {
            anyhow::bail!(
                "Network {} has no signing key; set PRIVATE_KEY",
                self.harness.network
            );
        }
        if network.to_contract.is_empty() && !network.contracts.contains_key("storage") {
            tracing::warn!(
                "Network {} has no default contract - contract test cases will fail",
                self.harness.network
            );
        }

        Ok(())
    }

    /// Get the selected network configuration
    pub fn network(&self) -> Result<&NetworkConfig> {
        self.networks.get(&self.harness.network).ok_or_else(|| {
            let mut known: Vec<_> = self.networks.keys().cloned().collect();
            known.sort();
            anyhow::anyhow!(
                "Invalid network '{}' (known: {})",
                self.harness.network,
                known.join(", ")
            )
        })
    }
}

/// Split a comma separated list of test names
pub fn split_test_names(input: &str) -> Vec<String> {
    input
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}

/// Substitute environment variables in the format ${VAR_NAME}
fn substitute_env_vars(input: &str) -> String {
    lazy_static::lazy_static! {
        static ref ENV_VAR: regex::Regex =
            regex::Regex::new(r"\$\{([A-Z_][A-Z0-9_]*)\}").expect("static regex");
    }

    let mut result = input.to_string();
    for cap in ENV_VAR.captures_iter(input) {
        let var_name = &cap[1];
        let var_value = env::var(var_name).unwrap_or_default();
        result = result.replace(&cap[0], &var_value);
    }

    result
}
