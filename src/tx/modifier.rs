//! Ordered, composable mutations over transaction parameters
//!
//! Modifiers run strictly in declaration order and each one observes the
//! effects of those before it. The first failing modifier aborts the scenario;
//! the rest are not applied.
//!
//! A gas-price override switches the parameters to legacy pricing. Tip-cap and
//! fee-cap overrides declared after it are therefore no-ops, while the same
//! overrides declared before it are applied and then ignored by the signer.

use super::params::{FeeMode, TransactionParameters};
use crate::chain::ChainState;
use crate::contract;
use crate::error::{HarnessError, HarnessResult};

use ethers::signers::LocalWallet;
use ethers::types::{Address, Bytes, U256};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tracing::debug;

/// Literal replacement or transform of the current value
#[derive(Clone)]
pub enum Override<T> {
    Literal(T),
    Transform(Arc<dyn Fn(T) -> T + Send + Sync>),
}

impl<T: Clone> Override<T> {
    pub fn literal(value: T) -> Self {
        Override::Literal(value)
    }

    pub fn transform<F>(f: F) -> Self
    where
        F: Fn(T) -> T + Send + Sync + 'static,
    {
        Override::Transform(Arc::new(f))
    }

    /// New value given the current one
    pub fn apply(&self, current: T) -> T {
        match self {
            Override::Literal(value) => value.clone(),
            Override::Transform(f) => f(current),
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for Override<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Override::Literal(value) => f.debug_tuple("Literal").field(value).finish(),
            Override::Transform(_) => f.write_str("Transform(..)"),
        }
    }
}

/// Value assignment
#[derive(Debug, Clone)]
pub enum ValueOverride {
    Literal(U256),
    /// Current sender balance plus a signed offset in wei
    BalanceOffset(i128),
}

/// Payload replacement
#[derive(Debug, Clone)]
pub enum PayloadOverride {
    Exact(Bytes),
    /// Zero-filled buffer of exactly this many bytes
    ZeroFilled(usize),
}

/// Destination replacement
#[derive(Debug, Clone)]
pub enum RecipientOverride {
    Address(Address),
    /// Address of a deployed contract known to the run, by name
    Contract(String),
}

/// One mutation step of a scenario
#[derive(Debug, Clone)]
pub enum Modifier {
    Nonce(Override<u64>),
    GasLimit(Override<u64>),
    /// Forces legacy pricing
    GasPrice(Override<U256>),
    /// No-op unless in fee-market mode
    TipCap(Override<U256>),
    /// No-op unless in fee-market mode
    FeeCap(Override<U256>),
    Value(ValueOverride),
    Payload(PayloadOverride),
    /// Hex private key of the replacement sender
    Sender(String),
    Recipient(RecipientOverride),
    /// Call data built from an arbitrary, possibly nonexistent, function signature
    MalformedSelector { signature: String, argument: U256 },
}

/// What a modifier may consult besides the parameters themselves
pub struct ModifierContext<'a> {
    pub chain: &'a dyn ChainState,
    pub contracts: &'a HashMap<String, Address>,
}

impl Modifier {
    pub fn name(&self) -> &'static str {
        match self {
            Modifier::Nonce(_) => "nonce",
            Modifier::GasLimit(_) => "gas_limit",
            Modifier::GasPrice(_) => "gas_price",
            Modifier::TipCap(_) => "tip_cap",
            Modifier::FeeCap(_) => "fee_cap",
            Modifier::Value(_) => "value",
            Modifier::Payload(_) => "payload",
            Modifier::Sender(_) => "sender",
            Modifier::Recipient(_) => "recipient",
            Modifier::MalformedSelector { .. } => "malformed_selector",
        }
    }

    /// Apply this modifier; failures carry a plain message
    pub async fn apply(
        &self,
        params: &mut TransactionParameters,
        ctx: &ModifierContext<'_>,
    ) -> Result<(), String> {
        match self {
            Modifier::Nonce(op) => params.nonce = op.apply(params.nonce),
            Modifier::GasLimit(op) => params.gas_limit = op.apply(params.gas_limit),
            Modifier::GasPrice(op) => {
                params.gas_price = op.apply(params.gas_price);
                params.fee_mode = FeeMode::Legacy;
            }
            Modifier::TipCap(op) => {
                if params.is_fee_market() {
                    let current = params.max_priority_fee_per_gas.unwrap_or_default();
                    params.max_priority_fee_per_gas = Some(op.apply(current));
                }
            }
            Modifier::FeeCap(op) => {
                if params.is_fee_market() {
                    let current = params.max_fee_per_gas.unwrap_or_default();
                    params.max_fee_per_gas = Some(op.apply(current));
                }
            }
            Modifier::Value(ValueOverride::Literal(value)) => params.value = *value,
            Modifier::Value(ValueOverride::BalanceOffset(offset)) => {
                let balance = ctx
                    .chain
                    .balance(params.from())
                    .await
                    .map_err(|e| format!("error getting balance: {}", e))?;
                let delta = U256::from(offset.unsigned_abs());
                params.value = if *offset >= 0 {
                    balance
                        .checked_add(delta)
                        .ok_or_else(|| "balance plus offset overflows".to_string())?
                } else {
                    balance.saturating_sub(delta)
                };
            }
            Modifier::Payload(PayloadOverride::Exact(data)) => params.data = data.clone(),
            Modifier::Payload(PayloadOverride::ZeroFilled(size)) => {
                params.data = Bytes::from(vec![0u8; *size]);
            }
            Modifier::Sender(key) => {
                let wallet: LocalWallet = key
                    .trim_start_matches("0x")
                    .parse()
                    .map_err(|e| format!("error loading private key: {}", e))?;
                params.set_wallet(wallet);
                params.nonce = ctx
                    .chain
                    .pending_nonce(params.from())
                    .await
                    .map_err(|e| format!("error getting nonce for account: {}", e))?;
            }
            Modifier::Recipient(RecipientOverride::Address(address)) => {
                params.to = Some(*address);
            }
            Modifier::Recipient(RecipientOverride::Contract(name)) => {
                let address = ctx
                    .contracts
                    .get(name)
                    .ok_or_else(|| format!("no deployed contract named {}", name))?;
                params.to = Some(*address);
            }
            Modifier::MalformedSelector {
                signature,
                argument,
            } => params.data = contract::raw_call(signature, *argument),
        }
        Ok(())
    }
}

/// Apply `modifiers` in order, stopping at the first failure
pub async fn apply_all(
    modifiers: &[Modifier],
    params: &mut TransactionParameters,
    ctx: &ModifierContext<'_>,
) -> HarnessResult<()> {
    for (position, modifier) in modifiers.iter().enumerate() {
        modifier
            .apply(params, ctx)
            .await
            .map_err(|message| HarnessError::Modifier {
                name: modifier.name(),
                position,
                message,
            })?;
        debug!(modifier = modifier.name(), position, "Applied modifier");
    }
    Ok(())
}
