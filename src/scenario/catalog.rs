//! `eth_sendRawTransaction` fault-injection catalog
//!
//! Ids are not unique: scenarios probing the same node error share one.
//!
//! # Authoring hazard
//!
//! `Modifier::GasPrice` switches the transaction to legacy pricing. Any
//! `TipCap` or `FeeCap` modifier placed after it does nothing, and one placed
//! before it is overridden at signing time. Keep gas-price scenarios and
//! fee-market scenarios separate.

use super::{CompanionPosition, Scenario};
use crate::contract::{AbiContract, ContractInterface};
use crate::error::HarnessResult;
use crate::tx::{
    Modifier, Override, PayloadOverride, PreSend, RecipientOverride, ValueOverride,
};

use ethers::types::{Address, U256};

/// Key with no funds on any configured network
const UNFUNDED_KEY: &str = "f7d9eb9afde6a5da1e7257e0d1c1c7b7f0e5476a8f6bfc9f1c2e076fcff6a2a6";

const ONE_ETHER: i128 = 1_000_000_000_000_000_000;
const GWEI: u64 = 1_000_000_000;

/// Largest gas limit a single transaction may carry (2^24)
const MAX_TX_GAS: u64 = 16_777_216;

/// All transaction scenarios, in execution order
///
/// `invalid_contract` is the recipient of the invalid-contract scenario.
pub fn send_raw_transaction_scenarios(invalid_contract: Address) -> HarnessResult<Vec<Scenario>> {
    let opcodes = AbiContract::opcodes()?;
    let invalid_opcode = opcodes.encode_call("test_invalid", &[])?;
    let revert_opcode = opcodes.encode_call("test_revert", &[])?;

    Ok(vec![
        Scenario::new(1, "Proper request"),
        Scenario::new(3, "UseInvalidFunction")
            .method("eth_wrongSendRawTransaction")
            .modifier(Modifier::MalformedSelector {
                signature: "invalidFunction(uint256)".to_string(),
                argument: U256::from(20u64),
            }),
        Scenario::new(4, "NONCE_TOO_LOW").modifier(Modifier::Nonce(Override::literal(0))),
        Scenario::new(5, "NONCE_TOO_HIGH")
            .modifier(Modifier::Nonce(Override::transform(|n: u64| n + 100))),
        Scenario::new(7, "UseInvalidAccount").modifier(Modifier::Sender(UNFUNDED_KEY.to_string())),
        Scenario::new(8, "UseInvalidContract").modifier(Modifier::Recipient(
            RecipientOverride::Address(invalid_contract),
        )),
        Scenario::new(9, "OVERSIZED_DATA")
            .modifier(Modifier::Payload(PayloadOverride::ZeroFilled(1024 * 1024))),
        Scenario::new(11, "GAS_PRICE_TOO_LOW-Legacy")
            .modifier(Modifier::GasPrice(Override::literal(U256::zero()))),
        Scenario::new(11, "GAS_PRICE_TOO_LOW-Dynamic")
            .modifier(Modifier::TipCap(Override::literal(U256::zero())))
            .modifier(Modifier::FeeCap(Override::literal(U256::zero()))),
        Scenario::new(12, "FEE_CAP_EXCEEDED")
            .modifier(Modifier::GasLimit(Override::literal(16_000_000)))
            .modifier(Modifier::GasPrice(Override::literal(
                U256::from(200u64) * U256::from(GWEI),
            ))),
        Scenario::new(10, "BLOCK_GAS_LIMIT_EXCEEDED")
            .modifier(Modifier::GasLimit(Override::literal(46_000_000))),
        Scenario::new(10, "TRANSACTION_GAS_LIMIT_EXCEEDED: GasLimitTooHigh")
            .modifier(Modifier::GasLimit(Override::literal(MAX_TX_GAS + 1))),
        Scenario::new(13, "GAS_TOO_LOW - Intrinsic gas too low")
            .modifier(Modifier::GasLimit(Override::literal(20_000))),
        // Intrinsic gas for the store(20) payload and nothing more
        Scenario::new(14, "OUT_OF_GAS - Transaction runs out of gas")
            .modifier(Modifier::GasLimit(Override::literal(21_204))),
        Scenario::new(17, "TipAboveFeeCap - max priority fee per gas higher than max fee per gas")
            .modifier(Modifier::FeeCap(Override::literal(U256::from(10u64)))),
        Scenario::new(20, "INVALID_OPCODE")
            .modifier(Modifier::Payload(PayloadOverride::Exact(invalid_opcode)))
            .modifier(Modifier::Recipient(RecipientOverride::Contract(
                "opcodes".to_string(),
            )))
            .pre_send(PreSend::EstimateGasProbe),
        Scenario::new(20, "REVERT_OPCODE")
            .modifier(Modifier::Payload(PayloadOverride::Exact(revert_opcode)))
            .modifier(Modifier::Recipient(RecipientOverride::Contract(
                "opcodes".to_string(),
            )))
            .pre_send(PreSend::EstimateGasProbe),
        Scenario::new(20, "INSUFFICIENT_FUNDS - Not enough funds for gas * price + value")
            .modifier(Modifier::Value(ValueOverride::BalanceOffset(ONE_ETHER))),
        Scenario::new(21, "REPLACEMENT_TRANSACTION_UNDERPRICED - Replacement without price bump")
            .batch(
                PreSend::Duplicate {
                    value: Some(U256::from(1000u64)),
                },
                CompanionPosition::After,
            ),
        Scenario::new(22, "ALREADY_KNOWN").batch(
            PreSend::Duplicate { value: None },
            CompanionPosition::After,
        ),
    ])
}
