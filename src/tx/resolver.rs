//! Default transaction parameters resolved from live chain state

use super::params::{FeeMode, TransactionParameters};
use crate::chain::ChainState;
use crate::config::FeeConfig;
use crate::error::{HarnessError, HarnessResult};

use ethers::signers::LocalWallet;
use ethers::types::{Address, Bytes, U256};
use tracing::{debug, warn};

const GWEI: u64 = 1_000_000_000;

/// Fee heuristics for freshly resolved parameters
#[derive(Debug, Clone)]
pub struct FeeHeuristics {
    /// Tip cap in wei
    pub tip_cap: U256,
    /// Added to the base fee to form the fee cap, in wei
    pub fee_cap_headroom: U256,
    /// Gas limit used when estimation fails
    pub fallback_gas_limit: u64,
}

impl FeeHeuristics {
    pub fn from_config(config: &FeeConfig) -> Self {
        Self {
            tip_cap: U256::from(config.tip_cap_gwei) * U256::from(GWEI),
            fee_cap_headroom: U256::from(config.fee_cap_headroom_gwei) * U256::from(GWEI),
            fallback_gas_limit: config.fallback_gas_limit,
        }
    }
}

impl Default for FeeHeuristics {
    fn default() -> Self {
        Self::from_config(&FeeConfig::default())
    }
}

/// Builds default parameters for a sender, recipient and payload
pub struct ParameterResolver {
    heuristics: FeeHeuristics,
}

impl ParameterResolver {
    pub fn new(heuristics: FeeHeuristics) -> Self {
        Self { heuristics }
    }

    /// Resolve nonce, gas limit, gas price and fee mode against the node
    ///
    /// Nonce and gas price failures are fatal for the run; a failed gas
    /// estimate falls back to the configured default and a missing base fee
    /// leaves the parameters in legacy mode.
    pub async fn resolve<C: ChainState + ?Sized>(
        &self,
        chain: &C,
        wallet: LocalWallet,
        chain_id: u64,
        to: Address,
        data: Bytes,
    ) -> HarnessResult<TransactionParameters> {
        let mut params = TransactionParameters::new(wallet, chain_id);
        let from = params.from();

        params.nonce = chain
            .pending_nonce(from)
            .await
            .map_err(|e| HarnessError::Nonce {
                address: format!("{:?}", from),
                message: e.to_string(),
            })?;

        params.gas_limit = match chain.estimate_gas(from, Some(to), data.clone()).await {
            Ok(gas) => gas,
            Err(e) => {
                warn!(
                    "Gas estimation failed, using fallback {}: {}",
                    self.heuristics.fallback_gas_limit, e
                );
                self.heuristics.fallback_gas_limit
            }
        };

        params.gas_price = chain
            .gas_price()
            .await
            .map_err(|e| HarnessError::GasPrice(e.to_string()))?;

        match chain.latest_base_fee().await {
            Ok(Some(base_fee)) => {
                params.fee_mode = FeeMode::FeeMarket;
                params.max_priority_fee_per_gas = Some(self.heuristics.tip_cap);
                params.max_fee_per_gas =
                    Some(base_fee.saturating_add(self.heuristics.fee_cap_headroom));
            }
            Ok(None) => debug!("Latest header has no base fee, using legacy pricing"),
            Err(e) => warn!("Header probe failed, using legacy pricing: {}", e),
        }

        params.to = Some(to);
        params.data = data;

        debug!(?params, "Resolved default transaction parameters");
        Ok(params)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{wallet, MockChain};

    fn gwei(n: u64) -> U256 {
        U256::from(n) * U256::from(GWEI)
    }

    #[tokio::test]
    async fn test_fee_market_detected_from_base_fee() {
        let mut chain = MockChain::new();
        chain.expect__pending_nonce().returning(|_| Ok(4));
        chain.expect__estimate_gas().returning(|_, _, _| Ok(43_000));
        chain.expect__gas_price().returning(|| Ok(U256::from(GWEI)));
        chain
            .expect__latest_base_fee()
            .returning(|| Ok(Some(U256::from(7u64))));

        let resolver = ParameterResolver::new(FeeHeuristics::default());
        let to = Address::repeat_byte(0x22);
        let params = resolver
            .resolve(&chain, wallet(), 1337, to, Bytes::from(vec![1, 2, 3]))
            .await
            .unwrap();

        assert_eq!(params.nonce, 4);
        assert_eq!(params.gas_limit, 43_000);
        assert_eq!(params.fee_mode, FeeMode::FeeMarket);
        assert_eq!(params.max_priority_fee_per_gas, Some(gwei(2)));
        assert_eq!(params.max_fee_per_gas, Some(gwei(10) + U256::from(7u64)));
        assert_eq!(params.to, Some(to));
        assert_eq!(params.value, U256::zero());
        assert_eq!(&params.data[..], &[1u8, 2, 3]);
    }

    #[tokio::test]
    async fn test_estimate_failure_falls_back() {
        let mut chain = MockChain::new();
        chain.expect__pending_nonce().returning(|_| Ok(0));
        chain.expect__estimate_gas().returning(|_, _, _| {
            Err(HarnessError::ChainQuery {
                method: "eth_estimateGas".into(),
                message: "execution reverted".into(),
            })
        });
        chain.expect__gas_price().returning(|| Ok(U256::one()));
        chain.expect__latest_base_fee().returning(|| Ok(None));

        let resolver = ParameterResolver::new(FeeHeuristics::default());
        let params = resolver
            .resolve(&chain, wallet(), 1, Address::zero(), Bytes::default())
            .await
            .unwrap();

        assert_eq!(params.gas_limit, 100_000);
        assert_eq!(params.fee_mode, FeeMode::Legacy);
        assert!(params.max_fee_per_gas.is_none());
        assert!(params.max_priority_fee_per_gas.is_none());
    }

    #[tokio::test]
    async fn test_nonce_failure_is_fatal() {
        let mut chain = MockChain::new();
        chain.expect__pending_nonce().returning(|_| {
            Err(HarnessError::Timeout {
                operation: "eth_getTransactionCount".into(),
            })
        });

        let resolver = ParameterResolver::new(FeeHeuristics::default());
        let err = resolver
            .resolve(&chain, wallet(), 1, Address::zero(), Bytes::default())
            .await
            .unwrap_err();
        assert!(matches!(err, HarnessError::Nonce { .. }));
        assert!(err.is_fatal());
    }

    #[tokio::test]
    async fn test_gas_price_failure_is_fatal() {
        let mut chain = MockChain::new();
        chain.expect__pending_nonce().returning(|_| Ok(1));
        chain.expect__estimate_gas().returning(|_, _, _| Ok(21_000));
        chain.expect__gas_price().returning(|| {
            Err(HarnessError::ChainQuery {
                method: "eth_gasPrice".into(),
                message: "unavailable".into(),
            })
        });

        let resolver = ParameterResolver::new(FeeHeuristics::default());
        let err = resolver
            .resolve(&chain, wallet(), 1, Address::zero(), Bytes::default())
            .await
            .unwrap_err();
        assert!(matches!(err, HarnessError::GasPrice(_)));
        assert!(err.is_fatal());
    }

    #[tokio::test]
    async fn test_header_probe_failure_keeps_legacy() {
        let mut chain = MockChain::new();
        chain.expect__pending_nonce().returning(|_| Ok(1));
        chain.expect__estimate_gas().returning(|_, _, _| Ok(21_000));
        chain.expect__gas_price().returning(|| Ok(U256::from(5u64)));
        chain.expect__latest_base_fee().returning(|| {
            Err(HarnessError::Timeout {
                operation: "eth_getBlockByNumber".into(),
            })
        });

        let resolver = ParameterResolver::new(FeeHeuristics::default());
        let params = resolver
            .resolve(&chain, wallet(), 1, Address::zero(), Bytes::default())
            .await
            .unwrap();
        assert_eq!(params.fee_mode, FeeMode::Legacy);
        assert_eq!(params.gas_price, U256::from(5u64));
    }
}
