//! Best-effort inclusion polling for submitted transactions
//!
//! A scenario's purpose is to observe submission-time behaviour, so a
//! transaction still pending at the deadline is an acceptable terminal state.

use super::ChainState;

use ethers::types::H256;
use std::time::Duration;
use tokio::time::{sleep, Instant};
use tracing::{debug, info, warn};

/// Terminal state of a confirmation wait
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Confirmation {
    /// Receipt observed
    Mined { block_number: Option<u64>, success: bool },
    /// Deadline reached without a receipt
    Pending,
}

/// Polls receipts for a bounded amount of time
pub struct ConfirmationWaiter {
    /// Bounded wait per transaction
    wait: Duration,
    /// Delay between receipt polls
    poll_interval: Duration,
}

impl ConfirmationWaiter {
    /// Create a new confirmation waiter
    pub fn new(wait: Duration, poll_interval: Duration) -> Self {
        Self {
            wait,
            poll_interval,
        }
    }

    /// Default bounded wait for a single transaction
    pub fn wait(&self) -> Duration {
        self.wait
    }

    /// Wait for `tx_hash` using the default bounded wait
    pub async fn confirm<C: ChainState + ?Sized>(&self, chain: &C, tx_hash: H256) -> Confirmation {
        self.confirm_until(chain, tx_hash, Instant::now() + self.wait)
            .await
    }

    /// Wait for `tx_hash` until a caller supplied deadline
    pub async fn confirm_until<C: ChainState + ?Sized>(
        &self,
        chain: &C,
        tx_hash: H256,
        deadline: Instant,
    ) -> Confirmation {
        loop {
            match chain.transaction_receipt(tx_hash).await {
                Ok(Some(receipt)) => {
                    let block_number = receipt.block_number.map(|b| b.as_u64());
                    let success = receipt.status.map(|s| s.as_u64() == 1).unwrap_or(false);
                    info!(
                        tx_hash = ?tx_hash,
                        block = ?block_number,
                        success,
                        "Transaction mined"
                    );
                    return Confirmation::Mined {
                        block_number,
                        success,
                    };
                }
                Ok(None) => {
                    debug!(tx_hash = ?tx_hash, "Transaction not yet mined");
                }
                Err(e) => {
                    warn!(tx_hash = ?tx_hash, "Receipt poll failed: {}", e);
                }
            }

            let now = Instant::now();
            if now >= deadline {
                debug!(tx_hash = ?tx_hash, "Confirmation wait elapsed, leaving pending");
                return Confirmation::Pending;
            }
            sleep(std::cmp::min(self.poll_interval, deadline - now)).await;
        }
    }
}

/// Parse a node-returned result string into a transaction hash
pub fn parse_tx_hash(raw: &str) -> Option<H256> {
    raw.parse::<H256>().ok()
}
