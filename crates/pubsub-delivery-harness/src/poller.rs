//! Convergence poller.
//!
//! Reads the subscriber ledger until the per-channel counts match what is
//! expected, or the attempt budget runs out. Only counts are compared while
//! polling; the exact comparison happens afterwards on the last snapshot.

use crate::clock::Clock;
use crate::controller::RemoteController;
use crate::delivery_set::DeliverySet;
use crate::{HarnessError, HarnessResult};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

/// Last ledger snapshot and how polling ended.
#[derive(Debug, Clone)]
pub struct PollOutcome {
    pub snapshot: DeliverySet,
    pub attempts: u32,
    pub converged: bool,
}

/// Bounded, fixed-interval ledger polling.
pub struct ConvergencePoller {
    clock: Arc<dyn Clock>,
    max_attempts: u32,
    interval: Duration,
}

impl ConvergencePoller {
    pub fn new(clock: Arc<dyn Clock>, max_attempts: u32, interval: Duration) -> Self {
        Self {
            clock,
            max_attempts: max_attempts.max(1),
            interval,
        }
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Poll until counts match `expected`. Never makes more than
    /// `max_attempts` ledger reads. Fails only when no snapshot was obtained.
    pub async fn poll(
        &self,
        controller: &RemoteController,
        protocol: &str,
        expected: &DeliverySet,
    ) -> HarnessResult<PollOutcome> {
        info!(url = %controller.url(), protocol = %protocol, "Getting messages received by subscriber");

        let mut last_snapshot: Option<DeliverySet> = None;
        let mut last_error: Option<HarnessError> = None;

        for attempt in 1..=self.max_attempts {
            match controller.fetch_ledger(protocol).await {
                Ok(snapshot) => {
                    let counts = snapshot.counts();
                    info!(attempt, counts = ?counts, "Subscriber ledger snapshot");

                    if snapshot.counts_match(expected) {
                        return Ok(PollOutcome {
                            snapshot,
                            attempts: attempt,
                            converged: true,
                        });
                    }
                    info!(
                        attempt,
                        expected = ?expected.counts(),
                        "Differing counts in received vs. sent messages, retrying"
                    );
                    last_snapshot = Some(snapshot);
                }
                Err(e) => {
                    warn!(attempt, error = %e, "Ledger read failed");
                    last_error = Some(e);
                }
            }

            if attempt < self.max_attempts {
                self.clock.sleep(self.interval).await;
            }
        }

        match last_snapshot {
            Some(snapshot) => Ok(PollOutcome {
                snapshot,
                attempts: self.max_attempts,
                converged: false,
            }),
            None => Err(last_error.unwrap_or_else(|| {
                HarnessError::Ledger("no ledger snapshot obtained".to_string())
            })),
        }
    }
}
