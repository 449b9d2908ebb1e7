//! Preflight probing run once before any scenario.
//!
//! Deployments can take a while to become routable, so both probes retry at
//! a fixed interval within a fixed budget. Running out of budget is fatal.

use crate::clock::Clock;
use crate::publisher::{PublishCommand, PublishDriver};
use crate::transport::HarnessTransport;
use crate::{HarnessError, HarnessResult};
use std::time::Duration;
use tracing::{debug, info, warn};

/// GET `url` until any HTTP response arrives. Returns the attempts used.
pub async fn probe_reachable(
    transport: &dyn HarnessTransport,
    clock: &dyn Clock,
    url: &str,
    attempts: u32,
    interval: Duration,
) -> HarnessResult<u32> {
    let attempts = attempts.max(1);
    let mut last_error = String::new();

    for attempt in 1..=attempts {
        match transport.get(url).await {
            Ok(reply) => {
                info!(url = %url, attempt, status = reply.status, "App reachable");
                return Ok(attempt);
            }
            Err(e) => {
                debug!(url = %url, attempt, error = %e, "App not reachable yet");
                last_error = e.to_string();
            }
        }
        if attempt < attempts {
            clock.sleep(interval).await;
        }
    }

    Err(HarnessError::Unreachable {
        url: url.to_string(),
        attempts,
        last_error,
    })
}

/// Publish a health check message until the publisher accepts it (200 or 204).
///
/// `retries` counts attempts after the first one.
pub async fn publish_health_check(
    driver: &PublishDriver,
    clock: &dyn Clock,
    protocol: &str,
    retries: u32,
    interval: Duration,
) -> HarnessResult<()> {
    let command = PublishCommand::health_check(protocol);
    let attempts = retries.saturating_add(1);
    let mut last_error = String::new();

    for attempt in 1..=attempts {
        match driver.post(&command).await {
            Ok(reply) if reply.status == 200 || reply.status == 204 => {
                info!(protocol = %protocol, attempt, "Publish health check passed");
                return Ok(());
            }
            Ok(reply) => {
                last_error = format!("publish failed with status {}", reply.status);
            }
            Err(e) => {
                last_error = e.to_string();
            }
        }
        warn!(protocol = %protocol, attempt, error = %last_error, "Publish health check failed");
        if attempt < attempts {
            clock.sleep(interval).await;
        }
    }

    Err(HarnessError::Unreachable {
        url: driver.url().to_string(),
        attempts,
        last_error,
    })
}
