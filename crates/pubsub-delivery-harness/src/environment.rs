//! Shared handle on the deployed publisher/subscriber pair.
//!
//! Built once per run, prepared with [`TestEnvironment::setup`], then passed
//! by reference to every scenario. Scenarios share the subscriber's mode and
//! ledger, which is why they run one after another.

use crate::channels::{channel_specs, ChannelSpec};
use crate::clock::{Clock, TokioClock};
use crate::controller::RemoteController;
use crate::health::{probe_reachable, publish_health_check};
use crate::ids::random_offset;
use crate::poller::ConvergencePoller;
use crate::publisher::PublishDriver;
use crate::report::RunReport;
use crate::transport::{HarnessTransport, ReqwestTransport};
use crate::HarnessResult;
use harness_config_and_utils::Config;
use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

/// Run parameters derived from [`Config`].
#[derive(Debug, Clone)]
pub struct HarnessSettings {
    pub protocols: Vec<String>,
    pub subscriber_app_name: String,
    pub messages_per_topic: u32,
    pub random_offset_max: u32,
    pub publish_rate_limit_rps: u32,
    pub receive_message_retries: u32,
    pub poll_interval: Duration,
    pub success_settle: Duration,
    pub empty_response_settle: Duration,
    pub redelivery_settle: Duration,
    pub health_check_attempts: u32,
    pub health_check_interval: Duration,
    pub publish_health_retries: u32,
    pub publish_health_interval: Duration,
    pub channels: Vec<ChannelSpec>,
}

impl HarnessSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            protocols: config.protocols.clone(),
            subscriber_app_name: config.subscriber_app_name.clone(),
            messages_per_topic: config.messages_per_topic,
            random_offset_max: config.random_offset_max,
            publish_rate_limit_rps: config.publish_rate_limit_rps,
            receive_message_retries: config.receive_message_retries,
            poll_interval: config.poll_interval(),
            success_settle: config.success_settle(),
            empty_response_settle: config.empty_response_settle(),
            redelivery_settle: config.redelivery_settle(),
            health_check_attempts: config.health_check_attempts,
            health_check_interval: config.health_check_interval(),
            publish_health_retries: config.publish_health_retries,
            publish_health_interval: config.publish_health_interval(),
            channels: channel_specs(&config.relaxed_channels, &config.cloud_event_types),
        }
    }
}

impl Default for HarnessSettings {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

/// The deployed apps and everything needed to drive them.
pub struct TestEnvironment {
    publisher_base: String,
    subscriber_base: String,
    transport: Arc<dyn HarnessTransport>,
    clock: Arc<dyn Clock>,
    settings: HarnessSettings,
    rng: Mutex<StdRng>,
    publisher: PublishDriver,
    controller: RemoteController,
    poller: ConvergencePoller,
}

impl TestEnvironment {
    /// Environment talking HTTP to the apps named in `config`.
    pub fn from_config(config: &Config, seed: Option<u64>) -> HarnessResult<Self> {
        config.validate()?;
        let publisher = config.publisher_url()?;
        let subscriber = config.subscriber_url()?;
        let transport = Arc::new(ReqwestTransport::new(config.request_timeout())?);

        Ok(Self::new(
            publisher.as_str(),
            subscriber.as_str(),
            transport,
            Arc::new(TokioClock),
            HarnessSettings::from_config(config),
            seed,
        ))
    }

    /// Environment from explicit parts. `seed` fixes message offsets.
    pub fn new(
        publisher_base: &str,
        subscriber_base: &str,
        transport: Arc<dyn HarnessTransport>,
        clock: Arc<dyn Clock>,
        settings: HarnessSettings,
        seed: Option<u64>,
    ) -> Self {
        let publisher_base = publisher_base.trim_end_matches('/').to_string();
        let subscriber_base = subscriber_base.trim_end_matches('/').to_string();
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        Self {
            publisher: PublishDriver::new(
                transport.clone(),
                clock.clone(),
                &publisher_base,
                settings.publish_rate_limit_rps,
            ),
            controller: RemoteController::new(
                transport.clone(),
                &publisher_base,
                settings.subscriber_app_name.clone(),
            ),
            poller: ConvergencePoller::new(
                clock.clone(),
                settings.receive_message_retries,
                settings.poll_interval,
            ),
            publisher_base,
            subscriber_base,
            transport,
            clock,
            settings,
            rng: Mutex::new(rng),
        }
    }

    /// Probe both apps and check that publishing works for every protocol.
    pub async fn setup(&self) -> HarnessResult<()> {
        info!(
            publisher = %self.publisher_base,
            subscriber = %self.subscriber_base,
            "Preparing test environment"
        );

        for url in [&self.publisher_base, &self.subscriber_base] {
            probe_reachable(
                self.transport.as_ref(),
                self.clock.as_ref(),
                url,
                self.settings.health_check_attempts,
                self.settings.health_check_interval,
            )
            .await?;
        }

        for protocol in &self.settings.protocols {
            publish_health_check(
                &self.publisher,
                self.clock.as_ref(),
                protocol,
                self.settings.publish_health_retries,
                self.settings.publish_health_interval,
            )
            .await?;
        }

        Ok(())
    }

    /// Log the final tally. Nothing remote needs undoing: each scenario
    /// re-establishes its own baseline.
    pub fn teardown(&self, report: &RunReport) {
        info!(
            run_id = %report.run_id,
            passed = report.passed_count(),
            failed = report.failed_count(),
            aborted = report.aborted.is_some(),
            "Test environment released"
        );
    }

    /// Random starting suffix for the next batch.
    pub fn next_offset(&self) -> u32 {
        random_offset(&mut *self.rng.lock(), self.settings.random_offset_max)
    }

    pub fn settings(&self) -> &HarnessSettings {
        &self.settings
    }

    pub fn clock(&self) -> &dyn Clock {
        self.clock.as_ref()
    }

    pub fn publisher(&self) -> &PublishDriver {
        &self.publisher
    }

    pub fn controller(&self) -> &RemoteController {
        &self.controller
    }

    pub fn poller(&self) -> &ConvergencePoller {
        &self.poller
    }

    pub fn publisher_base(&self) -> &str {
        &self.publisher_base
    }

    pub fn subscriber_base(&self) -> &str {
        &self.subscriber_base
    }
}
