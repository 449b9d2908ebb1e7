//! Scenario orchestrator.
//!
//! Runs scenarios one at a time against a shared [`TestEnvironment`]:
//! setup, publish, converge, assert. A scenario failure is recorded and the
//! run moves on; the next scenario re-establishes its own baseline. Only a
//! failed preflight stops the run, and every scenario is then reported as
//! skipped.

use crate::controller::SubscriberMode;
use crate::delivery_set::{compare, ChannelMismatch, DeliverySet};
use crate::environment::TestEnvironment;
use crate::publisher::PublishCommand;
use crate::report::{RunReport, ScenarioOutcome, ScenarioReport};
use crate::scenario::{ScenarioConfig, ScenarioKind, ScenarioPhase};
use crate::{HarnessError, HarnessResult};
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// Run preflight, then every `kinds` scenario for every configured protocol.
pub async fn run_all(env: &TestEnvironment, kinds: &[ScenarioKind]) -> RunReport {
    let mut report = RunReport::new();
    info!(run_id = %report.run_id, scenarios = kinds.len(), "Starting delivery verification run");

    if let Err(e) = env.setup().await {
        error!(error = %e, "Preflight failed, no scenario will run");
        report.aborted = Some(e.to_string());
    }

    for protocol in &env.settings().protocols {
        for &kind in kinds {
            let config = kind.config();

            if report.aborted.is_some() {
                report.push(scenario_report(config, protocol, ScenarioOutcome::Skipped));
                continue;
            }

            let outcome = run_scenario(env, config, protocol).await;
            report.push(scenario_report(config, protocol, outcome));
        }
    }

    report.finish();
    env.teardown(&report);
    report
}

fn scenario_report(
    config: ScenarioConfig,
    protocol: &str,
    outcome: ScenarioOutcome,
) -> ScenarioReport {
    ScenarioReport {
        kind: config.kind,
        name: config.name.to_string(),
        protocol: protocol.to_string(),
        outcome,
    }
}

/// Run one scenario and report how it ended.
pub async fn run_scenario(
    env: &TestEnvironment,
    config: ScenarioConfig,
    protocol: &str,
) -> ScenarioOutcome {
    let label = config.label(protocol);
    info!(scenario = %label, "Running scenario");

    let mut run = ScenarioRun::new(env, config, protocol);
    match run.execute().await {
        Ok(()) => {
            run.enter(ScenarioPhase::Done);
            info!(scenario = %label, "Scenario passed");
            ScenarioOutcome::Passed {
                warnings: run.warnings,
            }
        }
        Err(e) => {
            error!(scenario = %label, phase = %run.phase, error = %e, "Scenario failed");
            let mismatches = match &e {
                HarnessError::ExpectationMismatch { mismatches } => mismatches.clone(),
                _ => Vec::new(),
            };
            ScenarioOutcome::Failed {
                phase: run.phase,
                reason: e.to_string(),
                mismatches,
            }
        }
    }
}

/// State of one scenario in flight.
struct ScenarioRun<'e> {
    env: &'e TestEnvironment,
    config: ScenarioConfig,
    protocol: &'e str,
    phase: ScenarioPhase,
    warnings: Vec<ChannelMismatch>,
}

impl<'e> ScenarioRun<'e> {
    fn new(env: &'e TestEnvironment, config: ScenarioConfig, protocol: &'e str) -> Self {
        Self {
            env,
            config,
            protocol,
            phase: ScenarioPhase::Idle,
            warnings: Vec::new(),
        }
    }

    fn enter(&mut self, phase: ScenarioPhase) {
        debug!(scenario = %self.config.kind, from = %self.phase, to = %phase, "Scenario phase");
        self.phase = phase;
    }

    async fn execute(&mut self) -> HarnessResult<()> {
        match self.config.kind {
            ScenarioKind::Success => self.publish_and_echo().await,
            ScenarioKind::NoTopic => self.publish_without_topic().await,
            ScenarioKind::EmptyResponse => self.delivered_once_without_redelivery().await,
            ScenarioKind::Error | ScenarioKind::Retry | ScenarioKind::InvalidStatus => {
                self.redelivered_until_acknowledged().await
            }
        }
    }

    async fn publish_and_echo(&mut self) -> HarnessResult<()> {
        let protocol = self.protocol;
        let env = self.env;
        let settings = env.settings();

        self.enter(ScenarioPhase::Setup);
        env.controller()
            .set_mode(self.config.subscriber_mode, protocol)
            .await?;

        let sent = self.publish_all().await?;

        self.settle(settings.success_settle).await;
        self.converge_and_assert(&sent).await
    }

    async fn publish_without_topic(&mut self) -> HarnessResult<()> {
        self.enter(ScenarioPhase::Publishing);
        let command = PublishCommand::without_topic(self.protocol);
        info!(
            url = %self.env.publisher().url(),
            body = %serde_json::to_string(&command)?,
            "Publishing without topic"
        );

        let reply = self.env.publisher().post(&command).await?;

        self.enter(ScenarioPhase::Asserting);
        if reply.status != 404 {
            return Err(HarnessError::Configuration(format!(
                "publish without topic expected status 404, got {}",
                reply.status
            )));
        }
        Ok(())
    }

    async fn delivered_once_without_redelivery(&mut self) -> HarnessResult<()> {
        let protocol = self.protocol;
        let env = self.env;
        let settings = env.settings();
        let controller = env.controller();

        self.enter(ScenarioPhase::Setup);
        controller.initialize(protocol).await?;
        controller.set_mode(self.config.subscriber_mode, protocol).await?;

        let sent = self.publish_all().await?;

        // the empty acknowledgement still counts as a delivery
        self.settle(settings.empty_response_settle).await;
        self.converge_and_assert(&sent).await?;

        self.enter(ScenarioPhase::Setup);
        controller.initialize(protocol).await?;
        controller.set_mode(SubscriberMode::Success, protocol).await?;

        info!(scenario = %self.config.kind, "Validating no redelivered messages");
        self.settle(settings.redelivery_settle).await;
        self.converge_and_assert(&DeliverySet::empty()).await
    }

    async fn redelivered_until_acknowledged(&mut self) -> HarnessResult<()> {
        let protocol = self.protocol;
        let env = self.env;
        let settings = env.settings();
        let controller = env.controller();

        self.enter(ScenarioPhase::Setup);
        controller.initialize(protocol).await?;
        controller.set_mode(self.config.subscriber_mode, protocol).await?;

        let sent = self.publish_all().await?;

        self.enter(ScenarioPhase::Setup);
        controller.set_mode(SubscriberMode::Success, protocol).await?;

        info!(scenario = %self.config.kind, "Validating redelivered messages");
        self.settle(settings.redelivery_settle).await;
        self.converge_and_assert(&sent).await
    }

    /// Publish one batch per channel, each from a fresh random offset.
    async fn publish_all(&mut self) -> HarnessResult<DeliverySet> {
        self.enter(ScenarioPhase::Publishing);
        let env = self.env;
        let settings = env.settings();
        let mut sent = DeliverySet::empty();

        for spec in &settings.channels {
            let offset = env.next_offset();
            let accepted = env
                .publisher()
                .publish_batch(spec, self.protocol, offset, settings.messages_per_topic)
                .await
                .into_result()?;
            sent.insert(spec.channel, accepted);
        }

        info!(
            scenario = %self.config.kind,
            protocol = %self.protocol,
            total = sent.total(),
            "All channels published"
        );
        Ok(sent)
    }

    async fn settle(&mut self, delay: Duration) {
        self.enter(ScenarioPhase::Converging);
        debug!(delay_ms = delay.as_millis() as u64, "Waiting for deliveries to settle");
        self.env.clock().sleep(delay).await;
    }

    async fn converge_and_assert(&mut self, expected: &DeliverySet) -> HarnessResult<()> {
        self.enter(ScenarioPhase::Converging);
        let env = self.env;
        let outcome = env
            .poller()
            .poll(env.controller(), self.protocol, expected)
            .await?;
        if !outcome.converged {
            warn!(
                attempts = outcome.attempts,
                "Ledger counts never matched, comparing last snapshot"
            );
        }

        self.enter(ScenarioPhase::Asserting);
        let comparison = compare(expected, &outcome.snapshot, &env.settings().channels);
        for warning in &comparison.warnings {
            warn!(
                channel = %warning.channel,
                expected = warning.expected_count,
                observed = warning.observed_count,
                "Mismatch on relaxed channel"
            );
        }
        let warnings = comparison.into_result()?;
        self.warnings.extend(warnings);
        Ok(())
    }
}
