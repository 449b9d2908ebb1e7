mod common;

use common::{environment, fast_settings, FakeEnvironment, Faults};
use pubsub_delivery_harness::channels::{channel_specs, Channel};
use pubsub_delivery_harness::{
    run_all, run_scenario, ManualClock, ScenarioKind, ScenarioOutcome, ScenarioPhase,
};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

fn failed_parts(outcome: &ScenarioOutcome) -> (ScenarioPhase, &str, usize) {
    match outcome {
        ScenarioOutcome::Failed {
            phase,
            reason,
            mismatches,
        } => (*phase, reason.as_str(), mismatches.len()),
        other => panic!("expected failure, got {other:?}"),
    }
}

#[tokio::test]
async fn full_run_passes_against_healthy_broker() {
    let fake = FakeEnvironment::healthy();
    let clock = Arc::new(ManualClock::new());
    let env = environment(&fake, &clock, fast_settings());

    let report = run_all(&env, &ScenarioKind::ALL).await;

    assert!(report.aborted.is_none(), "aborted: {:?}", report.aborted);
    assert_eq!(report.scenarios.len(), 6);
    assert!(report.all_passed(), "{:#?}", report.summary_lines());
    assert!(report.finished_at.is_some());

    // five publishing scenarios, five channels, ten messages each
    assert_eq!(fake.publishes(), 250);
    assert!(clock.sleeps().contains(&Duration::from_secs(30)));
    assert!(clock.sleeps().contains(&Duration::from_secs(10)));

    let order: Vec<_> = report.scenarios.iter().map(|s| s.kind).collect();
    assert_eq!(order, ScenarioKind::ALL.to_vec());
}

#[tokio::test]
async fn success_scenario_sets_mode_then_polls_once() {
    let fake = FakeEnvironment::healthy();
    let clock = Arc::new(ManualClock::new());
    let env = environment(&fake, &clock, fast_settings());

    let report = run_all(&env, &[ScenarioKind::Success]).await;

    assert!(report.all_passed());
    assert_eq!(
        fake.control_methods(),
        vec!["set-respond-success".to_string(), "getMessages".to_string()]
    );
}

#[tokio::test]
async fn lost_messages_fail_strict_channel_after_full_poll_budget() {
    let fake = FakeEnvironment::with_faults(Faults {
        lost_channel: Some(Channel::TopicB),
        ..Faults::default()
    });
    let clock = Arc::new(ManualClock::new());
    let env = environment(&fake, &clock, fast_settings());

    let report = run_all(&env, &[ScenarioKind::Success, ScenarioKind::NoTopic]).await;

    let success = &report.scenarios[0];
    let (phase, reason, mismatches) = failed_parts(&success.outcome);
    assert_eq!(phase, ScenarioPhase::Asserting);
    assert_eq!(mismatches, 1);
    assert!(reason.contains("topic-b"), "reason: {reason}");

    if let ScenarioOutcome::Failed { mismatches, .. } = &success.outcome {
        assert_eq!(mismatches[0].channel, Channel::TopicB);
        assert_eq!(mismatches[0].observed_count, 0);
        assert_eq!(mismatches[0].missing.len(), 10);
    }

    let polls = fake
        .control_methods()
        .iter()
        .filter(|m| m.as_str() == "getMessages")
        .count();
    assert_eq!(polls, 10);

    // a mismatch fails the scenario, not the run
    assert!(report.aborted.is_none());
    assert!(report.scenarios[1].passed());
}

#[tokio::test]
async fn relaxed_channel_loss_is_a_warning() {
    let fake = FakeEnvironment::with_faults(Faults {
        lost_channel: Some(Channel::Mqtt),
        ..Faults::default()
    });
    let clock = Arc::new(ManualClock::new());
    let mut settings = fast_settings();
    settings.channels = channel_specs(&["mqtt".to_string()], &BTreeMap::new());
    let env = environment(&fake, &clock, settings);

    let report = run_all(&env, &[ScenarioKind::Success]).await;

    assert!(report.all_passed(), "{:#?}", report.summary_lines());
    match &report.scenarios[0].outcome {
        ScenarioOutcome::Passed { warnings } => {
            assert_eq!(warnings.len(), 1);
            assert_eq!(warnings[0].channel, Channel::Mqtt);
        }
        other => panic!("expected pass, got {other:?}"),
    }
    assert!(report.summary_lines()[0].contains("warning"));
}

#[tokio::test]
async fn redelivery_after_empty_acknowledgement_is_caught() {
    let fake = FakeEnvironment::with_faults(Faults {
        redeliver_after_empty: true,
        ..Faults::default()
    });
    let clock = Arc::new(ManualClock::new());
    let env = environment(&fake, &clock, fast_settings());

    let report = run_all(&env, &[ScenarioKind::EmptyResponse]).await;

    match &report.scenarios[0].outcome {
        ScenarioOutcome::Failed {
            phase, mismatches, ..
        } => {
            assert_eq!(*phase, ScenarioPhase::Asserting);
            assert_eq!(mismatches.len(), 5);
            for mismatch in mismatches {
                assert_eq!(mismatch.expected_count, 0);
                assert_eq!(mismatch.unexpected.len(), 10);
            }
        }
        other => panic!("expected failure, got {other:?}"),
    }
}

#[tokio::test]
async fn control_failure_fails_only_its_scenario() {
    let fake = FakeEnvironment::with_faults(Faults {
        failing_method: Some("set-respond-error".to_string()),
        ..Faults::default()
    });
    let clock = Arc::new(ManualClock::new());
    let env = environment(&fake, &clock, fast_settings());

    let report = run_all(&env, &ScenarioKind::ALL).await;

    assert!(report.aborted.is_none(), "aborted: {:?}", report.aborted);
    assert_eq!(report.scenarios.len(), 6);

    let error = &report.scenarios[3];
    assert_eq!(error.kind, ScenarioKind::Error);
    let (phase, reason, _) = failed_parts(&error.outcome);
    assert_eq!(phase, ScenarioPhase::Setup);
    assert!(reason.contains("set-respond-error"), "reason: {reason}");

    for (index, scenario) in report.scenarios.iter().enumerate() {
        if index != 3 {
            assert!(scenario.passed(), "{}: {:?}", scenario.label(), scenario.outcome);
        }
    }
    assert_eq!(report.failed_count(), 1);
    assert!(!report.all_passed());

    // later scenarios still reset and steer the subscriber
    let methods = fake.control_methods();
    assert!(methods.contains(&"set-respond-retry".to_string()));
    assert!(methods.contains(&"set-respond-invalid-status".to_string()));
}

#[tokio::test]
async fn run_scenario_fails_in_setup_when_reset_is_refused() {
    let fake = FakeEnvironment::with_faults(Faults {
        failing_method: Some("initialize".to_string()),
        ..Faults::default()
    });
    let clock = Arc::new(ManualClock::new());
    let env = environment(&fake, &clock, fast_settings());

    let outcome = run_scenario(&env, ScenarioKind::Error.config(), "http").await;

    assert_eq!(failed_parts(&outcome).0, ScenarioPhase::Setup);
    assert_eq!(fake.publishes(), 0);
}

#[tokio::test]
async fn lost_redelivery_is_caught() {
    let fake = FakeEnvironment::with_faults(Faults {
        drop_nacked: true,
        ..Faults::default()
    });
    let clock = Arc::new(ManualClock::new());
    let settings = fast_settings();
    let per_topic = settings.messages_per_topic as usize;
    let env = environment(&fake, &clock, settings);

    let report = run_all(&env, &[ScenarioKind::Error, ScenarioKind::Success]).await;

    match &report.scenarios[0].outcome {
        ScenarioOutcome::Failed {
            phase, mismatches, ..
        } => {
            assert_eq!(*phase, ScenarioPhase::Asserting);
            assert_eq!(mismatches.len(), 5);
            for mismatch in mismatches {
                assert_eq!(mismatch.observed_count, 0);
                assert_eq!(mismatch.missing.len(), per_topic);
            }
        }
        other => panic!("expected failure, got {other:?}"),
    }
    assert!(report.aborted.is_none());
    assert!(report.scenarios[1].passed());
}

#[tokio::test]
async fn cloud_event_channels_are_unwrapped_by_subscriber() {
    let fake = FakeEnvironment::healthy();
    let clock = Arc::new(ManualClock::new());
    let mut settings = fast_settings();
    let types = BTreeMap::from([("topic-a".to_string(), "order.created".to_string())]);
    settings.channels = channel_specs(&[], &types);
    let env = environment(&fake, &clock, settings);

    let report = run_all(&env, &[ScenarioKind::Success]).await;

    assert!(report.all_passed(), "{:#?}", report.summary_lines());
}

#[tokio::test]
async fn unreachable_publisher_skips_everything() {
    let fake = FakeEnvironment::with_faults(Faults {
        unreachable: true,
        ..Faults::default()
    });
    let clock = Arc::new(ManualClock::new());
    let env = environment(&fake, &clock, fast_settings());

    let report = run_all(&env, &ScenarioKind::ALL).await;

    assert!(report.aborted.is_some());
    assert_eq!(report.scenarios.len(), 6);
    assert!(report
        .scenarios
        .iter()
        .all(|s| s.outcome == ScenarioOutcome::Skipped));
    assert_eq!(report.failed_count(), 0);
    assert!(!report.all_passed());

    // only the publisher is probed; the budget runs out there
    assert_eq!(fake.gets(), 60);
    assert_eq!(clock.total_slept(), Duration::from_secs(59));
}

#[tokio::test]
async fn every_protocol_gets_a_full_pass() {
    let fake = FakeEnvironment::healthy();
    let clock = Arc::new(ManualClock::new());
    let mut settings = fast_settings();
    settings.protocols = vec!["http".to_string(), "grpc".to_string()];
    let env = environment(&fake, &clock, settings);

    let report = run_all(&env, &ScenarioKind::ALL).await;

    assert_eq!(report.scenarios.len(), 12);
    assert!(report.all_passed(), "{:#?}", report.summary_lines());
    assert!(report.scenarios[..6].iter().all(|s| s.protocol == "http"));
    assert!(report.scenarios[6..].iter().all(|s| s.protocol == "grpc"));
    assert_eq!(
        report.scenarios[11].label(),
        "publish with subscriber invalid status test redelivery of messages_grpc"
    );
}

#[tokio::test]
async fn accepted_topicless_publish_fails_without_aborting() {
    let fake = FakeEnvironment::with_faults(Faults {
        topicless_status: Some(200),
        ..Faults::default()
    });
    let clock = Arc::new(ManualClock::new());
    let env = environment(&fake, &clock, fast_settings());

    let report = run_all(&env, &[ScenarioKind::NoTopic, ScenarioKind::Success]).await;

    let (phase, reason, _) = failed_parts(&report.scenarios[0].outcome);
    assert_eq!(phase, ScenarioPhase::Asserting);
    assert!(reason.contains("404"), "reason: {reason}");
    assert!(report.aborted.is_none());
    assert!(report.scenarios[1].passed());
}

#[tokio::test]
async fn rejected_publish_fails_scenario_in_publishing_phase() {
    let fake = FakeEnvironment::with_faults(Faults {
        rejected_channel: Some((Channel::TopicC, 500)),
        ..Faults::default()
    });
    let clock = Arc::new(ManualClock::new());
    let env = environment(&fake, &clock, fast_settings());

    let report = run_all(&env, &[ScenarioKind::Success, ScenarioKind::NoTopic]).await;

    let (phase, reason, _) = failed_parts(&report.scenarios[0].outcome);
    assert_eq!(phase, ScenarioPhase::Publishing);
    assert!(reason.contains("500"), "reason: {reason}");
    assert!(reason.contains("pubsub-c-topic-http"), "reason: {reason}");
    assert!(report.aborted.is_none());
    assert!(report.scenarios[1].passed());
}
