//! Contract Test: Worker Tick
//!
//! Constraints verified:
//! - A changed address is written once and the hook runs with it
//! - An unchanged address causes no write and no hook
//! - The provider is re-read every tick, so out-of-band edits are repaired
//! - Resolve and update failures skip the tick without running the hook
//! - Construction fails fast on bad parameters, one record at a time
//!
//! If this test fails, the resolve → reconcile → hook flow is broken.

mod common;

use common::*;
use ddk_core::{Error, GlobalConfig, HookOutcome, TickOutcome, UpdateResult, Worker};
use std::sync::Arc;
use std::time::Duration;

fn build_worker(
    remote: &FakeRemote,
    runner: &RecordingRunner,
    record: ddk_core::RecordConfig,
) -> Worker {
    let registry = fake_registry(remote);
    Worker::new(
        &record,
        &GlobalConfig::default(),
        &registry,
        Arc::new(runner.clone()),
        shared_dedup(),
    )
    .expect("worker construction succeeds")
}

#[tokio::test]
async fn changed_address_is_written_and_hook_runs() {
    let remote = FakeRemote::holding(ip("198.51.100.1"));
    let runner = RecordingRunner::new();
    runner.set_output(IP_CMD, "198.51.100.7\n");

    let record = fake_record("home.example.com").with_on_update("notify ${IP_ADDRESS}");
    let mut worker = build_worker(&remote, &runner, record);

    let outcome = worker.tick().await;

    match outcome {
        TickOutcome::Changed {
            address,
            result,
            hook: HookOutcome::Ran(steps),
        } => {
            assert_eq!(address, ip("198.51.100.7"));
            assert_eq!(
                result,
                UpdateResult::Updated {
                    previous_ip: Some(ip("198.51.100.1")),
                    new_ip: ip("198.51.100.7"),
                }
            );
            assert_eq!(steps.len(), 1);
            assert!(steps[0].succeeded());
        }
        other => panic!("expected a changed tick with hook, got {:?}", other),
    }

    assert_eq!(remote.get(), Some(ip("198.51.100.7")));
    assert_eq!(remote.writes(), 1);
    assert_eq!(runner.hook_calls(), vec!["notify 198.51.100.7".to_string()]);
}

#[tokio::test]
async fn change_then_steady_state() {
    let remote = FakeRemote::holding(ip("198.51.100.1"));
    let runner = RecordingRunner::new();
    runner.set_output(IP_CMD, "198.51.100.7");

    let record = fake_record("home.example.com").with_on_update("notify ${IP_ADDRESS}");
    let mut worker = build_worker(&remote, &runner, record);

    let first = worker.tick().await;
    assert!(first.is_changed());
    assert!(first.hook_ran());
    assert_eq!(remote.get(), Some(ip("198.51.100.7")));

    let second = worker.tick().await;
    assert!(matches!(second, TickOutcome::Unchanged(addr) if addr == ip("198.51.100.7")));
    assert!(!second.hook_ran());

    assert_eq!(remote.reads(), 2);
    assert_eq!(remote.writes(), 1);
    assert_eq!(runner.hook_calls(), vec!["notify 198.51.100.7".to_string()]);
}

#[tokio::test]
async fn unchanged_address_is_a_no_op() {
    let remote = FakeRemote::holding(ip("198.51.100.7"));
    let runner = RecordingRunner::new();
    runner.set_output(IP_CMD, "198.51.100.7");

    let record = fake_record("home.example.com").with_on_update("notify ${IP_ADDRESS}");
    let mut worker = build_worker(&remote, &runner, record);

    for _ in 0..3 {
        let outcome = worker.tick().await;
        assert!(matches!(outcome, TickOutcome::Unchanged(addr) if addr == ip("198.51.100.7")));
    }

    assert_eq!(remote.reads(), 3, "every tick reads the provider");
    assert_eq!(remote.writes(), 0);
    assert!(runner.hook_calls().is_empty());
}

#[tokio::test]
async fn repeated_ticks_write_once() {
    let remote = FakeRemote::new();
    let runner = RecordingRunner::new();
    runner.set_output(IP_CMD, "2001:db8::7");

    let mut worker = build_worker(&remote, &runner, fake_record("v6.example.com"));

    let first = worker.tick().await;
    assert!(matches!(
        first,
        TickOutcome::Changed {
            result: UpdateResult::Created { .. },
            hook: HookOutcome::NotConfigured,
            ..
        }
    ));

    let second = worker.tick().await;
    assert!(!second.is_changed());
    assert_eq!(remote.writes(), 1);
}

#[tokio::test]
async fn out_of_band_edit_is_repaired() {
    let remote = FakeRemote::holding(ip("198.51.100.7"));
    let runner = RecordingRunner::new();
    runner.set_output(IP_CMD, "198.51.100.7");

    let record = fake_record("home.example.com").with_on_update("notify ${IP_ADDRESS}");
    let mut worker = build_worker(&remote, &runner, record);

    assert!(!worker.tick().await.is_changed());

    // Someone edits the record in the provider console
    remote.set(Some(ip("203.0.113.99")));

    let outcome = worker.tick().await;
    assert!(outcome.is_changed());
    assert_eq!(remote.get(), Some(ip("198.51.100.7")));
    assert_eq!(remote.writes(), 1);
}

#[tokio::test]
async fn hook_does_not_refire_for_known_address() {
    let remote = FakeRemote::holding(ip("198.51.100.1"));
    let runner = RecordingRunner::new();
    runner.set_output(IP_CMD, "198.51.100.7");

    let record = fake_record("home.example.com").with_on_update("notify ${IP_ADDRESS}");
    let mut worker = build_worker(&remote, &runner, record);

    assert!(worker.tick().await.hook_ran());

    remote.set(Some(ip("198.51.100.1")));
    let outcome = worker.tick().await;

    assert!(matches!(
        outcome,
        TickOutcome::Changed {
            hook: HookOutcome::AlreadyFired,
            ..
        }
    ));
    assert_eq!(remote.writes(), 2);
    assert_eq!(runner.hook_calls().len(), 1);
}

#[tokio::test]
async fn hook_sequence_continues_after_failing_step() {
    let remote = FakeRemote::new();
    let runner = RecordingRunner::new();
    runner.set_output(IP_CMD, "198.51.100.7");
    runner.fail("first 198.51.100.7");

    let record =
        fake_record("home.example.com").with_on_update("first ${IP_ADDRESS}; ; second ${IP_ADDRESS}");
    let mut worker = build_worker(&remote, &runner, record);

    match worker.tick().await {
        TickOutcome::Changed {
            hook: HookOutcome::Ran(steps),
            ..
        } => {
            assert_eq!(steps.len(), 2);
            assert!(!steps[0].succeeded());
            assert!(steps[1].succeeded());
        }
        other => panic!("expected hook to run, got {:?}", other),
    }

    assert_eq!(
        runner.hook_calls(),
        vec!["first 198.51.100.7".to_string(), "second 198.51.100.7".to_string()]
    );
}

#[tokio::test]
async fn resolve_failure_skips_the_tick() {
    let remote = FakeRemote::holding(ip("198.51.100.1"));
    let runner = RecordingRunner::new();
    runner.set_output(IP_CMD, "not an address");

    let record = fake_record("home.example.com").with_on_update("notify ${IP_ADDRESS}");
    let mut worker = build_worker(&remote, &runner, record);

    let outcome = worker.tick().await;
    assert!(matches!(outcome, TickOutcome::ResolveFailed(Error::Resolution(_))));

    runner.fail(IP_CMD);
    assert!(matches!(worker.tick().await, TickOutcome::ResolveFailed(_)));

    assert_eq!(remote.reads(), 0);
    assert_eq!(remote.get(), Some(ip("198.51.100.1")));
    assert!(runner.hook_calls().is_empty());
}

#[tokio::test]
async fn update_failure_skips_the_hook_and_recovers() {
    let remote = FakeRemote::holding(ip("198.51.100.1"));
    remote.set_unavailable(true);
    let runner = RecordingRunner::new();
    runner.set_output(IP_CMD, "198.51.100.7");

    let record = fake_record("home.example.com").with_on_update("notify ${IP_ADDRESS}");
    let mut worker = build_worker(&remote, &runner, record);

    let outcome = worker.tick().await;
    match outcome {
        TickOutcome::UpdateFailed(e) => assert!(e.is_transient()),
        other => panic!("expected update failure, got {:?}", other),
    }
    assert!(runner.hook_calls().is_empty());

    // The next tick is the retry
    remote.set_unavailable(false);
    assert!(worker.tick().await.hook_ran());
    assert_eq!(remote.get(), Some(ip("198.51.100.7")));
}

#[tokio::test]
async fn ip_command_output_is_trimmed_and_parsed() {
    let remote = FakeRemote::new();
    let runner = RecordingRunner::new();
    runner.set_output(IP_CMD, "  2001:db8:0:0::1  ");

    let mut worker = build_worker(&remote, &runner, fake_record("v6.example.com"));
    worker.tick().await;

    assert_eq!(remote.get(), Some(ip("2001:db8::1")));
}

#[test]
fn missing_parameter_fails_construction() {
    let remote = FakeRemote::new();
    let registry = fake_registry(&remote);
    let record = ddk_core::RecordConfig::new(FAKE_REGISTRAR, IP_CMD);

    let err = Worker::new(
        &record,
        &GlobalConfig::default(),
        &registry,
        Arc::new(RecordingRunner::new()),
        shared_dedup(),
    )
    .unwrap_err();

    assert!(matches!(err, Error::MissingParameter(ref key) if key == "record_name"));
    assert!(err.is_config());
}

#[test]
fn bad_record_fails_only_its_own_worker() {
    let remote = FakeRemote::new();
    let registry = fake_registry(&remote);
    let records = [
        fake_record("home.example.com"),
        ddk_core::RecordConfig::new("", IP_CMD).with_param("record_name", "x.example.com"),
        ddk_core::RecordConfig::new(FAKE_REGISTRAR, " ").with_param("record_name", "y.example.com"),
        fake_record("office.example.com"),
    ];

    let built: Vec<_> = records
        .iter()
        .map(|record| {
            Worker::new(
                record,
                &GlobalConfig::default(),
                &registry,
                Arc::new(RecordingRunner::new()),
                shared_dedup(),
            )
        })
        .collect();

    assert!(built[0].is_ok());
    assert!(matches!(&built[1], Err(e) if e.is_config()));
    assert!(matches!(&built[2], Err(e) if e.is_config()));
    assert!(built[3].is_ok());
}

#[test]
fn unknown_registrar_fails_construction() {
    let remote = FakeRemote::new();
    let registry = fake_registry(&remote);
    let record = ddk_core::RecordConfig::new("godaddy", IP_CMD);

    let err = Worker::new(
        &record,
        &GlobalConfig::default(),
        &registry,
        Arc::new(RecordingRunner::new()),
        shared_dedup(),
    )
    .unwrap_err();

    assert!(err.is_config());
    assert!(err.to_string().contains("godaddy"));
}

#[test]
fn interval_comes_from_global_config() {
    let remote = FakeRemote::new();
    let registry = fake_registry(&remote);
    let global = GlobalConfig {
        check_interval_seconds: 5,
        ..GlobalConfig::default()
    };

    let worker = Worker::new(
        &fake_record("home.example.com"),
        &global,
        &registry,
        Arc::new(RecordingRunner::new()),
        shared_dedup(),
    )
    .unwrap();

    assert_eq!(worker.interval(), Duration::from_secs(5));
    assert_eq!(worker.registrar(), FAKE_REGISTRAR);
    assert_eq!(worker.record_label(), "home.example.com");
}
