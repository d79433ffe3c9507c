//! Contract Test: Polling and Shutdown
//!
//! Constraints verified:
//! - The first tick happens immediately, later ones on the interval
//! - A worker exits promptly once shutdown is requested
//! - A worker started after shutdown never ticks
//!
//! If this test fails, someone has added:
//! - Tasks that ignore the shutdown signal
//! - Sleeps that are not cancellable

mod common;

use common::*;
use ddk_core::{shutdown_channel, Worker};
use std::sync::Arc;
use std::time::Duration;

fn polling_worker(remote: &FakeRemote, runner: &RecordingRunner) -> Worker {
    let updater = remote.updater("home.example.com");
    let resolver = ddk_core::CommandIpResolver::new(IP_CMD, Arc::new(runner.clone()));

    Worker::with_parts(
        Box::new(updater),
        Box::new(resolver),
        Arc::new(runner.clone()),
        shared_dedup(),
    )
    .with_interval(Duration::from_secs(60))
}

#[tokio::test(start_paused = true)]
async fn ticks_follow_the_interval() {
    let remote = FakeRemote::holding(ip("198.51.100.7"));
    let runner = RecordingRunner::new();
    runner.set_output(IP_CMD, "198.51.100.7");

    let (trigger, shutdown) = shutdown_channel();
    let handle = tokio::spawn(polling_worker(&remote, &runner).run(shutdown));

    tokio::time::sleep(Duration::from_millis(10)).await;
    assert_eq!(remote.reads(), 1, "first tick runs immediately");

    tokio::time::sleep(Duration::from_secs(30)).await;
    assert_eq!(remote.reads(), 1, "no tick before the interval elapses");

    tokio::time::sleep(Duration::from_secs(31)).await;
    assert_eq!(remote.reads(), 2);

    trigger.trigger();
    tokio::time::timeout(Duration::from_secs(1), handle)
        .await
        .expect("worker stops within 1 second")
        .unwrap();
}

#[tokio::test(start_paused = true)]
async fn shutdown_interrupts_the_wait() {
    let remote = FakeRemote::holding(ip("198.51.100.7"));
    let runner = RecordingRunner::new();
    runner.set_output(IP_CMD, "198.51.100.7");

    let (trigger, shutdown) = shutdown_channel();
    let handle = tokio::spawn(polling_worker(&remote, &runner).run(shutdown));

    tokio::time::sleep(Duration::from_millis(10)).await;
    trigger.trigger();

    // Well short of the 60 second interval
    tokio::time::timeout(Duration::from_secs(1), handle)
        .await
        .expect("worker stops without waiting for the next tick")
        .unwrap();
    assert_eq!(remote.reads(), 1);
}

#[tokio::test]
async fn already_triggered_shutdown_skips_every_tick() {
    let remote = FakeRemote::new();
    let runner = RecordingRunner::new();
    runner.set_output(IP_CMD, "198.51.100.7");

    let (trigger, shutdown) = shutdown_channel();
    trigger.trigger();

    polling_worker(&remote, &runner).run(shutdown).await;

    assert_eq!(remote.reads(), 0);
    assert!(runner.calls().is_empty());
}

#[tokio::test]
async fn dropped_trigger_stops_workers() {
    let remote = FakeRemote::new();
    let runner = RecordingRunner::new();
    runner.set_output(IP_CMD, "198.51.100.7");

    let (trigger, shutdown) = shutdown_channel();
    let handles: Vec<_> = (0..3)
        .map(|_| tokio::spawn(polling_worker(&remote, &runner).run(shutdown.clone())))
        .collect();

    drop(trigger);

    for handle in handles {
        tokio::time::timeout(Duration::from_secs(5), handle)
            .await
            .expect("worker stops when the trigger is gone")
            .unwrap();
    }
}
