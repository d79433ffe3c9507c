//! Test doubles and common utilities for contract tests
//!
//! This module provides minimal in-memory doubles for the three seams a
//! worker talks through: the command runner, the provider and the
//! updater factory.

#![allow(dead_code)]

use ddk_core::error::{Error, Result};
use ddk_core::traits::{CommandRunner, RecordUpdater, UpdateResult, UpdaterFactory};
use ddk_core::{ApiParams, UpdateDedupRegistry, UpdaterRegistry};
use std::collections::HashMap;
use std::net::IpAddr;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// Probe command used by test records
pub const IP_CMD: &str = "current-ip";

/// Registrar name the fake factory is registered under
pub const FAKE_REGISTRAR: &str = "fake";

pub fn ip(s: &str) -> IpAddr {
    s.parse().unwrap()
}

/// A CommandRunner that answers from a table and records every call
///
/// Commands without a canned answer succeed with empty output, unless they
/// were marked failing.
#[derive(Clone, Default)]
pub struct RecordingRunner {
    outputs: Arc<Mutex<HashMap<String, String>>>,
    failing: Arc<Mutex<Vec<String>>>,
    calls: Arc<Mutex<Vec<String>>>,
}

impl RecordingRunner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set what `command` prints
    pub fn set_output(&self, command: &str, output: &str) {
        self.outputs
            .lock()
            .unwrap()
            .insert(command.to_string(), output.to_string());
    }

    /// Make `command` exit non-zero
    pub fn fail(&self, command: &str) {
        self.failing.lock().unwrap().push(command.to_string());
    }

    /// Every command run so far, in order
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    /// Commands run so far, excluding the IP command
    pub fn hook_calls(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter(|c| c != IP_CMD)
            .collect()
    }
}

#[async_trait::async_trait]
impl CommandRunner for RecordingRunner {
    async fn run(&self, command: &str) -> Result<String> {
        self.calls.lock().unwrap().push(command.to_string());

        if self.failing.lock().unwrap().iter().any(|c| c == command) {
            return Err(Error::CommandFailed {
                command: command.to_string(),
                status: "exit status: 1".to_string(),
                output: "boom".to_string(),
            });
        }

        Ok(self
            .outputs
            .lock()
            .unwrap()
            .get(command)
            .cloned()
            .unwrap_or_default())
    }
}

/// In-memory provider state shared between a test and its updaters
#[derive(Clone, Default)]
pub struct FakeRemote {
    content: Arc<Mutex<Option<IpAddr>>>,
    reads: Arc<AtomicUsize>,
    writes: Arc<AtomicUsize>,
    unavailable: Arc<AtomicBool>,
}

impl FakeRemote {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn holding(address: IpAddr) -> Self {
        let remote = Self::new();
        remote.set(Some(address));
        remote
    }

    /// Edit the record out-of-band
    pub fn set(&self, address: Option<IpAddr>) {
        *self.content.lock().unwrap() = address;
    }

    pub fn get(&self) -> Option<IpAddr> {
        *self.content.lock().unwrap()
    }

    pub fn reads(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }

    pub fn writes(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    /// Make every call fail with a transient error
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    pub fn updater(&self, label: &str) -> FakeUpdater {
        FakeUpdater {
            remote: self.clone(),
            label: label.to_string(),
        }
    }
}

/// A RecordUpdater over a [`FakeRemote`] that reads before every write
pub struct FakeUpdater {
    remote: FakeRemote,
    label: String,
}

#[async_trait::async_trait]
impl RecordUpdater for FakeUpdater {
    async fn reconcile(&mut self, address: IpAddr) -> Result<UpdateResult> {
        if self.remote.unavailable.load(Ordering::SeqCst) {
            return Err(Error::transient("provider unavailable"));
        }

        self.remote.reads.fetch_add(1, Ordering::SeqCst);
        let current = self.remote.get();

        if current == Some(address) {
            return Ok(UpdateResult::Unchanged {
                current_ip: address,
            });
        }

        self.remote.set(Some(address));
        self.remote.writes.fetch_add(1, Ordering::SeqCst);

        Ok(match current {
            Some(previous) => UpdateResult::Updated {
                previous_ip: Some(previous),
                new_ip: address,
            },
            None => UpdateResult::Created { new_ip: address },
        })
    }

    fn registrar(&self) -> &'static str {
        FAKE_REGISTRAR
    }

    fn record_label(&self) -> String {
        self.label.clone()
    }
}

/// Factory that requires a `record_name` parameter
pub struct FakeFactory {
    remote: FakeRemote,
}

impl UpdaterFactory for FakeFactory {
    fn create(&self, params: &ApiParams) -> Result<Box<dyn RecordUpdater>> {
        let name = params.required_str("record_name")?;
        Ok(Box::new(self.remote.updater(&name)))
    }
}

/// A registry with the fake factory registered over `remote`
pub fn fake_registry(remote: &FakeRemote) -> UpdaterRegistry {
    let registry = UpdaterRegistry::new();
    registry.register(
        FAKE_REGISTRAR,
        Box::new(FakeFactory {
            remote: remote.clone(),
        }),
    );
    registry
}

/// A `[[record]]` section for the fake registrar
pub fn fake_record(name: &str) -> ddk_core::RecordConfig {
    ddk_core::RecordConfig::new(FAKE_REGISTRAR, IP_CMD).with_param("record_name", name)
}

pub fn shared_dedup() -> Arc<UpdateDedupRegistry> {
    Arc::new(UpdateDedupRegistry::new())
}
