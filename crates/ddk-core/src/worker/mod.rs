//! Per-record synchronization worker
//!
//! A [`Worker`] owns one record's updater and drives it on a fixed
//! interval:
//!
//! ```text
//! Initializing ──► Polling ◄──► Reconciling
//!       │             │
//!       ▼             ▼
//!  (config error)  shutdown
//! ```
//!
//! ## Tick Flow
//!
//! 1. Resolve the current address (failure: log, wait for next tick)
//! 2. Reconcile the record (failure: log, wait, hook not run)
//! 3. Unchanged: nothing else to do
//! 4. Changed: if a hook is configured and the address is first-seen in
//!    the shared [`UpdateDedupRegistry`], run the rendered hook sequence
//!
//! Ticks never overlap: the next tick is scheduled only after the current
//! reconciliation returns. There is no retry inside a tick.

use std::net::IpAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, warn};

use crate::command::render_hook;
use crate::config::{GlobalConfig, RecordConfig};
use crate::dedup::UpdateDedupRegistry;
use crate::error::{Error, Result};
use crate::registry::UpdaterRegistry;
use crate::resolver::CommandIpResolver;
use crate::shutdown::Shutdown;
use crate::traits::{CommandRunner, IpResolver, RecordUpdater, StepOutcome, UpdateResult};

/// What happened to the post-update hook on a changed tick
#[derive(Debug)]
pub enum HookOutcome {
    /// The record has no `ip_address_on_update_cmd`
    NotConfigured,
    /// Another tick or record already ran the hook for this address
    AlreadyFired,
    /// The hook ran; one outcome per sequence step
    Ran(Vec<StepOutcome>),
}

/// Result of one reconciliation attempt
#[derive(Debug)]
pub enum TickOutcome {
    /// The IP probe failed
    ResolveFailed(Error),
    /// The provider rejected or could not complete the reconciliation
    UpdateFailed(Error),
    /// The record already held the address
    Unchanged(IpAddr),
    /// The record was written
    Changed {
        /// Address written
        address: IpAddr,
        /// What the updater reported
        result: UpdateResult,
        /// What happened to the hook
        hook: HookOutcome,
    },
}

impl TickOutcome {
    /// Whether this tick wrote to the provider
    pub fn is_changed(&self) -> bool {
        matches!(self, TickOutcome::Changed { .. })
    }

    /// Whether the hook ran on this tick
    pub fn hook_ran(&self) -> bool {
        matches!(
            self,
            TickOutcome::Changed {
                hook: HookOutcome::Ran(_),
                ..
            }
        )
    }
}

/// Synchronization loop for one record
pub struct Worker {
    updater: Box<dyn RecordUpdater>,
    resolver: Box<dyn IpResolver>,
    runner: Arc<dyn CommandRunner>,
    dedup: Arc<UpdateDedupRegistry>,
    hook_template: Option<String>,
    interval: Duration,
}

impl Worker {
    /// Build a worker from a `[[record]]` section
    ///
    /// This is the `Initializing` state: the updater is constructed through
    /// `registry`. An unknown registrar or a missing/malformed parameter is
    /// returned as a config error and the record is never polled.
    pub fn new(
        record: &RecordConfig,
        global: &GlobalConfig,
        registry: &UpdaterRegistry,
        runner: Arc<dyn CommandRunner>,
        dedup: Arc<UpdateDedupRegistry>,
    ) -> Result<Self> {
        record.validate()?;

        let updater = registry.create(&record.domain_registrar, &record.api_param)?;
        let resolver = CommandIpResolver::new(record.ip_address_from_cmd.clone(), Arc::clone(&runner));

        let mut worker = Self::with_parts(updater, Box::new(resolver), runner, dedup)
            .with_interval(global.check_interval());
        worker.hook_template = record.hook_template().map(str::to_string);
        Ok(worker)
    }

    /// Build a worker from already-constructed parts
    ///
    /// The interval defaults to the global default and no hook is set.
    pub fn with_parts(
        updater: Box<dyn RecordUpdater>,
        resolver: Box<dyn IpResolver>,
        runner: Arc<dyn CommandRunner>,
        dedup: Arc<UpdateDedupRegistry>,
    ) -> Self {
        Self {
            updater,
            resolver,
            runner,
            dedup,
            hook_template: None,
            interval: GlobalConfig::default().check_interval(),
        }
    }

    /// Set the hook template
    pub fn with_hook(mut self, template: impl Into<String>) -> Self {
        self.hook_template = Some(template.into());
        self
    }

    /// Set the poll interval
    ///
    /// A zero interval falls back to the default.
    pub fn with_interval(mut self, interval: Duration) -> Self {
        if !interval.is_zero() {
            self.interval = interval;
        }
        self
    }

    /// Poll interval
    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Registrar of the owned updater
    pub fn registrar(&self) -> &'static str {
        self.updater.registrar()
    }

    /// Record label of the owned updater
    pub fn record_label(&self) -> String {
        self.updater.record_label()
    }

    /// Run until `shutdown` fires
    ///
    /// The first tick happens immediately, so a worker leaves `Initializing`
    /// straight for `Reconciling` instead of waiting one interval in
    /// `Polling`. Later ticks follow the interval.
    /// A slow tick delays the schedule rather than causing a burst.
    pub async fn run(mut self, mut shutdown: Shutdown) {
        let registrar = self.updater.registrar();
        let record = self.updater.record_label();

        info!(
            registrar,
            record = %record,
            command = %self.resolver.describe(),
            interval_secs = self.interval.as_secs(),
            "Worker started"
        );

        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            if shutdown.is_triggered() {
                break;
            }

            tokio::select! {
                biased;
                _ = shutdown.wait() => break,
                _ = ticker.tick() => {}
            }

            if shutdown.is_triggered() {
                break;
            }

            self.tick().await;
        }

        info!(registrar, record = %record, "Worker stopped");
    }

    /// One reconciliation attempt
    pub async fn tick(&mut self) -> TickOutcome {
        let registrar = self.updater.registrar();
        let record = self.updater.record_label();
        let command = self.resolver.describe();

        debug!(registrar, record = %record, command = %command, "Checking IP");

        let address = match self.resolver.resolve().await {
            Ok(address) => address,
            Err(e) => {
                warn!(
                    registrar,
                    record = %record,
                    command = %command,
                    error = %e,
                    "Failed to resolve current IP"
                );
                return TickOutcome::ResolveFailed(e);
            }
        };

        let result = match self.updater.reconcile(address).await {
            Ok(result) => result,
            Err(e) => {
                error!(
                    registrar,
                    record = %record,
                    command = %command,
                    address = %address,
                    error = %e,
                    "DNS update failed"
                );
                return TickOutcome::UpdateFailed(e);
            }
        };

        if !result.is_changed() {
            debug!(registrar, record = %record, address = %address, "DNS record already up to date");
            return TickOutcome::Unchanged(address);
        }

        info!(registrar, record = %record, address = %address, "DNS record updated");

        let hook = self.run_hook(registrar, &record, address).await;
        TickOutcome::Changed {
            address,
            result,
            hook,
        }
    }

    async fn run_hook(&self, registrar: &str, record: &str, address: IpAddr) -> HookOutcome {
        let Some(template) = self.hook_template.as_deref() else {
            return HookOutcome::NotConfigured;
        };

        if !self.dedup.mark_if_first(address) {
            info!(
                registrar,
                record,
                address = %address,
                "on_update_cmd already ran for this address, skipping"
            );
            return HookOutcome::AlreadyFired;
        }

        let command = render_hook(template, &address.to_string());
        info!(registrar, record, command = %command, "Running on_update_cmd");

        let steps = self.runner.run_sequence(&command).await;
        let failed = steps.iter().filter(|step| !step.succeeded()).count();
        if failed > 0 {
            warn!(
                registrar,
                record,
                failed,
                total = steps.len(),
                "on_update_cmd finished with failing steps"
            );
        }

        HookOutcome::Ran(steps)
    }
}

impl std::fmt::Debug for Worker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Worker")
            .field("registrar", &self.updater.registrar())
            .field("record", &self.updater.record_label())
            .field("resolver", &self.resolver.describe())
            .field("hook_template", &self.hook_template)
            .field("interval", &self.interval)
            .finish()
    }
}
