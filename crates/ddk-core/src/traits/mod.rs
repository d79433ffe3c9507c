//! Core traits for the DDK system
//!
//! This module defines the abstract interfaces that all implementations must follow.
//!
//! - [`IpResolver`]: Obtain the host's current address
//! - [`RecordUpdater`]: Reconcile one DNS record via a provider API
//! - [`CommandRunner`]: Execute probe, hook and startup commands

pub mod command_runner;
pub mod ip_resolver;
pub mod record_updater;

pub use command_runner::{CommandRunner, StepOutcome};
pub use ip_resolver::IpResolver;
pub use record_updater::{AddressRecordType, RecordUpdater, RemoteRecord, UpdateResult, UpdaterFactory};
