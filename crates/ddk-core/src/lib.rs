// # ddk-core
//
// Core library for the DDK polling DNS synchronizer.
//
// ## Architecture Overview
//
// This library provides the core functionality for keeping DNS records
// pointed at the host's current address:
// - **IpResolver**: Trait for obtaining the current address (command probe)
// - **RecordUpdater**: Trait for reconciling one record via a provider API
// - **CommandRunner**: Trait for executing probe, hook and startup commands
// - **Worker**: Per-record polling loop (resolve → reconcile → hook)
// - **UpdaterRegistry**: Plugin-based registry for provider adapters
// - **UpdateDedupRegistry**: Process-wide "hook already fired" set
//
// ## Design Principles
//
// 1. **Read Before Write**: Every tick re-reads the provider's record
// 2. **Plugin-Based**: Providers are registered by name, no hard-coded if-else
// 3. **Library-First**: All core functionality can be used as a library
// 4. **Failure Isolation**: A failing record never stops the others

pub mod command;
pub mod config;
pub mod dedup;
pub mod error;
pub mod registry;
pub mod resolver;
pub mod shutdown;
pub mod tracker;
pub mod traits;
pub mod worker;

// Re-export core types for convenience
pub use command::{render_hook, ProcessCommandRunner, HOOK_PLACEHOLDER};
pub use config::{ApiParams, DdkConfig, GlobalConfig, RecordConfig, DEFAULT_CHECK_INTERVAL_SECS};
pub use dedup::UpdateDedupRegistry;
pub use error::{Error, Result};
pub use registry::UpdaterRegistry;
pub use resolver::{parse_address, CommandIpResolver};
pub use shutdown::{shutdown_channel, Shutdown, ShutdownTrigger};
pub use tracker::ChangeTracker;
pub use traits::{
    AddressRecordType, CommandRunner, IpResolver, RecordUpdater, RemoteRecord, StepOutcome,
    UpdateResult, UpdaterFactory,
};
pub use worker::{HookOutcome, TickOutcome, Worker};
