//! Plugin-based updater registry
//!
//! The registry maps `domain_registrar` names to updater factories, so
//! workers never branch on a concrete provider type.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use ddk_core::UpdaterRegistry;
//!
//! let registry = UpdaterRegistry::new();
//! ddk_provider_cloudflare::register(&registry);
//!
//! let updater = registry.create("Cloudflare", &record.api_param)?;
//! ```
//!
//! ## Registration
//!
//! Provider crates expose a `register` function:
//!
//! ```rust,ignore
//! pub fn register(registry: &UpdaterRegistry) {
//!     registry.register("cloudflare", Box::new(CloudflareFactory));
//! }
//! ```

use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};

use crate::config::ApiParams;
use crate::error::{Error, Result};
use crate::traits::{RecordUpdater, UpdaterFactory};

/// Registry of updater factories keyed by registrar name
///
/// Names are matched case-insensitively.
///
/// ## Thread Safety
///
/// The registry uses interior mutability with RwLock, allowing concurrent
/// reads and exclusive writes.
#[derive(Default)]
pub struct UpdaterRegistry {
    factories: RwLock<HashMap<String, Box<dyn UpdaterFactory>>>,
}

impl UpdaterRegistry {
    /// Create a new empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an updater factory
    ///
    /// Registering a name twice replaces the earlier factory.
    pub fn register(&self, name: impl AsRef<str>, factory: Box<dyn UpdaterFactory>) {
        let name = normalize(name.as_ref());
        let mut factories = self.factories.write().unwrap_or_else(PoisonError::into_inner);
        factories.insert(name, factory);
    }

    /// Build the updater for `registrar` from its parameters
    ///
    /// # Errors
    ///
    /// - `Error::Config`: no factory registered under that name
    /// - whatever the factory reports for missing or malformed parameters
    pub fn create(&self, registrar: &str, params: &ApiParams) -> Result<Box<dyn RecordUpdater>> {
        let factories = self.factories.read().unwrap_or_else(PoisonError::into_inner);

        let factory = factories
            .get(&normalize(registrar))
            .ok_or_else(|| Error::config(format!("Unsupported domain registrar: {}", registrar)))?;

        factory.create(params)
    }

    /// List all registered registrar names
    pub fn list(&self) -> Vec<String> {
        let factories = self.factories.read().unwrap_or_else(PoisonError::into_inner);
        let mut names: Vec<String> = factories.keys().cloned().collect();
        names.sort();
        names
    }

    /// Check if a registrar name is registered
    pub fn has(&self, name: &str) -> bool {
        let factories = self.factories.read().unwrap_or_else(PoisonError::into_inner);
        factories.contains_key(&normalize(name))
    }
}

fn normalize(name: &str) -> String {
    name.trim().to_ascii_lowercase()
}
