// # IP Resolver Trait
//
// Defines the interface for obtaining the host's current address.
//
// ## Implementations
//
// - Command-based: [`CommandIpResolver`](crate::CommandIpResolver), runs
//   `ip_address_from_cmd` and parses its output
//
// Resolvers are polled once per tick by the worker. They do not cache,
// retry or watch; a failure simply skips that tick.

use async_trait::async_trait;
use std::net::IpAddr;

/// Trait for IP resolver implementations
#[async_trait]
pub trait IpResolver: Send + Sync {
    /// Fetch the current address
    ///
    /// # Errors
    ///
    /// `Error::Resolution` when the probe cannot be run, exits unsuccessfully
    /// or prints something that is not an IPv4/IPv6 literal.
    async fn resolve(&self) -> Result<IpAddr, crate::Error>;

    /// What this resolver runs (for logging)
    fn describe(&self) -> String;
}
