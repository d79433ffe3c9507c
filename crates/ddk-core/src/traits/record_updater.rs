// # Record Updater Trait
//
// Defines the interface for reconciling one DNS record with an address.
//
// ## Implementations
//
// - Aliyun: `ddk-provider-aliyun` crate
// - Cloudflare: `ddk-provider-cloudflare` crate
//
// ## Usage
//
// ```rust,ignore
// use ddk_core::RecordUpdater;
//
// #[tokio::main]
// async fn main() -> ddk_core::Result<()> {
//     let mut updater = /* RecordUpdater implementation */;
//
//     let result = updater.reconcile("203.0.113.5".parse().unwrap()).await?;
//     if result.is_changed() {
//         println!("record now points at 203.0.113.5");
//     }
//
//     Ok(())
// }
// ```

use async_trait::async_trait;
use std::net::IpAddr;

use crate::config::ApiParams;

/// Result of a reconciliation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateResult {
    /// Record existed with another address and was rewritten
    Updated {
        /// The address the provider held before the write
        previous_ip: Option<IpAddr>,
        /// The address written
        new_ip: IpAddr,
    },
    /// Record already held the address (no write)
    Unchanged {
        /// The current address
        current_ip: IpAddr,
    },
    /// Record was absent and has been created
    Created {
        /// The address written
        new_ip: IpAddr,
    },
}

impl UpdateResult {
    /// Whether a write happened
    pub fn is_changed(&self) -> bool {
        !matches!(self, UpdateResult::Unchanged { .. })
    }

    /// The address the record holds after the reconciliation
    pub fn address(&self) -> IpAddr {
        match *self {
            UpdateResult::Updated { new_ip, .. } | UpdateResult::Created { new_ip } => new_ip,
            UpdateResult::Unchanged { current_ip } => current_ip,
        }
    }
}

/// Snapshot of a record as the provider holds it
///
/// Fetched fresh on every reconciliation and discarded afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteRecord {
    /// Provider record identifier
    pub id: String,
    /// Record name as the provider reports it
    pub name: String,
    /// Current record content
    pub content: String,
    /// Time-to-live, when reported
    pub ttl: Option<u32>,
}

impl RemoteRecord {
    /// Record content parsed as an address, if it is one
    pub fn address(&self) -> Option<IpAddr> {
        self.content.trim().parse().ok()
    }

    /// Whether the record already points at `address`
    pub fn points_at(&self, address: IpAddr) -> bool {
        self.address() == Some(address)
    }
}

/// Trait for DNS provider adapters
///
/// One adapter instance is owned by exactly one worker, so `reconcile`
/// takes `&mut self` and adapters may keep a private
/// [`ChangeTracker`](crate::ChangeTracker).
///
/// # Contract
///
/// - Read the provider's current record before deciding to write. The
///   in-memory tracker is never enough on its own since the record may have
///   been edited out-of-band.
/// - Write only on mismatch; return [`UpdateResult::Unchanged`] otherwise.
/// - Apply bounded connect/read timeouts to every network call and map
///   timeouts to [`Error::Transient`](crate::Error::Transient).
/// - Do not retry. The next tick is the retry.
/// - Never report success for a write whose outcome is unknown.
#[async_trait]
pub trait RecordUpdater: Send + Sync {
    /// Bring the record in line with `address`
    ///
    /// # Errors
    ///
    /// - `Error::InvalidInput`: address family does not match the record type
    /// - `Error::Authentication`: credentials were rejected
    /// - `Error::NotFound`: the record identifier does not resolve
    /// - `Error::Transient`: network failure, timeout, throttling, 5xx
    /// - `Error::Provider`: any other rejection
    async fn reconcile(&mut self, address: IpAddr) -> Result<UpdateResult, crate::Error>;

    /// Registrar name (for logging)
    fn registrar(&self) -> &'static str;

    /// Human-readable record identity (for logging), e.g. "home.example.com/A"
    fn record_label(&self) -> String;
}

/// Helper trait for constructing updaters from `api_param`
pub trait UpdaterFactory: Send + Sync {
    /// Validate `params` and build an updater
    ///
    /// Must not perform network I/O. Missing or malformed keys are reported
    /// as `Error::MissingParameter` / `Error::InvalidParameter`.
    fn create(&self, params: &ApiParams) -> Result<Box<dyn RecordUpdater>, crate::Error>;
}

/// DNS record type for an address record
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddressRecordType {
    /// IPv4 record
    A,
    /// IPv6 record
    Aaaa,
}

impl AddressRecordType {
    /// Parse the `record_type` parameter (case-insensitive)
    pub fn parse(key: &str, value: &str) -> Result<Self, crate::Error> {
        match value.trim().to_ascii_uppercase().as_str() {
            "A" => Ok(Self::A),
            "AAAA" => Ok(Self::Aaaa),
            other => Err(crate::Error::invalid_param(
                key,
                format!("unsupported record type '{}', expected A or AAAA", other),
            )),
        }
    }

    /// Wire name
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::A => "A",
            Self::Aaaa => "AAAA",
        }
    }

    /// Reject addresses of the wrong family
    pub fn check(&self, address: IpAddr) -> Result<(), crate::Error> {
        match (self, address) {
            (Self::A, IpAddr::V4(_)) | (Self::Aaaa, IpAddr::V6(_)) => Ok(()),
            _ => Err(crate::Error::invalid_input(format!(
                "{} record cannot hold {}",
                self.as_str(),
                address
            ))),
        }
    }
}

impl std::fmt::Display for AddressRecordType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
