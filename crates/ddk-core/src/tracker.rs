//! Last-confirmed remote address for one record
//!
//! Adapters embed a [`ChangeTracker`] to remember what they last saw on, or
//! wrote to, the provider. It only feeds log lines, such as noticing that a
//! record was edited outside DDK. Every reconciliation re-reads the provider
//! before deciding.

use std::net::IpAddr;

/// Per-record memory of the last address known to be on the provider
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ChangeTracker {
    last_confirmed: Option<IpAddr>,
}

impl ChangeTracker {
    /// Create an empty tracker
    pub fn new() -> Self {
        Self::default()
    }

    /// Record what a fresh provider read returned
    ///
    /// `None` means the record is absent or its content is not an address.
    pub fn observe_remote(&mut self, address: Option<IpAddr>) {
        self.last_confirmed = address;
    }

    /// Record a successful write
    pub fn confirm(&mut self, address: IpAddr) {
        self.last_confirmed = Some(address);
    }

    /// Forget the last address (e.g. after a failed read)
    pub fn invalidate(&mut self) {
        self.last_confirmed = None;
    }

    /// Last address confirmed on the provider
    pub fn last_confirmed(&self) -> Option<IpAddr> {
        self.last_confirmed
    }

    /// Whether a fresh read disagrees with the last confirmed address
    ///
    /// False while nothing has been confirmed yet.
    pub fn drifted(&self, observed: Option<IpAddr>) -> bool {
        self.last_confirmed.is_some() && self.last_confirmed != observed
    }

    /// Whether the tracker currently believes the record holds `address`
    pub fn matches(&self, address: IpAddr) -> bool {
        self.last_confirmed == Some(address)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tracks_observations_and_writes() {
        let a: IpAddr = "198.51.100.1".parse().unwrap();
        let b: IpAddr = "198.51.100.7".parse().unwrap();

        let mut tracker = ChangeTracker::new();
        assert_eq!(tracker.last_confirmed(), None);

        tracker.observe_remote(Some(a));
        assert!(tracker.matches(a));

        tracker.confirm(b);
        assert!(tracker.matches(b));
        assert!(!tracker.matches(a));

        tracker.invalidate();
        assert_eq!(tracker.last_confirmed(), None);
    }

    #[test]
    fn drift_needs_a_confirmed_address() {
        let a: IpAddr = "198.51.100.1".parse().unwrap();
        let b: IpAddr = "198.51.100.7".parse().unwrap();

        let mut tracker = ChangeTracker::new();
        assert!(!tracker.drifted(Some(a)));
        assert!(!tracker.drifted(None));

        tracker.confirm(b);
        assert!(!tracker.drifted(Some(b)));
        assert!(tracker.drifted(Some(a)));
        assert!(tracker.drifted(None));
    }
}
