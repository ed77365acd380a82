//! SRV records.

use std::{cmp::Reverse, fmt::Display};

/// Representation of types that contain the fields of a SRV record.
pub trait SrvRecord {
    /// Type representing the SRV record's target. Must implement `Display` so
    /// it can be formatted into a `host:port` address.
    type Target: Display + ?Sized;

    /// Gets a SRV record's target.
    fn target(&self) -> &Self::Target;

    /// Gets a SRV record's port.
    fn port(&self) -> u16;

    /// Gets a SRV record's priority.
    fn priority(&self) -> u16;

    /// Gets a SRV record's weight.
    fn weight(&self) -> u16;

    /// Generates a key to sort a SRV record by priority and weight per RFC 2782.
    fn sort_key(&self) -> (u16, Reverse<u16>) {
        sort_key(self.priority(), self.weight())
    }
}

/// Generates a key to sort a SRV record by priority and weight per RFC 2782.
pub(crate) fn sort_key(priority: u16, weight: u16) -> (u16, Reverse<u16>) {
    // Ascending by priority, then descending (hence `Reverse`) by weight
    (priority, Reverse(weight))
}

/// A SRV record extracted from a single response.
///
/// The target is either the fully-qualified name sent by the server (with
/// its trailing dot) or, after address substitution, the textual form of an
/// IPv4/IPv6 address.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ServiceRecord {
    /// Lower is preferred.
    pub priority: u16,
    /// Relative share among records of the same priority.
    pub weight: u16,
    /// Port the service listens on.
    pub port: u16,
    /// Host name or address of the service.
    pub target: String,
}

impl ServiceRecord {
    /// Creates a record from its parts.
    pub fn new(priority: u16, weight: u16, port: u16, target: impl Into<String>) -> Self {
        Self {
            priority,
            weight,
            port,
            target: target.into(),
        }
    }

    /// Returns a copy of this record pointing at `target`.
    pub fn with_target(&self, target: impl Into<String>) -> Self {
        Self {
            target: target.into(),
            ..self.clone()
        }
    }
}

impl SrvRecord for ServiceRecord {
    type Target = str;

    fn target(&self) -> &Self::Target {
        &self.target
    }

    fn port(&self) -> u16 {
        self.port
    }

    fn priority(&self) -> u16 {
        self.priority
    }

    fn weight(&self) -> u16 {
        self.weight
    }
}
