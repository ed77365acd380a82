//! Name server configuration and DNS transport.
//!
//! [`SrvClient`](crate::SrvClient) talks to the outside world through two
//! traits: a [`ConfigProvider`] yielding the current name server list, and an
//! [`Exchange`] performing a single query/response round trip with one
//! server. Both have default implementations ([`ResolvConfWatcher`] and
//! [`UdpTransport`]) and can be replaced, e.g. with scripted fakes in tests.

pub mod conf;
pub use conf::{ConfigError, ConfigProvider, ResolvConfWatcher, ResolverConfig};

pub mod transport;
pub use transport::{Exchange, TransportError, UdpTransport};

pub(crate) mod hickory;
