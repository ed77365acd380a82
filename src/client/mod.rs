//! Clients based on SRV lookups.

use crate::{
    resolver::{
        hickory::{extract_records, fqdn, srv_query, substitute_addresses},
        ConfigError, ConfigProvider, Exchange, ResolvConfWatcher, UdpTransport,
    },
    ServiceRecord,
};
use hickory_proto::{
    error::ProtoError,
    op::{Message, ResponseCode},
};
use std::sync::Arc;

mod cache;
pub use cache::Cache;

/// SRV target selection.
pub mod policy;

/// Errors encountered by a [`SrvClient`].
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// No resolver configuration could be obtained
    #[error("resolver configuration unavailable: {0}")]
    ConfigUnavailable(#[from] ConfigError),
    /// The hostname isn't a valid DNS name
    #[error("invalid hostname {hostname:?}: {source}")]
    InvalidName {
        /// The hostname as given.
        hostname: String,
        /// Why it was rejected.
        source: ProtoError,
    },
    /// Every configured name server failed (or none are configured) and
    /// there is no cached response to fall back on
    #[error("no available nameservers")]
    NoNameserversAvailable,
    /// A name server answered without any SRV records
    #[error("no SRV records for {0:?}")]
    NoRecordsFound(String),
}

/// Client performing SRV lookups against the name servers of a
/// [`ConfigProvider`].
///
/// # Usage
///
/// [`SrvClient::system`] creates a client that reads `/etc/resolv.conf`
/// and talks to the servers listed there over UDP. [`SrvClient::new`] takes
/// any [`ConfigProvider`] and [`Exchange`] instead.
///
/// Name servers are tried strictly in order. A server that rejects the
/// EDNS0-extended query with `FORMERR` is asked again without EDNS0 before
/// moving on to the next one.
///
/// ## Caching
///
/// With [`SrvClient::enable_cache_last`], the last response obtained for each
/// hostname is kept and served whenever a later lookup gets no response from
/// any server.
#[derive(Debug)]
pub struct SrvClient<Config = ResolvConfWatcher, Transport = UdpTransport> {
    config: Config,
    transport: Transport,
    cache: Option<Cache>,
}

impl SrvClient {
    /// Creates a client using the system resolver configuration.
    pub fn system() -> Self {
        Self::new(ResolvConfWatcher::system(), UdpTransport)
    }
}

impl<Config, Transport> SrvClient<Config, Transport> {
    /// Creates a client with the given configuration source and transport.
    pub fn new(config: Config, transport: Transport) -> Self {
        Self {
            config,
            transport,
            cache: None,
        }
    }

    /// Keeps the last response for every hostname looked up and uses it
    /// whenever a later lookup of that hostname gets no response at all.
    pub fn enable_cache_last(self) -> Self {
        Self {
            cache: Some(Cache::default()),
            ..self
        }
    }

    /// Sets the configuration source of the client.
    pub fn config<C>(self, config: C) -> SrvClient<C, Transport> {
        SrvClient {
            config,
            transport: self.transport,
            cache: self.cache,
        }
    }

    /// Sets the transport of the client.
    pub fn transport<T>(self, transport: T) -> SrvClient<Config, T> {
        SrvClient {
            transport,
            config: self.config,
            cache: self.cache,
        }
    }

    /// Gets the client's response cache, if caching is enabled.
    pub fn cache(&self) -> Option<&Cache> {
        self.cache.as_ref()
    }
}

impl<Config: ConfigProvider, Transport: Exchange> SrvClient<Config, Transport> {
    /// Looks up the SRV records of `hostname`, returning them in the order
    /// the server sent them.
    ///
    /// With `replace_with_ips`, targets for which the response carries an A
    /// or AAAA record are replaced by that address.
    #[cfg_attr(not(feature = "log"), allow(unused_variables))]
    pub fn lookup_srv(
        &self,
        hostname: &str,
        replace_with_ips: bool,
    ) -> Result<Vec<ServiceRecord>, Error> {
        let config = self.config.current()?;
        let name = fqdn(hostname).map_err(|source| Error::InvalidName {
            hostname: hostname.to_string(),
            source,
        })?;

        let mut response = None;
        for server in config.normalized_servers() {
            let query = srv_query(&name, true);
            let first = match self.transport.exchange(&query, &server, config.timeout) {
                Ok(first) => first,
                Err(e) => {
                    #[cfg(feature = "log")]
                    tracing::debug!(%server, %e, "SRV query failed");
                    continue;
                }
            };
            if first.response_code() != ResponseCode::FormErr {
                response = Some(first);
                break;
            }

            // The server doesn't understand EDNS0; ask again without it
            #[cfg(feature = "log")]
            tracing::trace!(%server, "FORMERR, retrying without EDNS0");
            let query = srv_query(&name, false);
            match self.transport.exchange(&query, &server, config.timeout) {
                Ok(retry) => {
                    response = Some(retry);
                    break;
                }
                Err(e) => {
                    #[cfg(feature = "log")]
                    tracing::debug!(%server, %e, "SRV query without EDNS0 failed");
                }
            }
        }

        let response = self.store_or_fallback(hostname, response.map(Arc::new));
        let response = response.ok_or(Error::NoNameserversAvailable)?;

        let records = extract_records(&response);
        if records.is_empty() {
            return Err(Error::NoRecordsFound(hostname.to_string()));
        }

        if replace_with_ips {
            Ok(substitute_addresses(records, response.additionals()))
        } else {
            Ok(records)
        }
    }

    fn store_or_fallback(
        &self,
        hostname: &str,
        response: Option<Arc<Message>>,
    ) -> Option<Arc<Message>> {
        match &self.cache {
            Some(cache) => cache.store_or_fallback(hostname, response),
            None => response,
        }
    }

    /// Looks up the SRV records of `hostname` and picks one of them per
    /// RFC 2782, returning its `host:port` address. Targets are replaced by
    /// their addresses if the server provided them.
    ///
    /// If `hostname` carries a `:port`, that port is returned instead of the
    /// picked record's.
    pub fn srv(&self, hostname: &str) -> Result<String, Error> {
        let (host, port) = split_host_port(hostname);
        let record = self.pick(host)?;
        let port = port.map_or_else(|| record.port.to_string(), str::to_string);
        Ok(join_host_port(&record.target, &port))
    }

    /// Behaves like [`SrvClient::srv`], but returns only the picked target.
    pub fn srv_no_port(&self, hostname: &str) -> Result<String, Error> {
        let (host, _) = split_host_port(hostname);
        Ok(self.pick(host)?.target)
    }

    /// Returns the `host:port` addresses of every SRV record of `hostname`,
    /// sorted by ascending priority and then descending weight. Targets are
    /// not replaced by addresses.
    ///
    /// If `hostname` carries a `:port`, every address uses it.
    pub fn all_srv(&self, hostname: &str) -> Result<Vec<String>, Error> {
        let (host, port) = split_host_port(hostname);
        let mut records = self.lookup_srv(host, false)?;
        policy::sort_all(&mut records);
        Ok(records
            .iter()
            .map(|record| match port {
                Some(port) => join_host_port(&record.target, port),
                None => join_host_port(&record.target, &record.port.to_string()),
            })
            .collect())
    }

    /// Returns `host` unchanged if it already has a port, otherwise tries
    /// [`SrvClient::srv`] and returns its result, or `host` if it failed.
    #[cfg_attr(not(feature = "log"), allow(unused_variables))]
    pub fn maybe_srv(&self, host: &str) -> String {
        if split_host_port(host).1.is_some() {
            return host.to_string();
        }
        match self.srv(host) {
            Ok(addr) => addr,
            Err(e) => {
                #[cfg(feature = "log")]
                tracing::trace!(%host, %e, "SRV lookup failed, using host as is");
                host.to_string()
            }
        }
    }

    fn pick(&self, host: &str) -> Result<ServiceRecord, Error> {
        let records = self.lookup_srv(host, true)?;
        policy::pick_one(&records, &mut rand::rng())
            .cloned()
            .ok_or_else(|| Error::NoRecordsFound(host.to_string()))
    }
}

/// Splits a trailing `:port` off `input`. Accepts `host:port` with a single
/// colon and `[v6addr]:port`; anything else is a bare host. An empty port
/// (`host:`) counts as no port.
pub(crate) fn split_host_port(input: &str) -> (&str, Option<&str>) {
    let (host, port) = match input.strip_prefix('[') {
        Some(rest) => match rest.split_once("]:") {
            Some((host, port)) => (host, Some(port)),
            None => (input, None),
        },
        None => match input.split_once(':') {
            Some((host, port)) if !port.contains(':') => (host, Some(port)),
            _ => (input, None),
        },
    };
    (host, port.filter(|port| !port.is_empty()))
}

/// Joins a host and port, bracketing IPv6 addresses.
pub(crate) fn join_host_port(host: &str, port: &str) -> String {
    if host.contains(':') {
        format!("[{host}]:{port}")
    } else {
        format!("{host}:{port}")
    }
}
