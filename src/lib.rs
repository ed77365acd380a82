#![deny(missing_docs)]
#![warn(rustdoc::broken_intra_doc_links)]

/*!
SRV record lookups against the system's name servers.

# Introduction

SRV Records, as defined in [RFC 2782](https://tools.ietf.org/html/rfc2782),
are DNS records of the form

`_Service._Proto.Name TTL Class SRV Priority Weight Port Target`

For instance, a DNS server might respond with the following SRV records for
`_http._tcp.example.com`:

```text
_http._tcp.example.com. 60 IN SRV 1 100 443 test1.example.com.
_http._tcp.example.com. 60 IN SRV 2 50  443 test2.example.com.
_http._tcp.example.com. 60 IN SRV 2 50  443 test3.example.com.
```

A client wanting to communicate with this example service would talk to
`test1.example.com:443`, the only record of the lowest priority. Were there
several records of priority 1, one of them would be picked at random in
proportion to its weight.

`srvclient` builds the SRV queries itself (advertising EDNS0 so that large
responses survive), walks the name servers from `/etc/resolv.conf` in order,
and applies the RFC 2782 selection rules. If the server includes A/AAAA
records for the targets in the additional section, [`srv`] returns the
address instead of the target name.

```text
let addr = srvclient::srv("_http._tcp.example.com")?;           // "10.0.0.5:443"
let addr = srvclient::srv("_http._tcp.example.com:8080")?;      // "10.0.0.5:8080"
let all = srvclient::all_srv("_http._tcp.example.com")?;        // sorted "host:port"s
let addr = srvclient::maybe_srv("db.internal:5432");            // returned as is
```

# Clients

The free functions use a process-wide [`SrvClient`] built on first use with
[`SrvClient::system`]. A different client (for instance one with
[`SrvClient::enable_cache_last`]) can be installed with
[`set_default_client`] before any of them is called. Clients can also be
created and used directly; they don't share any state.

The name server list and transport are pluggable through the
[`ConfigProvider`] and [`Exchange`] traits.

[`ConfigProvider`]: resolver::ConfigProvider
[`Exchange`]: resolver::Exchange
*/

use std::sync::OnceLock;

mod client;
pub use client::{policy, Cache, Error, SrvClient};

mod record;
pub use record::{ServiceRecord, SrvRecord};

pub mod resolver;

static DEFAULT_CLIENT: OnceLock<SrvClient> = OnceLock::new();

/// Gets the default client, creating it with [`SrvClient::system`] if no
/// client has been installed with [`set_default_client`].
pub fn default_client() -> &'static SrvClient {
    DEFAULT_CLIENT.get_or_init(SrvClient::system)
}

/// Installs `client` as the default client used by the free functions of
/// this crate.
///
/// This only succeeds before the default client is first used; otherwise
/// `client` is handed back.
pub fn set_default_client(client: SrvClient) -> Result<(), SrvClient> {
    DEFAULT_CLIENT.set(client)
}

/// Calls [`SrvClient::srv`] on the default client.
pub fn srv(hostname: &str) -> Result<String, Error> {
    default_client().srv(hostname)
}

/// Calls [`SrvClient::srv_no_port`] on the default client.
pub fn srv_no_port(hostname: &str) -> Result<String, Error> {
    default_client().srv_no_port(hostname)
}

/// Calls [`SrvClient::all_srv`] on the default client.
pub fn all_srv(hostname: &str) -> Result<Vec<String>, Error> {
    default_client().all_srv(hostname)
}

/// Calls [`SrvClient::maybe_srv`] on the default client.
pub fn maybe_srv(host: &str) -> String {
    default_client().maybe_srv(host)
}
