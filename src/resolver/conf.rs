//! Resolver configuration.
//!
//! A [`ResolverConfig`] is an immutable snapshot of the name servers to query
//! and the per-exchange timeout. Snapshots are handed out by a
//! [`ConfigProvider`]; [`ResolvConfWatcher`] is the provider backed by a
//! glibc-style `/etc/resolv.conf` that it re-reads in the background.

use arc_swap::ArcSwapOption;
use std::{
    fs,
    io::{self, BufRead},
    net::Ipv6Addr,
    path::{Path, PathBuf},
    sync::{
        mpsc::{self, RecvTimeoutError},
        Arc,
    },
    thread::{self, JoinHandle},
    time::Duration,
};

/// Location of the system resolver configuration.
pub const RESOLV_CONF_PATH: &str = "/etc/resolv.conf";

/// How often [`ResolvConfWatcher`] re-reads its file unless told otherwise.
pub const DEFAULT_REFRESH_INTERVAL: Duration = Duration::from_secs(5);

/// Timeout used when resolv.conf doesn't carry `options timeout:n`.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

const DEFAULT_PORT: u16 = 53;

/// Errors encountered while obtaining a resolver configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The configuration file couldn't be read.
    #[error("reading resolver configuration: {0}")]
    Io(#[from] io::Error),
    /// A line of the configuration file is malformed.
    #[error("line {line}: {message}")]
    Parse {
        /// 1-based line number.
        line: usize,
        /// What was wrong with it.
        message: String,
    },
    /// No configuration has been loaded successfully yet.
    #[error("no resolver configuration has been loaded")]
    NotLoaded,
}

/// Source of the current resolver configuration.
pub trait ConfigProvider: Send + Sync {
    /// Returns the latest configuration snapshot.
    fn current(&self) -> Result<Arc<ResolverConfig>, ConfigError>;
}

/// A fixed configuration, mostly useful for embedders and tests.
impl ConfigProvider for Arc<ResolverConfig> {
    fn current(&self) -> Result<Arc<ResolverConfig>, ConfigError> {
        Ok(self.clone())
    }
}

/// Snapshot of the name servers to query.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResolverConfig {
    /// Servers in the order they should be tried, as `host` or `host:port`.
    pub servers: Vec<String>,
    /// Bound on each exchange. `None` leaves it to the transport's defaults.
    pub timeout: Option<Duration>,
}

impl ResolverConfig {
    /// Creates a configuration from a server list.
    pub fn new<S: Into<String>>(servers: impl IntoIterator<Item = S>) -> Self {
        Self {
            servers: servers.into_iter().map(Into::into).collect(),
            timeout: None,
        }
    }

    /// Sets the per-exchange timeout.
    pub fn timeout(self, timeout: Duration) -> Self {
        Self {
            timeout: Some(timeout),
            ..self
        }
    }

    /// Returns the server list with port 53 filled in wherever a port is
    /// missing.
    pub fn normalized_servers(&self) -> Vec<String> {
        self.servers
            .iter()
            .map(|server| normalize_server(server))
            .collect()
    }

    /// Parses a configuration in the format of `/etc/resolv.conf`.
    ///
    /// Only `nameserver` lines and the `timeout` option matter here; other
    /// keywords and unknown options are ignored.
    pub fn parse<R: BufRead>(reader: R) -> Result<Self, ConfigError> {
        let mut conf = Self {
            servers: Vec::new(),
            timeout: Some(DEFAULT_TIMEOUT),
        };

        for (idx, line) in reader.lines().enumerate() {
            let line = line?;
            let line = line.trim();
            if line.is_empty() || line.starts_with(';') || line.starts_with('#') {
                continue;
            }

            let mut words = line.split_whitespace();
            match words.next() {
                Some("nameserver") => {
                    let server = words.next().ok_or_else(|| ConfigError::Parse {
                        line: idx + 1,
                        message: "nameserver without an address".into(),
                    })?;
                    conf.servers.push(server.to_string());
                }
                Some("options") => {
                    for option in words {
                        if let Some(("timeout", secs)) = option.split_once(':') {
                            let secs = secs.parse::<u64>().map_err(|e| ConfigError::Parse {
                                line: idx + 1,
                                message: format!("invalid timeout {secs:?}: {e}"),
                            })?;
                            conf.timeout = Some(Duration::from_secs(secs));
                        }
                    }
                }
                _ => {}
            }
        }

        Ok(conf)
    }

    /// Reads and parses a configuration file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let file = fs::File::open(path)?;
        Self::parse(io::BufReader::new(file))
    }
}

fn normalize_server(server: &str) -> String {
    match crate::client::split_host_port(server) {
        (_, Some(_)) => server.to_string(),
        (host, None) if host.parse::<Ipv6Addr>().is_ok() => format!("[{host}]:{DEFAULT_PORT}"),
        (host, None) => format!("{host}:{DEFAULT_PORT}"),
    }
}

/// [`ConfigProvider`] backed by a resolv.conf file that is re-read on a
/// background thread.
///
/// The file is read once when the watcher starts; afterwards the snapshot is
/// swapped atomically after each successful reload. A failed reload keeps
/// the previous snapshot. The thread runs until [`ResolvConfWatcher::stop`]
/// is called or the watcher is dropped.
#[derive(Debug)]
pub struct ResolvConfWatcher {
    snapshot: Arc<ArcSwapOption<ResolverConfig>>,
    stop: Option<mpsc::Sender<()>>,
    handle: Option<JoinHandle<()>>,
}

impl ResolvConfWatcher {
    /// Starts watching `/etc/resolv.conf` with the default refresh interval.
    pub fn system() -> Self {
        Self::start(RESOLV_CONF_PATH, DEFAULT_REFRESH_INTERVAL)
    }

    /// Loads `path` and spawns a thread reloading it every `interval`.
    #[cfg_attr(not(feature = "log"), allow(unused_variables))]
    pub fn start(path: impl Into<PathBuf>, interval: Duration) -> Self {
        let path = path.into();
        let snapshot = Arc::new(ArcSwapOption::empty());
        reload(&path, &snapshot);

        let (stop, stopped) = mpsc::channel::<()>();
        let handle = {
            let snapshot = snapshot.clone();
            thread::Builder::new()
                .name("resolv-conf-refresh".into())
                .spawn(move || loop {
                    match stopped.recv_timeout(interval) {
                        Err(RecvTimeoutError::Timeout) => reload(&path, &snapshot),
                        Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
                    }
                })
        };

        let handle = match handle {
            Ok(handle) => Some(handle),
            Err(e) => {
                #[cfg(feature = "log")]
                tracing::warn!(%e, "Failed to spawn resolver configuration refresh thread");
                None
            }
        };

        Self {
            snapshot,
            stop: Some(stop),
            handle,
        }
    }

    /// Stops the refresh thread and waits for it to exit. The last snapshot
    /// stays readable.
    pub fn stop(&mut self) {
        if let Some(stop) = self.stop.take() {
            let _ = stop.send(());
        }
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }

    /// Whether the refresh thread is still running.
    pub fn is_running(&self) -> bool {
        self.handle
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }
}

impl ConfigProvider for ResolvConfWatcher {
    fn current(&self) -> Result<Arc<ResolverConfig>, ConfigError> {
        self.snapshot.load_full().ok_or(ConfigError::NotLoaded)
    }
}

impl Drop for ResolvConfWatcher {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg_attr(not(feature = "log"), allow(unused_variables))]
fn reload(path: &Path, snapshot: &ArcSwapOption<ResolverConfig>) {
    match ResolverConfig::from_file(path) {
        Ok(conf) => snapshot.store(Some(Arc::new(conf))),
        Err(e) => {
            #[cfg(feature = "log")]
            tracing::warn!(path = %path.display(), %e, "Failed to load resolver configuration");
        }
    }
}
