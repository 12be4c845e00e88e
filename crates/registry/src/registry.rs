use std::panic::AssertUnwindSafe;
use std::path::Path;

use futures_util::{FutureExt, StreamExt, stream};
use mcpdock_mcp::ServerHandle;
use serde_json::Value;

use crate::config::{Config, DEFAULT_CONFIG_PATH, ServerEntry};
use crate::error::ConfigError;
use crate::probe::{Prober, Reachability, StdioProber};
use crate::runtime::RuntimeFlags;
use crate::{ServerDescriptor, to_handles};

/// The set of configured tool providers that are ready for use.
///
/// Construction only reads the configuration and detects launchers; the
/// retained set stays empty until [`ServerRegistry::initialize`] has run.
///
/// Servers keep the order of the configuration file, and servers added
/// later go to the end. Tool name clashes are settled by this order.
pub struct ServerRegistry {
    config: Config,
    servers: Vec<ServerDescriptor>,
    runtimes: RuntimeFlags,
    prober: Box<dyn Prober>,
    probe_concurrency: usize,
}

impl ServerRegistry {
    /// Creates a registry from the configuration file at `path`.
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        Ok(Self::with_config(Config::load(path)?))
    }

    /// Creates a registry from `mcp_servers.json` in the working directory.
    pub fn from_default_path() -> Result<Self, ConfigError> {
        Self::new(DEFAULT_CONFIG_PATH)
    }

    /// Creates a registry from an already loaded configuration.
    pub fn with_config(config: Config) -> Self {
        Self {
            config,
            servers: Vec::new(),
            runtimes: RuntimeFlags::detect(),
            prober: Box::new(StdioProber),
            probe_concurrency: 1,
        }
    }

    /// Replaces the detected launcher availability.
    #[inline]
    pub fn with_runtime_flags(mut self, runtimes: RuntimeFlags) -> Self {
        self.runtimes = runtimes;
        self
    }

    /// Replaces the prober used by [`ServerRegistry::initialize`].
    #[inline]
    pub fn with_prober<P: Prober + 'static>(mut self, prober: P) -> Self {
        self.prober = Box::new(prober);
        self
    }

    /// Sets how many providers may be probed at the same time.
    ///
    /// Defaults to one, which probes entries in configuration order.
    #[inline]
    pub fn with_probe_concurrency(mut self, concurrency: usize) -> Self {
        self.probe_concurrency = concurrency.max(1);
        self
    }

    /// Loads, validates and probes every configured provider.
    ///
    /// Problems with single entries are logged and the entry is skipped;
    /// this method never fails. Each entry is probed exactly once, and an
    /// entry that fails is not retried.
    pub async fn initialize(&mut self) {
        let candidates: Vec<ServerDescriptor> = match self.config.server_entries() {
            Some(entries) if !entries.is_empty() => entries
                .iter()
                .filter_map(|(name, value)| self.prepare(name, value))
                .collect(),
            _ => {
                warn!("no servers found in the configuration");
                return;
            }
        };

        let prober = &*self.prober;
        let results: Vec<(ServerDescriptor, Reachability)> = stream::iter(candidates)
            .map(|descriptor| async move {
                let probe = prober.probe(&descriptor, descriptor.timeout());
                let reachability = match AssertUnwindSafe(probe).catch_unwind().await {
                    Ok(reachability) => reachability,
                    Err(_) => {
                        error!("probe of server `{}` panicked", descriptor.name());
                        Reachability::Unreachable {
                            reason: "probe panicked".to_owned(),
                        }
                    }
                };
                (descriptor, reachability)
            })
            .buffered(self.probe_concurrency)
            .collect()
            .await;

        for (descriptor, reachability) in results {
            let name = descriptor.name();
            match reachability {
                Reachability::Reachable { .. } => {
                    debug!("loaded server `{name}`");
                    self.insert(descriptor);
                }
                Reachability::Unreachable { reason } => {
                    warn!("server `{name}` is not available, ignoring: {reason}");
                }
            }
        }
        info!("{} servers available", self.servers.len());
    }

    /// Validates one entry and checks its launcher.
    fn prepare(&self, name: &str, value: &Value) -> Option<ServerDescriptor> {
        let entry = match ServerEntry::parse(value) {
            Ok(entry) => entry,
            Err(err) => {
                warn!("invalid server details for `{name}`, ignoring: {err}");
                return None;
            }
        };
        if let Some(launcher) = self.runtimes.missing_launcher(&entry.command) {
            warn!("{launcher} is not available, cannot load server `{name}`");
            return None;
        }
        match entry.into_descriptor(name) {
            Ok(descriptor) => Some(descriptor),
            Err(err) => {
                warn!("invalid server details for `{name}`, ignoring: {err}");
                None
            }
        }
    }

    /// Inserts a descriptor without probing it.
    ///
    /// Returns the descriptor previously registered under the same name; the
    /// replacement takes over its position.
    pub fn add_server(&mut self, descriptor: ServerDescriptor) -> Option<ServerDescriptor> {
        let name = descriptor.name().to_owned();
        let previous = self.insert(descriptor);
        info!("added server `{name}`");
        previous
    }

    fn insert(&mut self, descriptor: ServerDescriptor) -> Option<ServerDescriptor> {
        match self.position(descriptor.name()) {
            Some(idx) => Some(std::mem::replace(&mut self.servers[idx], descriptor)),
            None => {
                self.servers.push(descriptor);
                None
            }
        }
    }

    /// Removes a server. Unknown names are ignored.
    pub fn remove_server(&mut self, name: &str) -> Option<ServerDescriptor> {
        let Some(idx) = self.position(name) else {
            warn!("server `{name}` not found, cannot remove");
            return None;
        };
        info!("removed server `{name}`");
        Some(self.servers.remove(idx))
    }

    #[inline]
    fn position(&self, name: &str) -> Option<usize> {
        self.servers.iter().position(|server| server.name() == name)
    }

    /// Looks a server up by name.
    #[inline]
    pub fn get_server(&self, name: &str) -> Option<&ServerDescriptor> {
        self.servers.iter().find(|server| server.name() == name)
    }

    /// Returns a connection handle for every retained server, in
    /// registry order.
    #[inline]
    pub fn get_all_servers(&self) -> Vec<ServerHandle> {
        to_handles(&self.servers)
    }

    /// Returns the names of the retained servers, in registry order.
    pub fn server_names(&self) -> impl Iterator<Item = &str> {
        self.servers.iter().map(ServerDescriptor::name)
    }

    /// Returns the number of retained servers.
    #[inline]
    pub fn len(&self) -> usize {
        self.servers.len()
    }

    /// Returns whether no server is retained.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.servers.is_empty()
    }

    /// Returns the launcher availability captured at construction.
    #[inline]
    pub fn runtime_flags(&self) -> RuntimeFlags {
        self.runtimes
    }

    /// Returns the configuration document.
    #[inline]
    pub fn config(&self) -> &Config {
        &self.config
    }
}
