//! Host configuration: stored credentials per API host.
//!
//! [`ConfigStore`] is the persistence seam. [`YamlConfigStore`] keeps the
//! familiar on-disk format; [`MemoryConfigStore`] is for tests and for
//! callers that manage persistence themselves.

mod env;
pub mod location;
mod yaml;

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use crate::models::Host;
use crate::{Error, Result};

pub use env::EnvOverrides;
pub use location::{config_path, determine_config_location, ConfigLocation, CONFIG_ENV};
pub use yaml::YamlConfigStore;

/// All configured hosts, in file order.
#[derive(Debug, Clone, Default)]
pub struct HostConfig {
    /// Host records
    pub hosts: Vec<Host>,
}

impl HostConfig {
    /// Find the record for `host` (exact name match).
    pub fn find(&self, host: &str) -> Option<&Host> {
        self.hosts.iter().find(|h| h.host == host)
    }

    /// Mutable access to the record for `host`.
    pub fn find_mut(&mut self, host: &str) -> Option<&mut Host> {
        self.hosts.iter_mut().find(|h| h.host == host)
    }

    /// Replace the record with the same host name, or append it.
    pub fn upsert(&mut self, host: Host) {
        match self.find_mut(&host.host) {
            Some(existing) => *existing = host,
            None => self.hosts.push(host),
        }
    }
}

/// Loads and saves [`HostConfig`].
pub trait ConfigStore: Send {
    /// Read the configuration; a missing store yields an empty config.
    fn load(&self) -> Result<HostConfig>;

    /// Persist the configuration.
    fn save(&self, config: &HostConfig) -> Result<()>;

    /// Fail early if a later [`save`](Self::save) could not succeed.
    fn check_writeable(&self) -> Result<()> {
        Ok(())
    }
}

/// In-memory store. Clones share state.
#[derive(Debug, Clone, Default)]
pub struct MemoryConfigStore {
    config: Arc<Mutex<HostConfig>>,
    saves: Arc<AtomicUsize>,
}

impl MemoryConfigStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store preloaded with `hosts`.
    pub fn with_hosts(hosts: Vec<Host>) -> Self {
        Self {
            config: Arc::new(Mutex::new(HostConfig { hosts })),
            saves: Arc::default(),
        }
    }

    /// Current contents.
    pub fn snapshot(&self) -> HostConfig {
        self.config.lock().map(|c| c.clone()).unwrap_or_default()
    }

    /// Number of times [`ConfigStore::save`] has been called.
    pub fn save_count(&self) -> usize {
        self.saves.load(Ordering::SeqCst)
    }
}

impl ConfigStore for MemoryConfigStore {
    fn load(&self) -> Result<HostConfig> {
        self.config
            .lock()
            .map(|c| c.clone())
            .map_err(|_| Error::Config("host config lock poisoned".to_string()))
    }

    fn save(&self, config: &HostConfig) -> Result<()> {
        let mut stored = self
            .config
            .lock()
            .map_err(|_| Error::Config("host config lock poisoned".to_string()))?;
        *stored = config.clone();
        self.saves.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_upsert_replaces_by_name() {
        let mut config = HostConfig::default();
        config.upsert(Host::new("github.com").with_user("a"));
        config.upsert(Host::new("ghe.example.com").with_user("b"));
        config.upsert(Host::new("github.com").with_user("c"));

        assert_eq!(config.hosts.len(), 2);
        assert_eq!(config.find("github.com").unwrap().user, "c");
        assert!(config.find("GitHub.com").is_none());
    }

    #[test]
    fn test_memory_store_shares_state() {
        let store = MemoryConfigStore::new();
        let handle = store.clone();

        let mut config = store.load().unwrap();
        config.upsert(Host::new("github.com").with_user("octocat"));
        store.save(&config).unwrap();

        assert_eq!(handle.snapshot().hosts.len(), 1);
        assert_eq!(handle.save_count(), 1);
    }
}
