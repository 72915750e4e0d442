//! YAML-backed host configuration.
//!
//! ```yaml
//! github.com:
//! - user: octocat
//!   oauth_token: ghp_example
//!   protocol: https
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use secrecy::ExposeSecret;
use serde::{Deserialize, Serialize};
use serde_yaml::{Mapping, Value};
use tracing::debug;

use super::{location, ConfigStore, HostConfig};
use crate::models::Host;
use crate::Result;

#[derive(Debug, Default, Serialize, Deserialize)]
struct YamlHost {
    #[serde(default)]
    user: String,
    #[serde(default)]
    oauth_token: String,
    #[serde(default)]
    protocol: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    unix_socket: Option<String>,
}

/// Host configuration stored as a YAML file.
#[derive(Debug, Clone)]
pub struct YamlConfigStore {
    path: PathBuf,
}

impl YamlConfigStore {
    /// Use the file at `path`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Use the file resolved by [`location::config_path`].
    pub fn from_env() -> Result<Self> {
        Ok(Self::new(location::config_path()?))
    }

    /// The file backing this store.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ConfigStore for YamlConfigStore {
    fn load(&self) -> Result<HostConfig> {
        let contents = match fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(HostConfig::default()),
            Err(err) => return Err(err.into()),
        };
        if contents.trim().is_empty() {
            return Ok(HostConfig::default());
        }

        let mapping: Mapping = serde_yaml::from_str(&contents)?;
        let mut config = HostConfig::default();
        for (key, value) in mapping {
            let Value::String(name) = key else {
                continue;
            };
            let entries: Vec<YamlHost> = serde_yaml::from_value(value)?;
            let Some(entry) = entries.into_iter().next() else {
                continue;
            };

            let mut host = Host::new(name).with_user(entry.user).with_protocol(entry.protocol);
            if !entry.oauth_token.is_empty() {
                host = host.with_token(entry.oauth_token);
            }
            if let Some(socket) = entry.unix_socket.filter(|s| !s.is_empty()) {
                host = host.with_unix_socket(socket);
            }
            config.hosts.push(host);
        }

        debug!(path = %self.path.display(), hosts = config.hosts.len(), "loaded host config");
        Ok(config)
    }

    fn save(&self, config: &HostConfig) -> Result<()> {
        let mut mapping = Mapping::new();
        for host in &config.hosts {
            let entry = YamlHost {
                user: host.user.clone(),
                oauth_token: host
                    .access_token
                    .as_ref()
                    .map(|t| t.expose_secret().to_string())
                    .unwrap_or_default(),
                protocol: host.protocol.clone(),
                unix_socket: host.unix_socket.clone(),
            };
            mapping.insert(
                Value::String(host.host.clone()),
                serde_yaml::to_value(vec![entry])?,
            );
        }

        let contents = serde_yaml::to_string(&mapping)?;
        write_private(&self.path, contents.as_bytes())?;
        debug!(path = %self.path.display(), hosts = config.hosts.len(), "saved host config");
        Ok(())
    }

    fn check_writeable(&self) -> Result<()> {
        let existed = self.path.exists();
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        open_private(&self.path, false)?;
        if !existed {
            fs::remove_file(&self.path)?;
        }
        Ok(())
    }
}

fn open_private(path: &Path, truncate: bool) -> std::io::Result<fs::File> {
    let mut options = fs::OpenOptions::new();
    options.write(true).create(true);
    if truncate {
        options.truncate(true);
    } else {
        options.append(true);
    }
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }
    options.open(path)
}

fn write_private(path: &Path, contents: &[u8]) -> std::io::Result<()> {
    use std::io::Write;

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    open_private(path, true)?.write_all(contents)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_file_is_empty_config() {
        let dir = tempfile::tempdir().unwrap();
        let store = YamlConfigStore::new(dir.path().join("hub"));
        assert!(store.load().unwrap().hosts.is_empty());
    }

    #[test]
    fn test_reads_hub_format() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("hub");
        fs::write(
            &path,
            "github.com:\n- user: octocat\n  oauth_token: abc123\n  protocol: https\n\
             ghe.example.com:\n- user: jane\n  oauth_token: \"\"\n  protocol: http\n  unix_socket: /tmp/ghe.sock\n",
        )
        .unwrap();

        let config = YamlConfigStore::new(&path).load().unwrap();
        assert_eq!(config.hosts.len(), 2);

        let public = config.find("github.com").unwrap();
        assert_eq!(public.user, "octocat");
        assert_eq!(public.access_token.as_ref().unwrap().expose_secret(), "abc123");

        let enterprise = config.find("ghe.example.com").unwrap();
        assert!(!enterprise.has_token());
        assert_eq!(enterprise.protocol, "http");
        assert_eq!(enterprise.unix_socket.as_deref(), Some("/tmp/ghe.sock"));
    }

    #[test]
    fn test_save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let store = YamlConfigStore::new(dir.path().join("nested").join("hub"));

        let mut config = HostConfig::default();
        config.upsert(Host::new("github.com").with_user("octocat").with_token("t0k"));
        store.save(&config).unwrap();

        let raw = fs::read_to_string(store.path()).unwrap();
        assert!(raw.starts_with("github.com:"));
        assert!(raw.contains("oauth_token: t0k"));
        assert!(!raw.contains("unix_socket"));

        let loaded = store.load().unwrap();
        assert_eq!(loaded.find("github.com").unwrap().user, "octocat");

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mode = fs::metadata(store.path()).unwrap().permissions().mode();
            assert_eq!(mode & 0o777, 0o600);
        }
    }

    #[test]
    fn test_check_writeable_leaves_no_file() {
        let dir = tempfile::tempdir().unwrap();
        let store = YamlConfigStore::new(dir.path().join("sub").join("hub"));
        store.check_writeable().unwrap();
        assert!(!store.path().exists());
    }
}
