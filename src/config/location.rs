//! Where the host configuration file lives.

use std::path::{Path, PathBuf};

use tracing::warn;

use crate::{Error, Result};

/// Environment variable naming the config file explicitly.
pub const CONFIG_ENV: &str = "HUB_CONFIG";

const CONFIG_FILE_NAME: &str = "hub";
const DEFAULT_XDG_CONFIG_DIRS: &str = "/etc/xdg";

/// Resolved config file location.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigLocation {
    /// File to read and write
    pub path: PathBuf,
    /// A config file under `~/.config` that exists but is shadowed by
    /// `XDG_CONFIG_HOME`
    pub ignored_legacy: Option<PathBuf>,
}

/// Resolve the config file from the process environment.
///
/// `HUB_CONFIG` wins; otherwise the XDG search of
/// [`determine_config_location`] applies.
pub fn config_path() -> Result<PathBuf> {
    let var = |name: &str| std::env::var(name).ok().filter(|v| !v.is_empty());

    if let Some(explicit) = var(CONFIG_ENV) {
        return Ok(PathBuf::from(explicit));
    }

    let xdg_home = var("XDG_CONFIG_HOME").map(PathBuf::from);
    let home_config = dirs::home_dir().map(|home| home.join(".config"));
    let location = determine_config_location(
        xdg_home.as_deref(),
        home_config.as_deref(),
        var("XDG_CONFIG_DIRS").as_deref(),
    )?;

    if let Some(legacy) = &location.ignored_legacy {
        warn!(
            legacy = %legacy.display(),
            config = %location.path.display(),
            "config file found but not respected; move it to avoid re-authenticating"
        );
    }
    Ok(location.path)
}

/// Pick the config file.
///
/// The base directory is `xdg_home`, else `home_config`. The first existing
/// `hub` file in the base directory or any of the colon-separated
/// `xdg_dirs` (default `/etc/xdg`) is used; otherwise `<base>/hub`.
pub fn determine_config_location(
    xdg_home: Option<&Path>,
    home_config: Option<&Path>,
    xdg_dirs: Option<&str>,
) -> Result<ConfigLocation> {
    let config_dir = xdg_home
        .or(home_config)
        .ok_or_else(|| Error::Config("cannot determine home directory".to_string()))?;

    let search_dirs = std::iter::once(config_dir.to_path_buf()).chain(
        xdg_dirs
            .unwrap_or(DEFAULT_XDG_CONFIG_DIRS)
            .split(':')
            .filter(|dir| !dir.is_empty())
            .map(PathBuf::from),
    );
    for dir in search_dirs {
        let candidate = dir.join(CONFIG_FILE_NAME);
        if candidate.exists() {
            return Ok(ConfigLocation {
                path: candidate,
                ignored_legacy: None,
            });
        }
    }

    let ignored_legacy = match (xdg_home, home_config) {
        (Some(_), Some(home)) => Some(home.join(CONFIG_FILE_NAME)).filter(|legacy| legacy.exists()),
        _ => None,
    };

    Ok(ConfigLocation {
        path: config_dir.join(CONFIG_FILE_NAME),
        ignored_legacy,
    })
}

#[cfg(test)]
mod tests {
    use std::fs;

    use super::*;

    #[test]
    fn test_defaults_to_home_config() {
        let home = tempfile::tempdir().unwrap();
        let empty = tempfile::tempdir().unwrap();
        let xdg_dirs = empty.path().to_string_lossy().to_string();

        let location = determine_config_location(None, Some(home.path()), Some(&xdg_dirs)).unwrap();
        assert_eq!(location.path, home.path().join("hub"));
        assert!(location.ignored_legacy.is_none());
    }

    #[test]
    fn test_prefers_existing_file_in_xdg_dirs() {
        let home = tempfile::tempdir().unwrap();
        let system = tempfile::tempdir().unwrap();
        fs::write(system.path().join("hub"), "").unwrap();
        let xdg_dirs = format!("/nonexistent-hub-rs:{}", system.path().display());

        let location = determine_config_location(None, Some(home.path()), Some(&xdg_dirs)).unwrap();
        assert_eq!(location.path, system.path().join("hub"));
    }

    #[test]
    fn test_reports_shadowed_legacy_file() {
        let home = tempfile::tempdir().unwrap();
        let xdg = tempfile::tempdir().unwrap();
        fs::write(home.path().join("hub"), "").unwrap();

        let location = determine_config_location(Some(xdg.path()), Some(home.path()), Some("/nonexistent-hub-rs")).unwrap();
        assert_eq!(location.path, xdg.path().join("hub"));
        assert_eq!(location.ignored_legacy, Some(home.path().join("hub")));
    }

    #[test]
    fn test_requires_a_base_directory() {
        assert!(determine_config_location(None, None, None).is_err());
    }
}
