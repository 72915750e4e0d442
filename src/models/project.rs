//! Repository coordinates on a host.

use std::fmt;

use url::Url;

use crate::{Error, Result};

use super::host::GITHUB_HOST;

/// A repository identified by owner and name on a given host.
///
/// # Example
///
/// ```
/// use hub_rs::Project;
///
/// let project = Project::new("rust-lang", "rust");
/// assert_eq!(project.to_string(), "rust-lang/rust");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Project {
    /// Repository owner (user or organization)
    pub owner: String,
    /// Repository name
    pub name: String,
    /// Host name, e.g. `github.com`
    pub host: String,
    /// URL scheme used for web links
    pub protocol: String,
}

impl Project {
    /// Create a project on the public host.
    pub fn new(owner: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            owner: owner.into(),
            name: name.into(),
            host: GITHUB_HOST.to_string(),
            protocol: "https".to_string(),
        }
    }

    /// Place the project on another host.
    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.host = host.into();
        self
    }

    /// Derive a project from a remote URL such as
    /// `ssh://git@github.com/owner/name.git` or `https://github.com/owner/name`.
    pub fn from_url(url: &Url) -> Result<Self> {
        let host = url
            .host_str()
            .map(|h| h.trim_start_matches("www.").to_lowercase())
            .ok_or_else(|| Error::InvalidInput(format!("remote URL has no host: {}", url)))?;

        let mut segments = url
            .path_segments()
            .into_iter()
            .flatten()
            .filter(|s| !s.is_empty());
        let (owner, name) = match (segments.next(), segments.next()) {
            (Some(owner), Some(name)) => (owner, name.trim_end_matches(".git")),
            _ => {
                return Err(Error::InvalidInput(format!(
                    "remote URL does not name a repository: {}",
                    url
                )))
            }
        };

        let protocol = match url.scheme() {
            "http" => "http",
            _ => "https",
        };

        Ok(Self {
            owner: owner.to_string(),
            name: name.to_string(),
            host,
            protocol: protocol.to_string(),
        })
    }
}

impl fmt::Display for Project {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.owner, self.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_project_from_ssh_url() {
        let url = Url::parse("ssh://git@github.com/octocat/hello-world.git").unwrap();
        let project = Project::from_url(&url).unwrap();
        assert_eq!(project.owner, "octocat");
        assert_eq!(project.name, "hello-world");
        assert_eq!(project.host, "github.com");
        assert_eq!(project.protocol, "https");
    }

    #[test]
    fn test_project_from_http_url() {
        let url = Url::parse("http://www.GHE.example.com/team/tool").unwrap();
        let project = Project::from_url(&url).unwrap();
        assert_eq!(project.host, "ghe.example.com");
        assert_eq!(project.to_string(), "team/tool");
        assert_eq!(project.protocol, "http");
    }

    #[test]
    fn test_project_requires_owner_and_name() {
        let url = Url::parse("https://github.com/octocat").unwrap();
        assert!(Project::from_url(&url).is_err());
    }
}
