//! Git remotes and their URLs.
//!
//! Parses `git remote -v` output into [`Remote`]s, normalizing scp-style
//! addresses (`git@host:owner/repo`) and SSH host aliases so that every
//! remote URL can be mapped to a [`Project`].

mod ssh_config;

use std::collections::BTreeMap;

use once_cell::sync::Lazy;
use regex::Regex;
use url::Url;

use crate::models::Project;
use crate::{Error, Result};

pub use ssh_config::SshConfig;

/// Remote names tried first, in order.
pub const PRIORITY_REMOTES: [&str; 3] = ["upstream", "github", "origin"];

static PROTOCOL: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[A-Za-z_+-]+://").unwrap());

static REMOTE_LINE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(.+)\s+(.+)\s+\((push|fetch)\)").unwrap());

/// Parses remote URLs, resolving SSH host aliases.
#[derive(Debug, Clone, Default)]
pub struct UrlParser {
    ssh_config: SshConfig,
}

impl UrlParser {
    /// A parser using the given SSH aliases.
    pub fn new(ssh_config: SshConfig) -> Self {
        Self { ssh_config }
    }

    /// Parse a remote URL.
    ///
    /// ```
    /// use hub_rs::remote::UrlParser;
    ///
    /// let url = UrlParser::default().parse("git@github.com:octocat/hello.git").unwrap();
    /// assert_eq!(url.as_str(), "ssh://git@github.com/octocat/hello.git");
    /// ```
    pub fn parse(&self, raw: &str) -> Result<Url> {
        let raw = if !PROTOCOL.is_match(raw) && raw.contains(':') && !raw.contains('\\') {
            format!("ssh://{}", raw.replacen(':', "/", 1))
        } else {
            raw.to_string()
        };

        let mut url = Url::parse(&raw)?;
        if url.scheme() == "git+ssh" {
            url = Url::parse(&format!("ssh{}", &raw["git+ssh".len()..]))?;
        }
        if url.scheme() != "ssh" {
            return Ok(url);
        }

        if let Some(trimmed) = url.path().strip_prefix("//").map(|p| format!("/{}", p)) {
            url.set_path(&trimmed);
        }
        url.set_port(None)
            .map_err(|_| Error::InvalidInput(format!("cannot strip port from {}", url)))?;

        let host = url.host_str().unwrap_or_default().to_string();
        if let Some(alias) = self.ssh_config.resolve(&host) {
            let ignored = host == "github.com" && alias == "ssh.github.com";
            if !ignored && !alias.is_empty() {
                url.set_host(Some(alias))?;
            }
        }
        Ok(url)
    }
}

/// A named git remote.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Remote {
    /// Remote name, e.g. `origin`
    pub name: String,
    /// Fetch URL
    pub url: Option<Url>,
    /// Push URL
    pub push_url: Option<Url>,
}

impl Remote {
    /// The repository this remote points at, from the fetch URL or else the
    /// push URL.
    pub fn project(&self) -> Result<Project> {
        let url = self
            .url
            .as_ref()
            .or(self.push_url.as_ref())
            .ok_or_else(|| Error::InvalidInput(format!("remote {} has no URL", self.name)))?;
        Project::from_url(url)
    }
}

/// Build remotes from `git remote -v` lines.
///
/// Remotes named in [`PRIORITY_REMOTES`] come first in that order, the rest
/// follow by name. Remotes without any parsable URL are dropped.
pub fn parse_remotes<I, S>(lines: I, parser: &UrlParser) -> Vec<Remote>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut by_name: BTreeMap<String, BTreeMap<String, String>> = BTreeMap::new();
    for line in lines {
        let Some(caps) = REMOTE_LINE.captures(line.as_ref()) else {
            continue;
        };
        by_name
            .entry(caps[1].trim().to_string())
            .or_default()
            .insert(caps[3].to_string(), caps[2].trim().to_string());
    }

    let mut remotes = Vec::new();
    for name in PRIORITY_REMOTES {
        if let Some(urls) = by_name.remove(name) {
            remotes.extend(build_remote(name, &urls, parser));
        }
    }
    for (name, urls) in &by_name {
        remotes.extend(build_remote(name, urls, parser));
    }
    remotes
}

fn build_remote(name: &str, urls: &BTreeMap<String, String>, parser: &UrlParser) -> Option<Remote> {
    let parse = |kind: &str| urls.get(kind).and_then(|raw| parser.parse(raw).ok());
    let url = parse("fetch");
    let push_url = parse("push");
    if url.is_none() && push_url.is_none() {
        return None;
    }
    Some(Remote {
        name: name.to_string(),
        url,
        push_url,
    })
}
