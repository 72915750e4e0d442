//! Host aliases from OpenSSH client configuration.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use once_cell::sync::Lazy;
use regex::Regex;

static HOST_DIRECTIVE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^[ \t]*(host|hostname)[ \t]+(.+)$").unwrap());

static TOKEN: Lazy<Regex> = Lazy::new(|| Regex::new(r"%[%h]").unwrap());

/// `Host` alias to `HostName` mapping.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SshConfig {
    aliases: HashMap<String, String>,
}

impl SshConfig {
    /// Read the user config and then the system configs.
    pub fn load() -> Self {
        Self::read_files(&Self::default_files())
    }

    /// `~/.ssh/config`, `/etc/ssh_config`, `/etc/ssh/ssh_config`.
    pub fn default_files() -> Vec<PathBuf> {
        let mut files = Vec::new();
        if let Some(home) = dirs::home_dir() {
            files.push(home.join(".ssh").join("config"));
        }
        files.push(PathBuf::from("/etc/ssh_config"));
        files.push(PathBuf::from("/etc/ssh/ssh_config"));
        files
    }

    /// Read `files` in order; unreadable files are skipped. The first
    /// `HostName` seen for an alias wins.
    pub fn read_files<P: AsRef<Path>>(files: &[P]) -> Self {
        let mut config = Self::default();
        for file in files {
            if let Ok(contents) = fs::read_to_string(file) {
                config.parse(&contents);
            }
        }
        config
    }

    /// Add the aliases declared in `contents`.
    pub fn parse(&mut self, contents: &str) {
        let mut hosts = vec!["*".to_string()];
        for line in contents.lines() {
            let Some(caps) = HOST_DIRECTIVE.captures(line) else {
                continue;
            };
            let names = caps[2].split_whitespace();
            if caps[1].eq_ignore_ascii_case("host") {
                hosts = names.map(str::to_string).collect();
            } else {
                for host in &hosts {
                    for name in names.clone() {
                        self.aliases
                            .entry(host.clone())
                            .or_insert_with(|| expand_tokens(name, host));
                    }
                }
            }
        }
    }

    /// Insert an alias directly.
    pub fn insert(&mut self, alias: impl Into<String>, hostname: impl Into<String>) {
        self.aliases.insert(alias.into(), hostname.into());
    }

    /// The `HostName` configured for `alias`.
    pub fn resolve(&self, alias: &str) -> Option<&str> {
        self.aliases.get(alias).map(String::as_str)
    }
}

fn expand_tokens(text: &str, host: &str) -> String {
    TOKEN
        .replace_all(text, |caps: &regex::Captures<'_>| match &caps[0] {
            "%h" => host.to_string(),
            _ => "%".to_string(),
        })
        .into_owned()
}
