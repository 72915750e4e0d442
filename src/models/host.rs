//! Configured API hosts.

use std::fmt;

use once_cell::sync::Lazy;
use regex::Regex;
use secrecy::{ExposeSecret, SecretString};
use url::Url;

use crate::Result;

/// The public GitHub host name.
pub const GITHUB_HOST: &str = "github.com";

static ENV_VAR: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\$(?:\{([A-Za-z_][A-Za-z0-9_]*)\}|([A-Za-z_][A-Za-z0-9_]*))").unwrap());

/// One configured remote API endpoint plus its credentials.
///
/// # Example
///
/// ```
/// use hub_rs::Host;
///
/// let host = Host::new("github.com").with_user("octocat");
/// assert_eq!(host.api_root().unwrap().as_str(), "https://api.github.com/");
/// ```
#[derive(Clone)]
pub struct Host {
    /// Host name as the user typed it, e.g. `github.com` or `ghe.example.com`
    pub host: String,
    /// Login of the user the token belongs to
    pub user: String,
    /// Access token, `None` until one has been issued
    pub access_token: Option<SecretString>,
    /// URL scheme used to reach the API
    pub protocol: String,
    /// Route every connection through this unix socket instead of TCP
    pub unix_socket: Option<String>,
}

impl Host {
    /// Create a host record with the default `https` protocol.
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            user: String::new(),
            access_token: None,
            protocol: "https".to_string(),
            unix_socket: None,
        }
    }

    /// Set the user login.
    pub fn with_user(mut self, user: impl Into<String>) -> Self {
        self.user = user.into();
        self
    }

    /// Set the access token.
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.access_token = Some(SecretString::from(token.into()));
        self
    }

    /// Set the URL protocol.
    pub fn with_protocol(mut self, protocol: impl Into<String>) -> Self {
        self.protocol = protocol.into();
        self
    }

    /// Route connections through a unix socket.
    pub fn with_unix_socket(mut self, path: impl Into<String>) -> Self {
        self.unix_socket = Some(path.into());
        self
    }

    /// Returns `true` if an access token is present.
    pub fn has_token(&self) -> bool {
        self.access_token
            .as_ref()
            .is_some_and(|token| !token.expose_secret().is_empty())
    }

    /// The host name used for API calls (`github.com` becomes `api.github.com`).
    pub fn api_host(&self) -> String {
        normalize_host(&self.host)
    }

    /// The root every relative API path is resolved against.
    ///
    /// The public host maps to `https://api.github.com/`; any other host is
    /// treated as a self-hosted deployment serving the API under `/api/v3/`.
    pub fn api_root(&self) -> Result<Url> {
        let protocol = if self.protocol.is_empty() {
            "https"
        } else {
            self.protocol.as_str()
        };
        let mut root = Url::parse(&format!("{}://{}/", protocol, self.api_host()))?;
        if !root.host_str().is_some_and(|h| h.starts_with("api.github.")) {
            root.set_path("/api/v3/");
        }
        Ok(root)
    }

    /// The domain that may receive this host's token.
    ///
    /// Requests to this domain or any of its subdomains are authorized.
    pub fn auth_domain(&self) -> String {
        let domain = self.api_host();
        if domain.starts_with("api.github.") {
            domain.trim_start_matches("api.").to_string()
        } else {
            domain
        }
    }

    /// The unix socket path with `$VAR` and `${VAR}` references expanded.
    pub fn expanded_unix_socket(&self) -> Option<String> {
        let raw = self.unix_socket.as_deref()?;
        let expanded = ENV_VAR.replace_all(raw, |caps: &regex::Captures<'_>| {
            let name = caps.get(1).or_else(|| caps.get(2)).map_or("", |m| m.as_str());
            std::env::var(name).unwrap_or_default()
        });
        Some(expanded.into_owned()).filter(|path| !path.is_empty())
    }
}

impl fmt::Debug for Host {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Host")
            .field("host", &self.host)
            .field("user", &self.user)
            .field(
                "access_token",
                &self.access_token.as_ref().map(|_| "[REDACTED]"),
            )
            .field("protocol", &self.protocol)
            .field("unix_socket", &self.unix_socket)
            .finish()
    }
}

/// Map a user-facing host name to the host serving its API.
pub fn normalize_host(host: &str) -> String {
    if host.is_empty() {
        GITHUB_HOST.to_string()
    } else if host.eq_ignore_ascii_case(GITHUB_HOST) {
        "api.github.com".to_string()
    } else if host.eq_ignore_ascii_case("github.localhost") {
        "api.github.localhost".to_string()
    } else {
        host.to_lowercase()
    }
}
