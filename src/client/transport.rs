//! Construction of the underlying HTTP client.

use reqwest::{NoProxy, Proxy};
use url::Url;

use super::config::ClientConfig;
use crate::{Error, Result};

/// Build a `reqwest` client for `config`, optionally bound to a unix socket.
///
/// TCP connections honor `http_proxy`/`HTTP_PROXY` (minus `NO_PROXY`); socket
/// connections never use a proxy.
pub fn build_http_client(config: &ClientConfig, unix_socket: Option<&str>) -> Result<reqwest::Client> {
    let mut builder = reqwest::Client::builder()
        .user_agent(&config.user_agent)
        .connect_timeout(config.connect_timeout)
        .read_timeout(config.timeout);

    match unix_socket {
        Some(path) => builder = bind_unix_socket(builder, path)?.no_proxy(),
        None => match proxy_from_environment(|name| std::env::var(name).ok())? {
            Some(proxy) => {
                let proxy = Proxy::all(proxy.as_str())?.no_proxy(NoProxy::from_env());
                builder = builder.proxy(proxy);
            }
            None => builder = builder.no_proxy(),
        },
    }

    Ok(builder.build()?)
}

#[cfg(unix)]
fn bind_unix_socket(builder: reqwest::ClientBuilder, path: &str) -> Result<reqwest::ClientBuilder> {
    Ok(builder.unix_socket(std::path::PathBuf::from(path)))
}

#[cfg(not(unix))]
fn bind_unix_socket(_builder: reqwest::ClientBuilder, path: &str) -> Result<reqwest::ClientBuilder> {
    Err(Error::Config(format!(
        "unix socket {:?} is not supported on this platform",
        path
    )))
}

/// Resolve the proxy from `http_proxy`, falling back to `HTTP_PROXY`.
pub fn proxy_from_environment<F>(lookup: F) -> Result<Option<Url>>
where
    F: Fn(&str) -> Option<String>,
{
    let raw = lookup("http_proxy")
        .filter(|v| !v.is_empty())
        .or_else(|| lookup("HTTP_PROXY"))
        .unwrap_or_default();
    parse_proxy(&raw)
}

/// Parse a proxy address. A value without an `http` scheme is retried once
/// with `http://` prepended.
pub fn parse_proxy(raw: &str) -> Result<Option<Url>> {
    if raw.is_empty() {
        return Ok(None);
    }

    let first_err = match Url::parse(raw) {
        Ok(url) if url.scheme().starts_with("http") => return Ok(Some(url)),
        Ok(_) => None,
        Err(err) => Some(err),
    };

    match Url::parse(&format!("http://{}", raw)) {
        Ok(url) => Ok(Some(url)),
        Err(retry_err) => Err(Error::Config(format!(
            "invalid proxy address {:?}: {}",
            raw,
            first_err.unwrap_or(retry_err)
        ))),
    }
}
