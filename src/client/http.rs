//! HTTP client implementation for the hub API.

use std::fmt;
use std::sync::Arc;

use bytes::Bytes;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, ACCEPT, AUTHORIZATION, CONTENT_TYPE, HOST};
use reqwest::{Method, Request};
use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;
use tracing::debug;
use url::Url;

use crate::api::{PullsService, UsersService};
use crate::auth::{Prompter, Provisioner};
use crate::cache::{self, CacheStore};
use crate::config::ConfigStore;
use crate::models::Host;
use crate::{Error, Result};

use super::config::ClientConfig;
use super::response::ApiResponse;
use super::transport::build_http_client;

/// Versioned JSON media type sent with every request.
pub const API_MEDIA_TYPE: &str = "application/vnd.github.v3+json;charset=utf-8";

/// Media type enabling draft pull request fields.
pub const DRAFTS_MEDIA_TYPE: &str = "application/vnd.github.shadow-cat-preview+json;charset=utf-8";

/// The main client for interacting with the API of one host.
///
/// The client resolves relative paths against the host's API root, attaches
/// credentials, and serves cacheable requests from disk when the cache is
/// enabled.
///
/// # Example
///
/// ```no_run
/// use hub_rs::{ClientConfig, Host, HubClient, Project};
///
/// # async fn example() -> hub_rs::Result<()> {
/// let host = Host::new("github.com").with_user("octocat").with_token("ghp_example");
/// let client = HubClient::new(host, ClientConfig::default())?;
///
/// let me = client.users().current().await?;
/// let pulls = client
///     .pulls()
///     .fetch(&Project::new("rust-lang", "rust"), &Default::default(), 10, None)
///     .await?;
/// println!("{} sees {} open pull requests", me.login, pulls.len());
/// # Ok(())
/// # }
/// ```
pub struct HubClient {
    pub(crate) inner: Arc<ClientInner>,
}

pub(crate) struct ClientInner {
    pub(crate) http: reqwest::Client,
    pub(crate) root_url: Url,
    pub(crate) host: Host,
    pub(crate) auth: Authorization,
    pub(crate) cache: CacheStore,
    pub(crate) config: ClientConfig,
}

/// How requests are authenticated.
pub(crate) enum Authorization {
    None,
    /// `Authorization: token <t>`, only sent to `domain` and its subdomains
    Scoped { token: SecretString, domain: String },
    /// `Authorization: token <t>` on every request
    Token(SecretString),
    /// Basic credentials plus an optional one-time code
    Basic {
        user: String,
        password: SecretString,
        otp: Option<String>,
    },
}

/// A request payload.
#[derive(Debug, Clone)]
pub struct RequestBody {
    content_type: HeaderValue,
    bytes: Bytes,
}

impl RequestBody {
    /// Serialize `payload` as JSON.
    pub fn json<T: Serialize + ?Sized>(payload: &T) -> Result<Self> {
        Ok(Self {
            content_type: HeaderValue::from_static("application/json; charset=utf-8"),
            bytes: Bytes::from(serde_json::to_vec(payload)?),
        })
    }

    /// Raw bytes with an explicit content type.
    pub fn raw(content_type: HeaderValue, bytes: impl Into<Bytes>) -> Self {
        Self {
            content_type,
            bytes: bytes.into(),
        }
    }
}

impl HubClient {
    /// Create a client for `host`, authorizing with its token if it has one.
    pub fn new(host: Host, config: ClientConfig) -> Result<Self> {
        let auth = match &host.access_token {
            Some(token) if host.has_token() => Authorization::Scoped {
                token: token.clone(),
                domain: host.auth_domain(),
            },
            _ => Authorization::None,
        };
        Self::with_authorization(host, config, auth)
    }

    /// Obtain a ready host from `provisioner`, minting a token if needed, and
    /// build a client for it.
    pub async fn connect<S, P>(hostname: &str, provisioner: &mut Provisioner<S, P>) -> Result<Self>
    where
        S: ConfigStore,
        P: Prompter,
    {
        let host = provisioner.ready_host(hostname).await?;
        Self::new(host, provisioner.client_config().clone())
    }

    pub(crate) fn with_authorization(
        host: Host,
        config: ClientConfig,
        auth: Authorization,
    ) -> Result<Self> {
        let unix_socket = host.expanded_unix_socket();
        let http = build_http_client(&config, unix_socket.as_deref())?;
        let root_url = host.api_root()?;
        let cache = match &config.cache_dir {
            Some(dir) => CacheStore::new(dir.clone(), config.cache_ttl),
            None => CacheStore::in_temp_dir(config.cache_ttl),
        };

        Ok(Self {
            inner: Arc::new(ClientInner {
                http,
                root_url,
                host,
                auth,
                cache,
                config,
            }),
        })
    }

    /// Get the pull requests service.
    pub fn pulls(&self) -> PullsService {
        PullsService::new(self.inner.clone())
    }

    /// Get the users service.
    pub fn users(&self) -> UsersService {
        UsersService::new(self.inner.clone())
    }

    /// The host this client talks to.
    pub fn host(&self) -> &Host {
        &self.inner.host
    }

    /// The root relative paths are resolved against.
    pub fn root_url(&self) -> &Url {
        &self.inner.root_url
    }

    /// Perform a request. `configure` may adjust the headers last.
    pub async fn perform<F>(
        &self,
        method: Method,
        path: &str,
        body: Option<RequestBody>,
        configure: F,
    ) -> Result<ApiResponse>
    where
        F: FnOnce(&mut HeaderMap),
    {
        self.inner.perform(method, path, body, configure).await
    }

    /// `GET path`.
    pub async fn get(&self, path: &str) -> Result<ApiResponse> {
        self.inner.get(path).await
    }

    /// `GET path` asking for a specific media type.
    pub async fn get_file(&self, path: &str, accept: &str) -> Result<ApiResponse> {
        self.inner.get_file(path, accept).await
    }

    /// `POST path` with a JSON payload.
    pub async fn post_json<T: Serialize + ?Sized>(&self, path: &str, payload: &T) -> Result<ApiResponse> {
        self.inner.post_json(path, payload).await
    }
}

impl ClientInner {
    /// Resolve, authorize, consult the cache, then dispatch.
    pub(crate) async fn perform<F>(
        &self,
        method: Method,
        path: &str,
        body: Option<RequestBody>,
        configure: F,
    ) -> Result<ApiResponse>
    where
        F: FnOnce(&mut HeaderMap),
    {
        let url = self.root_url.join(path)?;
        let mut builder = self.http.request(method, url.clone());

        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static(API_MEDIA_TYPE));
        match &self.auth {
            Authorization::None => {}
            Authorization::Scoped { token, domain } => {
                if should_authorize(domain, &url) {
                    headers.insert(AUTHORIZATION, token_header(token)?);
                }
            }
            Authorization::Token(token) => {
                headers.insert(AUTHORIZATION, token_header(token)?);
            }
            Authorization::Basic {
                user,
                password,
                otp,
            } => {
                builder = builder.basic_auth(user, Some(password.expose_secret()));
                if let Some(code) = otp {
                    headers.insert(
                        HeaderName::from_static("x-github-otp"),
                        HeaderValue::from_str(code).map_err(|_| {
                            Error::InvalidInput("invalid two-factor code".to_string())
                        })?,
                    );
                }
            }
        }
        if let Some(body) = body {
            headers.insert(CONTENT_TYPE, body.content_type);
            builder = builder.body(body.bytes);
        }
        configure(&mut headers);

        let mut request = builder.headers(headers).build()?;

        let cache_key = self
            .cache
            .accepts(request.method(), request.url())
            .then(|| cache::cache_key(&request));
        if let Some(key) = &cache_key {
            if let Some(entry) = self.cache.read(key) {
                debug!(method = %request.method(), url = %request.url(), "cache hit");
                return Ok(ApiResponse::from_cache(entry));
            }
        }

        if let Some(target) = &self.config.override_url {
            redirect(&mut request, target)?;
        }

        debug!(
            method = %request.method(),
            url = %request.url(),
            cacheable = cache_key.is_some(),
            "sending request"
        );
        let response = self.http.execute(request).await?;
        debug!(status = response.status().as_u16(), url = %response.url(), "received response");

        let on_close = cache_key.and_then(|key| {
            self.cache
                .writer(key, response.status(), response.version(), response.headers())
        });
        Ok(ApiResponse::from_network(response, on_close))
    }

    pub(crate) async fn get(&self, path: &str) -> Result<ApiResponse> {
        self.perform(Method::GET, path, None, |_| {}).await
    }

    pub(crate) async fn get_file(&self, path: &str, accept: &str) -> Result<ApiResponse> {
        let accept = HeaderValue::from_str(accept)
            .map_err(|_| Error::InvalidInput(format!("invalid media type: {:?}", accept)))?;
        self.perform(Method::GET, path, None, move |headers| {
            headers.insert(ACCEPT, accept);
        })
        .await
    }

    pub(crate) async fn post_json<T: Serialize + ?Sized>(
        &self,
        path: &str,
        payload: &T,
    ) -> Result<ApiResponse> {
        let body = RequestBody::json(payload)?;
        self.perform(Method::POST, path, Some(body), |_| {}).await
    }
}

fn token_header(token: &SecretString) -> Result<HeaderValue> {
    let mut value = HeaderValue::from_str(&format!("token {}", token.expose_secret()))
        .map_err(|_| Error::InvalidInput("Invalid token format".to_string()))?;
    value.set_sensitive(true);
    Ok(value)
}

/// `host[:port]` of a URL, lowercased. The port is omitted when it is the
/// scheme's default.
pub(crate) fn authority(url: &Url) -> String {
    let host = url.host_str().unwrap_or_default().to_lowercase();
    match url.port() {
        Some(port) => format!("{}:{}", host, port),
        None => host,
    }
}

/// Returns `true` if a token scoped to `domain` may be sent to `url`.
pub fn should_authorize(domain: &str, url: &Url) -> bool {
    let request_host = authority(url);
    let domain = domain.to_lowercase();
    request_host == domain || request_host.ends_with(&format!(".{}", domain))
}

/// Point `request` at `target` while preserving the original authority in
/// the `Host` and `X-Original-*` headers.
fn redirect(request: &mut Request, target: &Url) -> Result<()> {
    let original = request.url().clone();
    let invalid = || Error::Config(format!("cannot redirect {} to {}", original, target));

    let url = request.url_mut();
    url.set_scheme(target.scheme()).map_err(|_| invalid())?;
    url.set_host(target.host_str())?;
    url.set_port(target.port()).map_err(|_| invalid())?;

    let original_port = original
        .port()
        .map(|p| p.to_string())
        .unwrap_or_else(|| "80".to_string());
    let headers = request.headers_mut();
    headers.insert(
        HOST,
        HeaderValue::from_str(&authority(&original)).map_err(|_| invalid())?,
    );
    headers.insert(
        HeaderName::from_static("x-original-scheme"),
        HeaderValue::from_str(original.scheme()).map_err(|_| invalid())?,
    );
    headers.insert(
        HeaderName::from_static("x-original-port"),
        HeaderValue::from_str(&original_port).map_err(|_| invalid())?,
    );
    Ok(())
}

impl Clone for HubClient {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl fmt::Debug for HubClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HubClient")
            .field("host", &self.inner.host)
            .field("root_url", &self.inner.root_url.as_str())
            .field("config", &self.inner.config)
            .finish()
    }
}
