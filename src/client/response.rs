//! Responses returned by the request pipeline.

use bytes::Bytes;
use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::header::{HeaderMap, LINK};
use reqwest::StatusCode;
use serde::de::DeserializeOwned;

use super::body::{OnClose, ResponseBody};
use super::error_info::{self, ErrorInfo};
use crate::cache::CachedEntry;
use crate::{Error, Result};

static LINK_RELATION: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"<([^>]+)>; rel="([^"]+)""#).unwrap());

/// An HTTP response, from the network or restored from the cache.
#[derive(Debug)]
pub struct ApiResponse {
    status: StatusCode,
    reason: String,
    version: String,
    headers: HeaderMap,
    body: ResponseBody,
    from_cache: bool,
}

impl ApiResponse {
    pub(crate) fn from_network(response: reqwest::Response, on_close: Option<OnClose>) -> Self {
        let status = response.status();
        Self {
            status,
            reason: status.canonical_reason().unwrap_or_default().to_string(),
            version: format!("{:?}", response.version()),
            headers: response.headers().clone(),
            body: ResponseBody::network(response, on_close),
            from_cache: false,
        }
    }

    pub(crate) fn from_cache(entry: CachedEntry) -> Self {
        Self {
            status: entry.status,
            reason: entry.reason,
            version: entry.version,
            headers: entry.headers,
            body: ResponseBody::buffered(entry.body, None),
            from_cache: true,
        }
    }

    /// HTTP status code.
    pub fn status(&self) -> StatusCode {
        self.status
    }

    /// Reason phrase, e.g. `Unprocessable Entity`.
    pub fn reason(&self) -> &str {
        &self.reason
    }

    /// Protocol version, e.g. `HTTP/1.1`.
    pub fn version(&self) -> &str {
        &self.version
    }

    /// Response headers.
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Returns `true` if this response was served from the on-disk cache.
    pub fn is_cached(&self) -> bool {
        self.from_cache
    }

    /// The URL of the `Link` relation `name`, e.g. `next`.
    pub fn link(&self, name: &str) -> Option<String> {
        self.headers
            .get_all(LINK)
            .iter()
            .filter_map(|value| value.to_str().ok())
            .flat_map(|value| LINK_RELATION.captures_iter(value))
            .find(|caps| &caps[2] == name)
            .map(|caps| caps[1].to_string())
    }

    /// Mutable access to the streaming body.
    pub fn body_mut(&mut self) -> &mut ResponseBody {
        &mut self.body
    }

    /// Take the body, discarding the metadata.
    pub fn into_body(self) -> ResponseBody {
        self.body
    }

    /// Read the whole body.
    pub async fn bytes(self) -> Result<Bytes> {
        self.body.bytes().await
    }

    /// Read the whole body as UTF-8 text.
    pub async fn text(self) -> Result<String> {
        let bytes = self.bytes().await?;
        String::from_utf8(bytes.to_vec())
            .map_err(|e| Error::InvalidInput(format!("response body is not UTF-8: {}", e)))
    }

    /// Read and deserialize a JSON body.
    pub async fn json<T: DeserializeOwned>(self) -> Result<T> {
        let bytes = self.bytes().await?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    /// Read the body as an API error payload.
    ///
    /// Returns `None` when the body matches neither error shape.
    pub async fn error_info(self) -> Result<Option<ErrorInfo>> {
        match error_info::translate("", self).await {
            Error::Api(api) => Ok(Some(api.info)),
            Error::UnparsableError { .. } => Ok(None),
            err => Err(err),
        }
    }
}
