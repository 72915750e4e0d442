//! On-disk cache of API responses.
//!
//! Entries are stored under a per-application namespace in the temp
//! directory, one file per request identity:
//!
//! ```text
//! HTTP/1.1 200 OK\r\n
//! content-type: application/json\r\n
//! \r\n
//! <raw body bytes>
//! ```
//!
//! The file's modification time is the entry's age. An entry older than the
//! configured TTL is treated as absent, and so is any file that does not
//! parse: the cache never turns into an error for the caller.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use bytes::Bytes;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, ACCEPT, AUTHORIZATION, HOST};
use reqwest::{Method, Request, StatusCode, Version};
use sha2::{Digest, Sha256};
use tracing::{debug, trace};
use url::Url;

use crate::client::body::{CapturedBody, OnClose};
use crate::client::authority;

/// Bumped whenever the key derivation or entry format changes.
pub const CACHE_VERSION: u32 = 2;

/// Content-addressable store of prior HTTP responses.
///
/// A TTL of zero disables both reads and writes.
#[derive(Debug, Clone)]
pub struct CacheStore {
    dir: PathBuf,
    ttl: Duration,
}

impl CacheStore {
    /// Create a store rooted at `dir`.
    pub fn new(dir: impl Into<PathBuf>, ttl: Duration) -> Self {
        Self {
            dir: dir.into(),
            ttl,
        }
    }

    /// Create a store in the default temp-directory namespace.
    pub fn in_temp_dir(ttl: Duration) -> Self {
        Self::new(Self::default_dir(), ttl)
    }

    /// `$TMPDIR/hub/api`
    pub fn default_dir() -> PathBuf {
        std::env::temp_dir().join("hub").join("api")
    }

    /// The directory entries are written under.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Maximum age of a usable entry.
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Returns `true` unless the TTL is zero.
    pub fn is_enabled(&self) -> bool {
        !self.ttl.is_zero()
    }

    /// Whether a request with this method and URL may be served from or
    /// written to the cache.
    pub fn accepts(&self, method: &Method, url: &Url) -> bool {
        self.is_enabled() && can_cache(method, url)
    }

    /// Location of the entry for `key`.
    pub fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(key)
    }

    /// Look up a fresh entry.
    pub fn read(&self, key: &str) -> Option<CachedEntry> {
        if !self.is_enabled() {
            return None;
        }

        let path = self.path_for(key);
        let modified = fs::metadata(&path).and_then(|m| m.modified()).ok()?;
        let age = modified.elapsed().unwrap_or(Duration::ZERO);
        if age > self.ttl {
            trace!(path = %path.display(), age_secs = age.as_secs(), "cache entry expired");
            return None;
        }

        let raw = fs::read(&path).ok()?;
        let entry = CachedEntry::parse(&raw);
        if entry.is_none() {
            debug!(path = %path.display(), "ignoring malformed cache entry");
        }
        entry
    }

    /// Build the close callback that persists a response once its body has
    /// been fully read.
    ///
    /// Returns `None` when the response is not cache-worthy (caching
    /// disabled, status 403, or any 5xx).
    pub fn writer(
        &self,
        key: String,
        status: StatusCode,
        version: Version,
        headers: &HeaderMap,
    ) -> Option<OnClose> {
        if !self.is_enabled() || status.is_server_error() || status == StatusCode::FORBIDDEN {
            return None;
        }

        let path = self.path_for(&key);
        let version = format!("{:?}", version);
        let reason = status.canonical_reason().unwrap_or_default().to_string();
        let headers = headers.clone();

        Some(Box::new(move |captured: CapturedBody| {
            if !captured.complete {
                trace!(path = %path.display(), "body not fully read; skipping cache write");
                return;
            }
            let entry = CachedEntry {
                version,
                status,
                reason,
                headers,
                body: captured.bytes,
            };
            match write_entry(&path, &entry.encode()) {
                Ok(()) => trace!(path = %path.display(), "cache entry written"),
                Err(err) => debug!(path = %path.display(), error = %err, "cache write failed"),
            }
        }))
    }
}

/// The fields of a request that decide cache equivalence.
#[derive(Debug, Clone, Copy)]
pub struct RequestIdentity<'a> {
    /// Authority the request was addressed to (`host[:port]`)
    pub host: &'a str,
    /// Full request URL
    pub url: &'a Url,
    /// `Accept` header
    pub accept: &'a [u8],
    /// `Authorization` header
    pub authorization: &'a [u8],
    /// Request body, only hashed for the GraphQL endpoint
    pub body: Option<&'a [u8]>,
}

impl<'a> RequestIdentity<'a> {
    /// Derive the cache key.
    ///
    /// The key is `<host>/<path-with-dashes>_<sha256>` where the digest
    /// covers the cache version, `Accept`, `Authorization`, the sorted query
    /// parts and, for GraphQL, the body.
    pub fn cache_key(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(format!("{}:", CACHE_VERSION));
        hasher.update(self.accept);
        hasher.update(self.authorization);

        let mut query_parts: Vec<&str> = self.url.query().unwrap_or_default().split('&').collect();
        query_parts.sort_unstable();
        for part in query_parts {
            hasher.update(part);
            hasher.update("&");
        }

        if is_graphql(self.url) {
            if let Some(body) = self.body {
                hasher.update(body);
            }
        }

        let escaped = self.url.path().replace('/', "-");
        let path = if escaped.len() > 1 {
            escaped.strip_prefix('-').unwrap_or(&escaped)
        } else {
            escaped.as_str()
        };

        format!("{}/{}_{}", self.host, path, hex::encode(hasher.finalize()))
    }
}

/// Compute the cache key of a built request.
pub fn cache_key(request: &Request) -> String {
    let headers = request.headers();
    let host = match headers.get(HOST).and_then(|h| h.to_str().ok()) {
        Some(host) => host.to_string(),
        None => authority(request.url()),
    };
    RequestIdentity {
        host: &host,
        url: request.url(),
        accept: header_bytes(headers, &ACCEPT),
        authorization: header_bytes(headers, &AUTHORIZATION),
        body: request.body().and_then(|b| b.as_bytes()),
    }
    .cache_key()
}

fn header_bytes<'a>(headers: &'a HeaderMap, name: &HeaderName) -> &'a [u8] {
    headers.get(name).map(HeaderValue::as_bytes).unwrap_or_default()
}

/// Returns `true` for the API's single GraphQL endpoint.
pub fn is_graphql(url: &Url) -> bool {
    matches!(url.path(), "/graphql" | "/api/graphql")
}

/// Only `GET` and GraphQL queries are cacheable.
pub fn can_cache(method: &Method, url: &Url) -> bool {
    method == Method::GET || is_graphql(url)
}

/// A response restored from disk.
#[derive(Debug, Clone)]
pub struct CachedEntry {
    /// Protocol, e.g. `HTTP/1.1`
    pub version: String,
    /// Status code
    pub status: StatusCode,
    /// Reason phrase
    pub reason: String,
    /// Response headers
    pub headers: HeaderMap,
    /// Raw body
    pub body: Bytes,
}

impl CachedEntry {
    /// Parse a status line, header block and body separated by a blank line.
    pub fn parse(raw: &[u8]) -> Option<Self> {
        let split = raw.windows(4).position(|w| w == b"\r\n\r\n")?;
        let head = std::str::from_utf8(&raw[..split]).ok()?;
        let body = Bytes::copy_from_slice(&raw[split + 4..]);

        let mut lines = head.split("\r\n");
        let mut status_line = lines.next()?.splitn(3, ' ');
        let version = status_line.next()?;
        let code = status_line.next()?.parse::<u16>().ok()?;
        let reason = status_line.next()?;
        let status = StatusCode::from_u16(code).ok()?;

        let mut headers = HeaderMap::new();
        for line in lines {
            let Some((name, value)) = line.split_once(':') else {
                continue;
            };
            if let (Ok(name), Ok(value)) = (
                HeaderName::from_bytes(name.trim().as_bytes()),
                HeaderValue::from_str(value.trim_start()),
            ) {
                headers.append(name, value);
            }
        }

        Some(Self {
            version: version.to_string(),
            status,
            reason: reason.to_string(),
            headers,
            body,
        })
    }

    /// Serialize in the on-disk format.
    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.body.len() + 256);
        out.extend_from_slice(
            format!("{} {} {}\r\n", self.version, self.status.as_u16(), self.reason).as_bytes(),
        );
        for (name, value) in &self.headers {
            out.extend_from_slice(name.as_str().as_bytes());
            out.extend_from_slice(b": ");
            out.extend_from_slice(value.as_bytes());
            out.extend_from_slice(b"\r\n");
        }
        out.extend_from_slice(b"\r\n");
        out.extend_from_slice(&self.body);
        out
    }
}

/// Write `contents` beside `path`, then rename over it so readers never see
/// a partial entry.
fn write_entry(path: &Path, contents: &[u8]) -> std::io::Result<()> {
    static SEQUENCE: AtomicUsize = AtomicUsize::new(0);

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }

    let mut temp_name = path.file_name().unwrap_or_default().to_os_string();
    temp_name.push(format!(
        ".{}.{}.tmp",
        std::process::id(),
        SEQUENCE.fetch_add(1, Ordering::Relaxed)
    ));
    let temp_path = path.with_file_name(temp_name);

    let mut options = fs::OpenOptions::new();
    options.write(true).create_new(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }

    let written = options
        .open(&temp_path)
        .and_then(|mut file| file.write_all(contents))
        .and_then(|()| fs::rename(&temp_path, path));
    if written.is_err() {
        let _ = fs::remove_file(&temp_path);
    }
    written
}

#[cfg(test)]
mod tests {
    use std::time::SystemTime;

    use super::*;

    fn request(url: &str, headers: &[(&str, &str)]) -> Request {
        let mut request = Request::new(Method::GET, Url::parse(url).unwrap());
        for (name, value) in headers {
            request.headers_mut().insert(
                HeaderName::from_bytes(name.as_bytes()).unwrap(),
                HeaderValue::from_str(value).unwrap(),
            );
        }
        request
    }

    fn entry(status: u16, body: &str) -> CachedEntry {
        let mut headers = HeaderMap::new();
        headers.insert("content-type", HeaderValue::from_static("application/json"));
        headers.insert("link", HeaderValue::from_static("<https://x/2>; rel=\"next\""));
        CachedEntry {
            version: "HTTP/1.1".into(),
            status: StatusCode::from_u16(status).unwrap(),
            reason: "OK".into(),
            headers,
            body: Bytes::from(body.to_string()),
        }
    }

    fn set_age(path: &Path, age: Duration) {
        let file = fs::OpenOptions::new().write(true).open(path).unwrap();
        file.set_modified(SystemTime::now() - age).unwrap();
    }

    #[test]
    fn test_cache_key_ignores_header_and_query_order() {
        let a = request(
            "https://api.github.com/repos/o/r/pulls?state=open&per_page=15",
            &[("accept", "application/json"), ("authorization", "token abc")],
        );
        let b = request(
            "https://api.github.com/repos/o/r/pulls?per_page=15&state=open",
            &[("authorization", "token abc"), ("accept", "application/json")],
        );
        assert_eq!(cache_key(&a), cache_key(&b));
        assert!(cache_key(&a).starts_with("api.github.com/repos-o-r-pulls_"));
    }

    #[test]
    fn test_cache_key_depends_on_identity() {
        let base = request("https://api.github.com/user", &[("authorization", "token a")]);
        let other_token = request("https://api.github.com/user", &[("authorization", "token b")]);
        let other_accept = request(
            "https://api.github.com/user",
            &[("authorization", "token a"), ("accept", "text/plain")],
        );
        let other_host = request("https://ghe.example.com/user", &[("authorization", "token a")]);

        assert_ne!(cache_key(&base), cache_key(&other_token));
        assert_ne!(cache_key(&base), cache_key(&other_accept));
        assert_ne!(cache_key(&base), cache_key(&other_host));
    }

    #[test]
    fn test_cache_key_is_stable_across_runs() {
        let req = request("https://api.github.com/", &[]);
        let key = cache_key(&req);
        assert_eq!(key, cache_key(&request("https://api.github.com/", &[])));
        assert!(key.starts_with("api.github.com/-_"));
        assert_eq!(key.len(), "api.github.com/-_".len() + 64);
    }

    #[test]
    fn test_graphql_body_is_part_of_identity() {
        let url = Url::parse("https://api.github.com/graphql").unwrap();
        let mut first = Request::new(Method::POST, url.clone());
        *first.body_mut() = Some(reqwest::Body::from(r#"{"query":"a"}"#));
        let mut second = Request::new(Method::POST, url);
        *second.body_mut() = Some(reqwest::Body::from(r#"{"query":"b"}"#));
        assert_ne!(cache_key(&first), cache_key(&second));

        let rest = Url::parse("https://api.github.com/repos/o/r/issues").unwrap();
        let mut first = Request::new(Method::POST, rest.clone());
        *first.body_mut() = Some(reqwest::Body::from("a"));
        let mut second = Request::new(Method::POST, rest);
        *second.body_mut() = Some(reqwest::Body::from("b"));
        assert_eq!(cache_key(&first), cache_key(&second));
    }

    #[test]
    fn test_cacheable_requests() {
        let graphql = Url::parse("https://api.github.com/graphql").unwrap();
        let enterprise = Url::parse("https://ghe.example.com/api/graphql").unwrap();
        let rest = Url::parse("https://api.github.com/user").unwrap();

        assert!(can_cache(&Method::GET, &rest));
        assert!(can_cache(&Method::POST, &graphql));
        assert!(can_cache(&Method::POST, &enterprise));
        assert!(!can_cache(&Method::POST, &rest));
        assert!(!can_cache(&Method::DELETE, &rest));
    }

    #[test]
    fn test_zero_ttl_disables_cache() {
        let dir = tempfile::tempdir().unwrap();
        let store = CacheStore::new(dir.path(), Duration::ZERO);
        let url = Url::parse("https://api.github.com/user").unwrap();

        assert!(!store.accepts(&Method::GET, &url));
        assert!(store
            .writer("k".into(), StatusCode::OK, Version::HTTP_11, &HeaderMap::new())
            .is_none());
        assert!(store.read("k").is_none());
    }

    #[test]
    fn test_entry_round_trip_through_disk() {
        let dir = tempfile::tempdir().unwrap();
        let store = CacheStore::new(dir.path(), Duration::from_secs(60));
        let original = entry(200, "[1,2,3]");

        let write = store
            .writer(
                "api.github.com/user_abc".into(),
                original.status,
                Version::HTTP_11,
                &original.headers,
            )
            .unwrap();
        write(CapturedBody {
            bytes: original.body.clone(),
            complete: true,
        });

        let restored = store.read("api.github.com/user_abc").unwrap();
        assert_eq!(restored.status, StatusCode::OK);
        assert_eq!(restored.version, "HTTP/1.1");
        assert_eq!(restored.reason, "OK");
        assert_eq!(restored.body, Bytes::from_static(b"[1,2,3]"));
        assert_eq!(
            restored.headers.get("link").unwrap(),
            "<https://x/2>; rel=\"next\""
        );
    }

    #[test]
    fn test_rewrite_replaces_entry_without_leftovers() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("api.github.com").join("user_abc");

        write_entry(&path, &entry(200, "first body").encode()).unwrap();
        write_entry(&path, &entry(200, "second").encode()).unwrap();

        let restored = CachedEntry::parse(&fs::read(&path).unwrap()).unwrap();
        assert_eq!(restored.body, Bytes::from_static(b"second"));

        let names: Vec<_> = fs::read_dir(path.parent().unwrap())
            .unwrap()
            .map(|e| e.unwrap().file_name())
            .collect();
        assert_eq!(names, vec![std::ffi::OsString::from("user_abc")]);

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mode = fs::metadata(&path).unwrap().permissions().mode();
            assert_eq!(mode & 0o777, 0o600);
        }
    }

    #[test]
    fn test_ttl_boundary() {
        let dir = tempfile::tempdir().unwrap();
        let ttl = Duration::from_secs(60);
        let store = CacheStore::new(dir.path(), ttl);
        let path = store.path_for("h/user_1");
        write_entry(&path, &entry(200, "{}").encode()).unwrap();

        set_age(&path, ttl - Duration::from_secs(5));
        assert!(store.read("h/user_1").is_some());

        set_age(&path, ttl + Duration::from_secs(5));
        assert!(store.read("h/user_1").is_none());
    }

    #[test]
    fn test_skips_forbidden_and_server_errors() {
        let dir = tempfile::tempdir().unwrap();
        let store = CacheStore::new(dir.path(), Duration::from_secs(60));
        let headers = HeaderMap::new();

        for status in [403, 500, 502, 503] {
            let status = StatusCode::from_u16(status).unwrap();
            assert!(store
                .writer("k".into(), status, Version::HTTP_11, &headers)
                .is_none());
        }
        for status in [200, 304, 404, 422] {
            let status = StatusCode::from_u16(status).unwrap();
            assert!(store
                .writer("k".into(), status, Version::HTTP_11, &headers)
                .is_some());
        }
    }

    #[test]
    fn test_incomplete_body_is_not_written() {
        let dir = tempfile::tempdir().unwrap();
        let store = CacheStore::new(dir.path(), Duration::from_secs(60));
        let write = store
            .writer("h/partial_1".into(), StatusCode::OK, Version::HTTP_11, &HeaderMap::new())
            .unwrap();
        write(CapturedBody {
            bytes: Bytes::from_static(b"[1,"),
            complete: false,
        });
        assert!(!store.path_for("h/partial_1").exists());
    }

    #[test]
    fn test_malformed_entries_are_misses() {
        let dir = tempfile::tempdir().unwrap();
        let store = CacheStore::new(dir.path(), Duration::from_secs(60));

        let cases: [&[u8]; 4] = [
            b"garbage without separator",
            b"HTTP/1.1 abc OK\r\n\r\nbody",
            b"HTTP/1.1\r\n\r\nbody",
            b"",
        ];
        for (i, raw) in cases.iter().enumerate() {
            let key = format!("h/bad_{}", i);
            write_entry(&store.path_for(&key), raw).unwrap();
            assert!(store.read(&key).is_none(), "case {} should be a miss", i);
        }
    }

    #[test]
    fn test_parse_preserves_body_bytes() {
        let raw = b"HTTP/1.1 200 OK\r\nx-a: 1\r\n\r\nline1\r\n\r\nline2";
        let entry = CachedEntry::parse(raw).unwrap();
        assert_eq!(entry.body, Bytes::from_static(b"line1\r\n\r\nline2"));
        assert_eq!(entry.headers.get("x-a").unwrap(), "1");
    }
}
