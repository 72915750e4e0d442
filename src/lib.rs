//! # hub-rs
//!
//! The API runtime of a GitHub command-line tool.
//!
//! This crate builds authenticated requests against the GitHub REST API (or a
//! self-hosted deployment), caches idempotent responses on disk, walks
//! `Link`-header pagination, turns structured error payloads into readable
//! messages, and provisions access tokens, including the two-factor
//! challenge flow.
//!
//! ## Features
//!
//! - **Request pipeline**: path resolution against the API root, versioned
//!   `Accept` header, token scoping to the host's domain, proxies and unix
//!   sockets
//! - **Response cache**: content-addressed entries under the temp directory,
//!   written only once a body has been read in full
//! - **Pagination**: lazy [`PaginatedStream`] with limit and filter support
//! - **Error translation**: field-level validation errors rendered per code
//! - **Credential provisioning**: environment, stored config, or a token
//!   request with note disambiguation and one-time codes
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::collections::BTreeMap;
//! use hub_rs::{HubClient, Project, Provisioner, TerminalPrompter, YamlConfigStore};
//!
//! #[tokio::main]
//! async fn main() -> hub_rs::Result<()> {
//!     let mut provisioner = Provisioner::new(YamlConfigStore::from_env()?, TerminalPrompter::new());
//!     let client = HubClient::connect("github.com", &mut provisioner).await?;
//!
//!     let mut filter = BTreeMap::new();
//!     filter.insert("state".to_string(), "open".to_string());
//!
//!     let project = Project::new("rust-lang", "rust");
//!     for pr in client.pulls().fetch(&project, &filter, 10, None).await? {
//!         println!("#{} {}", pr.number, pr.title);
//!     }
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]
#![deny(unsafe_code)]

pub mod api;
pub mod auth;
pub mod cache;
pub mod client;
pub mod config;
pub mod error;
pub mod models;
pub mod remote;

// Re-export primary types at crate root for convenience
pub use auth::{Prompter, Provisioner, TerminalPrompter};
pub use cache::CacheStore;
pub use client::{ApiResponse, ClientConfig, HubClient, PaginatedStream};
pub use config::{ConfigStore, EnvOverrides, HostConfig, MemoryConfigStore, YamlConfigStore};
pub use error::{ApiError, Error, Result};
pub use models::{Host, Project, PullRequest, User};

/// Prelude module for convenient imports.
///
/// ```rust
/// use hub_rs::prelude::*;
/// ```
pub mod prelude {
    pub use crate::api::{PullsService, UsersService};
    pub use crate::auth::{NoteIdentity, Prompter, Provisioner, TerminalPrompter};
    pub use crate::client::{ApiResponse, ClientConfig, ErrorInfo, FieldError, HubClient, PaginatedStream};
    pub use crate::config::{ConfigStore, EnvOverrides, MemoryConfigStore, YamlConfigStore};
    pub use crate::error::{Error, Result};
    pub use crate::models::{Host, Project, PullRequest, Repository, User};
    pub use crate::remote::{parse_remotes, Remote, UrlParser};
}
