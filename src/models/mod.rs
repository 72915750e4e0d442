//! Data models for the hub API client.
//!
//! - [`host`] - Configured API hosts and their credentials
//! - [`project`] - Repository coordinates (`owner/name` on a host)
//! - [`pull_request`] - Pull requests, repositories and users

pub mod host;
pub mod project;
pub mod pull_request;

pub use host::*;
pub use project::*;
pub use pull_request::*;
