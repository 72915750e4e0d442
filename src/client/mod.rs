//! HTTP client and request pipeline for the hub API.
//!
//! This module provides the main entry point [`HubClient`] plus the pieces
//! it is built from: response and body wrappers, error translation, the
//! transport builder, and the pagination walker.
//!
//! # Example
//!
//! ```no_run
//! use hub_rs::{ClientConfig, Host, HubClient};
//!
//! # async fn example() -> hub_rs::Result<()> {
//! let host = Host::new("github.com").with_token("ghp_example");
//! let client = HubClient::new(host, ClientConfig::from_env()?)?;
//!
//! let response = client.get("rate_limit").await?;
//! println!("{}", response.text().await?);
//! # Ok(())
//! # }
//! ```

pub mod body;
mod config;
pub mod error_info;
mod http;
pub mod paginated;
mod response;
pub mod transport;

pub use body::{CapturedBody, OnClose, ResponseBody};
pub use config::{ClientConfig, TEST_HOST_ENV};
pub use error_info::{translate, ErrorInfo, ErrorPayload, FieldError, CURRENT_USER_ACTION, OTP_HEADER};
pub use http::{should_authorize, HubClient, RequestBody, API_MEDIA_TYPE, DRAFTS_MEDIA_TYPE};
pub use paginated::{per_page, Page, PaginatedStream, Predicate, MAX_PAGE_SIZE};
pub use response::ApiResponse;
pub(crate) use error_info::check_status;
pub(crate) use http::{authority, Authorization, ClientInner};
