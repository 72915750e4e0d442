//! Users service.

use std::sync::Arc;

use reqwest::StatusCode;

use crate::client::{check_status, ClientInner, CURRENT_USER_ACTION};
use crate::models::User;
use crate::Result;

/// Service for user lookups.
pub struct UsersService {
    inner: Arc<ClientInner>,
}

impl UsersService {
    pub(crate) fn new(inner: Arc<ClientInner>) -> Self {
        Self { inner }
    }

    /// Get the user the client's credentials belong to.
    pub async fn current(&self) -> Result<User> {
        let response = check_status(StatusCode::OK, CURRENT_USER_ACTION, self.inner.get("user").await).await?;
        response.json().await
    }
}
