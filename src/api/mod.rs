//! API service modules.
//!
//! Each service provides methods for interacting with a specific
//! subset of the API.

mod pulls;
mod users;

pub use pulls::PullsService;
pub use users::UsersService;
