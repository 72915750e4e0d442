//! Credential provisioning for API hosts.
//!
//! [`Provisioner`] decides where a host's token comes from:
//!
//! 1. **Environment** - `GITHUB_TOKEN` is used as-is and never saved
//! 2. **Config store** - a previously saved token for the host
//! 3. **Token request** - a username and password (prompted, or taken from
//!    `GITHUB_USER`/`GITHUB_PASSWORD`) are exchanged for a new token,
//!    answering a two-factor challenge when the server issues one
//!
//! ```no_run
//! use hub_rs::{MemoryConfigStore, Provisioner, TerminalPrompter};
//!
//! # async fn example() -> hub_rs::Result<()> {
//! let mut provisioner = Provisioner::new(MemoryConfigStore::new(), TerminalPrompter::new());
//! let host = provisioner.prompt_for_host("github.com").await?;
//! println!("token ready for {}", host.user);
//! # Ok(())
//! # }
//! ```

mod prompt;
mod provisioner;

pub use prompt::{Prompter, TerminalPrompter};
pub use provisioner::{
    AuthorizationEntry, NoteIdentity, Provisioner, TokenAttempt, MAX_TOKEN_ATTEMPTS, OAUTH_APP_URL,
};
