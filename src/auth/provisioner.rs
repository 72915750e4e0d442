//! Access-token provisioning.

use std::process::Command;

use reqwest::StatusCode;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use url::Url;

use super::prompt::Prompter;
use crate::client::{translate, Authorization, ClientConfig, HubClient, OTP_HEADER};
use crate::config::{ConfigStore, EnvOverrides, HostConfig};
use crate::models::{Host, GITHUB_HOST};
use crate::{Error, Result};

/// Upper bound on token requests made by one provisioning call.
pub const MAX_TOKEN_ATTEMPTS: u32 = 9;

/// Sent as `note_url` with every token request.
pub const OAUTH_APP_URL: &str = "https://hub.github.com/";

const CREATE_TOKEN_ACTION: &str = "creating access token";

/// Passwords this long may already be tokens.
const TOKEN_LENGTH: usize = 40;

/// Who is asking for a token; rendered into the token note.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NoteIdentity {
    /// Application label
    pub label: String,
    /// Local account name
    pub user: String,
    /// Machine name
    pub machine: String,
}

impl NoteIdentity {
    /// An identity with the default `hub` label.
    pub fn new(user: impl Into<String>, machine: impl Into<String>) -> Self {
        Self {
            label: "hub".to_string(),
            user: user.into(),
            machine: machine.into(),
        }
    }

    /// Detect the local account (`USER`, `USERNAME`, then `whoami`) and
    /// machine name (`hostname`, then `HOSTNAME`).
    pub fn detect() -> Result<Self> {
        let var = |name: &str| std::env::var(name).ok().filter(|v| !v.is_empty());

        let user = match var("USER").or_else(|| var("USERNAME")) {
            Some(user) => user,
            None => command_output("whoami")?,
        };
        let machine = match command_output("hostname") {
            Ok(machine) if !machine.is_empty() => machine,
            _ => var("HOSTNAME")
                .ok_or_else(|| Error::Config("cannot determine hostname".to_string()))?,
        };

        Ok(Self::new(user, machine))
    }

    /// The note for the `number`th attempt: `hub for user@machine`, with
    /// ` <number>` appended from the second attempt on.
    pub fn note(&self, number: u32) -> String {
        let base = format!("{} for {}@{}", self.label, self.user, self.machine);
        if number > 1 {
            format!("{} {}", base, number)
        } else {
            base
        }
    }
}

fn command_output(program: &str) -> Result<String> {
    let output = Command::new(program).output()?;
    if !output.status.success() {
        return Err(Error::Config(format!("`{}` exited with {}", program, output.status)));
    }
    Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
}

/// State of one token acquisition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenAttempt {
    /// Requests made so far, starting at 1
    pub attempt: u32,
    /// Suffix number of the note
    pub note_number: u32,
    /// One-time code to send, once the server has asked for one
    pub otp: Option<String>,
}

impl TokenAttempt {
    fn first() -> Self {
        Self {
            attempt: 1,
            note_number: 1,
            otp: None,
        }
    }

    fn exhausted(&self) -> bool {
        self.attempt >= MAX_TOKEN_ATTEMPTS
    }
}

/// Successful token request body.
#[derive(Debug, Clone, Deserialize)]
pub struct AuthorizationEntry {
    /// The issued token
    pub token: String,
}

#[derive(Serialize)]
struct AuthorizationRequest<'a> {
    scopes: [&'a str; 1],
    note_url: &'a str,
    note: String,
}

enum TokenOutcome {
    Issued(SecretString),
    /// 422: a token with this note already exists
    DuplicateNote(Error),
    /// The server wants a one-time code
    Challenged(Error),
}

/// Finds or mints the credentials for a host.
///
/// # Example
///
/// ```no_run
/// use hub_rs::{HubClient, Provisioner, TerminalPrompter, YamlConfigStore};
///
/// # async fn example() -> hub_rs::Result<()> {
/// let mut provisioner = Provisioner::new(YamlConfigStore::from_env()?, TerminalPrompter::new());
/// let client = HubClient::connect("github.com", &mut provisioner).await?;
/// println!("signed in as {}", client.host().user);
/// # Ok(())
/// # }
/// ```
pub struct Provisioner<S, P> {
    store: S,
    prompter: P,
    env: EnvOverrides,
    client_config: ClientConfig,
    note_identity: Option<NoteIdentity>,
    hosts: Option<HostConfig>,
}

impl<S: ConfigStore, P: Prompter> Provisioner<S, P> {
    /// Create a provisioner reading overrides from the process environment.
    pub fn new(store: S, prompter: P) -> Self {
        Self {
            store,
            prompter,
            env: EnvOverrides::from_env(),
            client_config: ClientConfig::default(),
            note_identity: None,
            hosts: None,
        }
    }

    /// Replace the environment overrides.
    pub fn with_env(mut self, env: EnvOverrides) -> Self {
        self.env = env;
        self
    }

    /// Configuration for the clients this provisioner builds.
    pub fn with_client_config(mut self, config: ClientConfig) -> Self {
        self.client_config = config;
        self
    }

    /// Use a fixed note identity instead of detecting one.
    pub fn with_note_identity(mut self, identity: NoteIdentity) -> Self {
        self.note_identity = Some(identity);
        self
    }

    /// The client configuration.
    pub fn client_config(&self) -> &ClientConfig {
        &self.client_config
    }

    /// The host configuration, loaded on first use.
    pub fn hosts(&mut self) -> Result<&mut HostConfig> {
        if self.hosts.is_none() {
            self.hosts = Some(self.store.load()?);
        }
        Ok(self.hosts.get_or_insert_with(HostConfig::default))
    }

    /// A host with a usable token: the stored one, or a freshly provisioned
    /// one.
    pub async fn ready_host(&mut self, hostname: &str) -> Result<Host> {
        if self.env.token.is_none() {
            if let Some(host) = self.hosts()?.find(hostname) {
                if host.has_token() && !host.user.is_empty() {
                    return Ok(host.clone());
                }
            }
        }
        self.prompt_for_host(hostname).await
    }

    /// Establish credentials for `hostname`.
    ///
    /// Uses `GITHUB_TOKEN` when set, otherwise the stored token, otherwise
    /// mints a new one from a username and password. Newly minted tokens
    /// are saved to the config store.
    pub async fn prompt_for_host(&mut self, hostname: &str) -> Result<Host> {
        if hostname != GITHUB_HOST && Url::parse(&format!("https://{}", hostname)).is_err() {
            return Err(Error::InvalidHost(hostname.to_string()));
        }

        let env_token = self.env.token.clone();
        let existing = self.hosts()?.find(hostname).cloned();

        let mut host = match existing {
            Some(mut host) => {
                if host.user.is_empty() {
                    // Repair a record saved without its user.
                    self.store.check_writeable()?;
                    let user = self.prompt_user(hostname)?;
                    if user.is_empty() {
                        return Err(Error::Config("missing user".to_string()));
                    }
                    host.user = user;
                    self.hosts()?.upsert(host.clone());
                    self.save()?;
                }
                match &env_token {
                    Some(token) => host.access_token = Some(token.clone()),
                    None if host.has_token() => return Ok(host),
                    None => {}
                }
                host
            }
            None => {
                let mut host = Host::new(hostname);
                host.access_token = env_token.clone();
                host
            }
        };

        if env_token.is_none() {
            self.store.check_writeable()?;
            let token = self.authorize_client(&host).await?;
            host.access_token = Some(token);
        }

        match self.env.user_or_repository_owner() {
            Some(user) if env_token.is_some() => host.user = user,
            _ => {
                let client = HubClient::new(host.clone(), self.client_config.clone())?;
                host.user = client.users().current().await?.login;
            }
        }

        self.hosts()?.upsert(host.clone());
        if env_token.is_none() {
            self.save()?;
        }
        Ok(host)
    }

    /// Obtain a token for `host` from a username and password.
    pub async fn authorize_client(&mut self, host: &Host) -> Result<SecretString> {
        let user = self.prompt_user(&host.host)?;
        let password = self.prompt_password(&host.host, &user)?;

        if password.expose_secret().len() >= TOKEN_LENGTH && self.is_token(host, &password).await {
            debug!(host = %host.host, "password is already a token");
            return Ok(password);
        }

        let identity = match &self.note_identity {
            Some(identity) => identity.clone(),
            None => NoteIdentity::detect()?,
        };

        let mut attempt = TokenAttempt::first();
        loop {
            match self.request_token(host, &user, &password, &identity, &attempt).await? {
                TokenOutcome::Issued(token) => return Ok(token),
                TokenOutcome::DuplicateNote(err) | TokenOutcome::Challenged(err)
                    if attempt.exhausted() =>
                {
                    return Err(err)
                }
                TokenOutcome::DuplicateNote(_) => attempt.note_number += 1,
                TokenOutcome::Challenged(_) => {
                    if attempt.otp.is_some() {
                        warn!(host = %host.host, "invalid two-factor code");
                        self.prompter.warn("invalid two-factor code");
                    }
                    let code = self.prompter.one_time_code()?;
                    if code.trim().is_empty() {
                        return Err(Error::TwoFactorRequired);
                    }
                    attempt.otp = Some(code.trim().to_string());
                }
            }
            attempt.attempt += 1;
        }
    }

    async fn request_token(
        &self,
        host: &Host,
        user: &str,
        password: &SecretString,
        identity: &NoteIdentity,
        attempt: &TokenAttempt,
    ) -> Result<TokenOutcome> {
        let client = HubClient::with_authorization(
            host.clone(),
            self.uncached_config(),
            Authorization::Basic {
                user: user.to_string(),
                password: password.clone(),
                otp: attempt.otp.clone(),
            },
        )?;

        let request = AuthorizationRequest {
            scopes: ["repo"],
            note_url: OAUTH_APP_URL,
            note: identity.note(attempt.note_number),
        };
        debug!(attempt = attempt.attempt, note = %request.note, "requesting access token");

        let response = client
            .post_json("authorizations", &request)
            .await
            .map_err(|err| err.in_action(CREATE_TOKEN_ACTION))?;

        let status = response.status();
        if status == StatusCode::CREATED {
            let entry: AuthorizationEntry = response.json().await?;
            return Ok(TokenOutcome::Issued(SecretString::from(entry.token)));
        }

        let challenged = response
            .headers()
            .get(OTP_HEADER)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|v| v.starts_with("required;"));
        let err = translate(CREATE_TOKEN_ACTION, response).await;

        if challenged {
            Ok(TokenOutcome::Challenged(err))
        } else if status == StatusCode::UNPROCESSABLE_ENTITY {
            Ok(TokenOutcome::DuplicateNote(err))
        } else {
            Err(err)
        }
    }

    /// Returns `true` if `password` authenticates as a token.
    async fn is_token(&self, host: &Host, password: &SecretString) -> bool {
        let client = match HubClient::with_authorization(
            host.clone(),
            self.uncached_config(),
            Authorization::Token(password.clone()),
        ) {
            Ok(client) => client,
            Err(_) => return false,
        };
        matches!(client.get("user").await, Ok(response) if response.status() == StatusCode::OK)
    }

    fn uncached_config(&self) -> ClientConfig {
        self.client_config
            .clone()
            .with_cache_ttl(std::time::Duration::ZERO)
    }

    fn prompt_user(&mut self, hostname: &str) -> Result<String> {
        match &self.env.user {
            Some(user) => Ok(user.clone()),
            None => self.prompter.username(hostname),
        }
    }

    fn prompt_password(&mut self, hostname: &str, user: &str) -> Result<SecretString> {
        match &self.env.password {
            Some(password) => Ok(password.clone()),
            None => self.prompter.password(hostname, user),
        }
    }

    fn save(&mut self) -> Result<()> {
        let hosts = self.hosts()?.clone();
        self.store.save(&hosts)
    }
}
