//! Environment variables that override stored configuration.

use secrecy::SecretString;

/// Snapshot of the credential-related environment.
///
/// Captured once so provisioning can be driven without touching the process
/// environment.
#[derive(Debug, Clone, Default)]
pub struct EnvOverrides {
    /// `GITHUB_TOKEN`
    pub token: Option<SecretString>,
    /// `GITHUB_USER`
    pub user: Option<String>,
    /// `GITHUB_PASSWORD`
    pub password: Option<SecretString>,
    /// `GITHUB_REPOSITORY`, as `owner/name`
    pub repository: Option<String>,
}

impl EnvOverrides {
    /// Read the overrides from the process environment. Empty values count
    /// as unset.
    pub fn from_env() -> Self {
        let var = |name: &str| std::env::var(name).ok().filter(|v| !v.is_empty());
        Self {
            token: var("GITHUB_TOKEN").map(SecretString::from),
            user: var("GITHUB_USER"),
            password: var("GITHUB_PASSWORD").map(SecretString::from),
            repository: var("GITHUB_REPOSITORY"),
        }
    }

    /// Set the token override.
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(SecretString::from(token.into()));
        self
    }

    /// Set the user override.
    pub fn with_user(mut self, user: impl Into<String>) -> Self {
        self.user = Some(user.into());
        self
    }

    /// Set the password override.
    pub fn with_password(mut self, password: impl Into<String>) -> Self {
        self.password = Some(SecretString::from(password.into()));
        self
    }

    /// Set the repository override.
    pub fn with_repository(mut self, repository: impl Into<String>) -> Self {
        self.repository = Some(repository.into());
        self
    }

    /// `GITHUB_USER`, else the owner part of `GITHUB_REPOSITORY`.
    pub fn user_or_repository_owner(&self) -> Option<String> {
        self.user.clone().or_else(|| {
            self.repository
                .as_deref()
                .and_then(|repo| repo.split('/').next())
                .filter(|owner| !owner.is_empty())
                .map(str::to_string)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_falls_back_to_repository_owner() {
        let env = EnvOverrides::default().with_repository("octo-org/tools");
        assert_eq!(env.user_or_repository_owner().as_deref(), Some("octo-org"));

        let env = env.with_user("octocat");
        assert_eq!(env.user_or_repository_owner().as_deref(), Some("octocat"));

        assert!(EnvOverrides::default().user_or_repository_owner().is_none());
    }

    #[test]
    fn test_debug_redacts_secrets() {
        let env = EnvOverrides::default()
            .with_token("tok-123")
            .with_password("pw-456");
        let debug = format!("{:?}", env);
        assert!(!debug.contains("tok-123"));
        assert!(!debug.contains("pw-456"));
    }
}
