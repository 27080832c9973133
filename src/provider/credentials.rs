//! provider::credentials
//!
//! Provider-local default-credentials file.
//!
//! Located at (in order of precedence):
//! 1. `$TIDEMARK_CREDENTIALS` if set
//! 2. `<config dir>/tidemark/credentials.toml`
//!
//! # Format
//!
//! ```toml
//! [github]
//! username = "ci-bot"
//! password = "ghp_xxx"
//!
//! [stash]
//! username = "ci-bot"
//! password = "hunter2"
//! ```
//!
//! Defaults only ever fill blanks: values supplied with the request always
//! win. Any failure to read or parse the file is treated as "no defaults
//! available" and swallowed.

use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::Deserialize;

use crate::config::RepositoryConfig;

/// Environment variable overriding the credentials file location.
const CREDENTIALS_ENV: &str = "TIDEMARK_CREDENTIALS";

/// One provider section of the credentials file.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProviderCredentials {
    /// Fallback username
    pub username: Option<String>,
    /// Fallback password or token
    pub password: Option<String>,
}

/// The whole file: one section per provider name.
#[derive(Debug, Default, Deserialize)]
struct CredentialsFile {
    #[serde(flatten)]
    providers: BTreeMap<String, ProviderCredentials>,
}

/// Resolve the credentials file path.
fn credentials_path() -> Option<PathBuf> {
    if let Ok(path) = std::env::var(CREDENTIALS_ENV) {
        return Some(PathBuf::from(path));
    }
    dirs::config_dir().map(|dir| dir.join("tidemark").join("credentials.toml"))
}

/// Look up the fallback credentials for a provider, if any are on disk.
pub fn lookup(provider: &str) -> Option<ProviderCredentials> {
    let path = credentials_path()?;
    let text = std::fs::read_to_string(path).ok()?;
    let file: CredentialsFile = toml::from_str(&text).ok()?;
    file.providers.get(provider).cloned()
}

/// Fill blank username/password on `config` from the provider's section.
///
/// Explicitly supplied values are never overwritten.
pub fn apply(config: &mut RepositoryConfig, provider: &str) {
    let Some(defaults) = lookup(provider) else {
        return;
    };
    if config.username.trim().is_empty() {
        if let Some(username) = defaults.username {
            config.username = username;
        }
    }
    if config.password.trim().is_empty() {
        if let Some(password) = defaults.password {
            config.password = password;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_provider_sections() {
        let file: CredentialsFile = toml::from_str(
            r#"
            [github]
            username = "ci-bot"
            password = "ghp_xxx"

            [stash]
            username = "stash-bot"
            "#,
        )
        .unwrap();

        let github = &file.providers["github"];
        assert_eq!(github.username.as_deref(), Some("ci-bot"));
        assert_eq!(github.password.as_deref(), Some("ghp_xxx"));

        let stash = &file.providers["stash"];
        assert_eq!(stash.username.as_deref(), Some("stash-bot"));
        assert_eq!(stash.password, None);
    }

    #[test]
    fn malformed_file_parses_to_none() {
        let result: Result<CredentialsFile, _> = toml::from_str("not [ valid");
        assert!(result.is_err());
    }
}
