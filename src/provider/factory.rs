//! provider::factory
//!
//! Provider selection and creation.
//!
//! # Design
//!
//! The registry of backends is closed: [`ProviderKind`] enumerates every
//! variant this build knows, and [`create_provider`] maps a configuration
//! string onto one of them. An unknown name is a checked
//! [`ProviderError::UnknownProvider`] at startup, not a runtime load
//! failure.

use super::git::GitRemoteProvider;
use super::github::{GitHubEdition, GitHubRemoteProvider};
use super::stash::StashRemoteProvider;
use super::traits::{ProviderError, RemoteProvider};

/// Supported remote backends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderKind {
    /// Plain git (branch-tip polling, filter-capable)
    Git,
    /// Public GitHub
    GitHub,
    /// Self-hosted GitHub Enterprise
    GitHubEnterprise,
    /// Stash / Bitbucket Server
    Stash,
}

impl ProviderKind {
    /// Every kind this build knows.
    pub fn all() -> &'static [ProviderKind] {
        &[
            ProviderKind::Git,
            ProviderKind::GitHub,
            ProviderKind::GitHubEnterprise,
            ProviderKind::Stash,
        ]
    }

    /// The registry name used in configuration.
    pub fn name(&self) -> &'static str {
        match self {
            ProviderKind::Git => "git",
            ProviderKind::GitHub => "github",
            ProviderKind::GitHubEnterprise => "github-enterprise",
            ProviderKind::Stash => "stash",
        }
    }

    /// Parse a kind from a configuration string.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "git" => Some(ProviderKind::Git),
            "github" => Some(ProviderKind::GitHub),
            "github-enterprise" => Some(ProviderKind::GitHubEnterprise),
            "stash" => Some(ProviderKind::Stash),
            _ => None,
        }
    }
}

impl std::fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Create the provider for a configuration string.
///
/// # Errors
///
/// [`ProviderError::UnknownProvider`] naming the valid choices when the
/// string matches no registered backend.
pub fn create_provider(name: &str) -> Result<Box<dyn RemoteProvider>, ProviderError> {
    let kind = ProviderKind::parse(name).ok_or_else(|| {
        ProviderError::UnknownProvider(format!(
            "{} (valid providers: {})",
            name,
            valid_provider_names().join(", ")
        ))
    })?;

    Ok(match kind {
        ProviderKind::Git => Box::new(GitRemoteProvider::new()),
        ProviderKind::GitHub => Box::new(GitHubRemoteProvider::new(GitHubEdition::Cloud)),
        ProviderKind::GitHubEnterprise => {
            Box::new(GitHubRemoteProvider::new(GitHubEdition::Enterprise))
        }
        ProviderKind::Stash => Box::new(StashRemoteProvider::new()),
    })
}

/// Registry names, for configuration validation and error text.
pub fn valid_provider_names() -> Vec<&'static str> {
    ProviderKind::all().iter().map(|k| k.name()).collect()
}
