//! provider::git
//!
//! Plain git backend.
//!
//! # Design
//!
//! Plain git has no hosting API: "latest release" is the fetched tip of the
//! tracked branch, connection checking is an `ls-remote` round trip, and
//! there is no release enrichment. This is the only filter-capable
//! provider: branch whitelist/blacklist fields appear on its configuration
//! form and the resolver applies them to the tracked branch.

use async_trait::async_trait;

use super::traits::{ProviderError, RemoteProvider};
use crate::config::RepositoryConfig;
use crate::core::types::ReleaseMetadata;
use crate::git::{self, Git};

/// Plain git provider implementation.
#[derive(Debug, Default)]
pub struct GitRemoteProvider;

impl GitRemoteProvider {
    /// Create a plain git provider.
    pub fn new() -> Self {
        Self
    }
}

#[async_trait(?Send)]
impl RemoteProvider for GitRemoteProvider {
    fn name(&self) -> &'static str {
        "git"
    }

    fn display_name(&self) -> &'static str {
        "Git"
    }

    /// Accept the URL shapes git itself accepts: `http(s)`, `git` and `ssh`
    /// schemes, scp-like `user@host:path`, and local paths.
    fn validate_url(&self, url: &str) -> bool {
        let url = url.trim();
        if url.is_empty() {
            return false;
        }

        for scheme in ["http://", "https://", "git://", "ssh://", "file://"] {
            if let Some(rest) = url.strip_prefix(scheme) {
                return !rest.is_empty();
            }
        }

        // scp-like: user@host:path
        if let Some((user_host, path)) = url.split_once(':') {
            if user_host.contains('@') && !path.is_empty() {
                return true;
            }
        }

        // local path
        url.starts_with('/') || url.starts_with("./") || url.starts_with("../")
    }

    async fn check_connection(&self, config: &RepositoryConfig) -> Result<(), ProviderError> {
        git::ls_remote(config)
            .map_err(|e| ProviderError::ConnectionFailed(e.to_string()))
    }

    /// Plain git polls branches directly; the default branch-tracking
    /// refspec is enough.
    fn ref_spec(&self) -> Option<&'static str> {
        None
    }

    /// The "latest release" of a plain git repository is the fetched tip of
    /// the tracked branch.
    async fn latest_release(
        &self,
        config: &RepositoryConfig,
        git: &Git,
    ) -> Result<String, ProviderError> {
        let branch = config.effective_branch();
        git.remote_branch_tip(branch)
            .map_err(|_| ProviderError::NotFound(format!("branch '{branch}' not found on remote")))
    }

    async fn release_details(
        &self,
        _config: &RepositoryConfig,
        _tag: &str,
    ) -> Result<Option<ReleaseMetadata>, ProviderError> {
        Ok(None)
    }

    fn supports_branch_filter(&self) -> bool {
        true
    }

    fn template(&self) -> &'static str {
        include_str!("../../templates/scm_form_branch_filter.html")
    }
}
