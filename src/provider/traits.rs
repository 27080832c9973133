//! provider::traits
//!
//! RemoteProvider trait definition.
//!
//! # Design
//!
//! The trait is async because hosted backends involve network I/O; the
//! plain git variant simply never awaits anything interesting. All methods
//! return `Result` with typed [`ProviderError`] values so that expected
//! soft conditions (no releases published, repository not found) are
//! distinguishable from hard failures.
//!
//! Connection probing and release resolution must never leak credentials in
//! error text; messages are additionally masked at the response boundary,
//! but providers keep secrets out of their errors in the first place.

use async_trait::async_trait;
use thiserror::Error;

use crate::config::RepositoryConfig;
use crate::core::types::ReleaseMetadata;
use crate::git::{Git, GitError};

/// Errors from provider operations.
#[derive(Debug, Error)]
pub enum ProviderError {
    /// Every applicable authentication strategy was exhausted.
    #[error("authentication failed: {0}")]
    AuthFailed(String),

    /// The connection probe could not reach or read the repository.
    #[error("check connection failed. {0}")]
    ConnectionFailed(String),

    /// The repository has no published releases/tags to resolve.
    #[error("no releases published for {url}")]
    NoReleases {
        /// The repository URL polled
        url: String,
    },

    /// The requested resource was not found.
    #[error("not found: {0}")]
    NotFound(String),

    /// The hosting API returned an error.
    #[error("API error: {status} - {message}")]
    ApiError {
        /// HTTP status code
        status: u16,
        /// Error message from the API
        message: String,
    },

    /// Network or connection error below the API layer.
    #[error("network error: {0}")]
    NetworkError(String),

    /// The URL does not parse for this provider.
    #[error("unsupported URL: {0}")]
    UnsupportedUrl(String),

    /// The provider name is not in the registry.
    #[error("unknown provider '{0}'")]
    UnknownProvider(String),

    /// A git operation performed on the provider's behalf failed.
    #[error(transparent)]
    Git(#[from] GitError),
}

/// The polymorphic capability over a specific hosting backend's API and
/// conventions.
///
/// One provider instance serves one configured repository: a successfully
/// authenticated client handle may be cached inside the instance, so
/// instances must not be reused across differently-configured repositories.
///
/// # Thread Safety
///
/// Implementations must be `Send + Sync`.
#[async_trait(?Send)]
pub trait RemoteProvider: Send + Sync {
    /// Registry name (e.g. "github", "git").
    fn name(&self) -> &'static str;

    /// Human-facing name shown in the host's configuration view.
    fn display_name(&self) -> &'static str;

    /// Syntactic URL check. Never performs a network call.
    fn validate_url(&self, url: &str) -> bool;

    /// Fill missing username/password from a provider-local fallback source
    /// without overwriting explicitly supplied values.
    ///
    /// Failure to read the fallback source is treated as "no defaults
    /// available", never surfaced.
    fn apply_default_credentials(&self, _config: &mut RepositoryConfig) {}

    /// One authenticated round trip against the backend (e.g. fetch
    /// repository metadata).
    ///
    /// # Errors
    ///
    /// The error message must be safe to return to the host after masking;
    /// it must not embed raw credentials.
    async fn check_connection(&self, config: &RepositoryConfig) -> Result<(), ProviderError>;

    /// Extra fetch ref-spec this provider needs to resolve revisions.
    ///
    /// Plain git polls branches directly and needs none; hosted providers
    /// fetch tags explicitly.
    fn ref_spec(&self) -> Option<&'static str>;

    /// Resolve the most recent published release/tag.
    ///
    /// Hosted providers delegate newest-first ordering to the hosting API's
    /// default ordering and do not re-sort locally. Plain git resolves the
    /// tip of the tracked branch instead.
    async fn latest_release(
        &self,
        config: &RepositoryConfig,
        git: &Git,
    ) -> Result<String, ProviderError>;

    /// Resolve release name/body for a tag, if the backend has the concept.
    ///
    /// Strictly best-effort: callers log and swallow errors, and skip the
    /// call entirely when enrichment is disabled on the request.
    async fn release_details(
        &self,
        config: &RepositoryConfig,
        tag: &str,
    ) -> Result<Option<ReleaseMetadata>, ProviderError>;

    /// Whether this provider's configuration form carries branch
    /// whitelist/blacklist fields.
    fn supports_branch_filter(&self) -> bool {
        false
    }

    /// Embedded HTML configuration form for the host's `scm-view`.
    fn template(&self) -> &'static str;
}
