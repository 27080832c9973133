//! provider::mock
//!
//! Mock provider implementation for deterministic testing.
//!
//! # Design
//!
//! The mock provider holds scripted answers in memory and records the calls
//! made against it, so dispatcher and resolver tests can run without a
//! hosting API. Revisions still come from a real (temporary) git
//! repository; only the provider surface is scripted.
//!
//! # Example
//!
//! ```
//! use tidemark::provider::mock::MockRemoteProvider;
//! use tidemark::provider::RemoteProvider;
//!
//! let provider = MockRemoteProvider::new().with_connection_error("backend down");
//! assert_eq!(provider.name(), "mock");
//! assert!(provider.validate_url("https://example.com/repo.git"));
//!
//! # tokio_test::block_on(async {
//! let err = provider.check_connection(&Default::default()).await.unwrap_err();
//! assert!(err.to_string().contains("backend down"));
//! # });
//! ```

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use super::traits::{ProviderError, RemoteProvider};
use crate::config::RepositoryConfig;
use crate::core::types::ReleaseMetadata;
use crate::git::Git;

/// Mock provider for testing.
///
/// Thread-safe via internal `Arc<Mutex<...>>` wrapping; clones share state.
#[derive(Debug, Clone, Default)]
pub struct MockRemoteProvider {
    inner: Arc<Mutex<MockInner>>,
}

/// Internal scripted state.
#[derive(Debug, Default)]
struct MockInner {
    /// Whether validate_url answers true
    reject_urls: bool,
    /// Scripted connection failure, if any
    connection_error: Option<String>,
    /// Releases returned by latest_release, consumed front to back;
    /// the final entry repeats once the queue drains
    releases: Vec<String>,
    /// Scripted release details by tag
    details: HashMap<String, ReleaseMetadata>,
    /// Whether the branch filter fields apply
    supports_filter: bool,
    /// Whether the mock polls tags (and so fetches a tag ref-spec)
    tag_polling: bool,
    /// Calls recorded for verification
    calls: Vec<MockCall>,
}

/// Recorded call for test verification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MockCall {
    CheckConnection,
    LatestRelease,
    ReleaseDetails { tag: String },
}

impl MockRemoteProvider {
    /// Create a mock provider that accepts every URL and has no releases.
    pub fn new() -> Self {
        Self::default()
    }

    /// Script the release sequence returned by `latest_release`.
    pub fn with_releases<I, S>(self, releases: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.inner.lock().unwrap().releases = releases.into_iter().map(Into::into).collect();
        self
    }

    /// Script release details for one tag.
    pub fn with_details(self, tag: &str, metadata: ReleaseMetadata) -> Self {
        self.inner
            .lock()
            .unwrap()
            .details
            .insert(tag.to_string(), metadata);
        self
    }

    /// Make `check_connection` fail with the given message.
    pub fn with_connection_error(self, message: &str) -> Self {
        self.inner.lock().unwrap().connection_error = Some(message.to_string());
        self
    }

    /// Make `validate_url` reject everything.
    pub fn rejecting_urls(self) -> Self {
        self.inner.lock().unwrap().reject_urls = true;
        self
    }

    /// Make the mock filter-capable.
    pub fn with_branch_filter(self) -> Self {
        self.inner.lock().unwrap().supports_filter = true;
        self
    }

    /// Make the mock a tag-polling provider (like the hosted backends).
    pub fn with_tag_polling(self) -> Self {
        self.inner.lock().unwrap().tag_polling = true;
        self
    }

    /// The calls recorded so far.
    pub fn calls(&self) -> Vec<MockCall> {
        self.inner.lock().unwrap().calls.clone()
    }
}

#[async_trait(?Send)]
impl RemoteProvider for MockRemoteProvider {
    fn name(&self) -> &'static str {
        "mock"
    }

    fn display_name(&self) -> &'static str {
        "Mock"
    }

    fn validate_url(&self, url: &str) -> bool {
        !url.is_empty() && !self.inner.lock().unwrap().reject_urls
    }

    async fn check_connection(&self, _config: &RepositoryConfig) -> Result<(), ProviderError> {
        let mut inner = self.inner.lock().unwrap();
        inner.calls.push(MockCall::CheckConnection);
        match &inner.connection_error {
            Some(message) => Err(ProviderError::ConnectionFailed(message.clone())),
            None => Ok(()),
        }
    }

    fn ref_spec(&self) -> Option<&'static str> {
        if self.inner.lock().unwrap().tag_polling {
            Some("refs/tags/*:refs/tags/*")
        } else {
            None
        }
    }

    async fn latest_release(
        &self,
        config: &RepositoryConfig,
        _git: &Git,
    ) -> Result<String, ProviderError> {
        let mut inner = self.inner.lock().unwrap();
        inner.calls.push(MockCall::LatestRelease);
        match inner.releases.len() {
            0 => Err(ProviderError::NoReleases {
                url: config.url.clone(),
            }),
            1 => Ok(inner.releases[0].clone()),
            _ => Ok(inner.releases.remove(0)),
        }
    }

    async fn release_details(
        &self,
        _config: &RepositoryConfig,
        tag: &str,
    ) -> Result<Option<ReleaseMetadata>, ProviderError> {
        let mut inner = self.inner.lock().unwrap();
        inner.calls.push(MockCall::ReleaseDetails {
            tag: tag.to_string(),
        });
        Ok(inner.details.get(tag).cloned())
    }

    fn supports_branch_filter(&self) -> bool {
        self.inner.lock().unwrap().supports_filter
    }

    fn template(&self) -> &'static str {
        "<div>mock</div>"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn releases_drain_front_to_back_and_last_repeats() {
        let provider = MockRemoteProvider::new().with_releases(["v1", "v2"]);
        let config = RepositoryConfig::default();
        let (_dir, git) = fixture_git();

        assert_eq!(provider.latest_release(&config, &git).await.unwrap(), "v1");
        assert_eq!(provider.latest_release(&config, &git).await.unwrap(), "v2");
        assert_eq!(provider.latest_release(&config, &git).await.unwrap(), "v2");
    }

    #[tokio::test]
    async fn empty_release_queue_is_no_releases() {
        let provider = MockRemoteProvider::new();
        let config = RepositoryConfig {
            url: "https://example.com/r".into(),
            ..Default::default()
        };
        let (_dir, git) = fixture_git();
        let err = provider.latest_release(&config, &git).await.unwrap_err();
        assert!(matches!(err, ProviderError::NoReleases { .. }));
    }

    #[tokio::test]
    async fn records_calls() {
        let provider = MockRemoteProvider::new();
        let config = RepositoryConfig::default();
        provider.check_connection(&config).await.unwrap();
        provider.release_details(&config, "v1").await.unwrap();

        assert_eq!(
            provider.calls(),
            vec![
                MockCall::CheckConnection,
                MockCall::ReleaseDetails { tag: "v1".into() }
            ]
        );
    }

    /// A throwaway git handle; the mock never touches it.
    fn fixture_git() -> (tempfile::TempDir, Git) {
        let dir = tempfile::tempdir().unwrap();
        let config = RepositoryConfig {
            url: "https://example.com/r".into(),
            ..Default::default()
        };
        let git = Git::open_or_init(&config, dir.path()).unwrap();
        (dir, git)
    }
}
