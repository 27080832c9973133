//! provider::stash
//!
//! Stash / Bitbucket Server backend.
//!
//! # Design
//!
//! Stash clone URLs carry a project and repository slug under `/scm/`:
//! `https://stash.example.com/scm/PROJ/repo.git`. The REST API lives at
//! `/rest/api/1.0/projects/{project}/repos/{repo}` on the same host.
//!
//! Stash has tags but no release objects, so `latest_release` resolves the
//! most recently modified tag (trusting the API's ordering) and
//! `release_details` has nothing to enrich with.

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, USER_AGENT};
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::Deserialize;

use super::credentials;
use super::traits::{ProviderError, RemoteProvider};
use crate::config::RepositoryConfig;
use crate::core::types::ReleaseMetadata;
use crate::git::Git;

/// User-Agent header value for API requests.
const USER_AGENT_VALUE: &str = "tidemark";

/// Ref-spec fetching every tag so tag names resolve locally.
const TAGS_REFSPEC: &str = "refs/tags/*:refs/tags/*";

/// A repository coordinate parsed from a Stash clone URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StashRepo {
    /// Scheme + host, e.g. `https://stash.example.com`
    pub base: String,
    /// Project key
    pub project: String,
    /// Repository slug
    pub repo: String,
}

impl StashRepo {
    /// REST URL of the repository resource.
    fn api_url(&self) -> String {
        format!(
            "{}/rest/api/1.0/projects/{}/repos/{}",
            self.base, self.project, self.repo
        )
    }
}

/// Stash provider implementation.
#[derive(Debug)]
pub struct StashRemoteProvider {
    /// Fixed API base override for tests
    api_base_override: Option<String>,
    /// HTTP client for API requests
    client: Client,
}

impl Default for StashRemoteProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl StashRemoteProvider {
    /// Create a Stash provider.
    pub fn new() -> Self {
        Self {
            api_base_override: None,
            client: Client::new(),
        }
    }

    /// Create a Stash provider whose API calls go to a fixed base URL
    /// instead of the host parsed from the clone URL.
    pub fn with_api_base(api_base: impl Into<String>) -> Self {
        Self {
            api_base_override: Some(api_base.into()),
            client: Client::new(),
        }
    }

    fn headers(&self) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        headers.insert(USER_AGENT, HeaderValue::from_static(USER_AGENT_VALUE));
        headers
    }

    /// Resolve the repository coordinate, honoring the API base override.
    fn repo_for(&self, config: &RepositoryConfig) -> Result<StashRepo, ProviderError> {
        let mut repo = parse_stash_url(&config.url)
            .ok_or_else(|| ProviderError::UnsupportedUrl(config.url.clone()))?;
        if let Some(base) = &self.api_base_override {
            repo.base = base.clone();
        }
        Ok(repo)
    }

    /// Basic auth when credentials are configured, anonymous otherwise.
    fn apply_auth(&self, request: RequestBuilder, config: &RepositoryConfig) -> RequestBuilder {
        if config.has_credentials() {
            request.basic_auth(&config.username, Some(&config.password))
        } else {
            request
        }
    }
}

#[async_trait(?Send)]
impl RemoteProvider for StashRemoteProvider {
    fn name(&self) -> &'static str {
        "stash"
    }

    fn display_name(&self) -> &'static str {
        "Stash"
    }

    fn validate_url(&self, url: &str) -> bool {
        parse_stash_url(url).is_some()
    }

    fn apply_default_credentials(&self, config: &mut RepositoryConfig) {
        credentials::apply(config, self.name());
    }

    async fn check_connection(&self, config: &RepositoryConfig) -> Result<(), ProviderError> {
        let repo = self
            .repo_for(config)
            .map_err(|e| ProviderError::ConnectionFailed(e.to_string()))?;

        let response = self
            .apply_auth(self.client.get(repo.api_url()).headers(self.headers()), config)
            .send()
            .await
            .map_err(|e| ProviderError::ConnectionFailed(e.to_string()))?;

        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            Err(ProviderError::ConnectionFailed(format!(
                "repository probe returned {status}"
            )))
        }
    }

    fn ref_spec(&self) -> Option<&'static str> {
        Some(TAGS_REFSPEC)
    }

    async fn latest_release(
        &self,
        config: &RepositoryConfig,
        _git: &Git,
    ) -> Result<String, ProviderError> {
        let repo = self.repo_for(config)?;
        let url = format!("{}/tags?orderBy=MODIFICATION&limit=1", repo.api_url());

        let response = self
            .apply_auth(self.client.get(&url).headers(self.headers()), config)
            .send()
            .await
            .map_err(|e| ProviderError::NetworkError(e.to_string()))?;

        let status = response.status();
        match status {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                return Err(ProviderError::AuthFailed(format!(
                    "tag listing returned {status}"
                )))
            }
            StatusCode::NOT_FOUND => {
                return Err(ProviderError::NotFound(format!(
                    "repository {}/{} not found",
                    repo.project, repo.repo
                )))
            }
            _ if !status.is_success() => {
                return Err(ProviderError::ApiError {
                    status: status.as_u16(),
                    message: format!("tag listing returned {status}"),
                })
            }
            _ => {}
        }

        let page: StashTagPage = response.json().await.map_err(|e| ProviderError::ApiError {
            status: status.as_u16(),
            message: format!("failed to parse tag listing: {e}"),
        })?;

        // The API lists most recently modified first; trust its order
        page.values
            .into_iter()
            .next()
            .map(|tag| tag.display_id)
            .ok_or_else(|| ProviderError::NoReleases {
                url: config.url.clone(),
            })
    }

    async fn release_details(
        &self,
        _config: &RepositoryConfig,
        _tag: &str,
    ) -> Result<Option<ReleaseMetadata>, ProviderError> {
        // Stash tags carry no release name/body
        Ok(None)
    }

    fn template(&self) -> &'static str {
        include_str!("../../templates/scm_form.html")
    }
}

/// Parse a Stash clone URL (`https://host/scm/PROJECT/repo.git`).
pub fn parse_stash_url(url: &str) -> Option<StashRepo> {
    let (scheme, rest) = if let Some(rest) = url.strip_prefix("https://") {
        ("https", rest)
    } else if let Some(rest) = url.strip_prefix("http://") {
        ("http", rest)
    } else {
        return None;
    };

    let (host, path) = rest.split_once('/')?;
    let path = path.strip_prefix("scm/")?;
    let path = path.strip_suffix(".git").unwrap_or(path);
    let (project, repo) = path.split_once('/')?;
    if host.is_empty() || project.is_empty() || repo.is_empty() || repo.contains('/') {
        return None;
    }

    Some(StashRepo {
        base: format!("{scheme}://{host}"),
        project: project.to_string(),
        repo: repo.to_string(),
    })
}

/// One page of the Stash tag listing.
#[derive(Deserialize)]
struct StashTagPage {
    values: Vec<StashTag>,
}

/// One tag entry.
#[derive(Deserialize)]
struct StashTag {
    #[serde(rename = "displayId")]
    display_id: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    mod parse_stash_url {
        use super::*;

        #[test]
        fn https_clone_url() {
            let repo = parse_stash_url("https://stash.example.com/scm/PROJ/service.git").unwrap();
            assert_eq!(repo.base, "https://stash.example.com");
            assert_eq!(repo.project, "PROJ");
            assert_eq!(repo.repo, "service");
        }

        #[test]
        fn git_suffix_is_optional() {
            let repo = parse_stash_url("https://stash.example.com/scm/PROJ/service").unwrap();
            assert_eq!(repo.repo, "service");
        }

        #[test]
        fn rejects_urls_without_scm_segment() {
            assert!(parse_stash_url("https://stash.example.com/PROJ/service.git").is_none());
            assert!(parse_stash_url("https://stash.example.com/scm/PROJ").is_none());
            assert!(parse_stash_url("not-a-url").is_none());
            assert!(parse_stash_url("git@stash.example.com:PROJ/service.git").is_none());
        }
    }

    #[test]
    fn api_url_shape() {
        let repo = parse_stash_url("https://stash.example.com/scm/PROJ/service.git").unwrap();
        assert_eq!(
            repo.api_url(),
            "https://stash.example.com/rest/api/1.0/projects/PROJ/repos/service"
        );
    }

    #[test]
    fn provider_identity() {
        let provider = StashRemoteProvider::new();
        assert_eq!(provider.name(), "stash");
        assert_eq!(provider.display_name(), "Stash");
        assert!(!provider.supports_branch_filter());
        assert_eq!(provider.ref_spec(), Some(TAGS_REFSPEC));
    }
}
