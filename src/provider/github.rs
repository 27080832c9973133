//! provider::github
//!
//! GitHub backend, covering both the public cloud and GitHub Enterprise.
//!
//! # Design
//!
//! The single "password" configuration field cannot tell a cloud password, a
//! personal-access token, and an Enterprise secret apart, so the provider
//! probes a fixed strategy order instead of assuming, validating each
//! attempt with a live fetch-repository call and stopping at the first
//! success:
//!
//! 1. anonymous (only when no credentials are configured)
//! 2. cloud password (basic auth against `api.github.com`)
//! 3. cloud token (bearer auth against `api.github.com`)
//! 4. enterprise password (basic auth against `https://<host>/api/v3`),
//!    when the repository host is not `github.com`
//! 5. enterprise token (bearer auth against the same base)
//!
//! Exhausting all applicable strategies yields an authentication failure.
//! The winning session is cached for the lifetime of the provider instance,
//! which serves exactly one repository configuration.
//!
//! # Release Ordering
//!
//! `latest_release` takes the first element of the releases listing and
//! trusts the API's stated newest-first order; it is deliberately not
//! re-sorted locally.

use std::sync::Mutex;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, USER_AGENT};
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::Deserialize;

use super::credentials;
use super::traits::{ProviderError, RemoteProvider};
use crate::config::RepositoryConfig;
use crate::core::types::ReleaseMetadata;
use crate::git::Git;

/// Public GitHub API base URL.
const PUBLIC_API_BASE: &str = "https://api.github.com";

/// Host of the public hosting domain.
const PUBLIC_HOST: &str = "github.com";

/// User-Agent header value for API requests.
const USER_AGENT_VALUE: &str = "tidemark";

/// Ref-spec fetching every tag so tag names resolve locally.
const TAGS_REFSPEC: &str = "refs/tags/*:refs/tags/*";

/// Which GitHub deployment flavor a provider instance represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GitHubEdition {
    /// Public github.com
    Cloud,
    /// Self-hosted GitHub Enterprise
    Enterprise,
}

/// A repository coordinate parsed from a remote URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteRepo {
    /// Host name (e.g. `github.com`, `github.example.com`)
    pub host: String,
    /// Repository owner (user or organization)
    pub owner: String,
    /// Repository name
    pub repo: String,
}

/// Authentication strategies, in probe order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AuthStrategy {
    Anonymous,
    CloudPassword,
    CloudToken,
    EnterprisePassword,
    EnterpriseToken,
}

/// How a session authenticates each request.
#[derive(Clone)]
enum SessionAuth {
    Anonymous,
    Basic { username: String, password: String },
    Bearer { token: String },
}

/// A validated API session: base URL plus the credential shape that passed
/// the probe.
#[derive(Clone)]
struct Session {
    api_base: String,
    auth: SessionAuth,
}

/// GitHub provider implementation.
pub struct GitHubRemoteProvider {
    /// Deployment flavor (affects URL validation and registry name)
    edition: GitHubEdition,
    /// Fixed API base, overriding per-strategy derivation (Enterprise
    /// installs behind nonstandard paths, tests)
    api_base_override: Option<String>,
    /// HTTP client for API requests
    client: Client,
    /// Cached authenticated session for this provider instance
    session: Mutex<Option<Session>>,
}

// Custom Debug to avoid exposing cached credentials
impl std::fmt::Debug for GitHubRemoteProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GitHubRemoteProvider")
            .field("edition", &self.edition)
            .field("api_base_override", &self.api_base_override)
            .field(
                "has_session",
                &self.session.lock().map(|s| s.is_some()).unwrap_or(false),
            )
            .finish()
    }
}

impl GitHubRemoteProvider {
    /// Create a provider for the given deployment flavor.
    pub fn new(edition: GitHubEdition) -> Self {
        Self {
            edition,
            api_base_override: None,
            client: Client::new(),
            session: Mutex::new(None),
        }
    }

    /// Create a provider with a fixed API base URL.
    ///
    /// Used for Enterprise installs whose API is not at `/api/v3` and by
    /// tests pointing at a local mock server.
    pub fn with_api_base(edition: GitHubEdition, api_base: impl Into<String>) -> Self {
        Self {
            edition,
            api_base_override: Some(api_base.into()),
            client: Client::new(),
            session: Mutex::new(None),
        }
    }

    /// Common headers for API requests.
    fn headers(&self) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(
            ACCEPT,
            HeaderValue::from_static("application/vnd.github+json"),
        );
        headers.insert(USER_AGENT, HeaderValue::from_static(USER_AGENT_VALUE));
        headers.insert(
            "X-GitHub-Api-Version",
            HeaderValue::from_static("2022-11-28"),
        );
        headers
    }

    /// Apply a session's credential shape to a request.
    fn apply_auth(request: RequestBuilder, auth: &SessionAuth) -> RequestBuilder {
        match auth {
            SessionAuth::Anonymous => request,
            SessionAuth::Basic { username, password } => {
                request.basic_auth(username, Some(password))
            }
            SessionAuth::Bearer { token } => request.bearer_auth(token),
        }
    }

    /// The strategies applicable to this configuration, in probe order.
    fn strategies(config: &RepositoryConfig, host: &str) -> Vec<AuthStrategy> {
        if !config.has_credentials() {
            return vec![AuthStrategy::Anonymous];
        }
        let mut strategies = vec![AuthStrategy::CloudPassword, AuthStrategy::CloudToken];
        if host != PUBLIC_HOST {
            strategies.push(AuthStrategy::EnterprisePassword);
            strategies.push(AuthStrategy::EnterpriseToken);
        }
        strategies
    }

    /// The API base a strategy talks to.
    fn api_base(&self, strategy: AuthStrategy, host: &str) -> String {
        if let Some(base) = &self.api_base_override {
            return base.clone();
        }
        match strategy {
            AuthStrategy::CloudPassword | AuthStrategy::CloudToken => PUBLIC_API_BASE.to_string(),
            AuthStrategy::EnterprisePassword | AuthStrategy::EnterpriseToken => {
                enterprise_api_base(host)
            }
            AuthStrategy::Anonymous => {
                if host == PUBLIC_HOST {
                    PUBLIC_API_BASE.to_string()
                } else {
                    enterprise_api_base(host)
                }
            }
        }
    }

    /// Build the candidate session for one strategy.
    fn session_for(&self, strategy: AuthStrategy, config: &RepositoryConfig, host: &str) -> Session {
        let auth = match strategy {
            AuthStrategy::Anonymous => SessionAuth::Anonymous,
            AuthStrategy::CloudPassword | AuthStrategy::EnterprisePassword => SessionAuth::Basic {
                username: config.username.clone(),
                password: config.password.clone(),
            },
            AuthStrategy::CloudToken | AuthStrategy::EnterpriseToken => SessionAuth::Bearer {
                token: config.password.clone(),
            },
        };
        Session {
            api_base: self.api_base(strategy, host),
            auth,
        }
    }

    /// Validate a candidate session with a live fetch-repository call.
    async fn probe(&self, session: &Session, repo: &RemoteRepo) -> Result<(), ProviderError> {
        let url = format!("{}/repos/{}/{}", session.api_base, repo.owner, repo.repo);
        let request = Self::apply_auth(self.client.get(&url).headers(self.headers()), &session.auth);
        let response = request
            .send()
            .await
            .map_err(|e| ProviderError::NetworkError(e.to_string()))?;

        if response.status().is_success() {
            Ok(())
        } else {
            Err(error_for_status(response.status(), &read_api_message(response).await))
        }
    }

    /// Probe strategies in order, returning (and caching) the first session
    /// that passes.
    async fn authenticate(&self, config: &RepositoryConfig) -> Result<Session, ProviderError> {
        if let Some(session) = self.session.lock().expect("session lock").clone() {
            return Ok(session);
        }

        let repo = parse_repo_url(&config.url)
            .ok_or_else(|| ProviderError::UnsupportedUrl(config.url.clone()))?;

        let mut last_error = None;
        for strategy in Self::strategies(config, &repo.host) {
            let session = self.session_for(strategy, config, &repo.host);
            match self.probe(&session, &repo).await {
                Ok(()) => {
                    tracing::debug!(strategy = ?strategy, "authentication probe succeeded");
                    *self.session.lock().expect("session lock") = Some(session.clone());
                    return Ok(session);
                }
                Err(err) => {
                    tracing::debug!(strategy = ?strategy, error = %err, "authentication probe failed");
                    last_error = Some(err);
                }
            }
        }

        Err(ProviderError::AuthFailed(match last_error {
            Some(err) => format!("all authentication strategies exhausted; last: {err}"),
            None => "no applicable authentication strategy".to_string(),
        }))
    }

    /// GET a repository-scoped API path with the authenticated session.
    async fn api_get(
        &self,
        config: &RepositoryConfig,
        path: &str,
    ) -> Result<Response, ProviderError> {
        let session = self.authenticate(config).await?;
        let repo = parse_repo_url(&config.url)
            .ok_or_else(|| ProviderError::UnsupportedUrl(config.url.clone()))?;
        let url = format!(
            "{}/repos/{}/{}/{}",
            session.api_base, repo.owner, repo.repo, path
        );
        Self::apply_auth(self.client.get(&url).headers(self.headers()), &session.auth)
            .send()
            .await
            .map_err(|e| ProviderError::NetworkError(e.to_string()))
    }
}

#[async_trait(?Send)]
impl RemoteProvider for GitHubRemoteProvider {
    fn name(&self) -> &'static str {
        match self.edition {
            GitHubEdition::Cloud => "github",
            GitHubEdition::Enterprise => "github-enterprise",
        }
    }

    fn display_name(&self) -> &'static str {
        match self.edition {
            GitHubEdition::Cloud => "GitHub",
            GitHubEdition::Enterprise => "GitHub Enterprise",
        }
    }

    fn validate_url(&self, url: &str) -> bool {
        match parse_repo_url(url) {
            Some(repo) => match self.edition {
                GitHubEdition::Cloud => repo.host == PUBLIC_HOST,
                GitHubEdition::Enterprise => !repo.host.is_empty(),
            },
            None => false,
        }
    }

    fn apply_default_credentials(&self, config: &mut RepositoryConfig) {
        credentials::apply(config, self.name());
    }

    async fn check_connection(&self, config: &RepositoryConfig) -> Result<(), ProviderError> {
        self.authenticate(config)
            .await
            .map(|_| ())
            .map_err(|e| ProviderError::ConnectionFailed(e.to_string()))
    }

    fn ref_spec(&self) -> Option<&'static str> {
        Some(TAGS_REFSPEC)
    }

    async fn latest_release(
        &self,
        config: &RepositoryConfig,
        _git: &Git,
    ) -> Result<String, ProviderError> {
        let response = self.api_get(config, "releases?per_page=1").await?;
        let status = response.status();
        if !status.is_success() {
            return Err(error_for_status(status, &read_api_message(response).await));
        }

        let releases: Vec<GitHubRelease> =
            response.json().await.map_err(|e| ProviderError::ApiError {
                status: status.as_u16(),
                message: format!("failed to parse releases: {e}"),
            })?;

        // The API lists newest first; trust its order
        releases
            .into_iter()
            .next()
            .map(|release| release.tag_name)
            .ok_or_else(|| ProviderError::NoReleases {
                url: config.url.clone(),
            })
    }

    async fn release_details(
        &self,
        config: &RepositoryConfig,
        tag: &str,
    ) -> Result<Option<ReleaseMetadata>, ProviderError> {
        let response = self.api_get(config, &format!("releases/tags/{tag}")).await?;
        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !status.is_success() {
            return Err(error_for_status(status, &read_api_message(response).await));
        }

        let release: GitHubRelease =
            response.json().await.map_err(|e| ProviderError::ApiError {
                status: status.as_u16(),
                message: format!("failed to parse release: {e}"),
            })?;

        Ok(Some(ReleaseMetadata {
            tag: release.tag_name,
            name: release.name,
            body: release.body,
        }))
    }

    fn template(&self) -> &'static str {
        include_str!("../../templates/scm_form.html")
    }
}

/// Map an API error status to a typed provider error.
fn error_for_status(status: StatusCode, message: &str) -> ProviderError {
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
            ProviderError::AuthFailed(message.to_string())
        }
        StatusCode::NOT_FOUND => ProviderError::NotFound(message.to_string()),
        _ => ProviderError::ApiError {
            status: status.as_u16(),
            message: message.to_string(),
        },
    }
}

/// Extract the API's error message from a failed response body.
async fn read_api_message(response: Response) -> String {
    match response.json::<GitHubErrorResponse>().await {
        Ok(err) => err.message,
        Err(_) => "unknown error".to_string(),
    }
}

/// Derive the Enterprise API base from a repository host.
fn enterprise_api_base(host: &str) -> String {
    format!("https://{host}/api/v3")
}

/// Parse a remote URL to extract host, owner and repo.
///
/// Supports both SSH and HTTPS formats:
/// - `git@github.com:owner/repo.git`
/// - `https://github.example.com/owner/repo.git`
/// - `https://github.com/owner/repo`
pub fn parse_repo_url(url: &str) -> Option<RemoteRepo> {
    // SSH format: git@host:owner/repo.git
    if let Some(rest) = url.strip_prefix("git@") {
        let (host, path) = rest.split_once(':')?;
        return repo_from_path(host, path);
    }

    // HTTPS format: https://host/owner/repo.git
    if let Some(rest) = url
        .strip_prefix("https://")
        .or_else(|| url.strip_prefix("http://"))
    {
        let (host, path) = rest.split_once('/')?;
        return repo_from_path(host, path);
    }

    None
}

/// Split an `owner/repo(.git)` path into a [`RemoteRepo`].
fn repo_from_path(host: &str, path: &str) -> Option<RemoteRepo> {
    let path = path.strip_suffix(".git").unwrap_or(path);
    let (owner, repo) = path.split_once('/')?;
    if host.is_empty() || owner.is_empty() || repo.is_empty() || repo.contains('/') {
        return None;
    }
    Some(RemoteRepo {
        host: host.to_string(),
        owner: owner.to_string(),
        repo: repo.to_string(),
    })
}

/// GitHub release response format.
#[derive(Deserialize)]
struct GitHubRelease {
    tag_name: String,
    name: Option<String>,
    body: Option<String>,
}

/// GitHub error response format.
#[derive(Deserialize)]
struct GitHubErrorResponse {
    message: String,
}
