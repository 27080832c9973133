//! GitHub provider tests against a mock API server.
//!
//! These tests script the hosting API with wiremock to verify the
//! authentication probe order, release resolution, and enrichment behavior
//! without touching the network.

use serde_json::json;
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use tidemark::config::RepositoryConfig;
use tidemark::provider::github::{GitHubEdition, GitHubRemoteProvider};
use tidemark::provider::{ProviderError, RemoteProvider};

/// `Basic` header value for alice:tok.
const BASIC_ALICE_TOK: &str = "Basic YWxpY2U6dG9r";
/// `Bearer` header value for tok.
const BEARER_TOK: &str = "Bearer tok";

fn config(url: &str, username: &str, password: &str) -> RepositoryConfig {
    RepositoryConfig {
        url: url.into(),
        username: username.into(),
        password: password.into(),
        ..Default::default()
    }
}

fn provider_for(server: &MockServer) -> GitHubRemoteProvider {
    GitHubRemoteProvider::with_api_base(GitHubEdition::Cloud, server.uri())
}

/// A throwaway git handle; the GitHub provider never touches it.
fn fixture_git(config: &RepositoryConfig) -> (tempfile::TempDir, tidemark::git::Git) {
    let dir = tempfile::tempdir().unwrap();
    let git = tidemark::git::Git::open_or_init(config, dir.path()).unwrap();
    (dir, git)
}

// =============================================================================
// Anonymous Access
// =============================================================================

#[tokio::test]
async fn anonymous_probe_succeeds_without_credentials() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/repos/org/repo"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"full_name": "org/repo"})))
        .expect(1)
        .mount(&server)
        .await;

    let provider = provider_for(&server);
    let config = config("https://github.com/org/repo", "", "");

    provider.check_connection(&config).await.unwrap();
}

#[tokio::test]
async fn latest_release_takes_the_first_listed_release() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/repos/org/repo"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .mount(&server)
        .await;
    // Deliberately not sorted by tag name: the API's own order must win
    Mock::given(method("GET"))
        .and(path("/repos/org/repo/releases"))
        .and(query_param("per_page", "1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"tag_name": "v2.5.0", "name": "Newest", "body": null},
            {"tag_name": "v10.0.0", "name": "Older but larger", "body": null},
        ])))
        .mount(&server)
        .await;

    let provider = provider_for(&server);
    let config = config("https://github.com/org/repo", "", "");
    let (_dir, git) = fixture_git(&config);

    let tag = provider.latest_release(&config, &git).await.unwrap();
    assert_eq!(tag, "v2.5.0");
}

#[tokio::test]
async fn empty_release_listing_is_a_typed_no_releases_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/repos/org/repo"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/repos/org/repo/releases"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&server)
        .await;

    let provider = provider_for(&server);
    let config = config("https://github.com/org/repo", "", "");
    let (_dir, git) = fixture_git(&config);

    let err = provider.latest_release(&config, &git).await.unwrap_err();
    assert!(matches!(err, ProviderError::NoReleases { .. }));
}

// =============================================================================
// Authentication Probing
// =============================================================================

#[tokio::test]
async fn token_strategy_wins_after_password_is_rejected() {
    let server = MockServer::start().await;
    // Cloud password probe (basic auth) is rejected...
    Mock::given(method("GET"))
        .and(path("/repos/org/repo"))
        .and(header("authorization", BASIC_ALICE_TOK))
        .respond_with(
            ResponseTemplate::new(401).set_body_json(json!({"message": "Bad credentials"})),
        )
        .expect(1)
        .mount(&server)
        .await;
    // ...and the token probe (bearer auth) passes
    Mock::given(method("GET"))
        .and(path("/repos/org/repo"))
        .and(header("authorization", BEARER_TOK))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .expect(1)
        .mount(&server)
        .await;
    // The winning session's credential shape is used for the API call
    Mock::given(method("GET"))
        .and(path("/repos/org/repo/releases"))
        .and(header("authorization", BEARER_TOK))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"tag_name": "v1.0.0", "name": null, "body": null},
        ])))
        .expect(2)
        .mount(&server)
        .await;

    let provider = provider_for(&server);
    let config = config("https://github.com/org/repo", "alice", "tok");
    let (_dir, git) = fixture_git(&config);

    let tag = provider.latest_release(&config, &git).await.unwrap();
    assert_eq!(tag, "v1.0.0");

    // The session is cached: a second call must not probe again
    let tag = provider.latest_release(&config, &git).await.unwrap();
    assert_eq!(tag, "v1.0.0");
}

#[tokio::test]
async fn exhausted_strategies_fail_without_leaking_the_password() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/repos/org/repo"))
        .respond_with(
            ResponseTemplate::new(401).set_body_json(json!({"message": "Bad credentials"})),
        )
        .mount(&server)
        .await;

    let provider = provider_for(&server);
    let config = config("https://github.com/org/repo", "alice", "sup3rs3cr3t");

    let err = provider.check_connection(&config).await.unwrap_err();
    let message = err.to_string();
    assert!(message.contains("check connection failed"));
    assert!(!message.contains("sup3rs3cr3t"));
}

// =============================================================================
// Release Enrichment
// =============================================================================

#[tokio::test]
async fn release_details_resolve_name_and_body() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/repos/org/repo"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/repos/org/repo/releases/tags/v1.2.3"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "tag_name": "v1.2.3",
            "name": "Release 1.2.3",
            "body": "Bug fixes.",
        })))
        .mount(&server)
        .await;

    let provider = provider_for(&server);
    let config = config("https://github.com/org/repo", "", "");

    let release = provider
        .release_details(&config, "v1.2.3")
        .await
        .unwrap()
        .expect("release present");
    assert_eq!(release.tag, "v1.2.3");
    assert_eq!(release.name.as_deref(), Some("Release 1.2.3"));
    assert_eq!(release.body.as_deref(), Some("Bug fixes."));
}

#[tokio::test]
async fn missing_release_details_are_none_not_an_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/repos/org/repo"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/repos/org/repo/releases/tags/v9.9.9"))
        .respond_with(
            ResponseTemplate::new(404).set_body_json(json!({"message": "Not Found"})),
        )
        .mount(&server)
        .await;

    let provider = provider_for(&server);
    let config = config("https://github.com/org/repo", "", "");

    let release = provider.release_details(&config, "v9.9.9").await.unwrap();
    assert!(release.is_none());
}
