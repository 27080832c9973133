//! dispatcher
//!
//! Plugin-facing façade: validates and normalizes incoming configuration,
//! routes operations to the resolver, checkout executor, and branch filter,
//! and shapes responses.
//!
//! # Operations
//!
//! | Operation | Handler |
//! |---|---|
//! | `scm-configuration` | configuration-form field catalogue |
//! | `scm-view` | display name + embedded HTML template |
//! | `validate-scm-configuration` | field-level validation messages |
//! | `check-scm-connection` | status/messages envelope |
//! | `latest-revision` | head revision + fresh cursor |
//! | `latest-revisions-since` | revisions since cursor + fresh cursor |
//! | `checkout` | pinned materialization into a destination |
//!
//! Anything else is a 404. Every error message leaving this module passes
//! through [`mask_credentials`] first.

pub mod response;

use std::collections::BTreeMap;
use std::path::Path;

use serde_json::{json, Value};
use tracing::{info, warn};

use crate::checkout::CheckoutExecutor;
use crate::config::schema::{self, FIELD_BRANCH_BLACKLIST, FIELD_BRANCH_WHITELIST};
use crate::config::RepositoryConfig;
use crate::core::types::RevisionCursor;
use crate::filter::BranchFilter;
use crate::mask::mask_credentials;
use crate::provider::{create_provider, ProviderError, RemoteProvider};
use crate::resolver::RevisionResolver;
use self::response::PluginResponse;

/// Operation: fetch the configuration-form field catalogue.
pub const REQUEST_SCM_CONFIGURATION: &str = "scm-configuration";
/// Operation: fetch the configuration view (display name + template).
pub const REQUEST_SCM_VIEW: &str = "scm-view";
/// Operation: validate a submitted configuration.
pub const REQUEST_VALIDATE_SCM_CONFIGURATION: &str = "validate-scm-configuration";
/// Operation: probe the connection with a submitted configuration.
pub const REQUEST_CHECK_SCM_CONNECTION: &str = "check-scm-connection";
/// Operation: resolve the latest revision to build.
pub const REQUEST_LATEST_REVISION: &str = "latest-revision";
/// Operation: resolve revisions since a prior cursor.
pub const REQUEST_LATEST_REVISIONS_SINCE: &str = "latest-revisions-since";
/// Operation: materialize a pinned revision.
pub const REQUEST_CHECKOUT: &str = "checkout";

/// The plugin-facing façade bound to one provider.
pub struct Dispatcher {
    provider: Box<dyn RemoteProvider>,
}

impl Dispatcher {
    /// Create a dispatcher over an explicit provider instance.
    pub fn new(provider: Box<dyn RemoteProvider>) -> Self {
        Self { provider }
    }

    /// Create a dispatcher for a registry provider name.
    ///
    /// # Errors
    ///
    /// [`ProviderError::UnknownProvider`] when the name is not registered.
    pub fn for_provider(name: &str) -> Result<Self, ProviderError> {
        Ok(Self::new(create_provider(name)?))
    }

    /// Route one inbound operation to its handler.
    ///
    /// `body` is the raw JSON request body; operations without a request
    /// body ignore it.
    pub async fn handle(&self, operation: &str, body: &str) -> PluginResponse {
        match operation {
            REQUEST_SCM_CONFIGURATION => self.scm_configuration(),
            REQUEST_SCM_VIEW => self.scm_view(),
            REQUEST_VALIDATE_SCM_CONFIGURATION => self.validate_configuration(body),
            REQUEST_CHECK_SCM_CONNECTION => self.check_connection(body).await,
            REQUEST_LATEST_REVISION => self.latest_revision(body).await,
            REQUEST_LATEST_REVISIONS_SINCE => self.latest_revisions_since(body).await,
            REQUEST_CHECKOUT => self.checkout(body),
            unknown => {
                warn!(operation = %unknown, "unknown operation");
                PluginResponse::not_found()
            }
        }
    }

    // =========================================================================
    // Configuration Operations
    // =========================================================================

    fn scm_configuration(&self) -> PluginResponse {
        PluginResponse::success(schema::catalogue(self.provider.supports_branch_filter()))
    }

    fn scm_view(&self) -> PluginResponse {
        PluginResponse::success(json!({
            "displayValue": self.provider.display_name(),
            "template": self.provider.template(),
        }))
    }

    fn validate_configuration(&self, body: &str) -> PluginResponse {
        let request = match parse_body(body) {
            Ok(request) => request,
            Err(response) => return response,
        };
        let config = self.build_config(&request);

        let mut errors: Vec<Value> = Vec::new();
        if config.url.trim().is_empty() {
            errors.push(json!({"key": "url", "message": "URL is a required field"}));
        } else if !self.provider.validate_url(&config.url) {
            errors.push(json!({"key": "url", "message": "Invalid URL"}));
        }

        PluginResponse::success(Value::Array(errors))
    }

    async fn check_connection(&self, body: &str) -> PluginResponse {
        let request = match parse_body(body) {
            Ok(request) => request,
            Err(response) => return response,
        };
        let config = self.build_config(&request);

        let (status, message) = if config.url.trim().is_empty() {
            ("failure", "URL is empty".to_string())
        } else if !self.provider.validate_url(&config.url) {
            ("failure", "Invalid URL".to_string())
        } else {
            match self.provider.check_connection(&config).await {
                Ok(()) => ("success", "Could connect to URL successfully".to_string()),
                Err(err) => ("failure", mask_credentials(&err.to_string(), &config)),
            }
        };

        PluginResponse::success(json!({
            "status": status,
            "messages": [message],
        }))
    }

    // =========================================================================
    // Polling Operations
    // =========================================================================

    async fn latest_revision(&self, body: &str) -> PluginResponse {
        let request = match parse_body(body) {
            Ok(request) => request,
            Err(response) => return response,
        };
        let config = self.build_config(&request);
        let filter = self.branch_filter(&request);

        let Some(flyweight) = request.body.get("flyweight-folder").and_then(Value::as_str)
        else {
            return PluginResponse::internal_error("flyweight-folder is missing");
        };
        info!(flyweight = %flyweight, "resolving latest revision");

        let resolver = RevisionResolver::new(self.provider.as_ref());
        match resolver
            .latest(&config, &filter, Path::new(flyweight))
            .await
        {
            Ok(poll) => {
                let views = response::poll_views(&poll);
                match views.into_iter().next() {
                    Some(view) => PluginResponse::success(json!({
                        "revision": view,
                        "scm-data": poll.cursor.as_map(),
                    })),
                    None => PluginResponse::internal_error(mask_credentials(
                        &format!(
                            "branch '{}' is excluded by the branch filter",
                            config.effective_branch()
                        ),
                        &config,
                    )),
                }
            }
            Err(err) => {
                warn!(error = %err, "latest revision failed");
                PluginResponse::internal_error(mask_credentials(&err.to_string(), &config))
            }
        }
    }

    async fn latest_revisions_since(&self, body: &str) -> PluginResponse {
        let request = match parse_body(body) {
            Ok(request) => request,
            Err(response) => return response,
        };
        let config = self.build_config(&request);
        let filter = self.branch_filter(&request);
        let cursor = request_cursor(&request.body);

        let Some(flyweight) = request.body.get("flyweight-folder").and_then(Value::as_str)
        else {
            return PluginResponse::internal_error("flyweight-folder is missing");
        };
        info!(url = %config.url, "resolving revisions since cursor");

        let resolver = RevisionResolver::new(self.provider.as_ref());
        match resolver
            .since(&config, &filter, &cursor, Path::new(flyweight))
            .await
        {
            Ok(poll) => PluginResponse::success(json!({
                "revisions": response::poll_views(&poll),
                "scm-data": poll.cursor.as_map(),
            })),
            Err(err) => {
                warn!(error = %err, "revisions since cursor failed");
                PluginResponse::internal_error(mask_credentials(&err.to_string(), &config))
            }
        }
    }

    // =========================================================================
    // Checkout
    // =========================================================================

    fn checkout(&self, body: &str) -> PluginResponse {
        let request = match parse_body(body) {
            Ok(request) => request,
            Err(response) => return response,
        };
        let config = self.build_config(&request);

        let Some(destination) = request
            .body
            .get("destination-folder")
            .and_then(Value::as_str)
        else {
            return PluginResponse::internal_error("destination-folder is missing");
        };
        let Some(revision) = request
            .body
            .get("revision")
            .and_then(|r| r.get("revision"))
            .and_then(Value::as_str)
        else {
            return PluginResponse::internal_error("revision is missing");
        };

        let executor = CheckoutExecutor::new(self.provider.ref_spec());
        match executor.checkout(&config, revision, Path::new(destination)) {
            Ok(()) => PluginResponse::success(json!({
                "status": "success",
                "messages": [format!("Checked out to revision {revision}")],
            })),
            Err(err) => {
                warn!(error = %err, "checkout failed");
                PluginResponse::internal_error(mask_credentials(&err.to_string(), &config))
            }
        }
    }

    // =========================================================================
    // Request Normalization
    // =========================================================================

    /// Build the request-scoped configuration, filling blank credentials
    /// from the provider's fallback source.
    fn build_config(&self, request: &Request) -> RepositoryConfig {
        let mut config = RepositoryConfig::from_key_values(&request.configuration);
        self.provider.apply_default_credentials(&mut config);
        config
    }

    /// Build the branch filter from the submitted configuration.
    fn branch_filter(&self, request: &Request) -> BranchFilter {
        let get = |key: &str| {
            request
                .configuration
                .get(key)
                .map(String::as_str)
                .unwrap_or("")
        };
        BranchFilter::new(get(FIELD_BRANCH_BLACKLIST), get(FIELD_BRANCH_WHITELIST))
    }
}

/// A parsed request body plus its flattened configuration map.
struct Request {
    body: Value,
    configuration: BTreeMap<String, String>,
}

/// Parse the raw request body, flattening the `scm-configuration` map of
/// `{field: {value}}` objects into plain key/value pairs.
fn parse_body(body: &str) -> Result<Request, PluginResponse> {
    let body: Value = match serde_json::from_str(body) {
        Ok(value) => value,
        Err(err) => {
            return Err(PluginResponse::internal_error(format!(
                "malformed request body: {err}"
            )))
        }
    };

    let configuration = body
        .get("scm-configuration")
        .and_then(Value::as_object)
        .map(|fields| {
            fields
                .iter()
                .filter_map(|(key, properties)| {
                    properties
                        .get("value")
                        .and_then(Value::as_str)
                        .map(|value| (key.clone(), value.to_string()))
                })
                .collect()
        })
        .unwrap_or_default();

    Ok(Request {
        body,
        configuration,
    })
}

/// Extract the prior cursor from the request's `scm-data` map.
fn request_cursor(body: &Value) -> RevisionCursor {
    body.get("scm-data")
        .cloned()
        .and_then(|value| serde_json::from_value::<BTreeMap<String, String>>(value).ok())
        .map(RevisionCursor::from_map)
        .unwrap_or_default()
}
