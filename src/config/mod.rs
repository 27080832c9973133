//! config
//!
//! Per-request repository configuration.
//!
//! A [`RepositoryConfig`] is built from the key/value `scm-configuration`
//! map submitted with each operation and owned by that request scope. It is
//! never persisted by this crate; whatever persistence exists is the
//! orchestrator's job.

pub mod schema;

use std::collections::BTreeMap;

use self::schema::{
    FIELD_DEFAULT_BRANCH, FIELD_PASSWORD, FIELD_POPULATE_RELEASE_DETAILS, FIELD_SHALLOW_CLONE,
    FIELD_URL, FIELD_USERNAME,
};

/// Branch polled when the configuration does not name one.
pub const DEFAULT_BRANCH: &str = "master";

/// Repository configuration for one inbound operation.
///
/// Invariants: `url` is non-empty and syntactically valid per the selected
/// provider's rule (enforced by validation, not by construction, so that
/// invalid submissions surface as field-level messages instead of errors);
/// username and password count as credentials only when both are non-blank.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RepositoryConfig {
    /// Remote repository URL
    pub url: String,
    /// Username for authenticated operations, may be blank
    pub username: String,
    /// Password or access token, may be blank
    pub password: String,
    /// Branch to poll; `None` falls back to [`DEFAULT_BRANCH`]
    pub default_branch: Option<String>,
    /// Whether polling always tracks the default branch
    pub track_default_branch: bool,
    /// Whether clones/fetches should be depth-limited
    pub shallow_clone: bool,
    /// Whether release name/body enrichment runs for this request
    pub populate_release_details: bool,
}

impl RepositoryConfig {
    /// Build a configuration from the submitted key/value map.
    ///
    /// Unknown keys are ignored. Boolean fields arrive as the strings
    /// `"true"`/`"false"`; anything else reads as `false` (matching the
    /// host's form semantics), except `populateReleaseDetails`, which
    /// defaults to enabled when absent.
    pub fn from_key_values(map: &BTreeMap<String, String>) -> Self {
        let get = |key: &str| map.get(key).cloned().unwrap_or_default();

        let default_branch = map
            .get(FIELD_DEFAULT_BRANCH)
            .map(|s| s.trim())
            .filter(|s| !s.is_empty())
            .map(String::from);

        let populate_release_details = map
            .get(FIELD_POPULATE_RELEASE_DETAILS)
            .map(|v| v != "false")
            .unwrap_or(true);

        Self {
            url: get(FIELD_URL),
            username: get(FIELD_USERNAME),
            password: get(FIELD_PASSWORD),
            default_branch,
            track_default_branch: true,
            shallow_clone: map
                .get(FIELD_SHALLOW_CLONE)
                .map(|v| v == "true")
                .unwrap_or(false),
            populate_release_details,
        }
    }

    /// Whether both username and password are present and non-blank.
    ///
    /// Credentials travel together or not at all: a lone username or a lone
    /// password is treated as anonymous.
    pub fn has_credentials(&self) -> bool {
        !self.username.trim().is_empty() && !self.password.trim().is_empty()
    }

    /// The branch polling operates against.
    pub fn effective_branch(&self) -> &str {
        self.default_branch.as_deref().unwrap_or(DEFAULT_BRANCH)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn map(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn from_key_values_reads_all_fields() {
        let config = RepositoryConfig::from_key_values(&map(&[
            ("url", "https://github.com/org/repo"),
            ("username", "alice"),
            ("password", "s3cr3t"),
            ("defaultBranch", "develop"),
            ("shallowClone", "true"),
        ]));

        assert_eq!(config.url, "https://github.com/org/repo");
        assert_eq!(config.username, "alice");
        assert_eq!(config.password, "s3cr3t");
        assert_eq!(config.default_branch.as_deref(), Some("develop"));
        assert!(config.track_default_branch);
        assert!(config.shallow_clone);
        assert!(config.populate_release_details);
    }

    #[test]
    fn missing_fields_default_to_empty() {
        let config = RepositoryConfig::from_key_values(&map(&[("url", "https://example.com/r")]));
        assert_eq!(config.username, "");
        assert_eq!(config.password, "");
        assert_eq!(config.default_branch, None);
        assert!(!config.shallow_clone);
    }

    #[test]
    fn blank_default_branch_is_none() {
        let config = RepositoryConfig::from_key_values(&map(&[("defaultBranch", "   ")]));
        assert_eq!(config.default_branch, None);
        assert_eq!(config.effective_branch(), DEFAULT_BRANCH);
    }

    #[test]
    fn credentials_travel_together() {
        let mut config = RepositoryConfig::default();
        assert!(!config.has_credentials());

        config.username = "alice".into();
        assert!(!config.has_credentials());

        config.password = "s3cr3t".into();
        assert!(config.has_credentials());

        config.username = "  ".into();
        assert!(!config.has_credentials());
    }

    #[test]
    fn release_details_enabled_by_default_and_disableable() {
        let on = RepositoryConfig::from_key_values(&map(&[]));
        assert!(on.populate_release_details);

        let off =
            RepositoryConfig::from_key_values(&map(&[("populateReleaseDetails", "false")]));
        assert!(!off.populate_release_details);
    }
}
