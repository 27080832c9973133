//! config::schema
//!
//! Configuration-form field catalogue.
//!
//! The host renders a configuration form from the field definitions returned
//! by the `scm-configuration` operation. Each definition carries the
//! display metadata the host expects: display name, default value,
//! required / secure / part-of-identity flags, and display order.
//!
//! Filter-capable providers (plain git) append the branch whitelist and
//! blacklist fields to the base catalogue.

use serde_json::{json, Map, Value};

/// Field key: remote repository URL (required, part of material identity).
pub const FIELD_URL: &str = "url";
/// Field key: username (part of material identity).
pub const FIELD_USERNAME: &str = "username";
/// Field key: password or token (secure).
pub const FIELD_PASSWORD: &str = "password";
/// Field key: branch to poll.
pub const FIELD_DEFAULT_BRANCH: &str = "defaultBranch";
/// Field key: depth-limited clone toggle (boolean string).
pub const FIELD_SHALLOW_CLONE: &str = "shallowClone";
/// Field key: whitelisted branch patterns (filter-capable providers only).
pub const FIELD_BRANCH_WHITELIST: &str = "branchwhitelist";
/// Field key: blacklisted branch patterns (filter-capable providers only).
pub const FIELD_BRANCH_BLACKLIST: &str = "branchblacklist";
/// Field key: release name/body enrichment toggle (boolean string).
pub const FIELD_POPULATE_RELEASE_DETAILS: &str = "populateReleaseDetails";

/// One entry of the configuration-form catalogue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldDefinition {
    /// Wire key of the field
    pub key: &'static str,
    /// Label shown by the host's form renderer
    pub display_name: &'static str,
    /// Pre-filled value
    pub default_value: &'static str,
    /// Whether the host requires a value before saving
    pub required: bool,
    /// Whether the host must store and echo the value as a secret
    pub secure: bool,
    /// Whether the field participates in material identity
    pub part_of_identity: bool,
    /// Position in the rendered form
    pub display_order: u8,
}

impl FieldDefinition {
    /// Serialize to the property map the host expects for one field.
    fn to_wire(&self) -> Value {
        json!({
            "display-name": self.display_name,
            "default-value": self.default_value,
            "required": self.required,
            "secure": self.secure,
            "part-of-identity": self.part_of_identity,
            "display-order": self.display_order.to_string(),
        })
    }
}

/// Fields every provider's form carries.
pub fn base_fields() -> Vec<FieldDefinition> {
    vec![
        FieldDefinition {
            key: FIELD_URL,
            display_name: "URL",
            default_value: "",
            required: true,
            secure: false,
            part_of_identity: true,
            display_order: 0,
        },
        FieldDefinition {
            key: FIELD_USERNAME,
            display_name: "Username",
            default_value: "",
            required: false,
            secure: false,
            part_of_identity: true,
            display_order: 1,
        },
        FieldDefinition {
            key: FIELD_PASSWORD,
            display_name: "Password",
            default_value: "",
            required: false,
            secure: true,
            part_of_identity: false,
            display_order: 2,
        },
        FieldDefinition {
            key: FIELD_DEFAULT_BRANCH,
            display_name: "Default branch",
            default_value: "",
            required: false,
            secure: false,
            part_of_identity: false,
            display_order: 3,
        },
        FieldDefinition {
            key: FIELD_SHALLOW_CLONE,
            display_name: "Shallow clone",
            default_value: "false",
            required: false,
            secure: false,
            part_of_identity: false,
            display_order: 4,
        },
    ]
}

/// Branch-policy fields appended for filter-capable providers.
pub fn branch_filter_fields() -> Vec<FieldDefinition> {
    vec![
        FieldDefinition {
            key: FIELD_BRANCH_WHITELIST,
            display_name: "Whitelisted branches",
            default_value: "",
            required: false,
            secure: false,
            part_of_identity: true,
            display_order: 5,
        },
        FieldDefinition {
            key: FIELD_BRANCH_BLACKLIST,
            display_name: "Blacklisted branches",
            default_value: "",
            required: false,
            secure: false,
            part_of_identity: true,
            display_order: 6,
        },
    ]
}

/// The complete catalogue for a provider, as the wire object keyed by field.
pub fn catalogue(with_branch_filter: bool) -> Value {
    let mut fields = base_fields();
    if with_branch_filter {
        fields.extend(branch_filter_fields());
    }

    let mut map = Map::new();
    for field in &fields {
        map.insert(field.key.to_string(), field.to_wire());
    }
    Value::Object(map)
}
