//! dispatcher::response
//!
//! Response envelopes and revision-view shaping.
//!
//! Everything the host sees is built here: the `{code, body}` envelope, the
//! `RevisionView` objects, and the `data` bag carrying release metadata on
//! the head entry of a poll result.

use std::collections::BTreeMap;

use serde_json::{json, Value};

use crate::core::types::Revision;
use crate::resolver::ResolvedPoll;

/// Response code: operation succeeded.
pub const SUCCESS_RESPONSE_CODE: u16 = 200;
/// Response code: unknown operation or no view available.
pub const NOT_FOUND_RESPONSE_CODE: u16 = 404;
/// Response code: internal error, body carries the masked message.
pub const INTERNAL_ERROR_RESPONSE_CODE: u16 = 500;

/// Wire timestamp pattern: `yyyy-MM-dd'T'HH:mm:ss.SSS'Z'`, UTC.
const DATE_PATTERN: &str = "%Y-%m-%dT%H:%M:%S%.3fZ";

/// Data-bag key carrying the release tag on the head entry.
pub const DATA_RELEASE_TAG: &str = "RELEASE_TAG";
/// Data-bag key carrying the release name when enrichment succeeded.
pub const DATA_RELEASE_NAME: &str = "RELEASE_NAME";
/// Data-bag key carrying the release body when enrichment succeeded.
pub const DATA_RELEASE_BODY: &str = "RELEASE_BODY";

/// One response crossing the plugin-call boundary.
#[derive(Debug, Clone, PartialEq)]
pub struct PluginResponse {
    /// Response code (200/404/500)
    pub code: u16,
    /// JSON body, absent for bare 404s
    pub body: Option<Value>,
}

impl PluginResponse {
    /// A 200 with the given body.
    pub fn success(body: Value) -> Self {
        Self {
            code: SUCCESS_RESPONSE_CODE,
            body: Some(body),
        }
    }

    /// A bare 404 (unknown operation).
    pub fn not_found() -> Self {
        Self {
            code: NOT_FOUND_RESPONSE_CODE,
            body: None,
        }
    }

    /// A 500 whose body is the (already masked) message text.
    pub fn internal_error(message: impl Into<String>) -> Self {
        Self {
            code: INTERNAL_ERROR_RESPONSE_CODE,
            body: Some(Value::String(message.into())),
        }
    }
}

/// Shape one revision as the host's `RevisionView` object.
pub fn revision_view(revision: &Revision, data: &BTreeMap<String, String>) -> Value {
    let modified_files: Vec<Value> = revision
        .modified_files
        .iter()
        .map(|file| {
            json!({
                "fileName": file.file_name,
                "action": file.action.as_str(),
            })
        })
        .collect();

    json!({
        "revision": revision.revision,
        "user": revision.user,
        "timestamp": revision.timestamp.format(DATE_PATTERN).to_string(),
        "revisionComment": revision.comment,
        "modifiedFiles": modified_files,
        "data": data,
    })
}

/// Shape a whole poll result as an ordered list of revision views.
///
/// The head entry (index 0) carries the release tag and any enrichment in
/// its `data` bag; older entries carry an empty bag.
pub fn poll_views(poll: &ResolvedPoll) -> Vec<Value> {
    let empty = BTreeMap::new();
    let head_data = head_data(poll);

    poll.revisions
        .iter()
        .enumerate()
        .map(|(index, revision)| {
            let data = if index == 0 { &head_data } else { &empty };
            revision_view(revision, data)
        })
        .collect()
}

/// The head entry's data bag: release tag plus enrichment when present.
fn head_data(poll: &ResolvedPoll) -> BTreeMap<String, String> {
    let mut data = BTreeMap::new();
    if let Some(tag) = &poll.tag {
        data.insert(DATA_RELEASE_TAG.to_string(), tag.clone());
    }
    if let Some(release) = &poll.release {
        if let Some(name) = &release.name {
            data.insert(DATA_RELEASE_NAME.to_string(), name.clone());
        }
        if let Some(body) = &release.body {
            data.insert(DATA_RELEASE_BODY.to_string(), body.clone());
        }
    }
    data
}
