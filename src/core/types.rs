//! core::types
//!
//! Strong types for core domain concepts.
//!
//! # Types
//!
//! - [`Revision`] - A resolved commit with its change list
//! - [`ModifiedFile`] / [`FileAction`] - One entry of a change list
//! - [`RevisionCursor`] - Opaque "what was last built" state, round-tripped
//!   verbatim by the orchestrator between polls
//! - [`ReleaseMetadata`] - Optional release enrichment attached to a revision
//!
//! # Ownership
//!
//! `Revision` and `ModifiedFile` are produced by the [`git`](crate::git)
//! doorway and handed by value to the response shaper. `RevisionCursor`
//! crosses the trust boundary with the orchestrator and must never contain
//! secrets.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The kind of change a commit applied to one file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileAction {
    /// File was added
    Added,
    /// File content was modified
    Modified,
    /// File was deleted
    Deleted,
    /// File was renamed
    Renamed,
}

impl FileAction {
    /// Get the action name as it appears on the wire.
    pub fn as_str(&self) -> &'static str {
        match self {
            FileAction::Added => "added",
            FileAction::Modified => "modified",
            FileAction::Deleted => "deleted",
            FileAction::Renamed => "renamed",
        }
    }
}

impl std::fmt::Display for FileAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One file touched by a revision.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModifiedFile {
    /// Repository-relative path
    pub file_name: String,
    /// What happened to the file
    pub action: FileAction,
}

impl ModifiedFile {
    /// Convenience constructor.
    pub fn new(file_name: impl Into<String>, action: FileAction) -> Self {
        Self {
            file_name: file_name.into(),
            action,
        }
    }
}

/// A resolved commit, immutable once produced by the git doorway.
///
/// The resolver may post-process a revision before it reaches the response
/// shaper (e.g. synthesizing a placeholder [`ModifiedFile`] for an empty
/// merge commit so downstream change-list consumers never see an empty diff
/// for a build-triggering commit).
#[derive(Debug, Clone)]
pub struct Revision {
    /// Opaque commit identifier (full SHA)
    pub revision: String,
    /// Author, formatted `Name <email>`
    pub user: String,
    /// Author timestamp
    pub timestamp: DateTime<Utc>,
    /// Full commit message
    pub comment: String,
    /// Files touched, in diff order
    pub modified_files: Vec<ModifiedFile>,
    /// Whether the commit has more than one parent
    pub merge_commit: bool,
}

/// Opaque poll state ("scm-data") handed back to the orchestrator after
/// every successful poll and replayed on the next one.
///
/// Tidemark records the last built revision and, when polling a hosted
/// provider, the tag it was released under. The map is ordered so the wire
/// representation is deterministic. Never put secrets in here.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RevisionCursor(BTreeMap<String, String>);

/// Cursor key: the revision id the last build was triggered for.
pub const CURSOR_REVISION: &str = "LAST_KNOWN_REVISION";

/// Cursor key: the tag the last build was triggered for, if any.
pub const CURSOR_TAG: &str = "LAST_KNOWN_TAG";

impl RevisionCursor {
    /// Build a fresh cursor pointing at a revision and optional tag.
    pub fn at(revision: impl Into<String>, tag: Option<&str>) -> Self {
        let mut map = BTreeMap::new();
        map.insert(CURSOR_REVISION.to_string(), revision.into());
        if let Some(tag) = tag {
            map.insert(CURSOR_TAG.to_string(), tag.to_string());
        }
        Self(map)
    }

    /// Wrap a raw key/value map received from the orchestrator.
    pub fn from_map(map: BTreeMap<String, String>) -> Self {
        Self(map)
    }

    /// The recorded revision id, if the cursor carries one.
    pub fn revision(&self) -> Option<&str> {
        self.0.get(CURSOR_REVISION).map(String::as_str)
    }

    /// The recorded tag, if the cursor carries one.
    pub fn tag(&self) -> Option<&str> {
        self.0.get(CURSOR_TAG).map(String::as_str)
    }

    /// Whether the cursor carries no state at all (first poll).
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// View the raw map for response serialization.
    pub fn as_map(&self) -> &BTreeMap<String, String> {
        &self.0
    }
}

/// Release enrichment resolved from a hosted provider.
///
/// Returned as an immutable record and merged into the head revision's
/// `data` map by the response shaper; the provider never mutates
/// caller-owned state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReleaseMetadata {
    /// The tag the release was published under
    pub tag: String,
    /// Human-readable release name
    pub name: Option<String>,
    /// Release notes body
    pub body: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_action_wire_names() {
        assert_eq!(FileAction::Added.as_str(), "added");
        assert_eq!(FileAction::Modified.as_str(), "modified");
        assert_eq!(FileAction::Deleted.as_str(), "deleted");
        assert_eq!(FileAction::Renamed.as_str(), "renamed");
    }

    #[test]
    fn file_action_display_matches_as_str() {
        assert_eq!(format!("{}", FileAction::Deleted), "deleted");
    }

    #[test]
    fn cursor_at_records_revision_and_tag() {
        let cursor = RevisionCursor::at("abc123", Some("v1.2.3"));
        assert_eq!(cursor.revision(), Some("abc123"));
        assert_eq!(cursor.tag(), Some("v1.2.3"));
        assert!(!cursor.is_empty());
    }

    #[test]
    fn cursor_without_tag() {
        let cursor = RevisionCursor::at("abc123", None);
        assert_eq!(cursor.revision(), Some("abc123"));
        assert_eq!(cursor.tag(), None);
    }

    #[test]
    fn empty_cursor_has_no_state() {
        let cursor = RevisionCursor::default();
        assert!(cursor.is_empty());
        assert_eq!(cursor.revision(), None);
        assert_eq!(cursor.tag(), None);
    }

    #[test]
    fn cursor_round_trips_through_json() {
        let cursor = RevisionCursor::at("abc123", Some("v1.0.0"));
        let json = serde_json::to_string(&cursor).unwrap();
        let back: RevisionCursor = serde_json::from_str(&json).unwrap();
        assert_eq!(back, cursor);
    }

    #[test]
    fn cursor_serializes_as_flat_map() {
        let cursor = RevisionCursor::at("abc123", None);
        let json = serde_json::to_value(&cursor).unwrap();
        assert_eq!(json["LAST_KNOWN_REVISION"], "abc123");
    }
}
