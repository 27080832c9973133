//! resolver
//!
//! Revision resolution for polling operations.
//!
//! # Design
//!
//! Both poll shapes run the same head resolution: fetch (or clone) into the
//! flyweight workspace, ask the provider for the latest release/tag (or
//! branch tip for plain git), hard-reset the workspace to that point, read
//! the resulting revision, and update submodules. `since` then additionally
//! walks the range between the prior cursor and the new head.
//!
//! Each poll moves through `Fetching → ResolvingHead →
//! (DiffingSinceCursor | none) → Done | Failed`; there is no internal
//! parallelism, and the workspace is exclusively owned for the duration of
//! the call.
//!
//! # Ordering Contract
//!
//! Index 0 of a non-empty result is always the new head: the revision the
//! fresh cursor points at and the one that triggers the build. Older
//! revisions follow newest-to-oldest, and release metadata attaches only to
//! the head entry.
//!
//! # Degradation
//!
//! A cursor whose recorded revision is no longer reachable (rewritten
//! history, deleted tag) must not fail the poll: the resolver logs the
//! degradation and returns just the new head.

use std::path::Path;

use thiserror::Error;
use tracing::{debug, info, warn};

use crate::config::RepositoryConfig;
use crate::core::types::{
    FileAction, ModifiedFile, ReleaseMetadata, Revision, RevisionCursor,
};
use crate::filter::BranchFilter;
use crate::git::{Git, GitError};
use crate::provider::{ProviderError, RemoteProvider};

/// Placeholder path synthesized into empty merge-commit change lists.
const EMPTY_MERGE_PLACEHOLDER: &str = "/dev/null";

/// Errors from a failed poll.
#[derive(Debug, Error)]
pub enum ResolveError {
    /// The provider could not resolve the head or authenticate.
    #[error(transparent)]
    Provider(#[from] ProviderError),

    /// A git operation against the workspace failed.
    #[error(transparent)]
    Git(#[from] GitError),
}

/// The outcome of one successful poll.
#[derive(Debug)]
pub struct ResolvedPoll {
    /// Resolved revisions, new head first; empty when the tracked branch is
    /// blocked by policy or nothing changed since the cursor
    pub revisions: Vec<Revision>,
    /// The tag the head was released under, for tag-polling providers
    pub tag: Option<String>,
    /// Best-effort release enrichment for the head entry
    pub release: Option<ReleaseMetadata>,
    /// The fresh cursor to hand back to the orchestrator
    pub cursor: RevisionCursor,
}

/// Computes "the current head to build" and "revisions since a prior
/// cursor" for one provider.
pub struct RevisionResolver<'a> {
    provider: &'a dyn RemoteProvider,
}

impl<'a> RevisionResolver<'a> {
    /// Create a resolver over a provider.
    pub fn new(provider: &'a dyn RemoteProvider) -> Self {
        Self { provider }
    }

    /// Resolve the latest revision to build.
    ///
    /// Plain polling has no "since" semantics on the first call: the result
    /// holds exactly one revision (the head) and a fresh cursor pointing at
    /// it.
    pub async fn latest(
        &self,
        config: &RepositoryConfig,
        filter: &BranchFilter,
        workspace: &Path,
    ) -> Result<ResolvedPoll, ResolveError> {
        if self.branch_blocked(config, filter) {
            return Ok(ResolvedPoll {
                revisions: Vec::new(),
                tag: None,
                release: None,
                cursor: RevisionCursor::default(),
            });
        }

        let git = Git::open_or_init(config, workspace)?;
        let (target, head) = self.resolve_head(config, &git).await?;
        let tag = self.tag_for(&target);

        let release = self.enrich(config, tag.as_deref()).await;
        let cursor = RevisionCursor::at(&head.revision, tag.as_deref());

        info!(
            revision = %head.revision,
            target = %target,
            "resolved latest revision"
        );

        Ok(ResolvedPoll {
            revisions: vec![head],
            tag,
            release,
            cursor,
        })
    }

    /// Resolve all revisions since a prior cursor.
    ///
    /// The head is resolved exactly as in [`latest`](Self::latest); the
    /// walk then covers everything reachable from the new head but not from
    /// the cursor's recorded revision. An empty, stale, or unreachable
    /// cursor degrades to a head-only result.
    pub async fn since(
        &self,
        config: &RepositoryConfig,
        filter: &BranchFilter,
        cursor: &RevisionCursor,
        workspace: &Path,
    ) -> Result<ResolvedPoll, ResolveError> {
        if self.branch_blocked(config, filter) {
            return Ok(ResolvedPoll {
                revisions: Vec::new(),
                tag: None,
                release: None,
                cursor: cursor.clone(),
            });
        }

        let git = Git::open_or_init(config, workspace)?;
        let (target, head) = self.resolve_head(config, &git).await?;
        let tag = self.tag_for(&target);

        let revisions = match cursor.revision() {
            None => {
                warn!("cursor carries no revision; returning head only");
                vec![head.clone()]
            }
            Some(last) if last == head.revision => {
                debug!(revision = %last, "no new revisions since cursor");
                Vec::new()
            }
            Some(last) => match git.revisions_since(last) {
                Ok(range) => range
                    .into_iter()
                    .map(patch_empty_merge_commit)
                    .collect(),
                Err(err) => {
                    warn!(
                        cursor = %last,
                        error = %err,
                        "cursor unreachable; degrading to head-only result"
                    );
                    vec![head.clone()]
                }
            },
        };

        let release = self.enrich(config, tag.as_deref()).await;
        let cursor = RevisionCursor::at(&head.revision, tag.as_deref());

        info!(
            revision = %head.revision,
            new_revisions = revisions.len(),
            "resolved revisions since cursor"
        );

        Ok(ResolvedPoll {
            revisions,
            tag,
            release,
            cursor,
        })
    }

    /// Shared head resolution: fetch, resolve the build target through the
    /// provider, hard-reset, read the head revision, update submodules.
    async fn resolve_head(
        &self,
        config: &RepositoryConfig,
        git: &Git,
    ) -> Result<(String, Revision), ResolveError> {
        debug!(url = %config.url, "fetching remote");
        git.clone_or_fetch(self.provider.ref_spec())?;

        let target = self.provider.latest_release(config, git).await?;
        git.reset_hard(&target)?;
        let head = git.latest_revision()?;
        git.submodule_update()?;

        Ok((target, patch_empty_merge_commit(head)))
    }

    /// Whether branch policy blocks the tracked branch.
    fn branch_blocked(&self, config: &RepositoryConfig, filter: &BranchFilter) -> bool {
        if !self.provider.supports_branch_filter() {
            return false;
        }
        let branch = config.effective_branch();
        if filter.is_allowed(Some(branch)) {
            return false;
        }
        warn!(branch = %branch, "tracked branch blocked by branch policy");
        true
    }

    /// A release target is a tag only for tag-polling providers; for plain
    /// git the target is a branch-tip SHA and carries no tag semantics.
    fn tag_for(&self, target: &str) -> Option<String> {
        self.provider
            .ref_spec()
            .is_some()
            .then(|| target.to_string())
    }

    /// Fetch release enrichment, best-effort.
    ///
    /// Errors are logged and swallowed; a request with enrichment disabled
    /// skips the call entirely.
    async fn enrich(
        &self,
        config: &RepositoryConfig,
        tag: Option<&str>,
    ) -> Option<ReleaseMetadata> {
        let tag = tag?;
        if !config.populate_release_details {
            debug!("release detail enrichment disabled for this request");
            return None;
        }
        match self.provider.release_details(config, tag).await {
            Ok(release) => release,
            Err(err) => {
                warn!(tag = %tag, error = %err, "release enrichment failed; continuing without it");
                None
            }
        }
    }
}

/// A merge commit with an empty change list gains one placeholder entry so
/// downstream change-list consumers never see an empty diff for a
/// build-triggering commit.
fn patch_empty_merge_commit(mut revision: Revision) -> Revision {
    if revision.merge_commit && revision.modified_files.is_empty() {
        revision
            .modified_files
            .push(ModifiedFile::new(EMPTY_MERGE_PLACEHOLDER, FileAction::Deleted));
    }
    revision
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn revision(merge: bool, files: Vec<ModifiedFile>) -> Revision {
        Revision {
            revision: "abc123".into(),
            user: "Test <test@example.com>".into(),
            timestamp: Utc::now(),
            comment: "message".into(),
            modified_files: files,
            merge_commit: merge,
        }
    }

    #[test]
    fn empty_merge_commit_gains_placeholder() {
        let patched = patch_empty_merge_commit(revision(true, vec![]));
        assert_eq!(patched.modified_files.len(), 1);
        assert_eq!(patched.modified_files[0].file_name, "/dev/null");
        assert_eq!(patched.modified_files[0].action, FileAction::Deleted);
    }

    #[test]
    fn merge_commit_with_files_is_untouched() {
        let files = vec![ModifiedFile::new("src/lib.rs", FileAction::Modified)];
        let patched = patch_empty_merge_commit(revision(true, files.clone()));
        assert_eq!(patched.modified_files, files);
    }

    #[test]
    fn regular_empty_commit_is_untouched() {
        let patched = patch_empty_merge_commit(revision(false, vec![]));
        assert!(patched.modified_files.is_empty());
    }
}
