//! git::interface
//!
//! Git interface implementation using git2.
//!
//! This module provides the **single doorway** to all Git operations in
//! Tidemark. Polling and checkout both drive the same small operation set:
//! clone-or-fetch into an exclusively-owned workspace, hard-reset to a
//! resolved revision, read revisions (with their change lists), and update
//! submodules.
//!
//! # Architecture
//!
//! The `Git` struct is bound to one workspace directory and one
//! [`RepositoryConfig`] for its lifetime, mirroring the exclusive-ownership
//! rule: the orchestrator never runs two operations against the same
//! workspace concurrently, and this interface does not try to lock against
//! that.
//!
//! # Error Handling
//!
//! Git errors are categorized into typed variants:
//! - [`GitError::Workspace`]: workspace cannot be created or opened
//! - [`GitError::FetchFailed`]: clone/fetch round trip failed
//! - [`GitError::RevisionNotFound`]: a revision/ref does not resolve
//! - [`GitError::ResetFailed`]: hard reset could not converge
//! - [`GitError::SubmoduleFailed`]: submodule init/update failed
//!
//! # Example
//!
//! ```ignore
//! use tidemark::git::Git;
//! use std::path::Path;
//!
//! let git = Git::open_or_init(&config, Path::new("/tmp/flyweight"))?;
//! git.clone_or_fetch(Some("refs/tags/*:refs/tags/*"))?;
//! git.reset_hard("v1.2.3")?;
//! let revision = git.latest_revision()?;
//! git.submodule_update()?;
//! ```

use std::path::{Path, PathBuf};

use chrono::{DateTime, TimeZone, Utc};
use thiserror::Error;

use crate::config::RepositoryConfig;
use crate::core::types::{FileAction, ModifiedFile, Revision};

/// The remote every workspace tracks.
const REMOTE_NAME: &str = "origin";

/// Default branch-tracking refspec fetched on every round trip.
const HEADS_REFSPEC: &str = "+refs/heads/*:refs/remotes/origin/*";

/// Errors from Git operations.
///
/// The categorization lets higher layers distinguish "cursor no longer
/// reachable" (degradable) from genuinely failed fetches and resets.
#[derive(Debug, Error)]
pub enum GitError {
    /// Workspace directory cannot be created or opened as a repository.
    #[error("workspace error at {path}: {message}")]
    Workspace {
        /// The workspace path
        path: PathBuf,
        /// Description of the failure
        message: String,
    },

    /// Clone or fetch against the remote failed.
    #[error("fetch failed: {message}")]
    FetchFailed {
        /// Description of the failure
        message: String,
    },

    /// A revision, tag, or ref does not resolve in the local workspace.
    #[error("revision not found: {revision}")]
    RevisionNotFound {
        /// The revision that was requested
        revision: String,
    },

    /// Hard reset to a resolved revision failed.
    #[error("reset to {revision} failed: {message}")]
    ResetFailed {
        /// The target revision
        revision: String,
        /// Description of the failure
        message: String,
    },

    /// Submodule init/update failed.
    #[error("submodule '{name}' update failed: {message}")]
    SubmoduleFailed {
        /// The submodule path
        name: String,
        /// Description of the failure
        message: String,
    },

    /// Internal git2 error.
    #[error("git error: {message}")]
    Internal {
        /// The error message
        message: String,
    },
}

impl GitError {
    /// Create a GitError from a git2::Error with richer context.
    fn from_git2(err: git2::Error, context: &str) -> Self {
        match err.code() {
            git2::ErrorCode::NotFound | git2::ErrorCode::InvalidSpec => {
                GitError::RevisionNotFound {
                    revision: context.to_string(),
                }
            }
            _ => GitError::Internal {
                message: format!("{}: {}", context, err.message()),
            },
        }
    }
}

/// The Git interface.
///
/// Bound to one workspace directory and one repository configuration for
/// its lifetime. Construction never touches the network; the first
/// [`clone_or_fetch`](Git::clone_or_fetch) does.
pub struct Git {
    /// The underlying git2 repository
    repo: git2::Repository,
    /// Configuration the workspace operates under (credentials, shallow flag)
    config: RepositoryConfig,
}

impl std::fmt::Debug for Git {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Git")
            .field("path", &self.repo.path())
            .field("url", &self.config.url)
            .finish()
    }
}

impl Git {
    // =========================================================================
    // Workspace Setup
    // =========================================================================

    /// Open the workspace at `path`, initializing an empty repository with
    /// `origin` pointing at the configured URL when none exists yet.
    ///
    /// The remote URL is re-pointed when the workspace was previously used
    /// for a different repository, so a recycled flyweight folder converges
    /// instead of fetching from a stale remote.
    pub fn open_or_init(config: &RepositoryConfig, path: &Path) -> Result<Self, GitError> {
        std::fs::create_dir_all(path).map_err(|e| GitError::Workspace {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;

        let repo = match git2::Repository::open(path) {
            Ok(repo) => repo,
            Err(_) => git2::Repository::init(path).map_err(|e| GitError::Workspace {
                path: path.to_path_buf(),
                message: e.message().to_string(),
            })?,
        };

        let git = Self {
            repo,
            config: config.clone(),
        };
        git.ensure_remote()?;
        Ok(git)
    }

    /// Make sure `origin` exists and points at the configured URL.
    fn ensure_remote(&self) -> Result<(), GitError> {
        match self.repo.find_remote(REMOTE_NAME) {
            Ok(remote) => {
                if remote.url() != Some(self.config.url.as_str()) {
                    self.repo
                        .remote_set_url(REMOTE_NAME, &self.config.url)
                        .map_err(|e| GitError::from_git2(e, REMOTE_NAME))?;
                }
            }
            Err(_) => {
                self.repo
                    .remote(REMOTE_NAME, &self.config.url)
                    .map_err(|e| GitError::from_git2(e, REMOTE_NAME))?;
            }
        }
        Ok(())
    }

    /// Path of the working directory.
    pub fn work_dir(&self) -> Option<&Path> {
        self.repo.workdir()
    }

    // =========================================================================
    // Network Round Trips
    // =========================================================================

    /// Fetch the remote into the workspace, cloning implicitly on first use.
    ///
    /// Always fetches the branch-tracking refspec; `extra_refspec` adds the
    /// provider-specific pattern (e.g. `refs/tags/*:refs/tags/*`) and also
    /// turns on tag auto-following. Honors the shallow-clone flag via a
    /// depth-limited fetch.
    pub fn clone_or_fetch(&self, extra_refspec: Option<&str>) -> Result<(), GitError> {
        let mut remote = self
            .repo
            .find_remote(REMOTE_NAME)
            .map_err(|e| GitError::from_git2(e, REMOTE_NAME))?;

        let mut refspecs: Vec<&str> = vec![HEADS_REFSPEC];
        if let Some(extra) = extra_refspec {
            refspecs.push(extra);
        }

        let mut opts = git2::FetchOptions::new();
        opts.remote_callbacks(self.remote_callbacks());
        if extra_refspec.is_some() {
            opts.download_tags(git2::AutotagOption::All);
        }
        if self.config.shallow_clone {
            opts.depth(1);
        }

        remote
            .fetch(&refspecs, Some(&mut opts), None)
            .map_err(|e| GitError::FetchFailed {
                message: e.message().to_string(),
            })
    }

    /// Credential callbacks for fetches; plaintext user/pass only when the
    /// configuration carries both.
    fn remote_callbacks(&self) -> git2::RemoteCallbacks<'_> {
        let mut callbacks = git2::RemoteCallbacks::new();
        if self.config.has_credentials() {
            let username = self.config.username.clone();
            let password = self.config.password.clone();
            callbacks.credentials(move |_url, _username_from_url, _allowed| {
                git2::Cred::userpass_plaintext(&username, &password)
            });
        }
        callbacks
    }

    // =========================================================================
    // Resolution and Reset
    // =========================================================================

    /// Resolve a revision spec (SHA, tag name, or ref) to a commit id.
    pub fn resolve(&self, spec: &str) -> Result<String, GitError> {
        let object = self
            .repo
            .revparse_single(spec)
            .map_err(|e| GitError::from_git2(e, spec))?;
        let commit = object
            .peel(git2::ObjectType::Commit)
            .map_err(|e| GitError::from_git2(e, spec))?;
        Ok(commit.id().to_string())
    }

    /// Resolve the fetched tip of a remote branch.
    pub fn remote_branch_tip(&self, branch: &str) -> Result<String, GitError> {
        self.resolve(&format!("refs/remotes/{}/{}", REMOTE_NAME, branch))
    }

    /// Hard-reset the working tree to the given revision.
    ///
    /// The spec may be a SHA, a tag name, or any ref; annotated tags are
    /// peeled to their commit. Resetting twice to the same revision
    /// converges to the same tree with no further side effects.
    pub fn reset_hard(&self, revision: &str) -> Result<(), GitError> {
        let object = self
            .repo
            .revparse_single(revision)
            .map_err(|e| GitError::from_git2(e, revision))?;
        let commit = object
            .peel(git2::ObjectType::Commit)
            .map_err(|e| GitError::from_git2(e, revision))?;

        // Detach first so resets work in a freshly-fetched workspace whose
        // HEAD branch was never born
        self.repo
            .set_head_detached(commit.id())
            .map_err(|e| GitError::ResetFailed {
                revision: revision.to_string(),
                message: e.message().to_string(),
            })?;

        let mut checkout = git2::build::CheckoutBuilder::new();
        checkout.force().remove_untracked(true);

        self.repo
            .reset(&commit, git2::ResetType::Hard, Some(&mut checkout))
            .map_err(|e| GitError::ResetFailed {
                revision: revision.to_string(),
                message: e.message().to_string(),
            })
    }

    // =========================================================================
    // Revision Reading
    // =========================================================================

    /// Read the revision the working tree currently sits at (HEAD).
    pub fn latest_revision(&self) -> Result<Revision, GitError> {
        let head = self
            .repo
            .head()
            .map_err(|e| GitError::from_git2(e, "HEAD"))?;
        let commit = head
            .peel_to_commit()
            .map_err(|e| GitError::from_git2(e, "HEAD"))?;
        self.revision_from_commit(&commit)
    }

    /// Read full details for one revision without moving the working tree.
    pub fn details_for_revision(&self, revision: &str) -> Result<Revision, GitError> {
        let object = self
            .repo
            .revparse_single(revision)
            .map_err(|e| GitError::from_git2(e, revision))?;
        let commit = object
            .peel_to_commit()
            .map_err(|e| GitError::from_git2(e, revision))?;
        self.revision_from_commit(&commit)
    }

    /// Walk all revisions reachable from HEAD but not from `since`,
    /// newest first.
    ///
    /// # Errors
    ///
    /// [`GitError::RevisionNotFound`] when `since` no longer resolves
    /// (rewritten history, deleted tag); callers degrade rather than fail.
    pub fn revisions_since(&self, since: &str) -> Result<Vec<Revision>, GitError> {
        let since_oid = self
            .repo
            .revparse_single(since)
            .and_then(|obj| obj.peel(git2::ObjectType::Commit))
            .map_err(|e| GitError::from_git2(e, since))?
            .id();

        let head = self
            .repo
            .head()
            .and_then(|h| h.peel_to_commit())
            .map_err(|e| GitError::from_git2(e, "HEAD"))?;

        let mut walk = self
            .repo
            .revwalk()
            .map_err(|e| GitError::from_git2(e, "revwalk"))?;
        walk.set_sorting(git2::Sort::TOPOLOGICAL | git2::Sort::TIME)
            .map_err(|e| GitError::from_git2(e, "revwalk"))?;
        walk.push(head.id())
            .map_err(|e| GitError::from_git2(e, "revwalk"))?;
        walk.hide(since_oid)
            .map_err(|e| GitError::from_git2(e, since))?;

        let mut revisions = Vec::new();
        for oid in walk {
            let oid = oid.map_err(|e| GitError::from_git2(e, "revwalk"))?;
            let commit = self
                .repo
                .find_commit(oid)
                .map_err(|e| GitError::from_git2(e, &oid.to_string()))?;
            revisions.push(self.revision_from_commit(&commit)?);
        }
        Ok(revisions)
    }

    /// Build a [`Revision`] from a commit, diffing against its first parent
    /// to produce the change list.
    fn revision_from_commit(&self, commit: &git2::Commit<'_>) -> Result<Revision, GitError> {
        let author = commit.author();
        let user = match author.email() {
            Some(email) => format!("{} <{}>", author.name().unwrap_or_default(), email),
            None => author.name().unwrap_or_default().to_string(),
        };

        let timestamp = timestamp_utc(author.when());

        Ok(Revision {
            revision: commit.id().to_string(),
            user,
            timestamp,
            comment: commit.message().unwrap_or_default().trim_end().to_string(),
            modified_files: self.modified_files(commit)?,
            merge_commit: commit.parent_count() > 1,
        })
    }

    /// Diff a commit against its first parent (or the empty tree for a root
    /// commit), with rename detection, mapped to [`ModifiedFile`] entries.
    fn modified_files(&self, commit: &git2::Commit<'_>) -> Result<Vec<ModifiedFile>, GitError> {
        let tree = commit
            .tree()
            .map_err(|e| GitError::from_git2(e, &commit.id().to_string()))?;
        let parent_tree = match commit.parent(0) {
            Ok(parent) => Some(
                parent
                    .tree()
                    .map_err(|e| GitError::from_git2(e, &parent.id().to_string()))?,
            ),
            Err(_) => None,
        };

        let mut diff = self
            .repo
            .diff_tree_to_tree(parent_tree.as_ref(), Some(&tree), None)
            .map_err(|e| GitError::from_git2(e, &commit.id().to_string()))?;

        let mut find_opts = git2::DiffFindOptions::new();
        find_opts.renames(true);
        diff.find_similar(Some(&mut find_opts))
            .map_err(|e| GitError::from_git2(e, &commit.id().to_string()))?;

        let mut files = Vec::new();
        for delta in diff.deltas() {
            let action = match delta.status() {
                git2::Delta::Added | git2::Delta::Copied => FileAction::Added,
                git2::Delta::Deleted => FileAction::Deleted,
                git2::Delta::Renamed => FileAction::Renamed,
                _ => FileAction::Modified,
            };
            let path = match delta.status() {
                git2::Delta::Deleted => delta.old_file().path(),
                _ => delta.new_file().path(),
            };
            if let Some(path) = path {
                files.push(ModifiedFile::new(path.to_string_lossy(), action));
            }
        }
        Ok(files)
    }

    // =========================================================================
    // Submodules
    // =========================================================================

    /// Initialize and update every submodule recorded at the current
    /// revision. A repository without submodules is a no-op.
    pub fn submodule_update(&self) -> Result<(), GitError> {
        let submodules = self.repo.submodules().map_err(|e| GitError::Internal {
            message: e.message().to_string(),
        })?;

        for mut submodule in submodules {
            let name = submodule
                .path()
                .to_string_lossy()
                .into_owned();

            let mut fetch = git2::FetchOptions::new();
            fetch.remote_callbacks(self.remote_callbacks());
            let mut opts = git2::SubmoduleUpdateOptions::new();
            opts.fetch(fetch);

            submodule
                .update(true, Some(&mut opts))
                .map_err(|e| GitError::SubmoduleFailed {
                    name: name.clone(),
                    message: e.message().to_string(),
                })?;
        }
        Ok(())
    }
}

/// One anonymous-or-authenticated round trip against a remote URL without
/// a local workspace, equivalent to `git ls-remote`.
///
/// Used by connection checks; nothing is fetched.
pub fn ls_remote(config: &RepositoryConfig) -> Result<(), GitError> {
    let mut remote =
        git2::Remote::create_detached(config.url.as_str()).map_err(|e| GitError::FetchFailed {
            message: e.message().to_string(),
        })?;

    let mut callbacks = git2::RemoteCallbacks::new();
    if config.has_credentials() {
        let username = config.username.clone();
        let password = config.password.clone();
        callbacks.credentials(move |_url, _username_from_url, _allowed| {
            git2::Cred::userpass_plaintext(&username, &password)
        });
    }

    remote
        .connect_auth(git2::Direction::Fetch, Some(callbacks), None)
        .map_err(|e| GitError::FetchFailed {
            message: e.message().to_string(),
        })?;
    remote.disconnect().map_err(|e| GitError::FetchFailed {
        message: e.message().to_string(),
    })?;
    Ok(())
}

/// Convert a git2 commit time to a UTC timestamp.
fn timestamp_utc(time: git2::Time) -> DateTime<Utc> {
    Utc.timestamp_opt(time.seconds(), 0)
        .single()
        .unwrap_or_default()
}
