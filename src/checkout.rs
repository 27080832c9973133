//! checkout
//!
//! Materializes a specific revision into a destination working directory.
//!
//! Checkout is always pinned: the revision id comes from a prior poll and
//! is never re-resolved against the remote. Running the same checkout twice
//! converges to the same working-tree state with no additional side
//! effects.

use std::path::Path;

use thiserror::Error;
use tracing::info;

use crate::config::RepositoryConfig;
use crate::git::{Git, GitError};

/// Errors from materializing a revision.
#[derive(Debug, Error)]
pub enum CheckoutError {
    /// The destination could not be prepared or moved to the revision.
    #[error(transparent)]
    Git(#[from] GitError),
}

/// Materializes pinned revisions, fetching with the owning provider's
/// ref-spec.
#[derive(Debug)]
pub struct CheckoutExecutor {
    ref_spec: Option<&'static str>,
}

impl CheckoutExecutor {
    /// Create an executor fetching with the given extra ref-spec.
    pub fn new(ref_spec: Option<&'static str>) -> Self {
        Self { ref_spec }
    }

    /// Fetch into `destination` and hard-reset it to exactly `revision`,
    /// then bring submodules up to date.
    pub fn checkout(
        &self,
        config: &RepositoryConfig,
        revision: &str,
        destination: &Path,
    ) -> Result<(), CheckoutError> {
        info!(revision = %revision, destination = %destination.display(), "checking out");

        let git = Git::open_or_init(config, destination)?;
        git.clone_or_fetch(self.ref_spec)?;
        git.reset_hard(revision)?;
        git.submodule_update()?;
        Ok(())
    }
}
