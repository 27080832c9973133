//! git
//!
//! Single interface for all Git operations.
//!
//! All git interactions flow through [`Git`], which wraps `git2` and
//! normalizes failures into typed [`GitError`] categories. No other module
//! imports `git2` directly.

mod interface;

pub use interface::{ls_remote, Git, GitError};
