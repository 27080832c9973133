//! filter
//!
//! Branch whitelist/blacklist policy.
//!
//! # Semantics
//!
//! Patterns are comma-separated globs. `*` matches any run of characters,
//! including `/`. Matching is case-sensitive and anchored to the whole
//! branch name; `feature` does not match `my-feature-branch`.
//!
//! The two lists deliberately have asymmetric empty-set semantics: an empty
//! whitelist matches everything (an unset whitelist must not silently block
//! every branch) while an empty blacklist matches nothing.

/// How a matcher treats an empty pattern set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum EmptyMode {
    /// Empty set matches nothing (blacklist behavior)
    FailEmpty,
    /// Empty set matches everything (whitelist behavior)
    PassEmpty,
}

/// A set of glob patterns with configurable empty-set behavior.
#[derive(Debug, Clone)]
struct BranchMatcher {
    patterns: Vec<String>,
    mode: EmptyMode,
}

impl BranchMatcher {
    /// Parse a comma-separated pattern list. Blank entries are dropped.
    fn new(option: &str, mode: EmptyMode) -> Self {
        let patterns = option
            .split(',')
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .map(String::from)
            .collect();
        Self { patterns, mode }
    }

    fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }

    fn matches(&self, branch: &str) -> bool {
        if self.patterns.is_empty() {
            return self.mode == EmptyMode::PassEmpty;
        }
        self.patterns.iter().any(|p| glob_match(p, branch))
    }
}

/// Branch policy built from blacklist and whitelist pattern options.
///
/// # Example
///
/// ```
/// use tidemark::filter::BranchFilter;
///
/// let filter = BranchFilter::new("experimental/*", "feature/*, main");
/// assert!(filter.is_allowed(Some("feature/login")));
/// assert!(filter.is_allowed(Some("main")));
/// assert!(!filter.is_allowed(Some("experimental/login")));
/// assert!(!filter.is_allowed(Some("hotfix/crash")));
/// assert!(!filter.is_allowed(None));
/// ```
#[derive(Debug, Clone)]
pub struct BranchFilter {
    blacklist: BranchMatcher,
    whitelist: BranchMatcher,
}

impl Default for BranchFilter {
    /// A filter with both lists empty: every branch is allowed.
    fn default() -> Self {
        Self::new("", "")
    }
}

impl BranchFilter {
    /// Build a filter from comma-separated blacklist and whitelist options.
    pub fn new(blacklist_option: &str, whitelist_option: &str) -> Self {
        Self {
            blacklist: BranchMatcher::new(blacklist_option, EmptyMode::FailEmpty),
            whitelist: BranchMatcher::new(whitelist_option, EmptyMode::PassEmpty),
        }
    }

    /// Whether the branch passes the policy.
    ///
    /// An absent branch name is never allowed. With both lists empty every
    /// branch passes; otherwise a branch passes iff the whitelist admits it
    /// (or is empty) and the blacklist does not name it.
    pub fn is_allowed(&self, branch: Option<&str>) -> bool {
        let Some(branch) = branch else {
            return false;
        };
        if self.whitelist.is_empty() && self.blacklist.is_empty() {
            return true;
        }
        self.whitelist.matches(branch) && !self.blacklist.matches(branch)
    }
}

/// Anchored glob match where `*` matches any run of characters.
///
/// Each literal segment is matched left-to-right at its leftmost possible
/// position, which is optimal for `*`-only globs.
fn glob_match(pattern: &str, candidate: &str) -> bool {
    if !pattern.contains('*') {
        return pattern == candidate;
    }

    let segments: Vec<&str> = pattern.split('*').collect();
    let (first, rest_segments) = segments.split_first().expect("split yields at least one");
    let (last, middle) = rest_segments.split_last().expect("pattern contains '*'");

    let Some(mut rest) = candidate.strip_prefix(first) else {
        return false;
    };

    for segment in middle {
        if segment.is_empty() {
            continue;
        }
        match rest.find(segment) {
            Some(at) => rest = &rest[at + segment.len()..],
            None => return false,
        }
    }

    rest.ends_with(last)
}
