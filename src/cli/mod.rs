//! cli
//!
//! Command-line argument definitions using clap derive.
//!
//! The binary speaks the plugin-call protocol over stdio: one invocation
//! handles one operation, reading the JSON request body from stdin (or a
//! file) and printing the `{response-code, body}` envelope to stdout.
//!
//! # Example
//!
//! ```text
//! echo '{"scm-configuration": {...}, "flyweight-folder": "/tmp/fw"}' \
//!     | tidemark --provider github latest-revision
//! ```

use clap::Parser;
use std::path::PathBuf;

/// Tidemark - source-control polling and checkout engine
#[derive(Parser, Debug)]
#[command(name = "tidemark")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Remote backend to dispatch against (git, github, github-enterprise, stash)
    #[arg(long, default_value = "git")]
    pub provider: String,

    /// Read the request body from this file instead of stdin
    #[arg(long)]
    pub input: Option<PathBuf>,

    /// Enable debug logging
    #[arg(long)]
    pub debug: bool,

    /// Operation to handle (e.g. latest-revision, check-scm-connection)
    pub operation: String,
}

impl Cli {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Parser::parse()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_to_plain_git_provider() {
        let cli = Cli::parse_from(["tidemark", "latest-revision"]);
        assert_eq!(cli.provider, "git");
        assert_eq!(cli.operation, "latest-revision");
        assert!(cli.input.is_none());
        assert!(!cli.debug);
    }

    #[test]
    fn provider_and_input_flags_parse() {
        let cli = Cli::parse_from([
            "tidemark",
            "--provider",
            "github",
            "--input",
            "/tmp/request.json",
            "checkout",
        ]);
        assert_eq!(cli.provider, "github");
        assert_eq!(cli.input.as_deref(), Some(std::path::Path::new("/tmp/request.json")));
        assert_eq!(cli.operation, "checkout");
    }
}
