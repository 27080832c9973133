//! Tidemark binary entry point.
//!
//! Reads one plugin-call request from stdin (or `--input`), dispatches it
//! against the selected provider, and prints the response envelope as JSON
//! on stdout. The process exits 0 whenever a response was produced; the
//! envelope's `response-code` carries the operation outcome.

use std::io::Read;

use anyhow::{anyhow, Context, Result};
use serde_json::json;
use tracing_subscriber::EnvFilter;

use tidemark::cli::Cli;
use tidemark::dispatcher::Dispatcher;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse_args();

    let default_filter = if cli.debug { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)),
        )
        .with_writer(std::io::stderr)
        .init();

    let dispatcher = Dispatcher::for_provider(&cli.provider).map_err(|e| anyhow!("{e}"))?;

    let body = match &cli.input {
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("failed to read request body from {}", path.display()))?,
        None => {
            let mut body = String::new();
            std::io::stdin()
                .read_to_string(&mut body)
                .context("failed to read request body from stdin")?;
            body
        }
    };

    let response = dispatcher.handle(&cli.operation, &body).await;

    let envelope = json!({
        "response-code": response.code,
        "body": response.body,
    });
    println!("{}", serde_json::to_string(&envelope)?);

    Ok(())
}
