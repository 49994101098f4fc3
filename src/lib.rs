//! Library root for `ticket-bot`.
//!
//! Ticket-bot watches Slack channels for ticket references written as `!<number>`,
//! looks each one up in a fixed GitHub repository, and replies in the channel with
//! a short summary per issue:
//!
//! ```text
//! #42 - Login fails on Safari
//! https://github.com/acme/qa/issues/42
//! Assignees: alice, bob
//! ```
//!
//! Chat and tracker access sit behind traits so the resolution pipeline can be
//! exercised without either service.

pub mod base;
pub mod interaction;
pub mod runtime;
pub mod service;

use base::{config::Config, types::Void};
use rustls::crypto;
use tracing::info;

/// Public async entry for the binary crate.
///
/// Sets up necessary services and starts the ticket-bot runtime:
/// - Initializes the crypto provider
/// - Creates the runtime context with tracker and chat clients
/// - Starts the chat listener
pub async fn start(config: Config) -> Void {
    info!("Starting ticket-bot ...");

    // Start the crypto provider.
    crypto::ring::default_provider()
        .install_default()
        .map_err(|_| anyhow::anyhow!("Failed to install the rustls crypto provider."))?;

    // Initialize the runtime.
    let runtime = runtime::Runtime::new(config).await?;

    // Start the runtime.
    runtime.start().await?;

    Ok(())
}
