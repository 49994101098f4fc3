//! Load configuration via `config` crate with env-override support.

use std::{ops::Deref, sync::Arc};

use serde::Deserialize;

use super::types::{ReplyPolicy, RepoRef, Res, Void};

/// Default GitHub REST API base URL.
fn default_github_api_base() -> String {
    "https://api.github.com".to_string()
}

/// Default timeout for a single GitHub request, in milliseconds.
fn default_github_request_timeout_ms() -> u64 {
    10_000
}

fn default_ignore_bot_messages() -> bool {
    true
}

/// Configuration for the ticket-bot application.
#[derive(Debug, Clone)]
pub struct Config {
    pub inner: Arc<ConfigInner>,
}

impl Deref for Config {
    type Target = ConfigInner;

    fn deref(&self) -> &Self::Target {
        &self.inner
    }
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct ConfigInner {
    /// Slack app token used for socket mode (`TICKET_BOT_SLACK_APP_TOKEN`).
    pub slack_app_token: String,
    /// Slack bot token used to post replies (`TICKET_BOT_SLACK_BOT_TOKEN`).
    pub slack_bot_token: String,
    /// GitHub token (`TICKET_BOT_GITHUB_TOKEN`).
    pub github_token: String,
    /// Owner of the repository tickets resolve against (`TICKET_BOT_GITHUB_OWNER`).
    pub github_owner: String,
    /// Name of the repository tickets resolve against (`TICKET_BOT_GITHUB_REPO`).
    pub github_repo: String,
    /// GitHub API base URL (`TICKET_BOT_GITHUB_API_BASE`).
    #[serde(default = "default_github_api_base")]
    pub github_api_base: String,
    /// Per-request timeout for GitHub calls (`TICKET_BOT_GITHUB_REQUEST_TIMEOUT_MS`).
    #[serde(default = "default_github_request_timeout_ms")]
    pub github_request_timeout_ms: u64,
    /// How fetch failures interact with replies (`TICKET_BOT_REPLY_POLICY`).
    ///
    /// `all_or_nothing` suppresses every reply for a message when any of its
    /// tickets fails to resolve; `per_reference` replies to each ticket that did.
    #[serde(default)]
    pub reply_policy: ReplyPolicy,
    /// Skip messages posted by bots, including this one (`TICKET_BOT_IGNORE_BOT_MESSAGES`).
    #[serde(default = "default_ignore_bot_messages")]
    pub ignore_bot_messages: bool,
}

impl ConfigInner {
    /// The repository coordinate every ticket reference is fetched from.
    pub fn repo(&self) -> RepoRef {
        RepoRef {
            owner: self.github_owner.clone(),
            name: self.github_repo.clone(),
        }
    }

    /// Reject configurations the bot cannot run with.
    pub fn validate(&self) -> Void {
        let required = [
            ("slack_app_token", &self.slack_app_token),
            ("slack_bot_token", &self.slack_bot_token),
            ("github_token", &self.github_token),
            ("github_owner", &self.github_owner),
            ("github_repo", &self.github_repo),
        ];

        for (key, value) in required {
            if value.trim().is_empty() {
                return Err(anyhow::anyhow!("Configuration value `{key}` must not be empty."));
            }
        }

        if self.github_request_timeout_ms == 0 {
            return Err(anyhow::anyhow!("GitHub request timeout must be greater than 0."));
        }

        Ok(())
    }
}

impl Config {
    pub fn load(explicit_path: Option<&std::path::Path>) -> Res<Self> {
        let mut cfg = config::Config::builder().add_source(config::Environment::default().prefix("TICKET_BOT"));

        if let Some(p) = explicit_path {
            cfg = cfg.add_source(config::File::from(p.to_path_buf()));
        } else if std::path::Path::new(".hidden/config.toml").exists() {
            cfg = cfg.add_source(config::File::with_name(".hidden/config.toml"));
        }

        let result = Config {
            inner: Arc::new(cfg.build()?.try_deserialize()?),
        };

        result.validate()?;

        Ok(result)
    }
}

impl From<ConfigInner> for Config {
    fn from(inner: ConfigInner) -> Self {
        Self { inner: Arc::new(inner) }
    }
}
