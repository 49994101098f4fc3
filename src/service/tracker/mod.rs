//! Issue tracker integration for ticket-bot.
//!
//! The bot only ever reads single issues, so the trait surface is one call.
//! The default implementation talks to the GitHub REST API.

pub mod github;

use std::{ops::Deref, sync::Arc};

use async_trait::async_trait;

use crate::base::types::{Issue, Res, TicketReference};

// Traits.

/// Generic issue tracker trait that clients must implement.
#[async_trait]
pub trait GenericTrackerClient: Send + Sync + 'static {
    /// Fetch one issue by number from `owner/repo`.
    ///
    /// Retry policy, if any, belongs to the implementation.
    async fn get_issue(&self, owner: &str, repo: &str, reference: TicketReference) -> Res<Issue>;
}

// Structs.

/// Tracker client for the application.
///
/// This is trivially cloneable and can be passed around without the need for `Arc` or `Mutex`.
#[derive(Clone)]
pub struct TrackerClient {
    inner: Arc<dyn GenericTrackerClient>,
}

impl Deref for TrackerClient {
    type Target = dyn GenericTrackerClient;

    fn deref(&self) -> &Self::Target {
        &*self.inner
    }
}

impl TrackerClient {
    pub fn new(inner: Arc<dyn GenericTrackerClient>) -> Self {
        Self { inner }
    }
}
