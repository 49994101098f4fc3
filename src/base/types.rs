use std::fmt;

use serde::{Deserialize, Serialize};

pub type Err = anyhow::Error;
pub type Res<T> = Result<T, Err>;
pub type Void = Res<()>;

/// A ticket number referenced in chat text as `!<number>`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TicketReference(pub u64);

impl fmt::Display for TicketReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "!{}", self.0)
    }
}

/// A read-only copy of a tracker issue, held for one resolution cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Issue {
    pub number: u64,
    pub title: String,
    pub url: String,
    pub assignees: Vec<String>,
}

/// The fixed `owner/name` repository coordinate tickets resolve against.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepoRef {
    pub owner: String,
    pub name: String,
}

impl fmt::Display for RepoRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.owner, self.name)
    }
}

/// A fetch that did not produce an issue.
#[derive(Debug)]
pub struct FetchFailure {
    pub reference: TicketReference,
    pub error: Err,
}

/// How the coordinator reconciles fetch failures with successes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReplyPolicy {
    /// Wait for every outcome; any failure suppresses all replies for the message.
    #[default]
    AllOrNothing,
    /// Reply to each success as it arrives and log each failure on its own.
    PerReference,
}

/// The outcome of one resolution cycle.
#[derive(Debug)]
pub enum Resolution {
    /// Replies were attempted; `undelivered` counts the sends that failed.
    Replied { messages: Vec<String>, undelivered: usize },
    /// At least one fetch failed and nothing was sent.
    Reported { failures: Vec<FetchFailure> },
}

/// A chat message the bot may react to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IncomingMessage {
    pub channel_id: String,
    pub text: String,
}

/// The closed set of events the chat transport hands to the event loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatEvent {
    Connected,
    Message(IncomingMessage),
    Error(String),
    InvalidAuth(String),
    Ignored(String),
}
