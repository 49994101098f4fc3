//! Event handling and ticket resolution for ticket-bot.
//!
//! This module provides the per-message pipeline:
//! - Dispatching chat events
//! - Extracting `!<number>` references from message text
//! - Fetching the referenced issues concurrently
//! - Formatting and sending one reply per issue

pub mod chat_event;
pub mod fetch;
pub mod format;
pub mod references;
pub mod ticket_message;
