use std::ops::ControlFlow;

use tracing::{debug, error, info, instrument};

use crate::{
    base::{config::Config, types::ChatEvent},
    interaction::ticket_message::handle_ticket_message,
    service::{chat::ChatClient, tracker::TrackerClient},
};

/// Dispatch one chat event.
///
/// Message events are handed to a freshly spawned resolution and this returns
/// immediately. `Break` means the transport should stop listening.
#[instrument(skip_all)]
pub fn handle_chat_event(event: ChatEvent, config: &Config, tracker: &TrackerClient, chat: &ChatClient) -> ControlFlow<()> {
    match event {
        ChatEvent::Connected => {
            info!("Connected as {}; listening for `!<number>` references to {}.", chat.bot_user_id(), config.repo());
        }
        ChatEvent::Message(message) => {
            handle_ticket_message(message, config.clone(), tracker.clone(), chat.clone());
        }
        ChatEvent::Error(reason) => {
            error!("Chat transport error: {}", reason);
        }
        ChatEvent::InvalidAuth(reason) => {
            error!("Invalid chat credentials: {}", reason);
            return ControlFlow::Break(());
        }
        ChatEvent::Ignored(reason) => {
            debug!("Ignoring event: {}", reason);
        }
    }

    ControlFlow::Continue(())
}
