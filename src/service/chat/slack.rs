//! Slack integration for ticket-bot.
//!
//! This module provides the socket mode listener and reply delivery for Slack:
//! - Translating Slack callbacks into the closed `ChatEvent` set
//! - Posting replies to channels
//!
//! Only plain channel messages are turned into `ChatEvent::Message`; everything
//! else is reported as ignored.

use crate::{
    base::{
        config::Config,
        types::{ChatEvent, IncomingMessage, Res, Void},
    },
    interaction::chat_event::handle_chat_event,
    service::tracker::TrackerClient,
};
use async_trait::async_trait;
use hyper_rustls::HttpsConnector;
use hyper_util::client::legacy::connect::HttpConnector;
use slack_morphism::{errors::SlackClientError, prelude::*};
use tracing::{info, instrument, warn};

use std::sync::Arc;

use super::{ChatClient, GenericChatClient};

// Type aliases.

type FullClient = slack_morphism::SlackClient<SlackClientHyperConnector<HttpsConnector<HttpConnector>>>;

/// Slack API error codes that mean the token itself was rejected.
const AUTH_ERROR_CODES: &[&str] = &["invalid_auth", "not_authed", "account_inactive", "token_revoked", "token_expired", "not_allowed_token_type"];

// Extra methods on `ChatClient` applied by the slack implementation.

impl ChatClient {
    /// Creates a new Slack chat client.
    pub async fn slack(config: &Config, tracker: TrackerClient) -> Res<Self> {
        let client = SlackChatClient::new(config, tracker).await?;
        Ok(Self { inner: Arc::new(client) })
    }
}

impl From<SlackChatClient> for ChatClient {
    fn from(client: SlackChatClient) -> Self {
        Self { inner: Arc::new(client) }
    }
}

// Structs.

/// User state for the slack socket client.
struct SlackUserState {
    config: Config,
    tracker: TrackerClient,
    chat: ChatClient,
}

/// Slack client implementation.
#[derive(Clone)]
struct SlackChatClient {
    app_token: SlackApiToken,
    bot_token: SlackApiToken,
    bot_user_id: String,
    client: Arc<FullClient>,
    config: Config,
    tracker: TrackerClient,
}

impl SlackChatClient {
    /// Create a new Slack chat client.
    #[instrument(name = "SlackChatClient::new", skip_all)]
    pub async fn new(config: &Config, tracker: TrackerClient) -> Res<Self> {
        // Initialize tokens.

        let app_token = SlackApiToken::new(SlackApiTokenValue(config.slack_app_token.clone()));
        let bot_token = SlackApiToken::new(SlackApiTokenValue(config.slack_bot_token.clone()));

        // Initialize the Slack client.

        let https_connector = HttpsConnector::<HttpConnector>::builder().with_native_roots()?.https_only().enable_all_versions().build();
        let connector = SlackClientHyperConnector::with_connector(https_connector);
        let client = Arc::new(slack_morphism::SlackClient::new(connector));

        // Get the bot's user ID, which doubles as a check of the bot token.

        let session = client.open_session(&bot_token);
        let bot_user = session.auth_test().await.map_err(|e| anyhow::anyhow!("Slack rejected the bot token: {}", e))?;
        let bot_user_id = bot_user.user_id.0;

        info!("Slack bot user ID: {}", bot_user_id);

        Ok(Self {
            app_token,
            bot_token,
            bot_user_id,
            client,
            config: config.clone(),
            tracker,
        })
    }
}

#[async_trait]
impl GenericChatClient for SlackChatClient {
    fn bot_user_id(&self) -> &str {
        &self.bot_user_id
    }

    async fn start(&self) -> Void {
        let chat = ChatClient::from(self.clone());

        // Initialize the socket mode listener.

        let socket_mode_callbacks = SlackSocketModeListenerCallbacks::new()
            .with_command_events(handle_command_event)
            .with_interaction_events(handle_interaction_event)
            .with_push_events(handle_push_event);

        // Initialize the socket mode listener environment.

        let listener_environment = Arc::new(
            SlackClientEventsListenerEnvironment::new(self.client.clone())
                .with_error_handler(handle_listener_error)
                .with_user_state(SlackUserState {
                    config: self.config.clone(),
                    tracker: self.tracker.clone(),
                    chat: chat.clone(),
                }),
        );

        let socket_mode_listener = Arc::new(SlackClientSocketModeListener::new(
            &SlackClientSocketModeConfig::new(),
            listener_environment.clone(),
            socket_mode_callbacks,
        ));

        // Register an app token to listen for events.

        if let Err(err) = socket_mode_listener.listen_for(&self.app_token).await {
            let code = match &err {
                SlackClientError::ApiError(api_error) => Some(api_error.code.as_str()),
                _ => None,
            };
            let reason = err.to_string();

            let _ = handle_chat_event(registration_failure_event(code, reason.clone()), &self.config, &self.tracker, &chat);
            return Err(anyhow::anyhow!("Slack socket mode registration failed: {}", reason));
        }

        let _ = handle_chat_event(ChatEvent::Connected, &self.config, &self.tracker, &chat);

        // Start WS connections calling Slack API to get WS url for the token,
        // and wait for Ctrl-C to shutdown.
        socket_mode_listener.serve().await;

        Ok(())
    }

    #[instrument(skip(self, text))]
    async fn send_message(&self, channel_id: &str, text: &str) -> Void {
        let message = SlackMessageContent::new().with_text(text.to_string());

        let request = SlackApiChatPostMessageRequest::new(SlackChannelId(channel_id.to_string()), message);

        let session = self.client.open_session(&self.bot_token);

        let _ = session.chat_post_message(&request).await.map_err(|e| anyhow::anyhow!("Failed to send message: {}", e))?;

        Ok(())
    }
}

// Helpers.

/// Turn the parts of a Slack message event into a `ChatEvent`.
fn classify_message(channel_id: Option<&str>, text: Option<&str>, from_bot: bool, ignore_bot_messages: bool) -> ChatEvent {
    if from_bot && ignore_bot_messages {
        return ChatEvent::Ignored("message posted by a bot".to_string());
    }

    let Some(channel_id) = channel_id else {
        return ChatEvent::Ignored("message without a channel".to_string());
    };

    let Some(text) = text.filter(|t| !t.is_empty()) else {
        return ChatEvent::Ignored("message without text".to_string());
    };

    ChatEvent::Message(IncomingMessage {
        channel_id: channel_id.to_string(),
        text: text.to_string(),
    })
}

/// Classify a failed app token registration; only token rejections count as bad credentials.
fn registration_failure_event(api_error_code: Option<&str>, reason: String) -> ChatEvent {
    match api_error_code {
        Some(code) if AUTH_ERROR_CODES.contains(&code) => ChatEvent::InvalidAuth(reason),
        _ => ChatEvent::Error(reason),
    }
}

// Socket mode listener callbacks for Slack.

/// Handles command events from Slack.
async fn handle_command_event(
    event: SlackCommandEvent,
    _client: Arc<SlackHyperClient>,
    _states: SlackClientEventsUserState,
) -> Result<SlackCommandEventResponse, Box<dyn std::error::Error + Send + Sync>> {
    warn!("[COMMAND] {:#?}", event);
    Ok(SlackCommandEventResponse::new(
        SlackMessageContent::new().with_text("No app commands are supported. Mention a ticket as `!<number>` instead.".into()),
    ))
}

/// Handles interaction events from Slack.
async fn handle_interaction_event(event: SlackInteractionEvent, _client: Arc<SlackHyperClient>, _states: SlackClientEventsUserState) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    warn!("[INTERACTION] {:#?}", event);
    Ok(())
}

/// Handles errors raised by the socket mode listener.
fn handle_listener_error(err: Box<dyn std::error::Error + Send + Sync>, _client: Arc<SlackHyperClient>, states: SlackClientEventsUserState) -> HttpStatusCode {
    let event = ChatEvent::Error(err.to_string());

    match states.try_read() {
        Ok(states) => match states.get_user_state::<SlackUserState>() {
            Some(user_state) => {
                let _ = handle_chat_event(event, &user_state.config, &user_state.tracker, &user_state.chat);
            }
            None => warn!("Listener error without user state: {:?}", event),
        },
        Err(_) => warn!("Listener error while user state is locked: {:?}", event),
    }

    // Acknowledge so Slack does not redeliver the envelope.
    HttpStatusCode::OK
}

/// Handles push events from Slack.
#[instrument(skip_all)]
async fn handle_push_event(event_callback: SlackPushEventCallback, _client: Arc<SlackHyperClient>, states: SlackClientEventsUserState) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let states = states.read().await;
    let user_state = states.get_user_state::<SlackUserState>().ok_or(anyhow::anyhow!("Failed to get user state"))?;

    let event = match event_callback.event {
        SlackEventCallbackBody::Message(slack_message_event) => {
            let sender = &slack_message_event.sender;
            let from_bot = sender.bot_id.is_some() || sender.user.as_ref().is_some_and(|u| u.0 == user_state.chat.bot_user_id());

            classify_message(
                slack_message_event.origin.channel.as_ref().map(|c| c.0.as_str()),
                slack_message_event.content.as_ref().and_then(|c| c.text.as_deref()),
                from_bot,
                user_state.config.ignore_bot_messages,
            )
        }
        // Mentions also arrive as message events; answering both would double every reply.
        SlackEventCallbackBody::AppMention(_) => ChatEvent::Ignored("app mention".to_string()),
        _ => ChatEvent::Ignored("unhandled push event".to_string()),
    };

    let _ = handle_chat_event(event, &user_state.config, &user_state.tracker, &user_state.chat);

    Ok(())
}

// Tests.
