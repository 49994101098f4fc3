//! Resolution of the ticket references in one chat message.
//!
//! A resolution cycle extracts references, fans out fetches, reconciles the
//! outcomes according to the configured `ReplyPolicy`, and replies in the
//! originating channel. Fetch failures are only ever logged; they are never
//! posted back to the channel.

use tracing::{Instrument, error, info, instrument, warn};

use crate::{
    base::{
        config::Config,
        types::{IncomingMessage, ReplyPolicy, Resolution},
    },
    interaction::{
        fetch::{IssueStreams, fetch_issues},
        format::format_issue,
        references::extract_references,
    },
    service::{chat::ChatClient, tracker::TrackerClient},
};

/// Resolve `message` on its own task so the caller never waits on the tracker.
#[instrument(skip_all)]
pub fn handle_ticket_message(message: IncomingMessage, config: Config, tracker: TrackerClient, chat: ChatClient) {
    tokio::spawn(
        async move {
            match resolve_ticket_message(&message, &config, &tracker, &chat).await {
                Resolution::Replied { messages, undelivered } if undelivered > 0 => {
                    warn!("Delivered {} of {} replies.", messages.len() - undelivered, messages.len());
                }
                Resolution::Replied { messages, .. } if !messages.is_empty() => {
                    info!("Delivered {} replies.", messages.len());
                }
                Resolution::Replied { .. } => {}
                Resolution::Reported { failures } => {
                    warn!("Suppressed replies because {} ticket(s) failed to resolve.", failures.len());
                }
            }
        }
        .in_current_span(),
    );
}

/// Run one full resolution cycle for `message`.
#[instrument(skip_all, fields(channel_id = %message.channel_id))]
pub async fn resolve_ticket_message(message: &IncomingMessage, config: &Config, tracker: &TrackerClient, chat: &ChatClient) -> Resolution {
    let references = extract_references(&message.text);

    if references.is_empty() {
        return Resolution::Replied {
            messages: Vec::new(),
            undelivered: 0,
        };
    }

    info!("Resolving {} ticket reference(s) ...", references.len());

    let streams = fetch_issues(references, tracker, &config.repo());

    match config.reply_policy {
        ReplyPolicy::AllOrNothing => reply_all_or_nothing(streams, &message.channel_id, chat).await,
        ReplyPolicy::PerReference => reply_per_reference(streams, &message.channel_id, chat).await,
    }
}

/// Wait for every outcome, then reply to all issues or to none.
async fn reply_all_or_nothing(mut streams: IssueStreams, channel_id: &str, chat: &ChatClient) -> Resolution {
    // The failure channel closes only once every fetch task has finished.
    let mut failures = Vec::new();
    while let Some(failure) = streams.failures.recv().await {
        failures.push(failure);
    }

    if !failures.is_empty() {
        for failure in &failures {
            error!("Not replying to message: {:#}", failure.error);
        }

        return Resolution::Reported { failures };
    }

    let mut messages = Vec::new();
    while let Some(issue) = streams.issues.recv().await {
        messages.push(format_issue(&issue));
    }

    let mut undelivered = 0;
    for text in &messages {
        if !send_reply(chat, channel_id, text).await {
            undelivered += 1;
        }
    }

    Resolution::Replied { messages, undelivered }
}

/// Reply to each issue as it arrives and log each failure on its own.
async fn reply_per_reference(mut streams: IssueStreams, channel_id: &str, chat: &ChatClient) -> Resolution {
    let mut messages = Vec::new();
    let mut undelivered = 0;

    let mut issues_open = true;
    let mut failures_open = true;

    while issues_open || failures_open {
        tokio::select! {
            issue = streams.issues.recv(), if issues_open => match issue {
                Some(issue) => {
                    let text = format_issue(&issue);
                    if !send_reply(chat, channel_id, &text).await {
                        undelivered += 1;
                    }
                    messages.push(text);
                }
                None => issues_open = false,
            },
            failure = streams.failures.recv(), if failures_open => match failure {
                Some(failure) => error!("Skipping ticket: {:#}", failure.error),
                None => failures_open = false,
            },
        }
    }

    Resolution::Replied { messages, undelivered }
}

/// Send one reply, logging a delivery failure. Returns whether it was delivered.
async fn send_reply(chat: &ChatClient, channel_id: &str, text: &str) -> bool {
    match chat.send_message(channel_id, text).await {
        Ok(()) => true,
        Err(err) => {
            error!("Failed to deliver reply to {}: {}", channel_id, err);
            false
        }
    }
}

// Tests.

#[cfg(test)]
mod tests {
    use std::{
        sync::{Arc, Mutex},
        time::Duration,
    };

    use async_trait::async_trait;

    use super::*;
    use crate::{
        base::{
            config::ConfigInner,
            types::{Issue, Res, TicketReference},
        },
        service::{
            chat::ChatClient,
            mocks::{MockChat, MockTracker, issue_for},
            tracker::GenericTrackerClient,
        },
    };

    fn config(reply_policy: ReplyPolicy) -> Config {
        Config::from(ConfigInner {
            github_owner: "acme".to_string(),
            github_repo: "qa".to_string(),
            reply_policy,
            ..Default::default()
        })
    }

    fn message(text: &str) -> IncomingMessage {
        IncomingMessage {
            channel_id: "C1".to_string(),
            text: text.to_string(),
        }
    }

    /// A tracker that fails ticket 1, and does so more slowly than it resolves the rest.
    struct SlowFailureTracker;

    #[async_trait]
    impl GenericTrackerClient for SlowFailureTracker {
        async fn get_issue(&self, _owner: &str, _repo: &str, reference: TicketReference) -> Res<Issue> {
            if reference.0 == 1 {
                tokio::time::sleep(Duration::from_millis(50)).await;
                return Err(anyhow::anyhow!("github issue !1 lookup failed with status 502"));
            }

            Ok(issue_for(reference))
        }
    }

    /// A tracker that resolves ticket 1 more slowly than the rest.
    struct SlowFirstTracker;

    #[async_trait]
    impl GenericTrackerClient for SlowFirstTracker {
        async fn get_issue(&self, _owner: &str, _repo: &str, reference: TicketReference) -> Res<Issue> {
            if reference.0 == 1 {
                tokio::time::sleep(Duration::from_millis(50)).await;
            }

            Ok(issue_for(reference))
        }
    }

    fn failing_first_tracker() -> TrackerClient {
        let mut mock = MockTracker::new();
        mock.expect_get_issue().returning(|_, _, reference| match reference.0 {
            1 => Err(anyhow::anyhow!("github issue !1 lookup failed with status 404")),
            _ => Ok(issue_for(reference)),
        });
        TrackerClient::new(Arc::new(mock))
    }

    fn recording_chat(sent: Arc<Mutex<Vec<String>>>, times: usize) -> ChatClient {
        let mut mock = MockChat::new();
        mock.expect_send_message().withf(|channel_id, _| channel_id == "C1").times(times).returning(move |_, text| {
            sent.lock().unwrap().push(text.to_string());
            Ok(())
        });
        ChatClient::new(Arc::new(mock))
    }

    #[tokio::test]
    async fn test_message_without_references_is_a_no_op() {
        let tracker = TrackerClient::new(Arc::new(MockTracker::new()));
        let chat = ChatClient::new(Arc::new(MockChat::new()));

        let resolution = resolve_ticket_message(&message("nothing to see"), &config(ReplyPolicy::AllOrNothing), &tracker, &chat).await;

        assert!(matches!(resolution, Resolution::Replied { messages, undelivered: 0 } if messages.is_empty()));
    }

    #[tokio::test]
    async fn test_any_failure_suppresses_all_replies() {
        let mut chat = MockChat::new();
        chat.expect_send_message().never();
        let chat = ChatClient::new(Arc::new(chat));

        let resolution = resolve_ticket_message(&message("!1 and !2"), &config(ReplyPolicy::AllOrNothing), &failing_first_tracker(), &chat).await;

        match resolution {
            Resolution::Reported { failures } => {
                assert_eq!(failures.len(), 1);
                assert_eq!(failures[0].reference, TicketReference(1));
            }
            other => panic!("expected a report, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_slow_failure_still_suppresses_fast_successes() {
        let mut chat = MockChat::new();
        chat.expect_send_message().never();
        let chat = ChatClient::new(Arc::new(chat));
        let tracker = TrackerClient::new(Arc::new(SlowFailureTracker));

        let resolution = resolve_ticket_message(&message("!1 !2 !3"), &config(ReplyPolicy::AllOrNothing), &tracker, &chat).await;

        assert!(matches!(resolution, Resolution::Reported { failures } if failures.len() == 1));
    }

    #[tokio::test]
    async fn test_all_successes_reply_once_per_issue() {
        let mut tracker = MockTracker::new();
        tracker.expect_get_issue().times(2).returning(|_, _, reference| Ok(issue_for(reference)));
        let tracker = TrackerClient::new(Arc::new(tracker));

        let sent = Arc::new(Mutex::new(Vec::new()));
        let chat = recording_chat(sent.clone(), 2);

        let resolution = resolve_ticket_message(&message("!1 and !2"), &config(ReplyPolicy::AllOrNothing), &tracker, &chat).await;

        let Resolution::Replied { messages, undelivered } = resolution else {
            panic!("expected replies");
        };

        assert_eq!(undelivered, 0);
        assert_eq!(*sent.lock().unwrap(), messages);

        let mut expected = vec![format_issue(&issue_for(TicketReference(1))), format_issue(&issue_for(TicketReference(2)))];
        let mut actual = messages.clone();
        expected.sort();
        actual.sort();
        assert_eq!(actual, expected);
    }

    #[tokio::test]
    async fn test_replies_follow_fetch_completion_order() {
        let tracker = TrackerClient::new(Arc::new(SlowFirstTracker));

        for policy in [ReplyPolicy::AllOrNothing, ReplyPolicy::PerReference] {
            let sent = Arc::new(Mutex::new(Vec::new()));
            let chat = recording_chat(sent.clone(), 2);

            let resolution = resolve_ticket_message(&message("!1 !2"), &config(policy), &tracker, &chat).await;

            let expected = vec![format_issue(&issue_for(TicketReference(2))), format_issue(&issue_for(TicketReference(1)))];
            assert_eq!(*sent.lock().unwrap(), expected, "{policy:?}");
            assert!(matches!(resolution, Resolution::Replied { messages, undelivered: 0 } if messages == expected));
        }
    }

    #[tokio::test]
    async fn test_per_reference_replies_despite_failures() {
        let sent = Arc::new(Mutex::new(Vec::new()));
        let chat = recording_chat(sent.clone(), 1);

        let resolution = resolve_ticket_message(&message("!1 and !2"), &config(ReplyPolicy::PerReference), &failing_first_tracker(), &chat).await;

        assert!(matches!(resolution, Resolution::Replied { undelivered: 0, .. }));
        assert_eq!(*sent.lock().unwrap(), vec![format_issue(&issue_for(TicketReference(2)))]);
    }

    #[tokio::test]
    async fn test_failed_send_is_counted_and_others_still_sent() {
        let mut tracker = MockTracker::new();
        tracker.expect_get_issue().returning(|_, _, reference| Ok(issue_for(reference)));
        let tracker = TrackerClient::new(Arc::new(tracker));

        let attempts = Arc::new(Mutex::new(0));
        let mut chat = MockChat::new();
        let counter = attempts.clone();
        chat.expect_send_message().times(3).returning(move |_, _| {
            let mut attempts = counter.lock().unwrap();
            *attempts += 1;
            if *attempts == 1 { Err(anyhow::anyhow!("channel_not_found")) } else { Ok(()) }
        });
        let chat = ChatClient::new(Arc::new(chat));

        let resolution = resolve_ticket_message(&message("!4 !5 !6"), &config(ReplyPolicy::AllOrNothing), &tracker, &chat).await;

        assert!(matches!(resolution, Resolution::Replied { messages, undelivered: 1 } if messages.len() == 3));
        assert_eq!(*attempts.lock().unwrap(), 3);
    }
}
