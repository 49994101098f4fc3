//! Mock service doubles shared by unit tests.

use async_trait::async_trait;
use mockall::mock;

use crate::base::types::{Issue, Res, TicketReference, Void};

use super::{chat::GenericChatClient, tracker::GenericTrackerClient};

mock! {
    pub Chat {}

    #[async_trait]
    impl GenericChatClient for Chat {
        fn bot_user_id(&self) -> &str;
        async fn start(&self) -> Void;
        async fn send_message(&self, channel_id: &str, text: &str) -> Void;
    }
}

mock! {
    pub Tracker {}

    #[async_trait]
    impl GenericTrackerClient for Tracker {
        async fn get_issue(&self, owner: &str, repo: &str, reference: TicketReference) -> Res<Issue>;
    }
}

/// A minimal issue for `reference`, titled after its number.
pub fn issue_for(reference: TicketReference) -> Issue {
    Issue {
        number: reference.0,
        title: format!("Ticket {}", reference.0),
        url: format!("https://github.com/acme/qa/issues/{}", reference.0),
        assignees: vec!["alice".to_string()],
    }
}
