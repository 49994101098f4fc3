//! Concurrent fan-out fetch of referenced issues.

use tokio::sync::mpsc::{self, UnboundedReceiver};
use tracing::{Instrument, debug, instrument};

use crate::{
    base::types::{FetchFailure, Issue, RepoRef, TicketReference},
    service::tracker::TrackerClient,
};

/// The two completion channels of one fetch invocation.
///
/// Both channels close once every fetch task has finished.
pub struct IssueStreams {
    pub issues: UnboundedReceiver<Issue>,
    pub failures: UnboundedReceiver<FetchFailure>,
}

/// Fetch every reference from `repo` concurrently, one task per reference.
///
/// Each reference yields exactly one issue or one failure. Completion order is
/// not related to the order of `references`. Dropping the streams does not
/// cancel fetches already in flight.
#[instrument(skip(tracker))]
pub fn fetch_issues(references: Vec<TicketReference>, tracker: &TrackerClient, repo: &RepoRef) -> IssueStreams {
    let (issue_tx, issues) = mpsc::unbounded_channel();
    let (failure_tx, failures) = mpsc::unbounded_channel();

    for reference in references {
        let tracker = tracker.clone();
        let repo = repo.clone();
        let issue_tx = issue_tx.clone();
        let failure_tx = failure_tx.clone();

        tokio::spawn(
            async move {
                match tracker.get_issue(&repo.owner, &repo.name, reference).await {
                    Ok(issue) => {
                        debug!("Fetched ticket {reference}.");
                        let _ = issue_tx.send(issue);
                    }
                    Err(error) => {
                        let error = error.context(format!("failed to fetch ticket {reference} from {repo}"));
                        let _ = failure_tx.send(FetchFailure { reference, error });
                    }
                }
            }
            .in_current_span(),
        );
    }

    IssueStreams { issues, failures }
}
