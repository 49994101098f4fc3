//! Reply rendering for resolved issues.

use crate::base::types::Issue;

/// Render an issue as a three-line chat reply.
///
/// Title and URL are inserted verbatim.
pub fn format_issue(issue: &Issue) -> String {
    format!("#{} - {}\n{}\nAssignees: {}", issue.number, issue.title, issue.url, issue.assignees.join(", "))
}
