//! Ticket reference extraction from free text.

use std::sync::LazyLock;

use regex::Regex;

use crate::base::types::TicketReference;

static TICKET_PATTERN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"!([0-9]+)").expect("ticket pattern is valid"));

/// Extract every `!<number>` reference from `text`, left to right.
///
/// Duplicates are kept. Digit runs that do not fit a `u64` are skipped.
pub fn extract_references(text: &str) -> Vec<TicketReference> {
    TICKET_PATTERN
        .captures_iter(text)
        .filter_map(|captures| captures[1].parse::<u64>().ok())
        .map(TicketReference)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn numbers(text: &str) -> Vec<u64> {
        extract_references(text).into_iter().map(|r| r.0).collect()
    }

    #[test]
    fn test_empty_and_plain_text() {
        assert!(extract_references("").is_empty());
        assert!(extract_references("no tickets here").is_empty());
        assert!(extract_references("just a bang! and #42").is_empty());
    }

    #[test]
    fn test_order_and_duplicates_are_preserved() {
        assert_eq!(numbers("!3 then !1 and !3 again"), vec![3, 1, 3]);
    }

    #[test]
    fn test_no_word_boundary_needed() {
        assert_eq!(numbers("fixes!12,!13.see(!14)"), vec![12, 13, 14]);
        assert_eq!(numbers("!!7"), vec![7]);
    }

    #[test]
    fn test_digits_stop_at_first_non_digit() {
        assert_eq!(numbers("!42abc !0 !007"), vec![42, 0, 7]);
    }

    #[test]
    fn test_overflowing_numbers_are_skipped() {
        assert_eq!(numbers("!99999999999999999999999 !5"), vec![5]);
    }
}
