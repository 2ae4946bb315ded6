//! Ticket references in commit subjects.

use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;

#[allow(clippy::unwrap_used)] // Compile-time constant regex pattern
static FIXED_TICKET_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)Fixed #(\d+)").unwrap());

#[allow(clippy::unwrap_used)] // Compile-time constant regex pattern
static BACKPORT_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\[\d+\.\d+\.x\]").unwrap());

/// A ticket fixed by a commit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TicketReference {
    /// Tracker ticket id (digits only).
    pub ticket: String,
    /// Whether the commit was backported onto a release branch.
    pub backport: bool,
}

impl TicketReference {
    /// Creates a reference.
    pub fn new(ticket: impl Into<String>, backport: bool) -> Self {
        Self {
            ticket: ticket.into(),
            backport,
        }
    }
}

/// Extracts the fixed ticket from a commit subject, if any.
///
/// Only the first `Fixed #N` is taken. A subject starting with a release
/// branch prefix such as `[1.8.x]` marks the reference as a backport.
pub fn parse_subject(subject: &str) -> Option<TicketReference> {
    let ticket = FIXED_TICKET_PATTERN.captures(subject)?.get(1)?.as_str();

    Some(TicketReference::new(ticket, BACKPORT_PATTERN.is_match(subject)))
}

/// Returns the tickets referenced by `subjects` that still need classifying.
///
/// Tickets for which `is_cached` holds are skipped, and a ticket referenced
/// more than once is returned for its first subject only.
pub fn pending_tickets<'a, I, F>(subjects: I, is_cached: F) -> Vec<TicketReference>
where
    I: IntoIterator<Item = &'a str>,
    F: Fn(&str) -> bool,
{
    let mut seen = HashSet::new();

    subjects
        .into_iter()
        .filter_map(parse_subject)
        .filter(|reference| !is_cached(&reference.ticket))
        .filter(|reference| seen.insert(reference.ticket.clone()))
        .collect()
}
