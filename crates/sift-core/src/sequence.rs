//! Request sequencing for superseded fetches
//!
//! A newer request for the same logical resource (re-querying similarity with
//! an edited pattern, paging a search) supersedes any older one still in
//! flight. Each request is tagged with a ticket; only the response carrying
//! the most recently issued ticket may mutate state, regardless of the order
//! responses arrive in.

use tracing::debug;

/// Tag attached to one outgoing request
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Ticket(u64);

/// Issues monotonically increasing tickets for one resource
#[derive(Debug, Default)]
pub struct RequestSequencer {
    latest: u64,
}

impl RequestSequencer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Tag a new request, superseding every ticket issued before it
    pub fn issue(&mut self) -> Ticket {
        self.latest += 1;
        Ticket(self.latest)
    }

    pub fn is_latest(&self, ticket: Ticket) -> bool {
        ticket.0 == self.latest
    }

    /// Check a response ticket, logging when it is discarded
    pub fn accept(&self, ticket: Ticket, resource: &str) -> bool {
        if self.is_latest(ticket) {
            true
        } else {
            debug!(
                "Discarding stale {} response (ticket {} < latest {})",
                resource, ticket.0, self.latest
            );
            false
        }
    }

    /// Make every outstanding ticket stale without issuing a new request
    pub fn invalidate(&mut self) {
        self.latest += 1;
    }
}
