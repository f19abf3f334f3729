//! Satisfaction rating replies.
//!
//! While a ticket has a pending rating every inbound reply is read as a score.
//! Anything that is not an integer is ignored and the rating stays pending.

use std::sync::Arc;

use {
    helpline_common::types::{Contact, Ticket},
    helpline_tickets::{Outbox, Store, TicketLifecycle},
    tracing::{debug, info},
};

#[cfg(feature = "metrics")]
use helpline_metrics::{automation, counter};

use crate::Result;

pub const MIN_SCORE: u8 = 1;
pub const MAX_SCORE: u8 = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RatingOutcome {
    /// The ticket has no pending rating; the reply is not for this flow.
    NotPending,
    /// Not a number; waiting for a valid reply.
    Ignored,
    Resolved(u8),
}

/// Integer in the reply, clamped into the score range. Integers too large
/// for `i64` saturate to the nearest bound.
#[must_use]
pub fn parse_score(body: &str) -> Option<u8> {
    let body = body.trim();
    let (negative, digits) = match body.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, body.strip_prefix('+').unwrap_or(body)),
    };
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let n = match body.parse::<i64>() {
        Ok(n) => n,
        Err(_) if negative => i64::MIN,
        Err(_) => i64::MAX,
    };
    let clamped = n.clamp(i64::from(MIN_SCORE), i64::from(MAX_SCORE));
    u8::try_from(clamped).ok()
}

pub struct RatingFlow {
    store: Arc<dyn Store>,
    lifecycle: Arc<TicketLifecycle>,
    outbox: Outbox,
}

impl RatingFlow {
    pub fn new(store: Arc<dyn Store>, lifecycle: Arc<TicketLifecycle>, outbox: Outbox) -> Self {
        Self {
            store,
            lifecycle,
            outbox,
        }
    }

    pub async fn handle(
        &self,
        ticket: &Ticket,
        contact: &Contact,
        body: &str,
    ) -> Result<RatingOutcome> {
        let Some(rating) = self.store.pending_rating(ticket.id).await? else {
            return Ok(RatingOutcome::NotPending);
        };
        let Some(score) = parse_score(body) else {
            debug!(ticket_id = ticket.id, "rating reply is not a number, waiting");
            return Ok(RatingOutcome::Ignored);
        };
        if self.store.resolve_rating(rating.id, score).await?.is_none() {
            // Resolved by a concurrent reply.
            return Ok(RatingOutcome::Ignored);
        }
        info!(ticket_id = ticket.id, rating_id = rating.id, score, "rating received");
        #[cfg(feature = "metrics")]
        counter!(automation::RATINGS_RESOLVED_TOTAL).increment(1);

        let farewell = self
            .store
            .get_connection(ticket.connection_id)
            .await?
            .and_then(|c| c.farewell)
            .filter(|f| !f.trim().is_empty());
        if let Some(farewell) = farewell {
            self.outbox.send_text(ticket, contact, &farewell).await?;
        }

        self.lifecycle.close_rated(ticket.id).await?;
        Ok(RatingOutcome::Resolved(score))
    }
}
