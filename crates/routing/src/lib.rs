//! Assign unassigned tickets to a queue.
//!
//! Rules, in order:
//! 1. No queue on the connection: nothing to do.
//! 2. Exactly one queue: assign it; the chatbot starts iff it has root options.
//! 3. A valid 1-based selection among several queues: assign that queue.
//! 4. Otherwise: send a chooser of the queues and wait.

pub mod error;
pub mod router;

pub use {
    error::{Error, Result},
    router::{QueueRouter, RouteOutcome},
};
