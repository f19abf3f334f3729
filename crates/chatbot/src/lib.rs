//! Menu-driven assistant for tickets whose queue has an option tree.
//!
//! [`menu`] holds the pure part: the tree and the transition function from
//! (position, token) to the next move. [`engine`] applies a move to a ticket
//! and renders what the contact sees next.
//!
//! Reserved tokens: `00` restarts routing, `0` goes up one level, `#` hands
//! the ticket to a human.

pub mod engine;
pub mod error;
pub mod menu;

pub use {
    engine::ChatbotEngine,
    error::{Error, Result},
    menu::{MenuTree, Transition},
};
