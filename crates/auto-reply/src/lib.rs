//! Inbound event processing: the glue between the gateway and the automation.
//!
//! Flow: gateway frame → filters → resolve ticket → rating reply? → store
//! message → route to a queue → business-hours gate → connection greeting →
//! chatbot.

pub mod debounce;
pub mod error;
pub mod gate;
pub mod pipeline;
pub mod rating;

pub use {
    debounce::Debouncer,
    error::{Error, Result},
    gate::{BusinessHoursGate, LocalClock, is_out_of_hours},
    pipeline::{Handled, Pipeline},
    rating::{RatingFlow, RatingOutcome, parse_score},
};
