//! Metric names used throughout helpline.

/// Gateway event intake
pub mod events {
    /// Gateway frames accepted by the pipeline
    pub const RECEIVED_TOTAL: &str = "helpline_events_received_total";
    /// Frames skipped by the intake filters (label `reason`)
    pub const SKIPPED_TOTAL: &str = "helpline_events_skipped_total";
    /// Frames dropped because processing failed
    pub const DROPPED_TOTAL: &str = "helpline_events_dropped_total";
}

/// Ticket lifecycle
pub mod tickets {
    pub const CREATED_TOTAL: &str = "helpline_tickets_created_total";
    /// Creation attempts that hit the one-active-ticket invariant
    pub const CONFLICTS_TOTAL: &str = "helpline_tickets_conflicts_total";
    /// Status transitions (label `status`)
    pub const TRANSITIONS_TOTAL: &str = "helpline_ticket_transitions_total";
}

/// Message storage
pub mod messages {
    pub const STORED_TOTAL: &str = "helpline_messages_stored_total";
    /// Redeliveries of an already stored external id
    pub const DUPLICATES_TOTAL: &str = "helpline_messages_duplicates_total";
    pub const MEDIA_FAILURES_TOTAL: &str = "helpline_media_persist_failures_total";
}

/// Outbound sends to the gateway
pub mod outbound {
    /// Sends attempted (label `kind`: text, media, chooser)
    pub const SENT_TOTAL: &str = "helpline_outbound_sent_total";
    pub const FAILURES_TOTAL: &str = "helpline_outbound_failures_total";
}

/// Automation
pub mod automation {
    /// Queue assignments made by the router
    pub const QUEUE_ASSIGNMENTS_TOTAL: &str = "helpline_queue_assignments_total";
    /// Chatbot transitions (label `transition`)
    pub const CHATBOT_TRANSITIONS_TOTAL: &str = "helpline_chatbot_transitions_total";
    pub const RATINGS_RESOLVED_TOTAL: &str = "helpline_ratings_resolved_total";
    /// Out-of-hours sends replaced by a newer event for the same ticket
    pub const DEBOUNCE_REPLACED_TOTAL: &str = "helpline_debounce_replaced_total";
    pub const OUT_OF_HOURS_SENT_TOTAL: &str = "helpline_out_of_hours_sent_total";
}

/// Common label keys
pub mod labels {
    pub const REASON: &str = "reason";
    pub const KIND: &str = "kind";
    pub const STATUS: &str = "status";
    pub const TRANSITION: &str = "transition";
}
