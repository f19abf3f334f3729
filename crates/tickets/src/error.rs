use helpline_common::types::TicketId;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A write would break the one-active-ticket or one-pending-rating invariant.
    #[error("conflict: {message}")]
    Conflict { message: String },

    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    /// Storing an inbound media payload failed; the message is not recorded.
    #[error("failed to persist media: {0}")]
    MediaPersist(#[source] helpline_media::Error),

    #[error(transparent)]
    Config(#[from] helpline_config::Error),

    #[error(transparent)]
    Common(#[from] helpline_common::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),

    #[error(transparent)]
    Migrate(#[from] sqlx::migrate::MigrateError),

    #[error("{message}")]
    Message { message: String },
}

impl Error {
    #[must_use]
    pub fn conflict(message: impl Into<String>) -> Self {
        Self::Conflict {
            message: message.into(),
        }
    }

    #[must_use]
    pub fn not_found(entity: &'static str, id: impl ToString) -> Self {
        Self::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    #[must_use]
    pub fn ticket_not_found(id: TicketId) -> Self {
        Self::not_found("ticket", id)
    }

    #[must_use]
    pub fn message(message: impl Into<String>) -> Self {
        Self::Message {
            message: message.into(),
        }
    }

    #[must_use]
    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::Conflict { .. })
    }
}

impl helpline_common::FromMessage for Error {
    fn from_message(message: String) -> Self {
        Self::Message { message }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

helpline_common::impl_context!();
