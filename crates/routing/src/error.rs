#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Tickets(#[from] helpline_tickets::Error),

    #[error("{message}")]
    Message { message: String },
}

impl Error {
    #[must_use]
    pub fn message(message: impl Into<String>) -> Self {
        Self::Message {
            message: message.into(),
        }
    }
}

impl helpline_common::FromMessage for Error {
    fn from_message(message: String) -> Self {
        Self::Message { message }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

helpline_common::impl_context!();
