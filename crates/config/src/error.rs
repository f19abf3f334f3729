use crate::validate::{Diagnostic, Severity};

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Toml(#[from] toml::de::Error),

    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error("unsupported config format: .{extension}")]
    UnsupportedFormat { extension: String },

    #[error("failed to read {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{}", summarize(.diagnostics))]
    Validation { diagnostics: Vec<Diagnostic> },

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

    #[must_use]
    pub fn validation(diagnostics: Vec<Diagnostic>) -> Self {
        Self::Validation { diagnostics }
    }
}

impl helpline_common::FromMessage for Error {
    fn from_message(message: String) -> Self {
        Self::Message { message }
    }
}

fn summarize(diagnostics: &[Diagnostic]) -> String {
    let errors: Vec<&Diagnostic> = diagnostics
        .iter()
        .filter(|d| d.severity == Severity::Error)
        .collect();
    match errors.first() {
        Some(first) if first.path.is_empty() => {
            format!("validation failed ({} error(s)): {}", errors.len(), first.message)
        },
        Some(first) => format!(
            "validation failed ({} error(s)): {}: {}",
            errors.len(),
            first.path,
            first.message
        ),
        None => "validation failed".into(),
    }
}

pub type Result<T> = std::result::Result<T, Error>;

helpline_common::impl_context!();
