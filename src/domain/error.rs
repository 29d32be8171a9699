use thiserror::Error;

#[derive(Debug, Error)]
pub enum DomainError {
    #[error("content `{id}` not found")]
    ContentNotFound { id: String },
    #[error("domain validation failed: {message}")]
    Validation { message: String },
    #[error("content `{id}` cannot move from {from} to {to}")]
    InvalidTransition {
        id: String,
        from: &'static str,
        to: &'static str,
    },
}

impl DomainError {
    pub fn content_not_found(id: impl Into<String>) -> Self {
        Self::ContentNotFound { id: id.into() }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }
}
