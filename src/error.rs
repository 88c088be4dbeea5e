use thiserror::Error;

#[derive(Error, Debug)]
pub enum MetrixError {
    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Authentication rejected by source API (status {status})")]
    Auth { status: u16 },

    #[error("Failed to decode {resource} response: {message}")]
    Decode { resource: String, message: String },

    #[error("Project {0} not found")]
    NotFound(u64),

    #[error("Collection run failed: {0}")]
    Collection(#[source] Box<MetrixError>),

    #[error("Storage error: {message}")]
    Storage { message: String, retryable: bool },

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Pagination of {resource} exceeded {limit} pages")]
    PageLimitExceeded { resource: String, limit: u32 },

    #[error("Collection run cancelled")]
    Cancelled,
}

impl MetrixError {
    /// Whether retrying the same call could succeed without intervention.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Transport(_) => true,
            Self::Storage { retryable, .. } => *retryable,
            _ => false,
        }
    }
}

impl From<reqwest::Error> for MetrixError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            Self::Decode {
                resource: e
                    .url()
                    .map_or_else(|| "unknown".to_string(), |u| u.path().to_string()),
                message: e.to_string(),
            }
        } else {
            Self::Transport(e.to_string())
        }
    }
}

impl From<mongodb::error::Error> for MetrixError {
    fn from(e: mongodb::error::Error) -> Self {
        use mongodb::error::ErrorKind;

        let retryable = matches!(
            *e.kind,
            ErrorKind::Io(_)
                | ErrorKind::ConnectionPoolCleared { .. }
                | ErrorKind::ServerSelection { .. }
        ) || e.contains_label(mongodb::error::RETRYABLE_WRITE_ERROR);

        Self::Storage {
            message: e.to_string(),
            retryable,
        }
    }
}

pub type Result<T> = std::result::Result<T, MetrixError>;
