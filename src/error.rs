//! Failure taxonomy shared by every tabulation operation.
//!
//! Any of these aborts the enclosing transaction; nothing is written when an
//! operation returns `Err`.

pub type Result<T> = std::result::Result<T, TabError>;

#[derive(Debug, thiserror::Error)]
pub enum TabError {
    /// A match, speaker, team, tournament (or similar) does not exist.
    #[error("{resource} `{id}` not found")]
    NotFound { resource: &'static str, id: String },

    /// Malformed team role, blank required field, or a score entry that
    /// refers to an empty team slot.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Reserved for duplicate-submission detection. Re-submission is
    /// currently accepted and handled by reverting the prior result.
    #[error("conflict: {0}")]
    Conflict(String),

    /// The database (or the pool, or the blocking task running the query)
    /// failed.
    #[error("storage failure: {message}")]
    StorageFailure {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },
}

impl TabError {
    pub fn not_found(resource: &'static str, id: impl Into<String>) -> Self {
        TabError::NotFound {
            resource,
            id: id.into(),
        }
    }

    pub fn invalid(message: impl Into<String>) -> Self {
        TabError::InvalidInput(message.into())
    }

    pub fn storage(message: impl Into<String>) -> Self {
        TabError::StorageFailure {
            message: message.into(),
            source: None,
        }
    }

    /// Short, stable name of the failure class (used in API responses).
    pub fn kind(&self) -> &'static str {
        match self {
            TabError::NotFound { .. } => "not_found",
            TabError::InvalidInput(_) => "invalid_input",
            TabError::Conflict(_) => "conflict",
            TabError::StorageFailure { .. } => "storage_failure",
        }
    }
}

impl From<diesel::result::Error> for TabError {
    fn from(e: diesel::result::Error) -> Self {
        TabError::StorageFailure {
            message: e.to_string(),
            source: Some(Box::new(e)),
        }
    }
}

impl From<diesel::r2d2::PoolError> for TabError {
    fn from(e: diesel::r2d2::PoolError) -> Self {
        TabError::StorageFailure {
            message: format!("could not acquire connection: {e}"),
            source: Some(Box::new(e)),
        }
    }
}

impl From<tokio::task::JoinError> for TabError {
    fn from(e: tokio::task::JoinError) -> Self {
        TabError::StorageFailure {
            message: format!("database task failed: {e}"),
            source: Some(Box::new(e)),
        }
    }
}
