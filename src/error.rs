use thiserror::Error;

/// Structural problems that abort a whole batch before anything is stored.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FormatError {
    #[error("CSV must contain header and data rows")]
    MissingRows,
    #[error("Missing required headers: {}", .0.join(", "))]
    MissingHeaders(Vec<String>),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CoreError {
    #[error(transparent)]
    Format(#[from] FormatError),
    #[error("invalid record: {0}")]
    Validation(String),
    #[error("student ID {identifier} already exists")]
    Conflict { identifier: String },
    #[error("student ID {identifier} not found")]
    NotFound { identifier: String },
}

impl CoreError {
    pub fn conflict(identifier: impl Into<String>) -> Self {
        CoreError::Conflict {
            identifier: identifier.into(),
        }
    }

    pub fn not_found(identifier: impl Into<String>) -> Self {
        CoreError::NotFound {
            identifier: identifier.into(),
        }
    }
}
