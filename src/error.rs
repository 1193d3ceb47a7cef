use thiserror::Error;

/// Errors produced by the data-access layer.
///
/// Driver failures are classified into one of these variants at the driver
/// boundary, so callers switch on [`DalError::kind`] instead of parsing
/// messages.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum DalError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Connection error: {0}")]
    ConnectionError(String),

    #[error("Query error: {0}")]
    QueryError(String),

    #[error("Parameter error: {0}")]
    ParameterError(String),

    #[error("{0}")]
    ValidationError(String),

    #[error("{0} not found")]
    NotFound(String),

    #[error("Other database error: {0}")]
    Other(String),
}

/// Coarse classification of a [`DalError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Caller input is malformed; no database access was attempted.
    Validation,
    /// A keyed lookup matched zero rows.
    NotFound,
    /// Pool, connect or timeout failure. Transient.
    Connection,
    /// The statement itself failed. Fatal.
    Query,
    /// Anything else.
    Unknown,
}

impl DalError {
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            DalError::ValidationError(_) => ErrorKind::Validation,
            DalError::NotFound(_) => ErrorKind::NotFound,
            DalError::ConnectionError(_) => ErrorKind::Connection,
            DalError::QueryError(_) | DalError::ParameterError(_) => ErrorKind::Query,
            DalError::ConfigError(_) | DalError::Other(_) => ErrorKind::Unknown,
        }
    }

    /// True when the caller may retry at its own discretion.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        self.kind() == ErrorKind::Connection
    }
}
