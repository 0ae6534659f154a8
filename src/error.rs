use thiserror::Error;

/// Application error types
#[derive(Error, Debug)]
pub enum AppError {
    /// The data provider rejected a fetch. Carries the iteration id and the
    /// operation that was running so the failure can be diagnosed from the
    /// message alone.
    #[error("Failed to {operation} for iteration {iteration_id}: {message}")]
    FetchFailure {
        iteration_id: String,
        operation: String,
        message: String,
    },

    /// Validation errors
    #[error("Validation error: {0}")]
    Validation(String),

    /// Cache backend failure (read, write or decode). A miss is not an error.
    #[error("Cache corruption: {0}")]
    CacheCorruption(String),

    /// Not found errors
    #[error("Not found: {0}")]
    NotFound(String),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Internal errors
    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Wrap an underlying failure with the iteration id and operation name.
    pub fn fetch_failure(
        iteration_id: impl Into<String>,
        operation: impl Into<String>,
        cause: impl std::fmt::Display,
    ) -> Self {
        AppError::FetchFailure {
            iteration_id: iteration_id.into(),
            operation: operation.into(),
            message: cause.to_string(),
        }
    }

    /// Get error code string
    pub fn error_code(&self) -> &str {
        match self {
            AppError::FetchFailure { .. } => "FETCH_FAILURE",
            AppError::Validation(_) => "VALIDATION_ERROR",
            AppError::CacheCorruption(_) => "CACHE_CORRUPTION",
            AppError::NotFound(_) => "NOT_FOUND",
            AppError::Configuration(_) => "CONFIGURATION_ERROR",
            AppError::Io(_) => "IO_ERROR",
            AppError::Serialization(_) => "SERIALIZATION_ERROR",
            AppError::Internal(_) => "INTERNAL_ERROR",
        }
    }
}

/// Conversion from serde_json::Error
impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Serialization(err.to_string())
    }
}

/// Conversion from validator::ValidationErrors
impl From<validator::ValidationErrors> for AppError {
    fn from(err: validator::ValidationErrors) -> Self {
        AppError::Validation(err.to_string())
    }
}

/// Conversion from config::ConfigError
impl From<config::ConfigError> for AppError {
    fn from(err: config::ConfigError) -> Self {
        AppError::Configuration(err.to_string())
    }
}

/// Result type alias
pub type Result<T> = std::result::Result<T, AppError>;
