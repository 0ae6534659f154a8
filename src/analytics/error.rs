//! Error types for calculator operations

use crate::error::AppError;

/// Result type for analytics operations
pub type AnalyticsResult<T> = std::result::Result<T, AnalyticsError>;

/// Errors that can occur in analytics operations
#[derive(Debug, thiserror::Error)]
pub enum AnalyticsError {
    /// Input was not the shape a calculator expects
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

impl From<AnalyticsError> for AppError {
    fn from(err: AnalyticsError) -> Self {
        match err {
            AnalyticsError::InvalidInput(msg) => AppError::Validation(msg),
        }
    }
}
