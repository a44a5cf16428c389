use core_types::CoreError;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AnalyticsError {
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Unsupported calculator type: {0}")]
    UnsupportedCalculator(String),

    #[error("Error in calculation: {0}")]
    Calculation(String),
}

impl From<CoreError> for AnalyticsError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::UnsupportedCalculator(name) => AnalyticsError::UnsupportedCalculator(name),
            other => AnalyticsError::InvalidArgument(other.to_string()),
        }
    }
}
