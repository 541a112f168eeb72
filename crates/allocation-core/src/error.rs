use thiserror::Error;

#[derive(Error, Debug)]
pub enum AllocationError {
    #[error("Insufficient data: {0}")]
    InsufficientData(String),

    #[error("Invalid data: {0}")]
    InvalidData(String),

    #[error("Calculation error: {0}")]
    Calculation(String),

    #[error("Store error: {0}")]
    Store(String),

    #[error("Optimization failed: {0}")]
    OptimizationFailed(String),
}
