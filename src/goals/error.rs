/// An out-of-scope entity reports the same `NotFound` as a missing one, so a
/// denied read never leaks existence.
#[derive(Debug, thiserror::Error)]
pub enum GoalsError {
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Validation error: {0}")]
    Validation(String),
    #[error("Computation error: {0}")]
    Computation(String),
    #[error("Database error: {0}")]
    Database(String),
}
