use thiserror::Error;

#[derive(Debug, Error)]
pub enum ServiceError {
    /// The message is caller-visible and rendered verbatim in error bodies.
    #[error("{0}")]
    NotFound(String),
    #[error("storage error: {0}")]
    Storage(String),
}

impl ServiceError {
    pub fn not_found(entity: &str) -> Self { Self::NotFound(format!("{} not found", entity)) }
}
