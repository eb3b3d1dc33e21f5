use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("validation error: {0}")]
    Validation(String),

    #[error("database error: {0}")]
    Database(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("not authorized: {0}")]
    Forbidden(String),

    /// An optional capability (such as the AI assistant) is not configured.
    #[error("unavailable: {0}")]
    Unavailable(String),

    /// A remote collaborator failed or answered with something unusable.
    #[error("upstream error: {0}")]
    Upstream(String),

    #[error("internal error: {0}")]
    Internal(String),
}
