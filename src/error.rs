use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("already exists")]
    AlreadyExists,

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("storage operation timed out")]
    Timeout,

    #[error("storage task failed: {0}")]
    Task(String),
}

pub type Result<T> = std::result::Result<T, Error>;
