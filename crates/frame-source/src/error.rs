use thiserror::Error;

pub type Result<T, E = Error> = core::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum Error {
    /// The device or file could not be opened.
    #[error("source unavailable: {0}")]
    SourceUnavailable(String),
    #[error("backend error: {0}")]
    Backend(String),
    #[error("I/O error: {0}")]
    Io(String),
    #[error("invalid config: {0}")]
    Config(String),
}
