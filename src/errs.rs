use thiserror::Error;

/// The five error kinds a stage can fail with. Input-format and IO errors are
/// stage-fatal but non-fatal to sibling stages already in flight; Config
/// errors are raised during chain construction, before any thread starts;
/// Internal errors indicate a broken invariant and should not be recoverable.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("malformed record or unsupported encoding: {0}")]
    InputFormat(String),

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("could not allocate resource: {0}")]
    Resource(String),

    #[error("internal invariant violated: {0}")]
    Internal(String),
}

pub type EngineResult<T> = Result<T, EngineError>;
