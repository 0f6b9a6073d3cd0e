use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Compilation failed: {0}")]
    Compilation(String),

    #[error("Timeout after {0} seconds")]
    Timeout(u64),

    #[error("Invalid trace payload: {0}")]
    Protocol(String),

    #[error("Process error: {0}")]
    Process(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
