use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConnectError {
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Invalid descriptor: {0}")]
    InvalidDescriptor(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}
