use thiserror::Error;

#[derive(Debug, Error)]
pub enum ControllerError {
    /// The controller loop has exited
    #[error("controller is not running")]
    Disconnected,

    #[error("configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, ControllerError>;
