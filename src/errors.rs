use crate::types::Capability;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DomError {
    #[error("Invalid selector: {0}")]
    InvalidSelector(String),

    #[error("Host capability unavailable: {0}")]
    Unsupported(Capability),

    #[error("Element not found: {0}")]
    ElementNotFound(String),

    #[error("Element was removed from the document")]
    Detached,

    #[error("Script execution failed: {0}")]
    ScriptFailed(String),

    #[error("Smooth scroll failed: {0}")]
    SmoothScrollFailed(String),

    #[error("Host launch failed: {0}")]
    LaunchFailed(String),

    #[error("Navigation failed: {0}")]
    NavigationFailed(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Anyhow error: {0}")]
    Anyhow(String),
}

pub type Result<T> = std::result::Result<T, DomError>;

// headless_chrome reports everything through anyhow
impl From<anyhow::Error> for DomError {
    fn from(err: anyhow::Error) -> Self {
        DomError::Anyhow(err.to_string())
    }
}

impl DomError {
    pub fn script<E: std::fmt::Display>(err: E) -> Self {
        DomError::ScriptFailed(err.to_string())
    }

    /// Whether this error means the host simply lacks a feature.
    pub fn is_unsupported(&self) -> bool {
        matches!(self, DomError::Unsupported(_))
    }
}
