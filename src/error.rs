use crate::provider::BackendKind;
use thiserror::Error;

/// Errors that can occur when using the crossllm library.
#[derive(Error, Debug)]
pub enum Error {
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("Invalid response")]
    InvalidResponse,

    #[error("Invalid data: {0}")]
    InvalidData(String),

    #[error("Decoding error: {0}")]
    Decoding(#[from] serde_json::Error),

    #[error("Timeout")]
    Timeout,

    #[error("Server error ({code})")]
    Server { code: u16 },

    #[error("Operation `{operation}` is not supported by the {backend} backend")]
    InvalidService {
        operation: &'static str,
        backend: BackendKind,
    },

    #[error("Unsupported import: {0}")]
    UnsupportedImport(String),
}

impl Error {
    pub fn invalid_data(message: impl Into<String>) -> Self {
        Error::InvalidData(message.into())
    }

    pub fn server(code: u16) -> Self {
        Error::Server { code }
    }

    pub fn invalid_service(operation: &'static str, backend: BackendKind) -> Self {
        Error::InvalidService { operation, backend }
    }

    pub fn unsupported_import(message: impl Into<String>) -> Self {
        Error::UnsupportedImport(message.into())
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        if err.kind() == std::io::ErrorKind::TimedOut {
            Error::Timeout
        } else {
            Error::InvalidData(err.to_string())
        }
    }
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Error::Timeout
        } else if err.is_builder() {
            Error::InvalidUrl(err.to_string())
        } else {
            Error::InvalidData(err.to_string())
        }
    }
}
