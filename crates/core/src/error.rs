// Central Error Type for the RPC pipeline

use std::error::Error as StdError;
use thiserror::Error;

type BoxError = Box<dyn StdError + Send + Sync + 'static>;

/// Declared kind of an [`RpcError`]; classification keys off this, never off
/// the rendered message (the storage "value too long" probe is the one exception).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Parse,
    InvalidRequest,
    MethodNotFound,
    InvalidParams,
    TooLongParameter,
    Internal,
    Authentication,
    Database,
    Server,
}

/// Pipeline-level error type
#[derive(Error, Debug)]
pub enum RpcError {
    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Method not found: {0}")]
    MethodNotFound(String),

    #[error("Invalid params: {0}")]
    InvalidParams(String),

    #[error("Parameter too long: {0}")]
    TooLongParameter(String),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Authentication failed: {0}")]
    Authentication(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("{message}")]
    Server {
        message: String,
        #[source]
        source: Option<BoxError>,
    },
}

/// Result type alias using RpcError
pub type Result<T> = std::result::Result<T, RpcError>;

impl RpcError {
    /// Wrap an arbitrary failure as a server error, keeping it as the source.
    pub fn server<E>(err: E) -> Self
    where
        E: StdError + Send + Sync + 'static,
    {
        RpcError::Server {
            message: err.to_string(),
            source: Some(Box::new(err)),
        }
    }

    /// Server error with a plain message and no underlying cause.
    pub fn server_message(message: impl Into<String>) -> Self {
        RpcError::Server {
            message: message.into(),
            source: None,
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            RpcError::Parse(_) => ErrorKind::Parse,
            RpcError::InvalidRequest(_) => ErrorKind::InvalidRequest,
            RpcError::MethodNotFound(_) => ErrorKind::MethodNotFound,
            RpcError::InvalidParams(_) => ErrorKind::InvalidParams,
            RpcError::TooLongParameter(_) => ErrorKind::TooLongParameter,
            RpcError::Internal(_) => ErrorKind::Internal,
            RpcError::Authentication(_) => ErrorKind::Authentication,
            RpcError::Database(_) => ErrorKind::Database,
            RpcError::Server { .. } => ErrorKind::Server,
        }
    }

    /// The message carried by the variant, without the kind prefix.
    pub fn detail(&self) -> &str {
        match self {
            RpcError::Parse(msg)
            | RpcError::InvalidRequest(msg)
            | RpcError::MethodNotFound(msg)
            | RpcError::InvalidParams(msg)
            | RpcError::TooLongParameter(msg)
            | RpcError::Internal(msg)
            | RpcError::Authentication(msg)
            | RpcError::Database(msg) => msg,
            RpcError::Server { message, .. } => message,
        }
    }

    /// Render the error followed by every source in its chain, joined by `: `.
    /// A source whose text repeats the previous link is skipped.
    pub fn chain(&self) -> String {
        let mut last = self.to_string();
        let mut rendered = last.clone();
        let mut source = StdError::source(self);
        while let Some(cause) = source {
            let text = cause.to_string();
            if text != last {
                rendered.push_str(": ");
                rendered.push_str(&text);
            }
            last = text;
            source = cause.source();
        }
        rendered
    }
}
