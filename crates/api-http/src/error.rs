//! HTTP Server Errors

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ServerError {
    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to read local address: {0}")]
    LocalAddr(#[source] std::io::Error),

    #[error("invalid CORS origin '{0}'")]
    InvalidOrigin(String),
}

impl ServerError {
    pub fn bind(addr: impl ToString, source: std::io::Error) -> Self {
        ServerError::Bind {
            addr: addr.to_string(),
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, ServerError>;
