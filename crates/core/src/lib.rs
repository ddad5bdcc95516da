// rpcgate Core - JSON-RPC protocol, dispatch and ports
// NO HTTP dependencies; the transport lives in rpcgate-api-http

pub mod application;
pub mod domain;
pub mod error;
pub mod port;

pub use error::{ErrorKind, Result, RpcError};

pub const VERSION: &str = env!("CARGO_PKG_VERSION");
