//! JSON-RPC over HTTP
//!
//! hyper HTTP/1.1 front end for the rpcgate pipeline: CORS and security
//! headers, preflight handling, per-call deadlines and the method table.

pub mod access_log;
pub mod error;
pub mod handler;
pub mod headers;
pub mod methods;
pub mod server;

pub use access_log::AccessLog;
pub use error::ServerError;
pub use handler::RpcHttpHandler;
pub use headers::CorsPolicy;
pub use methods::build_registry;
pub use server::HttpServer;
