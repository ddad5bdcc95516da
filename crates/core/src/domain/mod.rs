// Domain Layer - Wire types and messages

pub mod message;
pub mod request;
pub mod response;

// Re-exports
pub use message::{Language, MessageCatalog, MessageKey};
pub use request::{Headers, Request, JSONRPC_VERSION};
pub use response::{code, ErrorObject, Response};
