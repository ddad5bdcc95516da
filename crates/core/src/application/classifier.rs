// Error Classifier - RpcError -> JSON-RPC error object

use crate::domain::{code, ErrorObject, MessageCatalog, MessageKey};
use crate::error::{ErrorKind, RpcError};
use serde_json::Value;
use tracing::{error, warn};

/// Storage drivers report oversized column values with this phrase
const VALUE_TOO_LONG: &str = "value too long";

/// Maps each error kind to a wire code and a localized message
#[derive(Debug, Clone, Copy, Default)]
pub struct ErrorClassifier {
    catalog: MessageCatalog,
}

impl ErrorClassifier {
    pub fn new(catalog: MessageCatalog) -> Self {
        Self { catalog }
    }

    /// Classify and log. Client-fault kinds keep their detail in `data`.
    pub fn classify(&self, err: &RpcError) -> ErrorObject {
        let kind = err.kind();
        let chain = err.chain();
        if kind == ErrorKind::Authentication {
            warn!(kind = ?kind, error = %chain, "Request rejected");
        } else {
            error!(kind = ?kind, error = %chain, "Request failed");
        }

        let (code, message) = match err {
            RpcError::Parse(_) => (code::PARSE_ERROR, self.localized(MessageKey::Parse)),
            RpcError::InvalidRequest(_) => (
                code::INVALID_REQUEST,
                self.localized(MessageKey::InvalidRequest),
            ),
            RpcError::MethodNotFound(_) => (
                code::METHOD_NOT_FOUND,
                self.localized(MessageKey::MethodNotFound),
            ),
            RpcError::InvalidParams(_) => (
                code::INVALID_PARAMS,
                self.localized(MessageKey::InvalidParams),
            ),
            RpcError::TooLongParameter(_) => (
                code::INVALID_PARAMS,
                self.localized(MessageKey::TooLongParameter),
            ),
            RpcError::Database(msg) if msg.contains(VALUE_TOO_LONG) => (
                code::INVALID_PARAMS,
                self.localized(MessageKey::TooLongParameter),
            ),
            RpcError::Database(_) => (code::SERVER_ERROR, self.localized(MessageKey::Database)),
            RpcError::Internal(_) => (code::INTERNAL_ERROR, self.localized(MessageKey::Internal)),
            RpcError::Authentication(_) => (
                code::SERVER_ERROR,
                self.localized(MessageKey::Authentication),
            ),
            RpcError::Server { message, .. } if message.trim().is_empty() => {
                (code::SERVER_ERROR, self.localized(MessageKey::Server))
            }
            RpcError::Server { message, .. } => (code::SERVER_ERROR, message.clone()),
        };

        let object = ErrorObject::new(code, message);
        if is_client_fault(kind) {
            object.with_data(Value::String(err.detail().to_string()))
        } else {
            object
        }
    }

    fn localized(&self, key: MessageKey) -> String {
        self.catalog.message(key).to_string()
    }
}

fn is_client_fault(kind: ErrorKind) -> bool {
    matches!(
        kind,
        ErrorKind::Parse
            | ErrorKind::InvalidRequest
            | ErrorKind::MethodNotFound
            | ErrorKind::InvalidParams
    )
}
