// Response Assembler - shape supervised responses into the HTTP body

use super::classifier::ErrorClassifier;
use crate::domain::Response;
use crate::error::{Result, RpcError};
use serde_json::Value;

/// One response is written as an object, several as an array
#[derive(Debug, Clone, Copy, Default)]
pub struct ResponseAssembler {
    classifier: ErrorClassifier,
}

impl ResponseAssembler {
    pub fn new(classifier: ErrorClassifier) -> Self {
        Self { classifier }
    }

    /// Serialize the batch. An empty batch becomes one Internal error with
    /// a null id, so a body is always produced.
    pub fn assemble(&self, responses: &[Response]) -> Result<Vec<u8>> {
        let encoded = match responses {
            [] => serde_json::to_vec(&self.error_response(&RpcError::Internal(
                "no responses to assemble".to_string(),
            ))),
            [single] => serde_json::to_vec(single),
            many => serde_json::to_vec(many),
        };
        encoded.map_err(|e| RpcError::Internal(format!("failed to encode response: {}", e)))
    }

    /// Single classified error response with `id: null`
    pub fn error_response(&self, err: &RpcError) -> Response {
        Response::failure(Value::Null, self.classifier.classify(err))
    }

    pub fn render_error(&self, err: &RpcError) -> Result<Vec<u8>> {
        serde_json::to_vec(&self.error_response(err))
            .map_err(|e| RpcError::Internal(format!("failed to encode response: {}", e)))
    }
}
