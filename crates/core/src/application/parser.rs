//! Request Parser
//!
//! Turns a raw HTTP body into JSON-RPC requests. A body whose first
//! non-whitespace byte is `[` is a batch and is decoded one element at a
//! time; anything else is decoded as a single request object.

use crate::domain::{Headers, Request};
use crate::error::{Result, RpcError};
use serde::de::{self, Deserializer as _, SeqAccess, Visitor};
use serde_json::error::Category;
use std::fmt;
use std::sync::Arc;

const BATCH_OPEN: u8 = b'[';

/// Header carrying the proxy chain; the rightmost hop is the client
pub const FORWARDED_FOR: &str = "x-forwarded-for";

const MISSING_ENVELOPE: &str = "'jsonrpc', 'method' and 'id' are required";

/// Stateless parser for request bodies
pub struct RequestParser;

impl RequestParser {
    /// Parse `body` into one or more requests, attaching `headers` to each.
    ///
    /// Never returns an empty list: an empty body and `[]` are parse errors.
    pub fn parse(body: &[u8], headers: Arc<Headers>) -> Result<Vec<Request>> {
        let first = body
            .iter()
            .find(|b| !b.is_ascii_whitespace())
            .ok_or_else(|| RpcError::Parse("empty request".to_string()))?;

        let mut requests = if *first == BATCH_OPEN {
            Self::parse_batch(body)?
        } else {
            vec![Self::parse_single(body)?]
        };

        if requests.is_empty() {
            return Err(RpcError::Parse("empty batch".to_string()));
        }

        for request in &mut requests {
            request.headers = headers.clone();
        }
        Ok(requests)
    }

    fn parse_single(body: &[u8]) -> Result<Request> {
        serde_json::from_slice(body).map_err(decode_error)
    }

    fn parse_batch(body: &[u8]) -> Result<Vec<Request>> {
        let mut de = serde_json::Deserializer::from_slice(body);
        let requests = (&mut de).deserialize_seq(BatchVisitor).map_err(decode_error)?;
        // Anything after the closing bracket
        de.end().map_err(decode_error)?;
        Ok(requests)
    }
}

/// Rightmost entry of the last forwarded-for header, if any
pub fn forwarded_client(headers: &Headers) -> Option<String> {
    headers
        .get_all(FORWARDED_FOR)
        .last()?
        .rsplit(',')
        .map(str::trim)
        .find(|hop| !hop.is_empty())
        .map(str::to_owned)
}

/// Malformed JSON is a parse error; well-formed JSON of the wrong shape is an
/// invalid request.
fn decode_error(err: serde_json::Error) -> RpcError {
    match err.classify() {
        Category::Data => RpcError::InvalidRequest(err.to_string()),
        Category::Syntax | Category::Eof | Category::Io => RpcError::Parse(err.to_string()),
    }
}

/// Decodes batch elements in order, stopping at the first one without a
/// complete envelope.
struct BatchVisitor;

impl<'de> Visitor<'de> for BatchVisitor {
    type Value = Vec<Request>;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("an array of JSON-RPC request objects")
    }

    fn visit_seq<A>(self, mut seq: A) -> std::result::Result<Self::Value, A::Error>
    where
        A: SeqAccess<'de>,
    {
        let mut requests = Vec::with_capacity(seq.size_hint().unwrap_or(0));
        while let Some(request) = seq.next_element::<Request>()? {
            if !request.has_batch_envelope() {
                return Err(de::Error::custom(MISSING_ENVELOPE));
            }
            requests.push(request);
        }
        Ok(requests)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn parse(body: &str) -> Result<Vec<Request>> {
        RequestParser::parse(body.as_bytes(), Arc::new(Headers::new()))
    }

    #[test]
    fn test_single_request() {
        let requests = parse(r#"{"jsonrpc":"2.0","method":"getSuccess","params":{},"id":1}"#).unwrap();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].method, "getSuccess");
        assert_eq!(requests[0].id, json!(1));
    }

    #[test]
    fn test_single_request_with_null_id_is_accepted() {
        let requests = parse(r#"{"jsonrpc":"2.0","method":"getSuccess","id":null}"#).unwrap();
        assert!(requests[0].id.is_null());
    }

    #[test]
    fn test_leading_whitespace_before_batch() {
        let requests = parse(
            "\n\t [{\"jsonrpc\":\"2.0\",\"method\":\"a\",\"id\":1},{\"jsonrpc\":\"2.0\",\"method\":\"b\",\"id\":\"two\"}]",
        )
        .unwrap();
        let methods: Vec<_> = requests.iter().map(|r| r.method.as_str()).collect();
        assert_eq!(methods, ["a", "b"]);
        assert_eq!(requests[1].id, json!("two"));
    }

    #[test]
    fn test_empty_body_is_parse_error() {
        assert!(matches!(parse(""), Err(RpcError::Parse(_))));
        assert!(matches!(parse("  \r\n "), Err(RpcError::Parse(_))));
    }

    #[test]
    fn test_empty_batch_is_parse_error() {
        assert!(matches!(parse("[]"), Err(RpcError::Parse(_))));
        assert!(matches!(parse(" [ ] "), Err(RpcError::Parse(_))));
    }

    #[test]
    fn test_malformed_single_is_parse_error() {
        assert!(matches!(parse(r#"{"jsonrpc":"2.0","#), Err(RpcError::Parse(_))));
        assert!(matches!(parse("{not json}"), Err(RpcError::Parse(_))));
    }

    #[test]
    fn test_wrong_types_single_is_invalid_request() {
        let err = parse(r#"{"jsonrpc":"2.0","method":42,"id":1}"#).unwrap_err();
        assert!(matches!(err, RpcError::InvalidRequest(_)), "got {err:?}");

        let err = parse(r#""just a string""#).unwrap_err();
        assert!(matches!(err, RpcError::InvalidRequest(_)), "got {err:?}");
    }

    #[test]
    fn test_batch_element_missing_id_aborts_batch() {
        let err = parse(
            r#"[{"jsonrpc":"2.0","method":"a","id":1},{"jsonrpc":"2.0","method":"b"}]"#,
        )
        .unwrap_err();
        match err {
            RpcError::InvalidRequest(msg) => assert!(msg.contains("required"), "{msg}"),
            other => panic!("expected InvalidRequest, got {other:?}"),
        }
    }

    #[test]
    fn test_batch_element_empty_method_aborts_batch() {
        let err = parse(r#"[{"jsonrpc":"2.0","method":"","id":1}]"#).unwrap_err();
        assert!(matches!(err, RpcError::InvalidRequest(_)));
    }

    #[test]
    fn test_batch_element_missing_version_aborts_batch() {
        let err = parse(r#"[{"method":"a","id":1}]"#).unwrap_err();
        assert!(matches!(err, RpcError::InvalidRequest(_)));
    }

    #[test]
    fn test_batch_element_wrong_type_is_invalid_request() {
        let err = parse(r#"[{"jsonrpc":"2.0","method":"a","id":1}, 7]"#).unwrap_err();
        assert!(matches!(err, RpcError::InvalidRequest(_)));
    }

    #[test]
    fn test_truncated_batch_is_parse_error() {
        let err = parse(r#"[{"jsonrpc":"2.0","method":"a","id":1},"#).unwrap_err();
        assert!(matches!(err, RpcError::Parse(_)));
    }

    #[test]
    fn test_trailing_garbage_after_batch_is_parse_error() {
        let err = parse(r#"[{"jsonrpc":"2.0","method":"a","id":1}] x"#).unwrap_err();
        assert!(matches!(err, RpcError::Parse(_)));
    }

    #[test]
    fn test_headers_attached_to_every_request() {
        let headers: Headers = [("Authorization", "token")].into_iter().collect();
        let requests = RequestParser::parse(
            br#"[{"jsonrpc":"2.0","method":"a","id":1},{"jsonrpc":"2.0","method":"b","id":2}]"#,
            Arc::new(headers),
        )
        .unwrap();
        assert!(requests
            .iter()
            .all(|r| r.headers.get("authorization") == Some("token")));
    }

    #[test]
    fn test_forwarded_client_takes_rightmost_hop() {
        let mut headers = Headers::new();
        headers.append("X-Forwarded-For", "198.51.100.1");
        headers.append("X-Forwarded-For", "203.0.113.5, 10.0.0.7 ");
        assert_eq!(forwarded_client(&headers).as_deref(), Some("10.0.0.7"));
    }

    #[test]
    fn test_forwarded_client_absent() {
        assert!(forwarded_client(&Headers::new()).is_none());
    }
}
