//! Response Headers
//!
//! CORS and security headers written on every response, and the preflight
//! rule for `OPTIONS`.

use crate::error::{Result, ServerError};
use hyper::header::{self, HeaderMap, HeaderValue};

const ALLOW_METHODS: &str = "POST, GET, OPTIONS";
const ALLOW_HEADERS: &str = "Content-Type, Authorization, OrgCode";
const MAX_AGE_SECS: &str = "86400";
pub const JSON_CONTENT_TYPE: &str = "application/json; charset=utf-8";

/// Header a preflight must announce before credentials are sent
const PREFLIGHT_REQUIRED: &str = "authorization";

/// CORS policy for the single allowed origin
#[derive(Debug, Clone)]
pub struct CorsPolicy {
    allow_origin: HeaderValue,
}

impl CorsPolicy {
    pub fn new(origin: &str) -> Result<Self> {
        let allow_origin = HeaderValue::from_str(origin)
            .map_err(|_| ServerError::InvalidOrigin(origin.to_string()))?;
        Ok(Self { allow_origin })
    }

    /// Write CORS, security and content-type headers.
    pub fn apply(&self, headers: &mut HeaderMap) {
        headers.insert(header::ACCESS_CONTROL_ALLOW_ORIGIN, self.allow_origin.clone());
        headers.insert(
            header::ACCESS_CONTROL_ALLOW_METHODS,
            HeaderValue::from_static(ALLOW_METHODS),
        );
        headers.insert(
            header::ACCESS_CONTROL_ALLOW_HEADERS,
            HeaderValue::from_static(ALLOW_HEADERS),
        );
        headers.insert(
            header::ACCESS_CONTROL_ALLOW_CREDENTIALS,
            HeaderValue::from_static("true"),
        );
        headers.insert(
            header::ACCESS_CONTROL_MAX_AGE,
            HeaderValue::from_static(MAX_AGE_SECS),
        );

        headers.insert(header::X_FRAME_OPTIONS, HeaderValue::from_static("DENY"));
        headers.insert(
            header::X_CONTENT_TYPE_OPTIONS,
            HeaderValue::from_static("nosniff"),
        );
        headers.insert(header::X_XSS_PROTECTION, HeaderValue::from_static("1"));
        headers.insert(header::CACHE_CONTROL, HeaderValue::from_static("no-store"));
        headers.insert(header::PRAGMA, HeaderValue::from_static("no-cache"));

        headers.insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static(JSON_CONTENT_TYPE),
        );
    }
}

/// A preflight passes only when it announces the authorization header.
pub fn preflight_allowed(request_headers: &HeaderMap) -> bool {
    request_headers
        .get_all(header::ACCESS_CONTROL_REQUEST_HEADERS)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|list| list.split(','))
        .any(|name| name.trim().eq_ignore_ascii_case(PREFLIGHT_REQUIRED))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_apply_sets_every_header() {
        let policy = CorsPolicy::new("https://app.example.com").unwrap();
        let mut headers = HeaderMap::new();
        policy.apply(&mut headers);

        assert_eq!(
            headers[header::ACCESS_CONTROL_ALLOW_ORIGIN],
            "https://app.example.com"
        );
        assert_eq!(headers[header::ACCESS_CONTROL_ALLOW_METHODS], ALLOW_METHODS);
        assert_eq!(headers[header::ACCESS_CONTROL_ALLOW_HEADERS], ALLOW_HEADERS);
        assert_eq!(headers[header::ACCESS_CONTROL_ALLOW_CREDENTIALS], "true");
        assert_eq!(headers[header::ACCESS_CONTROL_MAX_AGE], "86400");
        assert_eq!(headers[header::X_FRAME_OPTIONS], "DENY");
        assert_eq!(headers[header::X_CONTENT_TYPE_OPTIONS], "nosniff");
        assert_eq!(headers[header::X_XSS_PROTECTION], "1");
        assert_eq!(headers[header::CACHE_CONTROL], "no-store");
        assert_eq!(headers[header::PRAGMA], "no-cache");
        assert_eq!(headers[header::CONTENT_TYPE], JSON_CONTENT_TYPE);
    }

    #[test]
    fn test_invalid_origin_rejected() {
        let err = CorsPolicy::new("bad\norigin").unwrap_err();
        assert!(matches!(err, ServerError::InvalidOrigin(_)));
    }

    #[test]
    fn test_preflight_requires_authorization() {
        let mut headers = HeaderMap::new();
        assert!(!preflight_allowed(&headers));

        headers.insert(
            header::ACCESS_CONTROL_REQUEST_HEADERS,
            HeaderValue::from_static("content-type"),
        );
        assert!(!preflight_allowed(&headers));

        headers.insert(
            header::ACCESS_CONTROL_REQUEST_HEADERS,
            HeaderValue::from_static("Content-Type, AUTHORIZATION"),
        );
        assert!(preflight_allowed(&headers));
    }
}
