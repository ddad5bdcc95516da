// Request Domain Model

use serde::Deserialize;
use serde_json::value::RawValue;
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Protocol version written into every response
pub const JSONRPC_VERSION: &str = "2.0";

/// Read-only, case-insensitive header multi-map captured from the HTTP call
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Headers {
    values: BTreeMap<String, Vec<String>>,
}

impl Headers {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a value, keeping earlier values for the same name.
    pub fn append(&mut self, name: impl AsRef<str>, value: impl Into<String>) {
        self.values
            .entry(name.as_ref().to_ascii_lowercase())
            .or_default()
            .push(value.into());
    }

    /// First value for `name`.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.get_all(name).first().map(String::as_str)
    }

    /// Every value for `name`, in arrival order.
    pub fn get_all(&self, name: &str) -> &[String] {
        self.values
            .get(&name.to_ascii_lowercase())
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// True when `name` is present with at least one non-blank value.
    pub fn has_value(&self, name: &str) -> bool {
        self.get_all(name).iter().any(|v| !v.trim().is_empty())
    }
}

impl<K, V> FromIterator<(K, V)> for Headers
where
    K: AsRef<str>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut headers = Headers::new();
        for (name, value) in iter {
            headers.append(name, value);
        }
        headers
    }
}

/// One JSON-RPC call as received on the wire
///
/// Missing fields decode to their empty form so the parser, not serde,
/// decides which omissions are fatal.
#[derive(Debug, Clone, Deserialize)]
pub struct Request {
    #[serde(default)]
    pub jsonrpc: String,

    #[serde(default)]
    pub method: String,

    /// Undecoded params; decoded later against the handler's declared type
    #[serde(default)]
    pub params: Option<Box<RawValue>>,

    /// Correlation id (number, string or null)
    #[serde(default)]
    pub id: Value,

    #[serde(skip)]
    pub headers: Arc<Headers>,
}

impl Request {
    /// Raw params, if the client sent any
    pub fn raw_params(&self) -> Option<&RawValue> {
        self.params.as_deref()
    }

    /// Fields required of every batch element
    pub fn has_batch_envelope(&self) -> bool {
        !self.jsonrpc.is_empty() && !self.method.is_empty() && !self.id.is_null()
    }
}
