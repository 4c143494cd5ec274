//! Request parsing for the edge-layer JSON format
//!
//! Parses the JSON document the edge/network layer sends for each inbound
//! HTTP request it wants classified.

use serde::Deserialize;
use std::collections::{BTreeMap, BTreeSet};

/// An inbound HTTP request as delivered by the edge layer
///
/// Header names are lowercased on construction so lookups are
/// case-insensitive. Immutable once received.
#[derive(Debug, Clone)]
pub struct Request {
    /// HTTP method (e.g., "GET", "POST", "OPTIONS")
    pub method: String,

    /// URI path (e.g., "/dev/hello")
    pub path: String,

    /// Header name to values, names lowercased
    pub headers: BTreeMap<String, Vec<String>>,

    /// Signal labels attached by upstream inspection
    /// (e.g., "non-browser-user-agent", "token:absent")
    pub signals: BTreeSet<String>,
}

impl<'de> Deserialize<'de> for Request {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        use serde::de::Error;

        // Deserialize as raw JSON first, then pick the pieces apart;
        // a header value may be a string or an array of strings.
        let value = serde_json::Value::deserialize(deserializer)?;
        let obj = value
            .as_object()
            .ok_or_else(|| D::Error::custom("request must be a JSON object"))?;

        let method = obj
            .get("method")
            .and_then(|v| v.as_str())
            .ok_or_else(|| D::Error::custom("missing or non-string field: method"))?
            .to_string();

        let path = obj
            .get("path")
            .and_then(|v| v.as_str())
            .ok_or_else(|| D::Error::custom("missing or non-string field: path"))?
            .to_string();

        let mut headers = BTreeMap::new();
        if let Some(raw_headers) = obj.get("headers") {
            let map = raw_headers
                .as_object()
                .ok_or_else(|| D::Error::custom("headers must be a JSON object"))?;
            for (name, raw) in map {
                let values = match raw {
                    serde_json::Value::String(s) => vec![s.clone()],
                    serde_json::Value::Array(items) => {
                        let mut values = Vec::with_capacity(items.len());
                        for item in items {
                            match item.as_str() {
                                Some(s) => values.push(s.to_string()),
                                None => {
                                    return Err(D::Error::custom(format!(
                                        "header '{}' must be a string or an array of strings",
                                        name
                                    )))
                                }
                            }
                        }
                        values
                    }
                    _ => {
                        return Err(D::Error::custom(format!(
                            "header '{}' must be a string or an array of strings",
                            name
                        )))
                    }
                };
                headers.insert(name.to_ascii_lowercase(), values);
            }
        }

        let mut signals = BTreeSet::new();
        if let Some(raw_signals) = obj.get("signals") {
            let items = raw_signals
                .as_array()
                .ok_or_else(|| D::Error::custom("signals must be an array of strings"))?;
            for item in items {
                match item.as_str() {
                    Some(s) => {
                        signals.insert(s.to_string());
                    }
                    None => return Err(D::Error::custom("signals must be an array of strings")),
                }
            }
        }

        Ok(Request {
            method,
            path,
            headers,
            signals,
        })
    }
}

impl Request {
    /// Create a request with no headers or signals
    pub fn new(method: impl Into<String>, path: impl Into<String>) -> Self {
        Request {
            method: method.into(),
            path: path.into(),
            headers: BTreeMap::new(),
            signals: BTreeSet::new(),
        }
    }

    /// Add a header value (builder style, for embedding and tests)
    pub fn with_header(mut self, name: &str, value: impl Into<String>) -> Self {
        self.headers
            .entry(name.to_ascii_lowercase())
            .or_default()
            .push(value.into());
        self
    }

    /// Add an upstream signal label (builder style)
    pub fn with_signal(mut self, signal: impl Into<String>) -> Self {
        self.signals.insert(signal.into());
        self
    }

    /// Parse a request from JSON
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// First value of a header, case-insensitive
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .get(&name.to_ascii_lowercase())
            .and_then(|values| values.first())
            .map(String::as_str)
    }

    /// All values of a header, case-insensitive
    pub fn header_values(&self, name: &str) -> &[String] {
        self.headers
            .get(&name.to_ascii_lowercase())
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Get a summary of the request for logging
    pub fn summary(&self) -> String {
        let truncated = if self.path.len() > 100 {
            // Paths are untrusted UTF-8; back off to a char boundary
            let mut end = 100;
            while !self.path.is_char_boundary(end) {
                end -= 1;
            }
            format!("{}...", &self.path[..end])
        } else {
            self.path.clone()
        };
        format!("{} {}", self.method, truncated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_minimal_request() {
        let json = r#"{"method":"GET","path":"/dev/hello"}"#;
        let request = Request::from_json(json).unwrap();
        assert_eq!(request.method, "GET");
        assert_eq!(request.path, "/dev/hello");
        assert!(request.headers.is_empty());
        assert!(request.signals.is_empty());
    }

    #[test]
    fn test_parse_headers_string_and_array() {
        let json = r#"{
            "method": "GET",
            "path": "/dev/hello",
            "headers": {
                "User-Agent": "curl/8.0",
                "Accept": ["text/html", "application/json"]
            }
        }"#;
        let request = Request::from_json(json).unwrap();
        assert_eq!(request.header("user-agent"), Some("curl/8.0"));
        assert_eq!(request.header("USER-AGENT"), Some("curl/8.0"));
        assert_eq!(request.header_values("accept").len(), 2);
    }

    #[test]
    fn test_parse_signals() {
        let json = r#"{"method":"GET","path":"/dev/hello","signals":["token:absent","http-library"]}"#;
        let request = Request::from_json(json).unwrap();
        assert!(request.signals.contains("token:absent"));
        assert!(request.signals.contains("http-library"));
    }

    #[test]
    fn test_parse_missing_method_fails() {
        let json = r#"{"path":"/dev/hello"}"#;
        assert!(Request::from_json(json).is_err());
    }

    #[test]
    fn test_parse_non_object_fails() {
        assert!(Request::from_json(r#"["GET","/dev/hello"]"#).is_err());
    }

    #[test]
    fn test_parse_non_string_header_value_fails() {
        let scalar = r#"{"method":"GET","path":"/","headers":{"x-count":7}}"#;
        assert!(Request::from_json(scalar).is_err());

        // Same strictness inside an array
        let array = r#"{"method":"GET","path":"/","headers":{"x-tag":["one",7]}}"#;
        assert!(Request::from_json(array).is_err());

        let not_object = r#"{"method":"GET","path":"/","headers":["x-tag"]}"#;
        assert!(Request::from_json(not_object).is_err());
    }

    #[test]
    fn test_parse_non_string_signal_fails() {
        let mixed = r#"{"method":"GET","path":"/","signals":["token:absent",7]}"#;
        assert!(Request::from_json(mixed).is_err());

        let not_array = r#"{"method":"GET","path":"/","signals":"token:absent"}"#;
        assert!(Request::from_json(not_array).is_err());
    }

    #[test]
    fn test_header_lookup_missing() {
        let request = Request::new("GET", "/dev/hello");
        assert_eq!(request.header("x-challenge-token"), None);
        assert!(request.header_values("x-challenge-token").is_empty());
    }

    #[test]
    fn test_summary() {
        let request = Request::new("POST", "/dev/hello");
        assert_eq!(request.summary(), "POST /dev/hello");
    }

    #[test]
    fn test_summary_truncates_long_path() {
        let request = Request::new("GET", "/".repeat(150));
        assert!(request.summary().ends_with("..."));
        assert!(request.summary().len() < 120);
    }

    #[test]
    fn test_summary_truncates_on_char_boundary() {
        // Byte 100 lands inside the two-byte "é"
        let path = format!("{}é{}", "a".repeat(99), "abc");
        let request = Request::new("GET", path);
        let summary = request.summary();
        assert!(summary.ends_with("..."));
        assert!(!summary.contains('é'));
    }
}
