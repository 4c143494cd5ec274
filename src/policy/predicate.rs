//! Predicate trees for rule matching
//!
//! A small closed tagged tree (AND/OR/NOT/MATCH) evaluated by a pure
//! recursive function. No dynamic dispatch, no reflection.

use serde::Deserialize;

use crate::input::Request;

/// Request field a MATCH leaf inspects
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchField {
    UriPath,
    Method,
    Header,
}

/// Comparison operator for a MATCH leaf
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchOp {
    /// Byte-equality with the configured value
    Exact,

    /// Substring presence
    Contains,
}

/// Optional case normalization applied to the field value before comparing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Transform {
    #[default]
    None,
    Lowercase,
}

impl Transform {
    fn apply(&self, value: &str) -> String {
        match self {
            Transform::None => value.to_string(),
            Transform::Lowercase => value.to_ascii_lowercase(),
        }
    }
}

/// A boolean expression over request fields
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Predicate {
    /// All children must match (short-circuits left to right)
    And { children: Vec<Predicate> },

    /// Any child must match (short-circuits left to right)
    Or { children: Vec<Predicate> },

    /// Child must not match
    Not { child: Box<Predicate> },

    /// Leaf comparison against one request field
    Match {
        field: MatchField,
        #[serde(default)]
        transform: Transform,
        op: MatchOp,
        value: String,
        /// Name of the header to inspect; required when field = "header"
        #[serde(default)]
        header: Option<String>,
    },
}

impl Predicate {
    /// Evaluate against a request. Pure: no side effects, no I/O.
    pub fn eval(&self, request: &Request) -> bool {
        match self {
            Predicate::And { children } => children.iter().all(|c| c.eval(request)),
            Predicate::Or { children } => children.iter().any(|c| c.eval(request)),
            Predicate::Not { child } => !child.eval(request),
            Predicate::Match {
                field,
                transform,
                op,
                value,
                header,
            } => match field {
                MatchField::UriPath => compare(&transform.apply(&request.path), op, value),
                MatchField::Method => compare(&transform.apply(&request.method), op, value),
                MatchField::Header => {
                    let name = match header {
                        Some(name) => name,
                        // Rejected at policy load; unreachable for a loaded policy
                        None => return false,
                    };
                    request
                        .header_values(name)
                        .iter()
                        .any(|v| compare(&transform.apply(v), op, value))
                }
            },
        }
    }
}

fn compare(field_value: &str, op: &MatchOp, value: &str) -> bool {
    match op {
        MatchOp::Exact => field_value == value,
        MatchOp::Contains => field_value.contains(value),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn leaf(field: MatchField, op: MatchOp, value: &str) -> Predicate {
        Predicate::Match {
            field,
            transform: Transform::None,
            op,
            value: value.to_string(),
            header: None,
        }
    }

    #[test]
    fn test_match_path_contains() {
        let pred = leaf(MatchField::UriPath, MatchOp::Contains, "dev");
        assert!(pred.eval(&Request::new("GET", "/dev/hello")));
        assert!(!pred.eval(&Request::new("GET", "/prod/hello")));
    }

    #[test]
    fn test_match_method_exact() {
        let pred = leaf(MatchField::Method, MatchOp::Exact, "OPTIONS");
        assert!(pred.eval(&Request::new("OPTIONS", "/dev/hello")));
        assert!(!pred.eval(&Request::new("GET", "/dev/hello")));
    }

    #[test]
    fn test_match_header_any_value() {
        let pred = Predicate::Match {
            field: MatchField::Header,
            transform: Transform::Lowercase,
            op: MatchOp::Contains,
            value: "curl".to_string(),
            header: Some("user-agent".to_string()),
        };
        let hit = Request::new("GET", "/").with_header("User-Agent", "Curl/8.0");
        let miss = Request::new("GET", "/").with_header("User-Agent", "Mozilla/5.0");
        let absent = Request::new("GET", "/");
        assert!(pred.eval(&hit));
        assert!(!pred.eval(&miss));
        assert!(!pred.eval(&absent));
    }

    #[test]
    fn test_lowercase_transform() {
        let pred = Predicate::Match {
            field: MatchField::UriPath,
            transform: Transform::Lowercase,
            op: MatchOp::Contains,
            value: "dev".to_string(),
            header: None,
        };
        assert!(pred.eval(&Request::new("GET", "/DEV/hello")));
    }

    #[test]
    fn test_exact_is_case_sensitive_without_transform() {
        let pred = leaf(MatchField::Method, MatchOp::Exact, "OPTIONS");
        assert!(!pred.eval(&Request::new("options", "/dev/hello")));
    }

    #[test]
    fn test_and_or_not_composition() {
        // path contains "dev" AND NOT method = OPTIONS
        let pred = Predicate::And {
            children: vec![
                leaf(MatchField::UriPath, MatchOp::Contains, "dev"),
                Predicate::Not {
                    child: Box::new(leaf(MatchField::Method, MatchOp::Exact, "OPTIONS")),
                },
            ],
        };
        assert!(pred.eval(&Request::new("GET", "/dev/hello")));
        assert!(!pred.eval(&Request::new("OPTIONS", "/dev/hello")));
        assert!(!pred.eval(&Request::new("GET", "/prod/hello")));

        let either = Predicate::Or {
            children: vec![
                leaf(MatchField::UriPath, MatchOp::Contains, "dev"),
                leaf(MatchField::UriPath, MatchOp::Contains, "api"),
            ],
        };
        assert!(either.eval(&Request::new("GET", "/api/hello")));
        assert!(!either.eval(&Request::new("GET", "/prod/hello")));
    }

    #[test]
    fn test_empty_and_matches_everything() {
        let pred = Predicate::And { children: vec![] };
        assert!(pred.eval(&Request::new("GET", "/")));
    }

    #[test]
    fn test_empty_or_matches_nothing() {
        let pred = Predicate::Or { children: vec![] };
        assert!(!pred.eval(&Request::new("GET", "/")));
    }

    #[test]
    fn test_header_leaf_without_name_never_matches() {
        let pred = Predicate::Match {
            field: MatchField::Header,
            transform: Transform::None,
            op: MatchOp::Exact,
            value: "x".to_string(),
            header: None,
        };
        assert!(!pred.eval(&Request::new("GET", "/").with_header("a", "x")));
    }

    #[test]
    fn test_deserialize_from_toml() {
        let toml = r#"
            kind = "and"

            [[children]]
            kind = "match"
            field = "uri_path"
            op = "contains"
            value = "dev"

            [[children]]
            kind = "not"

            [children.child]
            kind = "match"
            field = "method"
            op = "exact"
            value = "OPTIONS"
        "#;
        let pred: Predicate = toml::from_str(toml).unwrap();
        assert!(pred.eval(&Request::new("GET", "/dev/hello")));
        assert!(!pred.eval(&Request::new("OPTIONS", "/dev/hello")));
    }
}
