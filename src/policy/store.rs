//! Policy loading and validation
//!
//! Parses the declarative TOML rule list into an immutable [`Policy`],
//! rejecting malformed or ambiguous input at load time. A well-formed
//! policy has no per-request error path.

use serde::Deserialize;
use std::path::Path;
use thiserror::Error;

use super::predicate::{MatchField, MatchOp, Predicate, Transform};
use super::{Action, Policy, Rule};

/// Errors detected while loading a policy. Fatal to startup.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read policy file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed policy: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("duplicate rule name '{0}'")]
    DuplicateName(String),

    #[error(
        "rules '{first}' and '{second}' share priority {priority} and are not provably disjoint"
    )]
    AmbiguousPriority {
        first: String,
        second: String,
        priority: u32,
    },

    #[error("rule '{rule}': header match is missing the header name")]
    MissingHeaderName { rule: String },

    #[error("rule '{rule}': override for signal '{signal}' must be 'challenge' or 'block'")]
    InvalidOverride { rule: String, signal: String },

    #[error("default_action must be 'allow', 'block', or 'challenge'")]
    InvalidDefaultAction,
}

#[derive(Debug, Deserialize)]
struct PolicyFile {
    #[serde(default = "default_allow")]
    default_action: Action,

    #[serde(default, rename = "rule")]
    rules: Vec<Rule>,
}

fn default_allow() -> Action {
    Action::Allow
}

/// Loads and validates policies
pub struct PolicyStore;

impl PolicyStore {
    /// Load a policy from TOML source
    pub fn load(source: &str) -> Result<Policy, ConfigError> {
        let file: PolicyFile = toml::from_str(source)?;

        if !file.default_action.is_terminal() {
            return Err(ConfigError::InvalidDefaultAction);
        }

        for rule in &file.rules {
            validate_rule(rule)?;
        }

        let mut seen = std::collections::BTreeSet::new();
        for rule in &file.rules {
            if !seen.insert(rule.name.as_str()) {
                return Err(ConfigError::DuplicateName(rule.name.clone()));
            }
        }

        // Stable sort keeps declaration order within a priority
        let mut rules = file.rules;
        rules.sort_by_key(|r| r.priority);
        check_priority_ties(&rules)?;

        Ok(Policy::new(rules, file.default_action))
    }

    /// Load a policy from a file path
    pub fn load_file(path: &Path) -> Result<Policy, ConfigError> {
        let source = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::load(&source)
    }
}

fn validate_rule(rule: &Rule) -> Result<(), ConfigError> {
    if header_leaf_missing_name(&rule.predicate) {
        return Err(ConfigError::MissingHeaderName {
            rule: rule.name.clone(),
        });
    }

    for entry in &rule.overrides {
        if !matches!(entry.action, Action::Challenge | Action::Block) {
            return Err(ConfigError::InvalidOverride {
                rule: rule.name.clone(),
                signal: entry.signal.clone(),
            });
        }
    }

    Ok(())
}

fn header_leaf_missing_name(predicate: &Predicate) -> bool {
    match predicate {
        Predicate::And { children } | Predicate::Or { children } => {
            children.iter().any(header_leaf_missing_name)
        }
        Predicate::Not { child } => header_leaf_missing_name(child),
        Predicate::Match { field, header, .. } => {
            *field == MatchField::Header && header.is_none()
        }
    }
}

fn check_priority_ties(rules: &[Rule]) -> Result<(), ConfigError> {
    for (i, rule) in rules.iter().enumerate() {
        for other in &rules[i + 1..] {
            if other.priority != rule.priority {
                break;
            }
            if !provably_disjoint(&rule.predicate, &other.predicate) {
                return Err(ConfigError::AmbiguousPriority {
                    first: rule.name.clone(),
                    second: other.name.clone(),
                    priority: rule.priority,
                });
            }
        }
    }
    Ok(())
}

type ExactConstraint = (MatchField, Transform, String);

// Two predicates are provably disjoint when each conjuncts an EXACT match
// on the same single-valued field (method or uri_path) with a different
// value. Header constraints never count: a header is multi-valued, so a
// request carrying both values satisfies both predicates at once.
// Anything weaker is treated as potentially overlapping and rejected.
fn provably_disjoint(a: &Predicate, b: &Predicate) -> bool {
    let mut constraints_a = Vec::new();
    let mut constraints_b = Vec::new();
    collect_exact_conjuncts(a, &mut constraints_a);
    collect_exact_conjuncts(b, &mut constraints_b);

    constraints_a.iter().any(|(field_a, transform_a, value_a)| {
        constraints_b.iter().any(|(field_b, transform_b, value_b)| {
            field_a == field_b && transform_a == transform_b && value_a != value_b
        })
    })
}

fn collect_exact_conjuncts(predicate: &Predicate, out: &mut Vec<ExactConstraint>) {
    match predicate {
        Predicate::And { children } => {
            for child in children {
                collect_exact_conjuncts(child, out);
            }
        }
        Predicate::Match {
            field,
            transform,
            op: MatchOp::Exact,
            value,
            ..
        } if *field != MatchField::Header => out.push((*field, *transform, value.clone())),
        _ => {}
    }
}
