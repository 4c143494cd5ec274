//! Policy definitions for the request gatekeeper
//!
//! Rules, actions, and the immutable policy snapshot loaded at start.

pub mod defaults;
pub mod predicate;
pub mod store;

use serde::Deserialize;
use std::collections::BTreeSet;

use crate::output::Outcome;
use self::predicate::Predicate;

/// Action a rule takes when its predicate matches
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    Allow,
    Block,
    Challenge,

    /// Proceed to the next rule
    Continue,
}

impl Action {
    /// Terminal actions decide the request; Continue does not
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Action::Continue)
    }

    /// The outcome this action decides, if terminal
    pub fn outcome(&self) -> Option<Outcome> {
        match self {
            Action::Allow => Some(Outcome::Allow),
            Action::Block => Some(Outcome::Block),
            Action::Challenge => Some(Outcome::Challenge),
            Action::Continue => None,
        }
    }
}

/// Maps an upstream-detected signal to an action, layered over the base
/// action of the rule it belongs to
#[derive(Debug, Clone, Deserialize)]
pub struct SignalOverride {
    /// Signal label to look for (e.g., "non-browser-user-agent")
    pub signal: String,

    /// Action taken when the signal is present (challenge or block)
    pub action: Action,
}

/// One ordered rule: predicate, base action, and signal overrides
#[derive(Debug, Clone, Deserialize)]
pub struct Rule {
    /// Unique rule name
    pub name: String,

    /// Lower evaluates first; provably-disjoint ties keep declaration order
    pub priority: u32,

    /// Match predicate over request fields
    pub predicate: Predicate,

    /// Base action when the predicate matches and no override fires
    pub action: Action,

    /// Per-signal overrides, consulted in declaration order after the
    /// predicate matches
    #[serde(default, rename = "override")]
    pub overrides: Vec<SignalOverride>,
}

impl Rule {
    /// Action for a matched request given the visible signal labels:
    /// the first override whose signal is present wins, else the base
    /// action.
    pub fn effective_action(&self, labels: &BTreeSet<String>) -> Action {
        for entry in &self.overrides {
            if labels.contains(&entry.signal) {
                return entry.action;
            }
        }
        self.action
    }
}

/// An immutable, validated policy snapshot
///
/// Read-only after load. Live reload swaps in a whole new snapshot; rules
/// are never mutated in place.
#[derive(Debug, Clone)]
pub struct Policy {
    rules: Vec<Rule>,
    default_action: Action,
}

impl Policy {
    pub(crate) fn new(rules: Vec<Rule>, default_action: Action) -> Self {
        Policy {
            rules,
            default_action,
        }
    }

    /// Rules in evaluation order (ascending priority)
    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    /// Outcome when no rule matches
    pub fn default_action(&self) -> Action {
        self.default_action
    }
}
