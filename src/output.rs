//! Disposition types and the edge-layer response format
//!
//! Produces the JSON output the edge layer consumes to decide whether to
//! forward a request, serve a challenge, or return a block response.

use serde::Serialize;
use std::collections::BTreeSet;

use crate::config::ChallengeMode;

/// Final outcome for one request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Outcome {
    /// Forward to the application
    Allow,

    /// Reject outright
    Block,

    /// Require proof-of-browser/human before proceeding
    Challenge,
}

/// The result of classifying one request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Disposition {
    /// The decided outcome
    pub outcome: Outcome,

    /// Name of the rule that decided the outcome, if any
    pub matched_rule: Option<String>,

    /// Signal labels that were visible during evaluation
    pub labels: BTreeSet<String>,
}

impl Disposition {
    /// Create an allow disposition with no matched rule
    pub fn allow(labels: BTreeSet<String>) -> Self {
        Disposition {
            outcome: Outcome::Allow,
            matched_rule: None,
            labels,
        }
    }

    /// Create a disposition decided by a named rule
    pub fn matched(
        outcome: Outcome,
        rule_name: impl Into<String>,
        labels: BTreeSet<String>,
    ) -> Self {
        Disposition {
            outcome,
            matched_rule: Some(rule_name.into()),
            labels,
        }
    }

    /// Check if this is an allow disposition
    pub fn is_allow(&self) -> bool {
        self.outcome == Outcome::Allow
    }

    /// Check if this is a block disposition
    pub fn is_block(&self) -> bool {
        self.outcome == Outcome::Block
    }

    /// Check if this is a challenge disposition
    pub fn is_challenge(&self) -> bool {
        self.outcome == Outcome::Challenge
    }

    /// Get the matched rule name if applicable
    pub fn matched_rule(&self) -> Option<&str> {
        self.matched_rule.as_deref()
    }
}

/// Response structure handed to the edge layer
#[derive(Debug, Serialize)]
pub struct EdgeResponse {
    /// The disposition: "allow", "block", or "challenge"
    pub disposition: Outcome,

    /// Name of the rule that decided the outcome
    #[serde(rename = "matchedRule", skip_serializing_if = "Option::is_none")]
    pub matched_rule: Option<String>,

    /// Signal labels visible during evaluation
    pub labels: Vec<String>,

    /// Challenge UX the edge layer should serve ("silent" or
    /// "interactive"), present only on challenge dispositions
    #[serde(rename = "challengeKind", skip_serializing_if = "Option::is_none")]
    pub challenge_kind: Option<&'static str>,
}

impl EdgeResponse {
    /// Create a response from a disposition
    pub fn from_disposition(disposition: &Disposition, mode: ChallengeMode) -> Self {
        let challenge_kind = if disposition.is_challenge() {
            mode.kind()
        } else {
            None
        };

        EdgeResponse {
            disposition: disposition.outcome,
            matched_rule: disposition.matched_rule.clone(),
            labels: disposition.labels.iter().cloned().collect(),
            challenge_kind,
        }
    }

    /// Serialize to JSON string
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| "{}".to_string())
    }
}
