//! Embedded default policy
//!
//! Mirrors the bot-challenge configuration this gatekeeper ships with: a
//! scope-down bot-control layer over the API stage path, a block rule for
//! requests carrying a missing-or-rejected token label, and a default
//! allow. Every predicate conjuncts NOT (method = OPTIONS) so CORS
//! preflight is never challenged or blocked.

use once_cell::sync::Lazy;

use super::store::PolicyStore;
use super::Policy;

/// Default policy TOML shipped with the gatekeeper
pub const DEFAULT_POLICY_TOML: &str = r#"
default_action = "allow"

# Bot-control layer, scoped down to the API stage path. The base action is
# continue: a request inside the scope with no override signal falls
# through to later rules.
[[rule]]
name = "Bot-Control"
priority = 10
action = "continue"

[rule.predicate]
kind = "and"

[[rule.predicate.children]]
kind = "match"
field = "uri_path"
transform = "lowercase"
op = "contains"
value = "dev"

[[rule.predicate.children]]
kind = "not"

[rule.predicate.children.child]
kind = "match"
field = "method"
op = "exact"
value = "OPTIONS"

[[rule.override]]
signal = "volumetric:ip-token-absent"
action = "challenge"

[[rule.override]]
signal = "non-browser-user-agent"
action = "challenge"

[[rule.override]]
signal = "http-library"
action = "block"

# A client that strips the challenge header still carries the
# validator-attached token label, so it is rejected here deterministically.
[[rule]]
name = "Block-Requests-With-Missing-Or-Rejected-Token-Label"
priority = 20
action = "continue"

[rule.predicate]
kind = "not"

[rule.predicate.child]
kind = "match"
field = "method"
op = "exact"
value = "OPTIONS"

[[rule.override]]
signal = "token:absent"
action = "block"

[[rule.override]]
signal = "token:rejected"
action = "block"
"#;

static DEFAULT_POLICY: Lazy<Policy> = Lazy::new(|| {
    PolicyStore::load(DEFAULT_POLICY_TOML).expect("embedded default policy is valid")
});

/// The compiled default policy
pub fn default_policy() -> &'static Policy {
    &DEFAULT_POLICY
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::policy::Action;

    #[test]
    fn test_default_policy_parses() {
        let policy = default_policy();
        assert_eq!(policy.rules().len(), 2);
        assert_eq!(policy.default_action(), Action::Allow);
    }

    #[test]
    fn test_default_policy_rule_order() {
        let policy = default_policy();
        assert_eq!(policy.rules()[0].name, "Bot-Control");
        assert_eq!(
            policy.rules()[1].name,
            "Block-Requests-With-Missing-Or-Rejected-Token-Label"
        );
    }

    #[test]
    fn test_default_policy_base_actions_continue() {
        // Both shipped rules decide only through signal overrides
        for rule in default_policy().rules() {
            assert_eq!(rule.action, Action::Continue);
            assert!(!rule.overrides.is_empty());
        }
    }
}
