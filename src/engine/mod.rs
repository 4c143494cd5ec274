//! Classification engine for the request gatekeeper
//!
//! Walks the policy's rules in ascending priority order and produces
//! exactly one disposition per request.

pub mod token;

use std::env;
use std::sync::Arc;

use crate::config::{ChallengeMode, Config};
use crate::input::Request;
use crate::output::Disposition;
use crate::policy::defaults;
use crate::policy::store::{ConfigError, PolicyStore};
use crate::policy::Policy;
use token::{TokenValidator, TokenVerifier};

/// The request gatekeeper
///
/// Holds an immutable policy snapshot; classification is pure per call,
/// so any number of requests may be classified concurrently.
#[derive(Debug)]
pub struct Gatekeeper {
    config: Config,
    policy: Arc<Policy>,
    validator: Option<TokenValidator>,
}

impl Gatekeeper {
    /// Create a gatekeeper from configuration
    ///
    /// Loads the policy file named in the config, or the embedded default
    /// policy when none is configured. Fails with [`ConfigError`] on
    /// malformed or ambiguous policy input.
    pub fn new(config: Config) -> Result<Self, ConfigError> {
        let policy = match config.policy_path() {
            Some(path) => PolicyStore::load_file(&path)?,
            None => defaults::default_policy().clone(),
        };

        Ok(Gatekeeper {
            config,
            policy: Arc::new(policy),
            validator: None,
        })
    }

    /// Create a gatekeeper with an explicit policy snapshot
    pub fn with_policy(config: Config, policy: Policy) -> Self {
        Gatekeeper {
            config,
            policy: Arc::new(policy),
            validator: None,
        }
    }

    /// Wire an external token verifier
    ///
    /// When present, the token state is validated per request and its
    /// label joins the request's upstream signals. Without a verifier the
    /// gatekeeper relies on token labels the edge layer already attached.
    pub fn with_verifier(mut self, verifier: Box<dyn TokenVerifier>) -> Self {
        let header = self.config.token.header.clone();
        self.validator = Some(TokenValidator::new(header, verifier));
        self
    }

    /// Check if the challenge layer is disabled
    pub fn is_disabled(&self) -> bool {
        env::var("GATEKEEPER_DISABLED").is_ok()
            || self.config.general.challenge_mode == ChallengeMode::Disabled
    }

    /// Check if log-only mode is enabled (classify and audit, allow all)
    pub fn is_log_only(&self) -> bool {
        env::var("GATEKEEPER_LOG_ONLY").is_ok()
    }

    /// Classify a request against the current policy snapshot
    ///
    /// Pure and total: every request yields exactly one outcome, and the
    /// same request against the same policy always yields the same
    /// disposition.
    pub fn classify(&self, request: &Request) -> Disposition {
        if self.is_disabled() {
            return Disposition::allow(request.signals.clone());
        }

        let mut labels = request.signals.clone();
        if let Some(validator) = &self.validator {
            if let Some(label) = validator.validate(request).label() {
                labels.insert(label.to_string());
            }
        }

        let mut disposition = self.evaluate(request, labels);

        // Log-only mode downgrades to allow but keeps the matched rule
        // for the audit trail
        if self.is_log_only() && !disposition.is_allow() {
            disposition.outcome = crate::output::Outcome::Allow;
        }

        disposition
    }

    fn evaluate(
        &self,
        request: &Request,
        labels: std::collections::BTreeSet<String>,
    ) -> Disposition {
        for rule in self.policy.rules() {
            if !rule.predicate.eval(request) {
                continue;
            }
            let action = rule.effective_action(&labels);
            if let Some(outcome) = action.outcome() {
                return Disposition::matched(outcome, rule.name.clone(), labels);
            }
            // Continue: fall through to the next rule
        }

        // No match is normal, not an error
        let outcome = self
            .policy
            .default_action()
            .outcome()
            .unwrap_or(crate::output::Outcome::Allow);
        Disposition {
            outcome,
            matched_rule: None,
            labels,
        }
    }

    /// Swap in a new policy snapshot atomically
    ///
    /// In-flight classifications keep the snapshot they started with; a
    /// partially-updated rule set is never observable.
    pub fn reload_policy(&mut self, policy: Policy) {
        self.policy = Arc::new(policy);
    }

    /// The current policy snapshot
    pub fn policy(&self) -> &Policy {
        &self.policy
    }

    /// The configuration
    pub fn config(&self) -> &Config {
        &self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::policy::Action;

    fn engine() -> Gatekeeper {
        Gatekeeper::new(Config::default()).unwrap()
    }

    #[test]
    fn test_plain_scoped_request_allowed() {
        let disposition = engine().classify(&Request::new("GET", "/dev/hello"));
        assert!(disposition.is_allow());
        assert_eq!(disposition.matched_rule(), None);
    }

    #[test]
    fn test_token_absent_signal_blocked() {
        let request = Request::new("GET", "/dev/hello").with_signal("token:absent");
        let disposition = engine().classify(&request);
        assert!(disposition.is_block());
        assert_eq!(
            disposition.matched_rule(),
            Some("Block-Requests-With-Missing-Or-Rejected-Token-Label")
        );
    }

    #[test]
    fn test_options_preflight_always_allowed() {
        let request = Request::new("OPTIONS", "/dev/hello")
            .with_signal("token:absent")
            .with_signal("http-library");
        let disposition = engine().classify(&request);
        assert!(disposition.is_allow());
    }

    #[test]
    fn test_non_browser_signal_challenged_in_scope() {
        let request = Request::new("GET", "/dev/hello").with_signal("non-browser-user-agent");
        let disposition = engine().classify(&request);
        assert!(disposition.is_challenge());
        assert_eq!(disposition.matched_rule(), Some("Bot-Control"));
    }

    #[test]
    fn test_out_of_scope_path_skips_bot_control() {
        let request = Request::new("GET", "/static/logo.png").with_signal("non-browser-user-agent");
        let disposition = engine().classify(&request);
        assert!(disposition.is_allow());
    }

    #[test]
    fn test_disabled_mode_allows_everything() {
        let mut config = Config::default();
        config.general.challenge_mode = ChallengeMode::Disabled;
        let engine = Gatekeeper::new(config).unwrap();
        let request = Request::new("GET", "/dev/hello").with_signal("token:absent");
        assert!(engine.classify(&request).is_allow());
    }

    #[test]
    fn test_reload_policy_swaps_snapshot() {
        let block_all = crate::policy::store::PolicyStore::load("default_action = \"block\"")
            .unwrap();
        let mut engine = engine();
        assert!(engine.classify(&Request::new("GET", "/dev/hello")).is_allow());
        engine.reload_policy(block_all);
        assert!(engine.classify(&Request::new("GET", "/dev/hello")).is_block());
        assert_eq!(engine.policy().default_action(), Action::Block);
    }
}
