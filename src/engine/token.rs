//! Challenge-token validation
//!
//! Checks whether a request carries a proof-of-challenge token and turns
//! the result into signal labels the rule layer can match on. The
//! cryptographic attestation itself is delegated to an external
//! [`TokenVerifier`]; a verifier failure is classified REJECTED so a
//! dependency outage never bypasses protection.

use thiserror::Error;

use crate::input::Request;

/// State of the challenge token on a request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenState {
    /// No token present
    Absent,

    /// Token present but failed attestation (or the verifier failed)
    Rejected,

    /// Token present and attested
    Accepted,
}

impl TokenState {
    /// Signal label for this state, if it carries one
    pub fn label(&self) -> Option<&'static str> {
        match self {
            TokenState::Absent => Some("token:absent"),
            TokenState::Rejected => Some("token:rejected"),
            TokenState::Accepted => None,
        }
    }
}

/// Error from the external attestation service
#[derive(Debug, Error)]
#[error("token verifier unavailable: {0}")]
pub struct VerifyError(pub String);

/// External attestation capability
///
/// Implementations wrap whatever issues and checks challenge tokens. The
/// gatekeeper only needs a yes/no answer.
pub trait TokenVerifier: Send + Sync {
    /// Check whether a presented token is genuine and unexpired
    fn verify(&self, token: &str) -> Result<bool, VerifyError>;
}

/// Inspects the configured token header and classifies the token state
pub struct TokenValidator {
    header: String,
    verifier: Box<dyn TokenVerifier>,
}

impl std::fmt::Debug for TokenValidator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenValidator")
            .field("header", &self.header)
            .finish_non_exhaustive()
    }
}

impl TokenValidator {
    /// Create a validator reading the given header
    pub fn new(header: impl Into<String>, verifier: Box<dyn TokenVerifier>) -> Self {
        TokenValidator {
            header: header.into(),
            verifier,
        }
    }

    /// Classify the token on a request
    pub fn validate(&self, request: &Request) -> TokenState {
        match request.header(&self.header) {
            None => TokenState::Absent,
            Some(token) if token.is_empty() => TokenState::Absent,
            Some(token) => match self.verifier.verify(token) {
                Ok(true) => TokenState::Accepted,
                Ok(false) => TokenState::Rejected,
                // Fail closed: an unreachable verifier must not become a
                // bypass
                Err(_) => TokenState::Rejected,
            },
        }
    }

    /// The header this validator inspects
    pub fn header(&self) -> &str {
        &self.header
    }
}
