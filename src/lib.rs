//! request-gatekeeper - Bot-challenge classification for inbound HTTP requests
//!
//! This library sits in front of an API and decides, for each inbound
//! request, one of three dispositions: allow, block, or challenge
//! (require proof-of-browser/human before proceeding).
//!
//! # Features
//!
//! - **Ordered rule evaluation**: ascending-priority rules with
//!   AND/OR/NOT/MATCH predicates over method, path, and headers
//! - **Scope-down**: restrict what a broad detection rule even examines
//! - **Signal overrides**: map upstream-detected signals (non-browser
//!   user agent, volumetric IP, missing token) to challenge or block
//! - **Token validation**: classify the proof-of-challenge token as
//!   absent, rejected, or accepted, failing closed on verifier outages
//! - **Challenge modes**: disabled, silent, or interactive, as one
//!   configuration switch
//! - **Audit logging**: JSONL log of all dispositions
//!
//! # Example
//!
//! ```
//! use request_gatekeeper::{Config, Gatekeeper, Request};
//!
//! let config = Config::default();
//! let engine = Gatekeeper::new(config).unwrap();
//!
//! let json = r#"{"method":"GET","path":"/dev/hello","signals":["token:absent"]}"#;
//! let request = Request::from_json(json).unwrap();
//!
//! let disposition = engine.classify(&request);
//! assert!(disposition.is_block());
//! ```

pub mod audit;
pub mod config;
pub mod engine;
pub mod input;
pub mod output;
pub mod policy;

// Re-exports for convenience
pub use config::{ChallengeMode, Config};
pub use engine::token::{TokenState, TokenValidator, TokenVerifier, VerifyError};
pub use engine::Gatekeeper;
pub use input::Request;
pub use output::{Disposition, EdgeResponse, Outcome};
pub use policy::store::{ConfigError, PolicyStore};
pub use policy::{Action, Policy, Rule};
