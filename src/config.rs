//! Configuration loading for the request gatekeeper
//!
//! Supports TOML configuration with embedded defaults.

use serde::Deserialize;
use std::path::PathBuf;

/// Which challenge experience the edge layer serves
///
/// Replaces the duplicated with/without-challenge stack variants of the
/// original deployment with one first-class switch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ChallengeMode {
    /// No challenge layer at all; every request is allowed
    Disabled,

    /// Silent proof-of-browser challenge (no user interaction)
    #[default]
    Silent,

    /// Interactive challenge (captcha-style)
    Interactive,
}

impl ChallengeMode {
    /// Parse from string
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "disabled" => Some(ChallengeMode::Disabled),
            "silent" => Some(ChallengeMode::Silent),
            "interactive" => Some(ChallengeMode::Interactive),
            _ => None,
        }
    }

    /// The challenge kind reported to the edge layer, if any
    pub fn kind(&self) -> Option<&'static str> {
        match self {
            ChallengeMode::Disabled => None,
            ChallengeMode::Silent => Some("silent"),
            ChallengeMode::Interactive => Some("interactive"),
        }
    }
}

/// General configuration section
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Challenge experience served on challenge dispositions
    pub challenge_mode: ChallengeMode,

    /// Enable audit logging
    pub audit_log: bool,

    /// Path to audit log file
    pub audit_path: Option<String>,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            challenge_mode: ChallengeMode::Silent,
            audit_log: true,
            audit_path: Some("~/.gatekeeper/audit.jsonl".to_string()),
        }
    }
}

/// Policy source configuration
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct PolicyConfig {
    /// Path to a policy TOML file; the embedded default policy is used
    /// when unset
    pub file: Option<String>,
}

/// Token validation configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TokenConfig {
    /// Header carrying the proof-of-challenge token
    pub header: String,
}

impl Default for TokenConfig {
    fn default() -> Self {
        Self {
            header: "x-challenge-token".to_string(),
        }
    }
}

/// Main configuration structure
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    pub general: GeneralConfig,
    pub policy: PolicyConfig,
    pub token: TokenConfig,
}

impl Config {
    /// Load configuration from file or use defaults
    pub fn load() -> Self {
        let config_paths = [
            // User-specific config
            dirs::home_dir().map(|p| p.join(".gatekeeper/config.toml")),
            // System-wide config
            Some(PathBuf::from("/etc/request-gatekeeper/config.toml")),
        ];

        for path in config_paths.into_iter().flatten() {
            if path.exists() {
                if let Ok(content) = std::fs::read_to_string(&path) {
                    match toml::from_str(&content) {
                        Ok(config) => return config,
                        Err(e) => {
                            eprintln!("Warning: Failed to parse {}: {}", path.display(), e);
                        }
                    }
                }
            }
        }

        Config::default()
    }

    /// Load from a specific path
    pub fn load_from(path: &std::path::Path) -> Result<Self, Box<dyn std::error::Error>> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }

    /// Expand ~ in path strings
    pub fn expand_path(path: &str) -> PathBuf {
        if path.starts_with("~/") {
            if let Some(home) = dirs::home_dir() {
                return home.join(&path[2..]);
            }
        }
        PathBuf::from(path)
    }

    /// Get the audit log path (expanded)
    pub fn audit_path(&self) -> Option<PathBuf> {
        self.general.audit_path.as_ref().map(|p| Self::expand_path(p))
    }

    /// Get the policy file path (expanded)
    pub fn policy_path(&self) -> Option<PathBuf> {
        self.policy.file.as_ref().map(|p| Self::expand_path(p))
    }
}

/// Embedded default configuration
pub const DEFAULT_CONFIG_TOML: &str = r#"
[general]
challenge_mode = "silent"
audit_log = true
audit_path = "~/.gatekeeper/audit.jsonl"

[policy]
# file = "~/.gatekeeper/policy.toml"

[token]
header = "x-challenge-token"
"#;
