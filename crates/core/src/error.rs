use std::path::PathBuf;

/// Errors raised while loading, merging or resolving configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("No usable configuration for form \"{form_key}\": a selector is required")]
    MissingSelector { form_key: String },

    #[error("Invalid configuration: {0}")]
    Invalid(#[from] serde_json::Error),

    #[error("Failed to read configuration file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Errors raised while evaluating a single rule.
///
/// These never leave the validator: the offending rule is logged and
/// treated as failed.
#[derive(Debug, thiserror::Error)]
pub enum RuleError {
    #[error("Invalid regex literal '{literal}': {reason}")]
    InvalidRegex { literal: String, reason: String },

    #[error("Unparseable date '{0}'")]
    InvalidDate(String),

    #[error("Invalid operand for rule '{rule}': '{operand}'")]
    InvalidOperand { rule: String, operand: String },
}
