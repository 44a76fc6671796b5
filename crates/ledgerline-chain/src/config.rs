//! TOML-driven runtime configuration.
//!
//! Everything has a default, so an absent config file means default
//! behavior rather than a startup error. Example document:
//!
//! ```toml
//! checkpoint_span = 256
//! verify_chunk = 1024
//! alert_after_failures = 3
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

use ledgerline_contracts::{AuditError, AuditResult};

/// Tunables for the audit subsystem.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AuditConfig {
    /// Entries folded into each scheduled checkpoint.
    pub checkpoint_span: u64,

    /// Entries read per chunk when verifying large ranges.
    pub verify_chunk: u64,

    /// Consecutive facade write failures before log severity escalates.
    pub alert_after_failures: u32,
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            checkpoint_span: 256,
            verify_chunk: 1024,
            alert_after_failures: 3,
        }
    }
}

impl AuditConfig {
    /// Parse `s` as a TOML configuration document.
    ///
    /// Returns `AuditError::Config` when the TOML is malformed or a field
    /// has the wrong type.
    pub fn from_toml_str(s: &str) -> AuditResult<Self> {
        toml::from_str(s).map_err(|e| AuditError::Config {
            reason: format!("failed to parse config TOML: {}", e),
        })
    }

    /// Read the file at `path` and parse it as TOML configuration.
    pub fn from_file(path: &Path) -> AuditResult<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| AuditError::Config {
            reason: format!("failed to read config file '{}': {}", path.display(), e),
        })?;
        Self::from_toml_str(&contents)
    }
}

#[cfg(test)]
mod tests {
    use super::AuditConfig;

    #[test]
    fn empty_document_yields_defaults() {
        let config = AuditConfig::from_toml_str("").unwrap();
        assert_eq!(config.checkpoint_span, 256);
        assert_eq!(config.verify_chunk, 1024);
        assert_eq!(config.alert_after_failures, 3);
    }

    #[test]
    fn partial_document_overrides_selectively() {
        let config = AuditConfig::from_toml_str("checkpoint_span = 64").unwrap();
        assert_eq!(config.checkpoint_span, 64);
        assert_eq!(config.verify_chunk, 1024);
    }

    #[test]
    fn malformed_toml_is_a_config_error() {
        let err = AuditConfig::from_toml_str("checkpoint_span = \"lots\"").unwrap_err();
        assert!(err.to_string().contains("configuration error"));
    }

    #[test]
    fn missing_file_is_a_config_error() {
        let err = AuditConfig::from_file(std::path::Path::new("/nonexistent/audit.toml"))
            .unwrap_err();
        assert!(err.to_string().contains("failed to read config file"));
    }
}
