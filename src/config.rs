//! Runtime configuration.
//!
//! `AppConfig` is assembled by `main.rs` from the command line (with `HIGIT_*`
//! environment fallbacks) and handed to `Core`. Library users can build it
//! directly; `Default` matches the behaviour of the mobile client.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Default depth for fetches that do not name explicit branches.
pub const DEFAULT_FETCH_DEPTH: i32 = 10;

/// Certificate/host-key decision applied by the transport bridge.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HostCertPolicy {
    /// Let libgit2 validate the presented certificate or host key.
    #[default]
    Strict,
    /// Accept whatever the server presents. Development only.
    AcceptInvalid,
}

/// Process-wide libgit2 options, applied once by `git::engine::configure`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineOptions {
    pub server_timeout_ms: i32,
    pub mwindow_size: usize,
    pub mwindow_mapped_limit: usize,
    pub strict_hash_verification: bool,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            server_timeout_ms: 30 * 1000,
            mwindow_size: 128 * 1024 * 1024,
            mwindow_mapped_limit: 64 * 1024 * 1024,
            strict_hash_verification: false,
        }
    }
}

/// How new SSH identities are generated and protected.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IdentitySettings {
    pub key_bits: usize,
    pub comment: String,
    pub passphrase: String,
}

impl Default for IdentitySettings {
    fn default() -> Self {
        Self {
            key_bits: 4096,
            comment: "higit".to_string(),
            passphrase: String::new(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Application files directory; `initSystem` may override it at runtime.
    pub base_path: Option<PathBuf>,
    pub cert_policy: HostCertPolicy,
    pub engine: EngineOptions,
    pub identity: IdentitySettings,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_production_safe() {
        let config = AppConfig::default();
        assert_eq!(config.cert_policy, HostCertPolicy::Strict);
        assert_eq!(config.identity.key_bits, 4096);
        assert_eq!(config.identity.comment, "higit");
        assert!(config.identity.passphrase.is_empty());
        assert_eq!(config.engine.server_timeout_ms, 30_000);
    }

    #[test]
    fn partial_config_fills_in_defaults() {
        let config: AppConfig =
            serde_json::from_str(r#"{"cert_policy":"accept_invalid","identity":{"key_bits":2048}}"#)
                .unwrap();
        assert_eq!(config.cert_policy, HostCertPolicy::AcceptInvalid);
        assert_eq!(config.identity.key_bits, 2048);
        assert_eq!(config.identity.comment, "higit");
    }
}
