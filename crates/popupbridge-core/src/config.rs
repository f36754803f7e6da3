// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Bridge configuration, persisted as JSON next to the pending-request store.

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{PopupBridgeError, Result};

/// File name of the persisted configuration inside the data directory.
pub const CONFIG_FILE: &str = "config.json";

/// Default namespace for the persisted pending-request slot.
pub const DEFAULT_STORE_NAMESPACE: &str = "popup_bridge_preferences";

/// Default analytics batch endpoint.
pub const DEFAULT_ANALYTICS_URL: &str = "https://api.paypal.com/v1/tracking/batch/events";

/// Identity of the embedding application, reported with analytics events.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppMetadata {
    pub app_id: String,
    pub app_name: String,
    pub app_version: String,
}

impl Default for AppMetadata {
    fn default() -> Self {
        Self {
            app_id: "com.example.popupbridge".into(),
            app_name: "PopupBridge".into(),
            app_version: "VersionUnknown".into(),
        }
    }
}

/// Persistent bridge settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BridgeConfig {
    /// Custom URL scheme the host app registered for deep links back in.
    pub return_url_scheme: String,
    /// Namespace of the durable pending-request slot.
    pub store_namespace: String,
    /// Send lifecycle analytics events.
    pub analytics_enabled: bool,
    /// HTTPS endpoint receiving analytics batches.
    pub analytics_url: String,
    /// Embedding application identity.
    pub app: AppMetadata,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            return_url_scheme: "com.example.popupbridge".into(),
            store_namespace: DEFAULT_STORE_NAMESPACE.into(),
            analytics_enabled: true,
            analytics_url: DEFAULT_ANALYTICS_URL.into(),
            app: AppMetadata::default(),
        }
    }
}

impl BridgeConfig {
    /// Create a config for the given return URL scheme with all other
    /// settings at their defaults.
    pub fn with_scheme(return_url_scheme: impl Into<String>) -> Self {
        Self {
            return_url_scheme: return_url_scheme.into(),
            ..Self::default()
        }
    }

    /// Reject settings the bridge cannot work with.
    pub fn validate(&self) -> Result<()> {
        if self.return_url_scheme.is_empty() {
            return Err(PopupBridgeError::Config("return_url_scheme is empty".into()));
        }
        if self.return_url_scheme.contains("://") {
            return Err(PopupBridgeError::Config(format!(
                "return_url_scheme must be a bare scheme, got {}",
                self.return_url_scheme
            )));
        }
        if self.store_namespace.is_empty() {
            return Err(PopupBridgeError::Config("store_namespace is empty".into()));
        }
        Ok(())
    }

    /// Load the config from `data_dir`, falling back to defaults when the
    /// file is missing or unreadable.
    pub fn load_or_default(data_dir: &Path) -> Self {
        let path = data_dir.join(CONFIG_FILE);
        let data = match std::fs::read_to_string(&path) {
            Ok(data) => data,
            Err(_) => {
                debug!(path = %path.display(), "no config file, using defaults");
                return Self::default();
            }
        };
        match serde_json::from_str(&data) {
            Ok(config) => config,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "config unreadable, using defaults");
                Self::default()
            }
        }
    }

    /// Write the config to `data_dir` as pretty-printed JSON.
    pub fn save(&self, data_dir: &Path) -> Result<()> {
        let path = data_dir.join(CONFIG_FILE);
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(&path, json)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempfile::tempdir().expect("tempdir");
        assert_eq!(BridgeConfig::load_or_default(dir.path()), BridgeConfig::default());
    }

    #[test]
    fn save_then_load() {
        let dir = tempfile::tempdir().expect("tempdir");
        let mut config = BridgeConfig::with_scheme("myapp");
        config.analytics_enabled = false;
        config.save(dir.path()).expect("save");

        let loaded = BridgeConfig::load_or_default(dir.path());
        assert_eq!(loaded, config);
    }

    #[test]
    fn partial_file_fills_in_defaults() {
        let dir = tempfile::tempdir().expect("tempdir");
        std::fs::write(dir.path().join(CONFIG_FILE), r#"{"return_url_scheme":"shop"}"#)
            .expect("write");

        let loaded = BridgeConfig::load_or_default(dir.path());
        assert_eq!(loaded.return_url_scheme, "shop");
        assert_eq!(loaded.store_namespace, DEFAULT_STORE_NAMESPACE);
        assert!(loaded.analytics_enabled);
    }

    #[test]
    fn corrupt_file_yields_defaults() {
        let dir = tempfile::tempdir().expect("tempdir");
        std::fs::write(dir.path().join(CONFIG_FILE), "{not json").expect("write");
        assert_eq!(BridgeConfig::load_or_default(dir.path()), BridgeConfig::default());
    }

    #[test]
    fn validate_rejects_scheme_with_separator() {
        assert!(BridgeConfig::with_scheme("myapp://").validate().is_err());
        assert!(BridgeConfig::with_scheme("").validate().is_err());
        assert!(BridgeConfig::with_scheme("myapp").validate().is_ok());
    }
}
