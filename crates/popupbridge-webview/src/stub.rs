// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Stub bridge for desktop/CI builds where native mobile APIs are unavailable.
//
// Every trait method returns `PlatformUnavailable`; desktop hosts persist the
// pending request with the SQLite store instead.

use popupbridge_core::error::{PopupBridgeError, Result};

use crate::traits::*;

/// No-op bridge returned on non-mobile platforms.
pub struct StubBridge;

impl PlatformBridge for StubBridge {
    fn platform_name(&self) -> &str {
        "Desktop (stub)"
    }
}

impl NativePreferences for StubBridge {
    fn get_string(&self, _namespace: &str, _key: &str) -> Result<Option<String>> {
        tracing::warn!("NativePreferences::get_string called on stub bridge");
        Err(PopupBridgeError::PlatformUnavailable)
    }

    fn put_string(&self, _namespace: &str, _key: &str, _value: &str) -> Result<()> {
        tracing::warn!("NativePreferences::put_string called on stub bridge");
        Err(PopupBridgeError::PlatformUnavailable)
    }

    fn remove(&self, _namespace: &str, _key: &str) -> Result<()> {
        Err(PopupBridgeError::PlatformUnavailable)
    }
}

impl NativeAppChecks for StubBridge {
    fn is_app_installed(&self, _package_name: &str) -> Result<bool> {
        Err(PopupBridgeError::PlatformUnavailable)
    }
}
