// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Platform-agnostic seams between the bridge and its host.
//
// `ScriptHost` is implemented by whatever owns the embedded script engine.
// The native traits cover the two device capabilities the bridge needs:
// a durable preferences slot and an installed-app check.

use popupbridge_core::error::Result;

/// Package name of the Venmo app.
pub const VENMO_APP_PACKAGE: &str = "com.venmo";

/// Package name of the PayPal app.
pub const PAYPAL_APP_PACKAGE: &str = "com.paypal.android.p2pmobile";

/// The thread that evaluates script inside the embedded page.
///
/// `post_script` only enqueues: the script must run later on the owner
/// thread, in posting order, and the call must never block on evaluation.
pub trait ScriptHost: Send + Sync {
    fn post_script(&self, script: String);
}

/// Unified bridge that groups the native capabilities used by PopupBridge.
pub trait PlatformBridge: NativePreferences + NativeAppChecks + Send + Sync {
    /// Human-readable platform name (e.g. "Android").
    fn platform_name(&self) -> &str;
}

/// Durable string preferences, namespaced per file.
///
/// Implementations block on I/O; callers on an async runtime should use
/// `spawn_blocking`.
pub trait NativePreferences {
    /// Read `key` from `namespace`. Returns None if not set.
    fn get_string(&self, namespace: &str, key: &str) -> Result<Option<String>>;

    /// Write `key` in `namespace`, replacing any previous value.
    fn put_string(&self, namespace: &str, key: &str, value: &str) -> Result<()>;

    /// Remove `key` from `namespace`. Removing a missing key is not an error.
    fn remove(&self, namespace: &str, key: &str) -> Result<()>;
}

/// Query which other apps are installed on the device.
pub trait NativeAppChecks {
    fn is_app_installed(&self, package_name: &str) -> Result<bool>;

    fn is_venmo_installed(&self) -> Result<bool> {
        self.is_app_installed(VENMO_APP_PACKAGE)
    }

    fn is_paypal_installed(&self) -> Result<bool> {
        self.is_app_installed(PAYPAL_APP_PACKAGE)
    }
}
