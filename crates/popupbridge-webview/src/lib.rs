// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>

//! PopupBridge — script-facing bridge protocol and native platform seams.
//!
//! This crate owns everything that touches the embedded page: the inbound
//! `open`/`sendMessage` interface, the fixed notification scripts, the
//! page-readiness latch, and the `ScriptHost` seam that posts scripts to the
//! owner thread. It also defines the native capabilities (preferences,
//! installed-app checks) with Android (JNI) and desktop stub implementations.

pub mod host;
pub mod interface;
pub mod page;
pub mod script;
pub mod traits;

#[cfg(target_os = "android")]
pub mod android;

#[cfg(not(target_os = "android"))]
pub mod stub;

pub use host::{ChannelScriptHost, RecordingScriptHost, ScriptReceiver};
pub use interface::JavascriptInterface;
pub use page::PageLoadState;
pub use traits::{NativeAppChecks, NativePreferences, PlatformBridge, ScriptHost};

/// Retrieves the bridge implementation for the target operating system.
pub fn platform_bridge() -> Box<dyn traits::PlatformBridge> {
    #[cfg(target_os = "android")]
    {
        Box::new(android::AndroidBridge::new())
    }
    #[cfg(not(target_os = "android"))]
    {
        Box::new(stub::StubBridge)
    }
}
