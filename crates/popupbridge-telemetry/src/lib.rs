// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>

//! PopupBridge — lifecycle analytics.
//!
//! Telemetry is best-effort: `TelemetrySink::emit` returns immediately, never
//! fails, and a lost event is only ever logged.

pub mod api;
pub mod client;
pub mod device;
pub mod http;
pub mod session;

use std::sync::{Mutex, PoisonError};

pub use api::AnalyticsApi;
pub use client::AnalyticsClient;
pub use device::DeviceInfo;
pub use http::PostRequestExecutor;
pub use session::SessionContext;

/// `open` was called by the page.
pub const POPUP_BRIDGE_STARTED: &str = "popup-bridge:started";
/// A success payload was delivered without error.
pub const POPUP_BRIDGE_SUCCEEDED: &str = "popup-bridge:succeeded";
/// A failure, or a payload that could not be fully decoded, was delivered.
pub const POPUP_BRIDGE_FAILED: &str = "popup-bridge:failed";
/// The user came back without completing the flow.
pub const POPUP_BRIDGE_CANCELED: &str = "popup-bridge:canceled";

/// One-way telemetry boundary.
pub trait TelemetrySink: Send + Sync {
    /// Record `event_name`. Must not block and must not panic.
    fn emit(&self, event_name: &str);
}

/// Sink that drops every event.
pub struct NoopSink;

impl TelemetrySink for NoopSink {
    fn emit(&self, _event_name: &str) {}
}

/// Sink that keeps every event name in memory.
#[derive(Default)]
pub struct RecordingSink {
    events: Mutex<Vec<String>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<String> {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl TelemetrySink for RecordingSink {
    fn emit(&self, event_name: &str) {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(event_name.to_owned());
    }
}
