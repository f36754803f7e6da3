// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Fire-and-forget analytics client.

use std::sync::Arc;

use tokio::runtime::Handle;
use tracing::debug;

use crate::TelemetrySink;
use crate::api::AnalyticsApi;

/// Sends each event on its own Tokio task.
///
/// `emit` may be called from any thread, including ones outside the
/// runtime; it only spawns.
#[derive(Clone)]
pub struct AnalyticsClient {
    api: Arc<AnalyticsApi>,
    runtime: Handle,
}

impl AnalyticsClient {
    pub fn new(api: AnalyticsApi, runtime: Handle) -> Self {
        Self {
            api: Arc::new(api),
            runtime,
        }
    }
}

impl TelemetrySink for AnalyticsClient {
    fn emit(&self, event_name: &str) {
        let api = Arc::clone(&self.api);
        let event_name = event_name.to_owned();
        self.runtime.spawn(async move {
            if let Err(e) = api.execute(&event_name).await {
                debug!(event = %event_name, error = %e, "analytics event dropped");
            }
        });
    }
}
