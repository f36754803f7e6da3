// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Analytics batch body and its submission.
//
// Body shape:
//   {"events":[{"batch_params":{...},"event_params":[{"event_name":..,"t":..}]}]}

use std::sync::Arc;

use chrono::Utc;
use popupbridge_core::error::Result;
use serde::Serialize;
use tracing::instrument;

use crate::device::DeviceInfo;
use crate::http::PostRequestExecutor;
use crate::session::SessionContext;

#[derive(Debug, Serialize)]
struct AnalyticsBody<'a> {
    events: [EventBatch<'a>; 1],
}

#[derive(Debug, Serialize)]
struct EventBatch<'a> {
    batch_params: BatchParams<'a>,
    event_params: [EventParams<'a>; 1],
}

#[derive(Debug, Serialize)]
struct BatchParams<'a> {
    app_id: &'a str,
    app_name: &'a str,
    client_os: &'a str,
    c_sdk_ver: &'a str,
    comp: &'static str,
    device_manufacturer: &'a str,
    mobile_device_model: &'a str,
    event_source: &'static str,
    is_simulator: bool,
    mapv: &'a str,
    platform: &'a str,
    session_id: String,
    tenant_name: &'static str,
}

#[derive(Debug, Serialize)]
struct EventParams<'a> {
    event_name: &'a str,
    t: i64,
}

/// Builds analytics batches and posts them.
pub struct AnalyticsApi {
    executor: PostRequestExecutor,
    url: String,
    device: DeviceInfo,
    session: Arc<SessionContext>,
}

impl AnalyticsApi {
    pub fn new(
        executor: PostRequestExecutor,
        url: impl Into<String>,
        device: DeviceInfo,
        session: Arc<SessionContext>,
    ) -> Self {
        Self {
            executor,
            url: url.into(),
            device,
            session,
        }
    }

    /// Post one event stamped with the current time.
    #[instrument(skip(self))]
    pub async fn execute(&self, event_name: &str) -> Result<()> {
        let body = self.body(event_name, Utc::now().timestamp_millis());
        self.executor.execute(&self.url, body.to_string()).await?;
        Ok(())
    }

    /// Build the batch body for one event at `timestamp_ms`.
    pub fn body(&self, event_name: &str, timestamp_ms: i64) -> serde_json::Value {
        let device = &self.device;
        let body = AnalyticsBody {
            events: [EventBatch {
                batch_params: BatchParams {
                    app_id: &device.app_id,
                    app_name: &device.app_name,
                    client_os: &device.client_os,
                    c_sdk_ver: &device.sdk_version,
                    comp: "popupbridgesdk",
                    device_manufacturer: &device.manufacturer,
                    mobile_device_model: &device.model,
                    event_source: "mobile-native",
                    is_simulator: device.is_simulator,
                    mapv: &device.app_version,
                    platform: &device.platform,
                    session_id: self.session.session_id(),
                    tenant_name: "Braintree",
                },
                event_params: [EventParams {
                    event_name,
                    t: timestamp_ms,
                }],
            }],
        };
        // Plain strings, bools and integers always serialize.
        serde_json::to_value(&body).unwrap_or(serde_json::Value::Null)
    }
}

#[cfg(test)]
mod tests {
    use popupbridge_core::config::AppMetadata;

    use super::*;

    fn api(session: Arc<SessionContext>) -> AnalyticsApi {
        AnalyticsApi::new(
            PostRequestExecutor::new().expect("client"),
            "https://analytics.example/v1/tracking/batch/events",
            DeviceInfo::detect(&AppMetadata::default()),
            session,
        )
    }

    #[test]
    fn body_has_batch_and_event_params() {
        let session = Arc::new(SessionContext::new());
        let body = api(session.clone()).body("popup-bridge:started", 1_700_000_000_000);

        let batch = &body["events"][0];
        assert_eq!(batch["batch_params"]["comp"], "popupbridgesdk");
        assert_eq!(batch["batch_params"]["event_source"], "mobile-native");
        assert_eq!(batch["batch_params"]["tenant_name"], "Braintree");
        assert_eq!(batch["batch_params"]["session_id"], session.session_id());
        assert_eq!(batch["event_params"][0]["event_name"], "popup-bridge:started");
        assert_eq!(batch["event_params"][0]["t"], 1_700_000_000_000_i64);
    }

    #[test]
    fn body_follows_session_reset() {
        let session = Arc::new(SessionContext::new());
        let api = api(session.clone());
        let before = api.body("e", 0)["events"][0]["batch_params"]["session_id"].clone();
        session.reset();
        let after = api.body("e", 0)["events"][0]["batch_params"]["session_id"].clone();
        assert_ne!(before, after);
    }
}
