// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Device and application facts reported with analytics batches.

use popupbridge_core::config::AppMetadata;
use serde::Serialize;

/// Static facts about the app and the device it runs on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeviceInfo {
    pub app_id: String,
    pub app_name: String,
    pub app_version: String,
    pub client_os: String,
    pub sdk_version: String,
    pub manufacturer: String,
    pub model: String,
    pub platform: String,
    pub is_simulator: bool,
}

impl DeviceInfo {
    /// Collect what the process can see about itself.
    ///
    /// Manufacturer and model are not observable from portable Rust; hosts
    /// that know them should overwrite the fields.
    pub fn detect(app: &AppMetadata) -> Self {
        Self {
            app_id: app.app_id.clone(),
            app_name: app.app_name.clone(),
            app_version: app.app_version.clone(),
            client_os: format!("{} {}", std::env::consts::OS, std::env::consts::ARCH),
            sdk_version: env!("CARGO_PKG_VERSION").to_owned(),
            manufacturer: "unknown".to_owned(),
            model: "unknown".to_owned(),
            platform: platform_label().to_owned(),
            is_simulator: false,
        }
    }
}

fn platform_label() -> &'static str {
    match std::env::consts::OS {
        "android" => "Android",
        "ios" => "iOS",
        "macos" => "macOS",
        "windows" => "Windows",
        "linux" => "Linux",
        other => other,
    }
}
