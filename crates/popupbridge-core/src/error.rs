// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Unified error types for PopupBridge.

use thiserror::Error;

/// Top-level error type for all PopupBridge operations.
#[derive(Debug, Error)]
pub enum PopupBridgeError {
    // -- Persistence --
    #[error("pending request store error: {0}")]
    Store(String),

    #[error("file I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("invalid configuration: {0}")]
    Config(String),

    // -- Round trip --
    #[error("browser switch failed: {0}")]
    Transport(String),

    #[error("invalid URL: {0}")]
    InvalidUrl(String),

    #[error("failed to decode query parameter: {0}")]
    QueryDecode(String),

    // -- Telemetry --
    #[error("analytics request failed: {0}")]
    Telemetry(String),

    // -- Platform bridge --
    #[error("platform bridge error: {0}")]
    Bridge(String),

    #[error("feature not available on this platform")]
    PlatformUnavailable,
}

/// Alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, PopupBridgeError>;
