// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>

//! PopupBridge — single-slot storage for the pending request.
//!
//! The store is a dumb persistence primitive: it holds at most one opaque
//! token and has no opinion about what it means. Every operation is async
//! and runs its I/O off the calling thread, so the script thread is never
//! blocked. `get` on an empty slot returns `Ok(None)`.

pub mod memory;
pub mod preferences;
pub mod sqlite;

use async_trait::async_trait;
use popupbridge_core::error::{PopupBridgeError, Result};
use popupbridge_core::types::PendingRequest;

pub use memory::MemoryStore;
pub use preferences::PreferencesStore;
pub use sqlite::SqliteStore;

/// Key of the pending request inside its namespace.
pub const PENDING_REQUEST_KEY: &str = "pending_request";

/// Durable single-slot store for one [`PendingRequest`].
#[async_trait]
pub trait PendingRequestStore: Send + Sync {
    /// Replace the slot's contents with `request`.
    async fn store(&self, request: &PendingRequest) -> Result<()>;

    /// Read the slot without consuming it.
    async fn get(&self) -> Result<Option<PendingRequest>>;

    /// Empty the slot. Clearing an empty slot is not an error.
    async fn clear(&self) -> Result<()>;
}

/// Map a blocking-task join failure into a store error.
pub(crate) fn join_err(e: tokio::task::JoinError) -> PopupBridgeError {
    PopupBridgeError::Store(format!("blocking task failed: {e}"))
}
