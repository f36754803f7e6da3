// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>

//! PopupBridge — resume an embedded web page after an external round trip.
//!
//! A page calls `popupBridge.open(url)`; the host launches the URL in an
//! external browser or app through a [`BrowserSwitchTransport`] and records
//! a pending request. When the user comes back, however many times the
//! platform reports it, the page receives exactly one `onComplete` or
//! `onCancel` callback.

pub mod client;
pub mod coordinator;
pub mod lifecycle;
pub mod listeners;
pub mod outcome;
pub mod transport;

pub use client::{PopupBridgeClient, PopupBridgeClientBuilder};
pub use coordinator::{CoordinatorState, ReturnHandling, RoundTripCoordinator};
pub use lifecycle::{LifecycleEvent, LifecycleObserver};
pub use transport::{BrowserSwitchTransport, DeepLinkTransport};
