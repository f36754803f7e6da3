// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Host lifecycle observer.
//
// Turns the host's resume / new-deep-link notifications into calls to
// `handle_return_to_app`. Resume handling is deferred by one scheduler tick
// so that a deep link delivered right after the resume is seen first; the
// re-entrancy guard and the cleared token absorb whichever signal loses.
//
// A saved deep link is used for one resolution only: the resume task takes
// it out, and a new-deep-link task clears it once handled, so a later bare
// resume never replays a previous flow's URI.

use std::sync::{Arc, Mutex, PoisonError};

use popupbridge_core::types::ReentrySignal;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tracing::debug;

use crate::coordinator::{ReturnHandling, RoundTripCoordinator};

/// Host lifecycle notifications.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LifecycleEvent {
    /// The owning window/activity returned to the foreground.
    Resumed,
    /// The app was handed a new deep link while running.
    NewIntent(ReentrySignal),
    Paused,
    Destroyed,
}

pub struct LifecycleObserver {
    coordinator: Arc<RoundTripCoordinator>,
    runtime: Handle,
    latest: Arc<Mutex<ReentrySignal>>,
}

impl LifecycleObserver {
    pub fn new(coordinator: Arc<RoundTripCoordinator>, runtime: Handle) -> Self {
        Self {
            coordinator,
            runtime,
            latest: Arc::new(Mutex::new(ReentrySignal::resumed())),
        }
    }

    /// The signal a resume would be resolved against right now.
    pub fn latest_signal(&self) -> ReentrySignal {
        self.latest
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Record the deep link the host was launched with. Consumed by the
    /// next resume.
    pub fn set_launch_signal(&self, signal: ReentrySignal) {
        *self.latest.lock().unwrap_or_else(PoisonError::into_inner) = signal;
    }

    /// Handle one lifecycle event. Returns the spawned resolution task for
    /// events that trigger one.
    pub fn on_event(&self, event: LifecycleEvent) -> Option<JoinHandle<ReturnHandling>> {
        match event {
            LifecycleEvent::Resumed => {
                let coordinator = Arc::clone(&self.coordinator);
                let latest = Arc::clone(&self.latest);
                Some(self.runtime.spawn(async move {
                    tokio::task::yield_now().await;
                    let signal = std::mem::take(
                        &mut *latest.lock().unwrap_or_else(PoisonError::into_inner),
                    );
                    coordinator.handle_return_to_app(&signal).await
                }))
            }
            LifecycleEvent::NewIntent(signal) => {
                self.set_launch_signal(signal.clone());
                let coordinator = Arc::clone(&self.coordinator);
                let latest = Arc::clone(&self.latest);
                Some(self.runtime.spawn(async move {
                    let handled = coordinator.handle_return_to_app(&signal).await;
                    let mut slot = latest.lock().unwrap_or_else(PoisonError::into_inner);
                    if *slot == signal {
                        *slot = ReentrySignal::resumed();
                    }
                    handled
                }))
            }
            LifecycleEvent::Paused | LifecycleEvent::Destroyed => {
                debug!(?event, "lifecycle event needs no action");
                None
            }
        }
    }
}
