// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Page-readiness latch in front of the script host.
//
// While the host reports a navigation in progress, scripts are held back and
// delivered when the page finishes loading. At most one script is held: a
// later script replaces an earlier one, since only one notification can be
// outstanding per round trip.

use std::sync::{Arc, Mutex, PoisonError};

use tracing::debug;

use crate::traits::ScriptHost;

#[derive(Debug, Default)]
struct Latch {
    loading: bool,
    pending: Option<String>,
}

/// Two-state (ready / loading) latch with a single pending script.
pub struct PageLoadState {
    host: Arc<dyn ScriptHost>,
    latch: Mutex<Latch>,
}

impl PageLoadState {
    /// Wrap `host`. The page is assumed ready until the host reports a
    /// navigation with [`page_started`](Self::page_started).
    pub fn new(host: Arc<dyn ScriptHost>) -> Self {
        Self {
            host,
            latch: Mutex::new(Latch::default()),
        }
    }

    /// Deliver `script` now if the page is ready, otherwise hold it.
    pub fn deliver(&self, script: String) {
        let mut latch = self.latch.lock().unwrap_or_else(PoisonError::into_inner);
        if latch.loading {
            if latch.pending.replace(script).is_some() {
                debug!("replaced held script while page is loading");
            } else {
                debug!("holding script until page finishes loading");
            }
            return;
        }
        drop(latch);
        self.host.post_script(script);
    }

    /// The page began loading: hold scripts from now on.
    pub fn page_started(&self) {
        self.latch
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .loading = true;
    }

    /// The page finished loading: release the held script, if any, once.
    pub fn page_finished(&self) {
        let pending = {
            let mut latch = self.latch.lock().unwrap_or_else(PoisonError::into_inner);
            latch.loading = false;
            latch.pending.take()
        };
        if let Some(script) = pending {
            debug!("releasing held script");
            self.host.post_script(script);
        }
    }

    pub fn is_ready(&self) -> bool {
        !self
            .latch
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .loading
    }
}
