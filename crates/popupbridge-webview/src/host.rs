// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Ready-made script hosts.
//
// `ChannelScriptHost` hands scripts to the owner thread over an unbounded
// Tokio channel; the owner drains `ScriptReceiver` and evaluates each script
// in order. `RecordingScriptHost` keeps scripts in memory for headless hosts.

use std::sync::{Mutex, PoisonError};

use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::traits::ScriptHost;

/// Script host backed by an unbounded channel to the owner thread.
#[derive(Clone)]
pub struct ChannelScriptHost {
    tx: mpsc::UnboundedSender<String>,
}

/// Owner-thread end of a [`ChannelScriptHost`].
pub struct ScriptReceiver {
    rx: mpsc::UnboundedReceiver<String>,
}

impl ChannelScriptHost {
    /// Create a connected host/receiver pair.
    pub fn channel() -> (Self, ScriptReceiver) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, ScriptReceiver { rx })
    }
}

impl ScriptHost for ChannelScriptHost {
    fn post_script(&self, script: String) {
        debug!(len = script.len(), "posting script to owner thread");
        if self.tx.send(script).is_err() {
            warn!("script receiver dropped; script discarded");
        }
    }
}

impl ScriptReceiver {
    /// Wait for the next script. Returns None once every host is dropped.
    pub async fn recv(&mut self) -> Option<String> {
        self.rx.recv().await
    }

    /// Take the next script if one is already queued.
    pub fn try_recv(&mut self) -> Option<String> {
        self.rx.try_recv().ok()
    }
}

/// Script host that records every posted script.
#[derive(Default)]
pub struct RecordingScriptHost {
    scripts: Mutex<Vec<String>>,
}

impl RecordingScriptHost {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of all scripts posted so far, oldest first.
    pub fn scripts(&self) -> Vec<String> {
        self.scripts
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn len(&self) -> usize {
        self.scripts
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl ScriptHost for RecordingScriptHost {
    fn post_script(&self, script: String) {
        self.scripts
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(script);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn channel_preserves_posting_order() {
        let (host, mut receiver) = ChannelScriptHost::channel();
        host.post_script("first".into());
        host.post_script("second".into());
        drop(host);

        assert_eq!(receiver.recv().await.as_deref(), Some("first"));
        assert_eq!(receiver.recv().await.as_deref(), Some("second"));
        assert_eq!(receiver.recv().await, None);
    }

    #[test]
    fn posting_after_receiver_dropped_is_silent() {
        let (host, receiver) = ChannelScriptHost::channel();
        drop(receiver);
        host.post_script("lost".into());
    }

    #[test]
    fn recording_host_keeps_scripts() {
        let host = RecordingScriptHost::new();
        assert!(host.is_empty());
        host.post_script("a".into());
        assert_eq!(host.scripts(), vec!["a".to_owned()]);
    }
}
