// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// In-memory store for hosts without durable storage and for tests.
//
// Not durable: the slot is lost when the process dies. Counts every
// operation so round-trip tests can assert how often the slot was touched.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;
use popupbridge_core::error::Result;
use popupbridge_core::types::PendingRequest;

use crate::PendingRequestStore;

#[derive(Debug, Default)]
pub struct MemoryStore {
    slot: Mutex<Option<PendingRequest>>,
    stores: AtomicUsize,
    gets: AtomicUsize,
    clears: AtomicUsize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A store whose slot already holds `request`.
    pub fn holding(request: PendingRequest) -> Self {
        Self {
            slot: Mutex::new(Some(request)),
            ..Self::default()
        }
    }

    /// Current contents, without counting as a `get`.
    pub fn peek(&self) -> Option<PendingRequest> {
        self.slot
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn store_count(&self) -> usize {
        self.stores.load(Ordering::SeqCst)
    }

    pub fn get_count(&self) -> usize {
        self.gets.load(Ordering::SeqCst)
    }

    pub fn clear_count(&self) -> usize {
        self.clears.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PendingRequestStore for MemoryStore {
    async fn store(&self, request: &PendingRequest) -> Result<()> {
        self.stores.fetch_add(1, Ordering::SeqCst);
        *self.slot.lock().unwrap_or_else(PoisonError::into_inner) = Some(request.clone());
        Ok(())
    }

    async fn get(&self) -> Result<Option<PendingRequest>> {
        self.gets.fetch_add(1, Ordering::SeqCst);
        Ok(self.peek())
    }

    async fn clear(&self) -> Result<()> {
        self.clears.fetch_add(1, Ordering::SeqCst);
        *self.slot.lock().unwrap_or_else(PoisonError::into_inner) = None;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn empty_store_returns_none() {
        let store = MemoryStore::new();
        assert_eq!(store.get().await.expect("get"), None);
    }

    #[tokio::test]
    async fn store_get_clear() {
        let store = MemoryStore::new();
        store.store(&PendingRequest::new("tok-1")).await.expect("store");
        assert_eq!(store.get().await.expect("get"), Some(PendingRequest::new("tok-1")));

        store.clear().await.expect("clear");
        assert_eq!(store.peek(), None);
        assert_eq!((store.store_count(), store.get_count(), store.clear_count()), (1, 1, 1));
    }
}
