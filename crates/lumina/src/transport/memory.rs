//! In-process stand-ins for both channels, shared between simulated windows.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use super::slots::SlotError;
use super::{ChangeHandler, FanoutChannel, Listener, MessageHandler, SlotStore, TransportError};

static NEXT_ID: AtomicU64 = AtomicU64::new(1);

fn next_id() -> u64 {
    NEXT_ID.fetch_add(1, Ordering::Relaxed)
}

#[derive(Default)]
struct BusInner {
    listeners: Mutex<Vec<(u64, u64, MessageHandler)>>,
    /// When set, posts are silently dropped.
    broken: AtomicBool,
}

/// Fan-out bus. Each [`MemoryBus::window`] handle plays one process: its
/// posts reach listeners of every other handle, never its own.
#[derive(Clone, Default)]
pub struct MemoryBus {
    inner: Arc<BusInner>,
    origin: u64,
}

impl MemoryBus {
    pub fn new() -> Self {
        Self {
            inner: Arc::default(),
            origin: next_id(),
        }
    }

    pub fn window(&self) -> Self {
        Self {
            inner: self.inner.clone(),
            origin: next_id(),
        }
    }

    /// Drop every message from now on, as if the channel had died.
    pub fn break_delivery(&self) {
        self.inner.broken.store(true, Ordering::Relaxed);
    }

    pub fn listener_count(&self) -> usize {
        self.inner.listeners.lock().map(|l| l.len()).unwrap_or(0)
    }
}

impl FanoutChannel for MemoryBus {
    fn post(&self, payload: &[u8]) -> Result<(), TransportError> {
        if self.inner.broken.load(Ordering::Relaxed) {
            return Ok(());
        }
        if let Ok(listeners) = self.inner.listeners.lock() {
            for (_, origin, handler) in listeners.iter() {
                if *origin != self.origin {
                    handler(payload.to_vec());
                }
            }
        }
        Ok(())
    }

    fn listen(&self, handler: MessageHandler) -> Result<Listener, TransportError> {
        let id = next_id();
        if let Ok(mut listeners) = self.inner.listeners.lock() {
            listeners.push((id, self.origin, handler));
        }
        let inner = self.inner.clone();
        Ok(Listener::new(move || {
            if let Ok(mut listeners) = inner.listeners.lock() {
                listeners.retain(|(lid, _, _)| *lid != id);
            }
        }))
    }
}

#[derive(Default)]
struct SlotsInner {
    values: Mutex<HashMap<String, String>>,
    watchers: Mutex<Vec<(u64, u64, String, ChangeHandler)>>,
    failing: AtomicBool,
}

/// Slot storage shared by simulated windows. Change notifications reach
/// watchers of other handles only, like storage events between windows.
#[derive(Clone, Default)]
pub struct MemorySlots {
    inner: Arc<SlotsInner>,
    origin: u64,
}

impl MemorySlots {
    pub fn new() -> Self {
        Self {
            inner: Arc::default(),
            origin: next_id(),
        }
    }

    pub fn window(&self) -> Self {
        Self {
            inner: self.inner.clone(),
            origin: next_id(),
        }
    }

    /// Make every read and write fail, as with disabled or full storage.
    pub fn set_failing(&self, failing: bool) {
        self.inner.failing.store(failing, Ordering::Relaxed);
    }

    /// Write without notifying anyone, e.g. to seed a value.
    pub fn seed(&self, key: &str, value: &str) {
        if let Ok(mut values) = self.inner.values.lock() {
            values.insert(key.to_string(), value.to_string());
        }
    }

    pub fn watcher_count(&self) -> usize {
        self.inner.watchers.lock().map(|w| w.len()).unwrap_or(0)
    }
}

impl SlotStore for MemorySlots {
    fn get(&self, key: &str) -> Result<Option<String>, SlotError> {
        if self.inner.failing.load(Ordering::Relaxed) {
            return Err(SlotError::Unavailable);
        }
        let values = self.inner.values.lock().map_err(|_| SlotError::Unavailable)?;
        Ok(values.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), SlotError> {
        if self.inner.failing.load(Ordering::Relaxed) {
            return Err(SlotError::Unavailable);
        }
        self.seed(key, value);
        if let Ok(watchers) = self.inner.watchers.lock() {
            for (_, origin, watched, handler) in watchers.iter() {
                if *origin != self.origin && watched == key {
                    handler();
                }
            }
        }
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), SlotError> {
        if let Ok(mut values) = self.inner.values.lock() {
            values.remove(key);
        }
        Ok(())
    }

    fn watch(&self, key: &str, on_change: ChangeHandler) -> Result<Listener, SlotError> {
        let id = next_id();
        if let Ok(mut watchers) = self.inner.watchers.lock() {
            watchers.push((id, self.origin, key.to_string(), on_change));
        }
        let inner = self.inner.clone();
        Ok(Listener::new(move || {
            if let Ok(mut watchers) = inner.watchers.lock() {
                watchers.retain(|(wid, _, _, _)| *wid != id);
            }
        }))
    }
}
