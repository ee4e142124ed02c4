//! The process-scoped presentation state.
//!
//! The operator owns the canonical state and writes it with
//! [`StateStore::replace`]; displays only ever [`StateStore::reconcile`]
//! incoming copies. Identity of the held `Arc`s is meaningful: reconcile
//! keeps the current `Arc` whenever the incoming value would look the same,
//! so nothing downstream mistakes a duplicate delivery for new content.

use std::sync::{Arc, Weak};
use std::time::{SystemTime, UNIX_EPOCH};

use serde::Serialize;
use tracing::{debug, warn};

use crate::model::{
    HistoryEntry, PresentationState, SlideContent, StylePatch, StyleSettings, slides_equivalent,
};
use crate::transport::SlotStore;
use crate::transport::slots::{HISTORY_KEY, LIVE_STATE_KEY, SETTINGS_KEY};

pub const HISTORY_LIMIT: usize = 20;

/// Notified after every [`StateStore::replace`].
pub trait StateListener {
    fn state_replaced(&self, state: &PresentationState);
}

/// What a [`StateStore::reconcile`] call actually changed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Reconciled {
    pub slide_changed: bool,
    pub style_changed: bool,
}

impl Reconciled {
    pub fn is_noop(&self) -> bool {
        !self.slide_changed && !self.style_changed
    }
}

pub struct StateStore {
    slide: Option<Arc<SlideContent>>,
    style: Arc<StyleSettings>,
    history: Vec<HistoryEntry>,
    /// Bumped whenever the visible slide changes to non-equivalent content.
    epoch: u64,
    persistence: Option<Arc<dyn SlotStore>>,
    listeners: Vec<Weak<dyn StateListener>>,
}

impl StateStore {
    /// Operator store: restores style and history from `slots` and writes
    /// back to them. The slide always starts empty.
    pub fn operator(slots: Arc<dyn SlotStore>) -> Self {
        let style = read_json::<StyleSettings>(slots.as_ref(), SETTINGS_KEY).unwrap_or_default();
        let history = read_json::<Vec<HistoryEntry>>(slots.as_ref(), HISTORY_KEY)
            .map(|mut h| {
                h.truncate(HISTORY_LIMIT);
                h
            })
            .unwrap_or_default();
        debug!(history = history.len(), "Restored operator state");
        Self {
            slide: None,
            style: Arc::new(style),
            history,
            epoch: 0,
            persistence: Some(slots),
            listeners: Vec::new(),
        }
    }

    /// Display store: starts idle and never persists anything.
    pub fn display() -> Self {
        Self {
            slide: None,
            style: Arc::default(),
            history: Vec::new(),
            epoch: 0,
            persistence: None,
            listeners: Vec::new(),
        }
    }

    pub fn slide(&self) -> Option<&Arc<SlideContent>> {
        self.slide.as_ref()
    }

    pub fn style(&self) -> &Arc<StyleSettings> {
        &self.style
    }

    pub fn history(&self) -> &[HistoryEntry] {
        &self.history
    }

    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    pub fn snapshot(&self) -> PresentationState {
        PresentationState {
            slide: self.slide.clone(),
            style: self.style.clone(),
        }
    }

    /// Register a listener for future replacements. The store holds it
    /// weakly: once its owner drops it, it is forgotten.
    pub fn subscribe(&mut self, listener: Weak<dyn StateListener>) {
        self.listeners.push(listener);
    }

    /// Overwrite the current state unconditionally, persist it and notify
    /// listeners.
    pub fn replace(&mut self, state: PresentationState) {
        if !slides_equivalent(self.slide.as_deref(), state.slide.as_deref()) {
            self.epoch += 1;
        }
        self.slide = state.slide.clone();
        self.style = state.style.clone();

        self.persist(&state);

        self.listeners.retain(|weak| match weak.upgrade() {
            Some(listener) => {
                listener.state_replaced(&state);
                true
            }
            None => false,
        });
    }

    /// Show `slide` and record it in history.
    pub fn present(&mut self, slide: SlideContent) {
        let slide = Arc::new(slide);
        self.replace(PresentationState {
            slide: Some(slide.clone()),
            style: self.style.clone(),
        });
        let entry = HistoryEntry {
            id: next_history_id(&self.history),
            slide,
            captured_at: now_millis(),
        };
        self.history = append_history(&self.history, entry);
        if let Some(slots) = &self.persistence {
            write_json(slots.as_ref(), HISTORY_KEY, &self.history);
        }
    }

    /// Show a history entry again without reordering history.
    pub fn select_history(&mut self, id: u64) -> Option<Arc<SlideContent>> {
        let slide = self.history.iter().find(|e| e.id == id)?.slide.clone();
        self.replace(PresentationState {
            slide: Some(slide.clone()),
            style: self.style.clone(),
        });
        Some(slide)
    }

    pub fn update_style(&mut self, patch: &StylePatch) {
        if patch.is_empty() {
            return;
        }
        let style = self.style.merged(patch);
        self.replace(PresentationState {
            slide: self.slide.clone(),
            style: Arc::new(style),
        });
    }

    /// Back to the idle screen.
    pub fn clear(&mut self) {
        self.replace(PresentationState {
            slide: None,
            style: self.style.clone(),
        });
    }

    pub fn clear_history(&mut self) {
        self.history.clear();
        if let Some(slots) = &self.persistence {
            write_json(slots.as_ref(), HISTORY_KEY, &self.history);
        }
    }

    /// Adopt an incoming state, keeping current `Arc`s for anything that
    /// would look the same. Applying the same state again is a no-op.
    pub fn reconcile(&mut self, incoming: PresentationState) -> Reconciled {
        let mut outcome = Reconciled::default();

        if !slides_equivalent(self.slide.as_deref(), incoming.slide.as_deref()) {
            self.slide = incoming.slide;
            self.epoch += 1;
            outcome.slide_changed = true;
        }
        if *self.style != *incoming.style {
            self.style = incoming.style;
            outcome.style_changed = true;
        }
        outcome
    }

    fn persist(&self, state: &PresentationState) {
        let Some(slots) = &self.persistence else {
            return;
        };
        write_json(slots.as_ref(), LIVE_STATE_KEY, state);
        write_json(slots.as_ref(), SETTINGS_KEY, state.style.as_ref());
    }
}

/// Prepend `entry`, dropping older entries with the same reference, and keep
/// the newest [`HISTORY_LIMIT`].
pub fn append_history(history: &[HistoryEntry], entry: HistoryEntry) -> Vec<HistoryEntry> {
    let reference = entry.slide.reference.clone();
    std::iter::once(entry)
        .chain(
            history
                .iter()
                .filter(|h| h.slide.reference != reference)
                .cloned(),
        )
        .take(HISTORY_LIMIT)
        .collect()
}

fn next_history_id(history: &[HistoryEntry]) -> u64 {
    let latest = history.iter().map(|h| h.id).max().unwrap_or(0);
    now_millis().max(latest + 1)
}

pub fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

/// Best-effort read; absent, unreadable or malformed values yield `None`.
pub fn read_json<T: serde::de::DeserializeOwned>(slots: &dyn SlotStore, key: &str) -> Option<T> {
    match slots.get(key) {
        Ok(Some(raw)) => match serde_json::from_str(&raw) {
            Ok(value) => Some(value),
            Err(e) => {
                warn!(key, error = %e, "Ignoring malformed slot value");
                None
            }
        },
        Ok(None) => None,
        Err(e) => {
            debug!(key, error = %e, "Slot read failed");
            None
        }
    }
}

/// Best-effort write; failures are logged and swallowed.
fn write_json<T: Serialize + ?Sized>(slots: &dyn SlotStore, key: &str, value: &T) {
    let json = match serde_json::to_string(value) {
        Ok(json) => json,
        Err(e) => {
            warn!(key, error = %e, "Could not serialize slot value");
            return;
        }
    };
    if let Err(e) = slots.set(key, &json) {
        warn!(key, error = %e, "Slot write failed, keeping in-memory state");
    }
}
