//! Keeps the operator and display processes on one presentation state.
//!
//! A session is created once per process for its fixed [`Role`]:
//!
//! - **Operator**: answers `RequestState` with the current state and
//!   publishes a `StateUpdate` on every store replacement. The store itself
//!   writes the fallback slot.
//! - **Display**: starts in [`Phase::Connecting`], reads the fallback slot,
//!   sends one `RequestState` and moves to [`Phase::Synced`] without waiting
//!   for an answer. From then on fan-out messages, slot change notifications
//!   and poll ticks all end up in the same reconcile call.
//!
//! Background threads never touch state. They enqueue [`SyncEvent`]s and
//! wake the UI, which drains them with [`SyncSession::pump`].

pub mod envelope;
mod ticker;

use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Arc, Weak};
use std::time::Duration;

use tracing::{debug, info, trace, warn};

use crate::model::{PresentationState, Role};
use crate::store::{StateListener, StateStore, read_json};
use crate::transport::slots::LIVE_STATE_KEY;
use crate::transport::{FanoutChannel, Listener, SlotStore};

pub use envelope::ChannelEnvelope;
use ticker::Ticker;

pub const POLL_INTERVAL: Duration = Duration::from_secs(1);

#[derive(Debug)]
pub enum SyncEvent {
    /// Raw payload from the fan-out channel, not yet decoded.
    Fanout(Vec<u8>),
    /// Another process wrote the live-state slot.
    SlotChanged,
    PollTick,
}

/// Where an incoming state came from.
#[derive(Debug, Clone, Copy)]
enum Origin {
    Fanout,
    SlotChanged,
    Poll,
    Startup,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Operator,
    Connecting,
    Synced,
}

/// Enqueues events for the UI thread and wakes it.
#[derive(Clone)]
pub struct EventSink {
    tx: Sender<SyncEvent>,
    wake: Arc<dyn Fn() + Send + Sync>,
}

impl EventSink {
    /// `false` once the session is gone.
    pub fn send(&self, event: SyncEvent) -> bool {
        let delivered = self.tx.send(event).is_ok();
        if delivered {
            (self.wake)();
        }
        delivered
    }
}

pub struct Transports {
    /// `None` when the fan-out channel could not be created.
    pub fanout: Option<Arc<dyn FanoutChannel>>,
    pub slots: Arc<dyn SlotStore>,
}

pub struct SyncOptions {
    pub poll_interval: Duration,
    /// Called from background threads whenever an event is queued.
    pub wake: Arc<dyn Fn() + Send + Sync>,
}

impl Default for SyncOptions {
    fn default() -> Self {
        Self {
            poll_interval: POLL_INTERVAL,
            wake: Arc::new(|| {}),
        }
    }
}

/// Publishes every store replacement on the fan-out channel.
struct Publisher {
    fanout: Option<Arc<dyn FanoutChannel>>,
}

impl Publisher {
    fn publish(&self, state: &PresentationState) {
        post(self.fanout.as_deref(), &ChannelEnvelope::state_update(state.clone()));
    }
}

impl StateListener for Publisher {
    fn state_replaced(&self, state: &PresentationState) {
        self.publish(state);
    }
}

pub struct SyncSession {
    role: Role,
    phase: Phase,
    fanout: Option<Arc<dyn FanoutChannel>>,
    slots: Arc<dyn SlotStore>,
    events: Receiver<SyncEvent>,
    sink: EventSink,
    /// Held strongly here and weakly by the store.
    publisher: Option<Arc<Publisher>>,
    listeners: Vec<Listener>,
    ticker: Option<Ticker>,
    /// Set once a live operator has been heard from.
    contact: bool,
}

impl SyncSession {
    pub fn start(
        role: Role,
        store: &mut StateStore,
        transports: Transports,
        options: SyncOptions,
    ) -> Self {
        let (tx, events) = mpsc::channel();
        let sink = EventSink {
            tx,
            wake: options.wake,
        };
        let mut session = Self {
            role,
            phase: match role {
                Role::Operator => Phase::Operator,
                Role::Display => Phase::Connecting,
            },
            fanout: transports.fanout,
            slots: transports.slots,
            events,
            sink,
            publisher: None,
            listeners: Vec::new(),
            ticker: None,
            contact: false,
        };
        if session.fanout.is_none() {
            warn!("Fan-out channel unavailable, syncing through storage only");
        }

        match role {
            Role::Operator => session.enter_operator(store),
            Role::Display => session.enter_display(store, options.poll_interval),
        }
        info!(role = role.name(), phase = ?session.phase, "Sync session started");
        session
    }

    fn enter_operator(&mut self, store: &mut StateStore) {
        self.attach_fanout();
        let publisher = Arc::new(Publisher {
            fanout: self.fanout.clone(),
        });
        let weak: Weak<dyn StateListener> = Arc::downgrade(&publisher) as Weak<dyn StateListener>;
        store.subscribe(weak);
        self.publisher = Some(publisher);
    }

    fn enter_display(&mut self, store: &mut StateStore, poll_interval: Duration) {
        // Attach first so the answer to our request cannot slip past.
        self.attach_fanout();

        let sink = self.sink.clone();
        match self.slots.watch(
            LIVE_STATE_KEY,
            Box::new(move || {
                sink.send(SyncEvent::SlotChanged);
            }),
        ) {
            Ok(listener) => self.listeners.push(listener),
            Err(e) => warn!(error = %e, "Cannot watch live state, relying on polling"),
        }

        // Covers launching after the operator's last publish.
        self.read_fallback(store, Origin::Startup);
        post(self.fanout.as_deref(), &ChannelEnvelope::RequestState);

        match Ticker::spawn(poll_interval, self.sink.clone()) {
            Ok(ticker) => self.ticker = Some(ticker),
            Err(e) => warn!(error = %e, "Cannot start poll ticker"),
        }
        self.phase = Phase::Synced;
    }

    fn attach_fanout(&mut self) {
        let Some(fanout) = &self.fanout else {
            return;
        };
        let sink = self.sink.clone();
        match fanout.listen(Box::new(move |bytes| {
            sink.send(SyncEvent::Fanout(bytes));
        })) {
            Ok(listener) => self.listeners.push(listener),
            Err(e) => warn!(error = %e, "Cannot listen on fan-out channel"),
        }
    }

    #[cfg(test)]
    pub fn role(&self) -> Role {
        self.role
    }

    #[cfg(test)]
    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn has_fanout(&self) -> bool {
        self.fanout.is_some()
    }

    /// Whether a running operator has been heard from. A snapshot left in
    /// storage by an operator that has since exited does not count.
    pub fn has_contact(&self) -> bool {
        self.contact
    }

    /// Handle for feeding events from outside the session's own sources.
    #[cfg(test)]
    pub fn sink(&self) -> EventSink {
        self.sink.clone()
    }

    /// Handle every queued event. Returns how many were handled.
    pub fn pump(&mut self, store: &mut StateStore) -> usize {
        let mut handled = 0;
        while let Ok(event) = self.events.try_recv() {
            self.handle(event, store);
            handled += 1;
        }
        handled
    }

    pub fn handle(&mut self, event: SyncEvent, store: &mut StateStore) {
        match event {
            SyncEvent::Fanout(bytes) => {
                let Some(envelope) = ChannelEnvelope::decode(&bytes) else {
                    debug!(bytes = bytes.len(), "Discarding malformed envelope");
                    return;
                };
                match (self.role, envelope) {
                    (Role::Operator, ChannelEnvelope::RequestState) => {
                        debug!("Answering state request");
                        self.publish_current(store);
                    }
                    (Role::Display, ChannelEnvelope::StateUpdate { payload }) => {
                        self.apply(store, payload, Origin::Fanout);
                    }
                    (Role::Operator, ChannelEnvelope::StateUpdate { .. })
                    | (Role::Display, ChannelEnvelope::RequestState) => {
                        trace!(role = self.role.name(), "Ignoring envelope for other role");
                    }
                }
            }
            SyncEvent::SlotChanged => {
                if self.role == Role::Display {
                    self.read_fallback(store, Origin::SlotChanged);
                }
            }
            SyncEvent::PollTick => {
                if self.role == Role::Display {
                    self.read_fallback(store, Origin::Poll);
                }
            }
        }
    }

    /// Re-send the current state, e.g. right after launching a display.
    pub fn publish_current(&self, store: &StateStore) {
        if let Some(publisher) = &self.publisher {
            publisher.publish(&store.snapshot());
        }
    }

    fn read_fallback(&mut self, store: &mut StateStore, origin: Origin) {
        if let Some(state) = read_json::<PresentationState>(self.slots.as_ref(), LIVE_STATE_KEY) {
            self.apply(store, state, origin);
        }
    }

    /// Single entry point for incoming state, whichever channel it came on.
    fn apply(&mut self, store: &mut StateStore, state: PresentationState, origin: Origin) {
        let outcome = store.reconcile(state);
        // A poll only proves a live operator once the slot has moved since startup.
        self.contact |= match origin {
            Origin::Fanout | Origin::SlotChanged => true,
            Origin::Poll => !outcome.is_noop(),
            Origin::Startup => false,
        };
        if !outcome.is_noop() {
            debug!(
                slide_changed = outcome.slide_changed,
                style_changed = outcome.style_changed,
                epoch = store.epoch(),
                "Applied state update"
            );
        }
    }
}

impl Drop for SyncSession {
    fn drop(&mut self) {
        debug!(
            role = self.role.name(),
            listeners = self.listeners.len(),
            "Sync session closed"
        );
    }
}

fn post(fanout: Option<&dyn FanoutChannel>, envelope: &ChannelEnvelope) {
    let Some(fanout) = fanout else {
        return;
    };
    match envelope.encode() {
        Ok(bytes) => {
            if let Err(e) = fanout.post(&bytes) {
                warn!(error = %e, "Fan-out post failed");
            }
        }
        Err(e) => warn!(error = %e, "Could not encode envelope"),
    }
}
