//! Delivery mechanisms between the operator and display processes.
//!
//! Two independent channels are used together for redundancy:
//!
//! - a fan-out channel ([`FanoutChannel`]): real-time, unordered,
//!   at-most-once, and only seen by listeners attached at send time;
//! - a fallback slot store ([`SlotStore`]): durable key-value slots whose
//!   changes are announced to watchers in other processes, and which displays
//!   also poll.
//!
//! Neither channel interprets payloads. Decoding and role handling live in
//! [`crate::sync`].

pub mod loopback;
#[cfg(test)]
pub mod memory;
pub mod slots;

pub use loopback::LoopbackChannel;
pub use slots::{FileSlots, SlotStore, UnavailableSlots};

/// Name shared by every cooperating process. Processes using a different
/// name never see each other's messages.
pub const CHANNEL_NAME: &str = "lumina_live_channel";

/// Callback receiving raw fan-out payloads, invoked on a background thread.
pub type MessageHandler = Box<dyn Fn(Vec<u8>) + Send + 'static>;

/// Callback invoked when a watched slot changes in another process.
pub type ChangeHandler = Box<dyn Fn() + Send + 'static>;

#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("Fan-out channel I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Payload of {size} bytes exceeds the {limit} byte datagram limit")]
    PayloadTooLarge { size: usize, limit: usize },
}

/// Real-time pub/sub between processes.
pub trait FanoutChannel: Send + Sync {
    /// Deliver `payload` to every listener currently attached in other
    /// processes. Nobody listening is not an error.
    fn post(&self, payload: &[u8]) -> Result<(), TransportError>;

    /// Attach a listener. Messages flow until the returned guard is dropped.
    fn listen(&self, handler: MessageHandler) -> Result<Listener, TransportError>;
}

/// Keeps a subscription alive; dropping it detaches the subscription and
/// releases whatever resources back it (threads, watchers, marker files).
#[must_use = "dropping a Listener detaches it immediately"]
pub struct Listener {
    detach: Option<Box<dyn FnOnce()>>,
}

impl Listener {
    pub fn new(detach: impl FnOnce() + 'static) -> Self {
        Self {
            detach: Some(Box::new(detach)),
        }
    }
}

impl Drop for Listener {
    fn drop(&mut self) {
        if let Some(detach) = self.detach.take() {
            detach();
        }
    }
}

impl std::fmt::Debug for Listener {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Listener")
            .field("attached", &self.detach.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::rc::Rc;

    #[test]
    fn test_listener_detaches_once_on_drop() {
        let count = Rc::new(Cell::new(0));
        let counter = count.clone();
        let listener = Listener::new(move || counter.set(counter.get() + 1));
        assert_eq!(count.get(), 0);
        drop(listener);
        assert_eq!(count.get(), 1);
    }
}
