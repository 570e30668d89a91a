//! Session termination event stream.
//!
//! Every subscriber gets its own unbounded queue, so a listener that has not
//! been polled yet never loses an event. Dropping the receiver is how a
//! listener unregisters.

use std::sync::{Arc, Mutex, MutexGuard};

use log::debug;
use tokio::sync::mpsc;

use dbgbox_protocol::TerminationEvent;

/// Receiving end of one subscription.
pub type TerminationReceiver = mpsc::UnboundedReceiver<TerminationEvent>;

#[derive(Debug, Clone, Default)]
pub struct TerminationEvents {
    listeners: Arc<Mutex<Vec<mpsc::UnboundedSender<TerminationEvent>>>>,
}

impl TerminationEvents {
    pub fn new() -> Self {
        Self::default()
    }

    /// Locked listener list with unsubscribed entries pruned.
    fn live_listeners(&self) -> MutexGuard<'_, Vec<mpsc::UnboundedSender<TerminationEvent>>> {
        let mut listeners = self.listeners.lock().unwrap_or_else(|e| e.into_inner());
        listeners.retain(|tx| !tx.is_closed());
        listeners
    }

    /// Publish an ended session. Returns how many listeners received it.
    pub fn emit(&self, event: TerminationEvent) -> usize {
        let delivered = self
            .live_listeners()
            .iter()
            .filter(|tx| tx.send(event.clone()).is_ok())
            .count();
        if delivered == 0 {
            debug!("termination of session {} had no listeners", event.session_id);
        }
        delivered
    }

    pub fn subscribe(&self) -> TerminationReceiver {
        let (tx, rx) = mpsc::unbounded_channel();
        self.live_listeners().push(tx);
        rx
    }

    /// Number of live listeners.
    pub fn listener_count(&self) -> usize {
        self.live_listeners().len()
    }
}
