//! Debounced typing notifications.
//!
//! The first keystroke toward a peer emits `typing(to, true)`. Every
//! keystroke re-arms a single pending timer; when it fires after `idle`
//! without further input, `typing(to, false)` is emitted. At most one timer
//! is outstanding at any time.

use std::sync::Arc;
use std::time::Duration;

use murmur_core::ClientEvent;
use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::debug;

struct Pending {
    to: String,
    cancel: CancellationToken,
}

#[derive(Default)]
struct Slot {
    pending: Option<Pending>,
    generation: u64,
}

/// Emits typing start/stop events into an outbound channel.
pub struct TypingDebouncer {
    idle: Duration,
    outbox: mpsc::UnboundedSender<ClientEvent>,
    slot: Arc<Mutex<Slot>>,
}

fn typing(to: String, is_typing: bool) -> ClientEvent {
    ClientEvent::Typing { to, is_typing }
}

impl TypingDebouncer {
    /// Create a debouncer that stops after `idle` of silence.
    pub fn new(idle: Duration, outbox: mpsc::UnboundedSender<ClientEvent>) -> Self {
        Self {
            idle,
            outbox,
            slot: Arc::new(Mutex::new(Slot::default())),
        }
    }

    /// Record a keystroke in the conversation with `to`.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn keystroke(&self, to: &str) {
        let mut slot = self.slot.lock();
        slot.generation += 1;
        let generation = slot.generation;

        match slot.pending.take() {
            Some(prev) if prev.to == to => prev.cancel.cancel(),
            Some(prev) => {
                prev.cancel.cancel();
                self.emit(typing(prev.to, false));
                self.emit(typing(to.to_owned(), true));
            }
            None => self.emit(typing(to.to_owned(), true)),
        }

        let cancel = CancellationToken::new();
        slot.pending = Some(Pending {
            to: to.to_owned(),
            cancel: cancel.clone(),
        });
        drop(slot);

        let slot = self.slot.clone();
        let outbox = self.outbox.clone();
        let idle = self.idle;
        let _ = tokio::spawn(async move {
            tokio::select! {
                () = tokio::time::sleep(idle) => {}
                () = cancel.cancelled() => return,
            }
            let mut slot = slot.lock();
            // A keystroke may have re-armed the slot between wake-up and lock.
            if slot.generation != generation {
                return;
            }
            if let Some(done) = slot.pending.take() {
                debug!(to = %done.to, "typing idle");
                let _ = outbox.send(typing(done.to, false));
            }
        });
    }

    /// Stop typing now, e.g. because the message was sent.
    pub fn stop(&self) {
        let mut slot = self.slot.lock();
        slot.generation += 1;
        if let Some(prev) = slot.pending.take() {
            prev.cancel.cancel();
            self.emit(typing(prev.to, false));
        }
    }

    /// Whether a stop notification is pending.
    pub fn is_typing(&self) -> bool {
        self.slot.lock().pending.is_some()
    }

    fn emit(&self, event: ClientEvent) {
        if self.outbox.send(event).is_err() {
            debug!("typing outbox closed");
        }
    }
}

impl Drop for TypingDebouncer {
    fn drop(&mut self) {
        if let Some(prev) = self.slot.lock().pending.take() {
            prev.cancel.cancel();
        }
    }
}
