//! Per-peer conversation threads and unread counts, backed by a store.

use std::collections::VecDeque;
use std::sync::Arc;

use murmur_core::PrivateMessage;
use murmur_core::constants::THREAD_CAPACITY;
use tracing::{debug, warn};

use crate::codec::{self, Threads, UnreadLedger};
use crate::store::{ConversationStore, StoreKey};

/// Bounded message history and unread ledger for every peer.
///
/// Threads are created on first append and never destroyed. Storage failures
/// are logged and swallowed; the in-memory state stays authoritative.
pub struct ConversationCache {
    threads: Threads,
    unread: UnreadLedger,
    store: Arc<dyn ConversationStore>,
}

impl ConversationCache {
    /// Create an empty cache over `store` without reading it.
    pub fn new(store: Arc<dyn ConversationStore>) -> Self {
        Self {
            threads: Threads::new(),
            unread: UnreadLedger::new(),
            store,
        }
    }

    /// Create a cache and [`load`](Self::load) it from `store`.
    pub fn open(store: Arc<dyn ConversationStore>) -> Self {
        let mut cache = Self::new(store);
        cache.load();
        cache
    }

    /// Replace in-memory state with what the store holds.
    pub fn load(&mut self) {
        self.threads = self
            .read(StoreKey::History)
            .map(|raw| codec::decode_history(&raw))
            .unwrap_or_default();
        self.unread = self
            .read(StoreKey::Unread)
            .map(|raw| codec::decode_unread(&raw))
            .unwrap_or_default();
        debug!(threads = self.threads.len(), unread_peers = self.unread.len(), "conversation cache loaded");
    }

    /// Persist threads and the unread ledger.
    pub fn save(&self) {
        self.save_history();
        self.save_unread();
    }

    /// Persist threads only.
    pub fn save_history(&self) {
        match codec::encode_history(&self.threads) {
            Ok(raw) => self.write(StoreKey::History, &raw),
            Err(e) => warn!(error = %e, "failed to encode conversation history"),
        }
    }

    /// Persist the unread ledger only.
    pub fn save_unread(&self) {
        match codec::encode_unread(&self.unread) {
            Ok(raw) => self.write(StoreKey::Unread, &raw),
            Err(e) => warn!(error = %e, "failed to encode unread counts"),
        }
    }

    /// Append to `peer`'s thread, evicting the oldest beyond capacity.
    pub fn append(&mut self, peer: &str, message: PrivateMessage) {
        let thread = self.threads.entry(peer.to_owned()).or_default();
        thread.push_back(message);
        while thread.len() > THREAD_CAPACITY {
            let _ = thread.pop_front();
        }
    }

    /// Messages exchanged with `peer`, oldest first.
    pub fn thread(&self, peer: &str) -> impl Iterator<Item = &PrivateMessage> {
        self.threads.get(peer).into_iter().flat_map(VecDeque::iter)
    }

    /// Number of messages held for `peer`.
    pub fn thread_len(&self, peer: &str) -> usize {
        self.threads.get(peer).map_or(0, VecDeque::len)
    }

    /// Peers with a thread, sorted.
    pub fn peers(&self) -> Vec<&str> {
        let mut peers: Vec<&str> = self.threads.keys().map(String::as_str).collect();
        peers.sort_unstable();
        peers
    }

    /// Bump `peer`'s unread count, returning the new value.
    pub fn increment_unread(&mut self, peer: &str) -> u32 {
        let count = self.unread.entry(peer.to_owned()).or_insert(0);
        *count = count.saturating_add(1);
        *count
    }

    /// Reset `peer`'s unread count.
    pub fn clear_unread(&mut self, peer: &str) {
        let _ = self.unread.remove(peer);
    }

    /// Unread count for `peer`.
    pub fn unread(&self, peer: &str) -> u32 {
        self.unread.get(peer).copied().unwrap_or(0)
    }

    /// The username from the last successful join, if stored.
    pub fn remembered_username(&self) -> Option<String> {
        self.read(StoreKey::Username)
            .map(|name| name.trim().to_owned())
            .filter(|name| !name.is_empty())
    }

    /// Store `username` for the next start.
    pub fn remember_username(&self, username: &str) {
        self.write(StoreKey::Username, username);
    }

    /// Forget everything, in memory and in the store.
    pub fn clear_all(&mut self) {
        self.threads.clear();
        self.unread.clear();
        for key in StoreKey::ALL {
            if let Err(e) = self.store.remove(key) {
                warn!(?key, error = %e, "failed to clear stored conversation state");
            }
        }
    }

    fn read(&self, key: StoreKey) -> Option<String> {
        match self.store.read(key) {
            Ok(value) => value,
            Err(e) => {
                warn!(?key, error = %e, "failed to read stored conversation state");
                None
            }
        }
    }

    fn write(&self, key: StoreKey, value: &str) {
        if let Err(e) = self.store.write(key, value) {
            warn!(?key, error = %e, "failed to persist conversation state");
        }
    }
}
