//! Encoding of persisted conversation state.
//!
//! History is a JSON object mapping peer to an array of messages; unread is
//! a JSON object mapping peer to a positive count. Decoding is tolerant per
//! entry: a malformed message is skipped, a non-array thread becomes empty,
//! and only an unparseable document loses everything.

use std::collections::{BTreeMap, HashMap, VecDeque};

use murmur_core::PrivateMessage;
use murmur_core::constants::THREAD_CAPACITY;
use serde_json::Value;
use tracing::{debug, warn};

/// Message threads keyed by peer.
pub type Threads = HashMap<String, VecDeque<PrivateMessage>>;

/// Unread counts keyed by peer.
pub type UnreadLedger = HashMap<String, u32>;

/// Decode stored history.
pub fn decode_history(raw: &str) -> Threads {
    let Some(entries) = parse_object(raw, "history") else {
        return Threads::new();
    };

    let mut threads = Threads::with_capacity(entries.len());
    for (peer, value) in entries {
        let thread = match value {
            Value::Array(items) => decode_thread(&peer, items),
            other => {
                warn!(peer = %peer, kind = json_kind(&other), "stored thread is not an array, starting empty");
                VecDeque::new()
            }
        };
        let _ = threads.insert(peer, thread);
    }
    threads
}

fn decode_thread(peer: &str, items: Vec<Value>) -> VecDeque<PrivateMessage> {
    let total = items.len();
    let mut thread: VecDeque<PrivateMessage> = items
        .into_iter()
        .filter_map(|item| serde_json::from_value(item).ok())
        .collect();
    if thread.len() < total {
        debug!(peer, dropped = total - thread.len(), "skipped malformed stored messages");
    }
    while thread.len() > THREAD_CAPACITY {
        let _ = thread.pop_front();
    }
    thread
}

/// Encode history, keeping the newest [`THREAD_CAPACITY`] messages per peer.
pub fn encode_history(threads: &Threads) -> Result<String, serde_json::Error> {
    let ordered: BTreeMap<&str, Vec<&PrivateMessage>> = threads
        .iter()
        .map(|(peer, thread)| {
            let skip = thread.len().saturating_sub(THREAD_CAPACITY);
            (peer.as_str(), thread.iter().skip(skip).collect())
        })
        .collect();
    serde_json::to_string(&ordered)
}

/// Decode stored unread counts. Zero, negative and non-numeric entries are dropped.
pub fn decode_unread(raw: &str) -> UnreadLedger {
    let Some(entries) = parse_object(raw, "unread") else {
        return UnreadLedger::new();
    };
    entries
        .into_iter()
        .filter_map(|(peer, value)| {
            let count = value.as_u64().and_then(|n| u32::try_from(n).ok())?;
            (count > 0).then_some((peer, count))
        })
        .collect()
}

/// Encode unread counts, omitting zeros.
pub fn encode_unread(unread: &UnreadLedger) -> Result<String, serde_json::Error> {
    let ordered: BTreeMap<&str, u32> = unread
        .iter()
        .filter(|(_, count)| **count > 0)
        .map(|(peer, count)| (peer.as_str(), *count))
        .collect();
    serde_json::to_string(&ordered)
}

fn parse_object(raw: &str, what: &str) -> Option<serde_json::Map<String, Value>> {
    match serde_json::from_str::<Value>(raw) {
        Ok(Value::Object(map)) => Some(map),
        Ok(other) => {
            warn!(what, kind = json_kind(&other), "stored state is not an object, ignoring");
            None
        }
        Err(e) => {
            warn!(what, error = %e, "failed to parse stored state, ignoring");
            None
        }
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
