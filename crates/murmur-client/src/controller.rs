//! Conversation controller: turns relay events into cache updates and view
//! instructions for whichever peer the user is looking at.

use std::sync::Arc;

use murmur_core::validation::validate_username;
use murmur_core::{ClientEvent, PresenceEntry, PrivateMessage, RelayError};
use thiserror::Error;
use tracing::{debug, warn};

use crate::cache::ConversationCache;
use crate::store::ConversationStore;

/// Highest unread count shown verbatim in a badge.
const BADGE_MAX: u32 = 99;

/// What the view should do after an event.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ViewUpdate {
    /// Nothing visible changed.
    None,
    /// Add one message to the open conversation.
    Append(PrivateMessage),
    /// Replace the open conversation with `messages`.
    Redisplay {
        /// Peer whose conversation is shown.
        peer: String,
        /// Full thread, oldest first.
        messages: Vec<PrivateMessage>,
    },
}

/// Typing state to show for the open conversation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TypingIndicator {
    /// Who is typing.
    pub username: String,
    /// Whether to show or clear the indicator.
    pub is_typing: bool,
}

/// Why an outgoing message was not sent.
#[derive(Clone, Copy, Debug, Error, PartialEq, Eq)]
pub enum ComposeError {
    /// Input was blank.
    #[error("message is empty")]
    Empty,
    /// No conversation is open.
    #[error("select a user to send a private message")]
    NoActivePeer,
}

/// Badge text for an unread count: nothing at zero, `99+` past 99.
pub fn unread_badge(count: u32) -> Option<String> {
    match count {
        0 => None,
        n if n > BADGE_MAX => Some(format!("{BADGE_MAX}+")),
        n => Some(n.to_string()),
    }
}

/// Client-side view state over a [`ConversationCache`].
pub struct ConversationController {
    me: Option<String>,
    active_peer: Option<String>,
    roster: Vec<PresenceEntry>,
    cache: ConversationCache,
}

impl ConversationController {
    /// Open the cache from `store` and start with no active peer.
    pub fn new(store: Arc<dyn ConversationStore>) -> Self {
        Self::with_cache(ConversationCache::open(store))
    }

    /// Wrap an already loaded cache.
    pub fn with_cache(cache: ConversationCache) -> Self {
        Self {
            me: None,
            active_peer: None,
            roster: Vec::new(),
            cache,
        }
    }

    /// Our username once the relay accepted the join.
    pub fn username(&self) -> Option<&str> {
        self.me.as_deref()
    }

    /// Peer whose conversation is open.
    pub fn active_peer(&self) -> Option<&str> {
        self.active_peer.as_deref()
    }

    /// The underlying cache.
    pub fn cache(&self) -> &ConversationCache {
        &self.cache
    }

    /// Username to rejoin with at startup.
    pub fn remembered_username(&self) -> Option<String> {
        self.cache.remembered_username()
    }

    /// Build a join request after checking the name locally.
    pub fn join_request(proposed: &str) -> Result<ClientEvent, RelayError> {
        let username = validate_username(proposed)?;
        Ok(ClientEvent::Join {
            username: username.to_owned(),
        })
    }

    /// The relay accepted our join.
    ///
    /// Remembers the name and redisplays the open conversation, if any.
    pub fn on_joined(&mut self, username: &str) -> ViewUpdate {
        self.cache.remember_username(username);
        self.me = Some(username.to_owned());
        match self.active_peer.clone() {
            Some(peer) => self.redisplay(peer),
            None => ViewUpdate::None,
        }
    }

    /// A direct message arrived (including the echo of our own).
    pub fn on_private_message(&mut self, message: PrivateMessage) -> ViewUpdate {
        let Some(me) = self.me.as_deref() else {
            warn!(message_id = %message.id, "private message before join, ignoring");
            return ViewUpdate::None;
        };
        let peer = message.peer_of(me).to_owned();
        let from_me = message.from == me;
        let viewing = self.active_peer.as_deref() == Some(peer.as_str());

        self.cache.append(&peer, message.clone());
        if !from_me && !viewing {
            let unread = self.cache.increment_unread(&peer);
            debug!(peer = %peer, unread, "unread message");
        }
        self.cache.save();

        if viewing {
            ViewUpdate::Append(message)
        } else {
            ViewUpdate::None
        }
    }

    /// Open the conversation with `peer`.
    ///
    /// Clears its unread count and returns the full thread to redisplay.
    pub fn select_peer(&mut self, peer: &str) -> ViewUpdate {
        self.active_peer = Some(peer.to_owned());
        self.cache.clear_unread(peer);
        self.cache.save_unread();
        self.redisplay(peer.to_owned())
    }

    fn redisplay(&self, peer: String) -> ViewUpdate {
        let messages = self.cache.thread(&peer).cloned().collect();
        ViewUpdate::Redisplay { peer, messages }
    }

    /// A new presence snapshot arrived.
    pub fn on_users_update(&mut self, users: Vec<PresenceEntry>) {
        self.roster = users;
    }

    /// Everyone online except us, in relay order.
    pub fn online_peers(&self) -> Vec<&PresenceEntry> {
        self.roster
            .iter()
            .filter(|entry| Some(entry.username.as_str()) != self.me.as_deref())
            .collect()
    }

    /// Badge for `peer`'s unread count.
    pub fn badge(&self, peer: &str) -> Option<String> {
        unread_badge(self.cache.unread(peer))
    }

    /// A peer started or stopped typing to us.
    ///
    /// Only the open conversation's peer produces an indicator.
    pub fn on_user_typing(&self, username: &str, is_typing: bool) -> Option<TypingIndicator> {
        (self.active_peer.as_deref() == Some(username)).then(|| TypingIndicator {
            username: username.to_owned(),
            is_typing,
        })
    }

    /// Build the event for sending `text` to the open conversation.
    pub fn compose(&self, text: &str) -> Result<ClientEvent, ComposeError> {
        let message = text.trim();
        if message.is_empty() {
            return Err(ComposeError::Empty);
        }
        let to = self.active_peer.clone().ok_or(ComposeError::NoActivePeer)?;
        Ok(ClientEvent::PrivateMessage {
            to,
            message: message.to_owned(),
        })
    }

    /// Forget the user, their history and unread counts.
    pub fn logout(&mut self) {
        self.cache.clear_all();
        self.me = None;
        self.active_peer = None;
        self.roster.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{MemoryStore, StoreKey};
    use assert_matches::assert_matches;

    fn controller() -> (ConversationController, Arc<MemoryStore>) {
        let store = Arc::new(MemoryStore::new());
        let mut ctl = ConversationController::new(store.clone());
        let _ = ctl.on_joined("me");
        (ctl, store)
    }

    fn from(peer: &str, body: &str) -> PrivateMessage {
        PrivateMessage::new(peer, "me", body)
    }

    fn to(peer: &str, body: &str) -> PrivateMessage {
        PrivateMessage::new("me", peer, body)
    }

    #[test]
    fn unviewed_incoming_counts_unread() {
        let (mut ctl, _) = controller();
        assert_eq!(ctl.on_private_message(from("bob", "hi")), ViewUpdate::None);
        assert_eq!(ctl.cache().unread("bob"), 1);
        assert_eq!(ctl.cache().thread_len("bob"), 1);
    }

    #[test]
    fn viewed_incoming_appends_without_unread() {
        let (mut ctl, _) = controller();
        let _ = ctl.select_peer("bob");
        let m = from("bob", "hi");
        assert_eq!(ctl.on_private_message(m.clone()), ViewUpdate::Append(m));
        assert_eq!(ctl.cache().unread("bob"), 0);
    }

    #[test]
    fn own_echo_filed_under_recipient_without_unread() {
        let (mut ctl, _) = controller();
        let _ = ctl.select_peer("carol");
        assert_eq!(ctl.on_private_message(to("bob", "psst")), ViewUpdate::None);
        assert_eq!(ctl.cache().thread_len("bob"), 1);
        assert_eq!(ctl.cache().unread("bob"), 0);
    }

    #[test]
    fn switching_peer_clears_unread_and_redisplays() {
        let (mut ctl, store) = controller();
        let _ = ctl.on_private_message(from("alice", "a1"));
        let _ = ctl.on_private_message(from("bob", "b1"));
        assert_eq!(ctl.cache().unread("alice"), 1);

        let shown = ctl.select_peer("alice");
        assert_matches!(shown, ViewUpdate::Redisplay { ref peer, ref messages } if peer == "alice" && messages.len() == 1);
        let stored = store.read(StoreKey::Unread).unwrap().unwrap();
        assert_eq!(stored, r#"{"bob":1}"#);

        let bob_before: Vec<PrivateMessage> = ctl.cache().thread("bob").cloned().collect();
        let shown = ctl.select_peer("bob");
        let bob_after: Vec<PrivateMessage> = ctl.cache().thread("bob").cloned().collect();
        assert_eq!(bob_after, bob_before);
        assert_eq!(shown, ViewUpdate::Redisplay { peer: "bob".into(), messages: bob_before });
        assert_eq!(ctl.cache().unread("alice"), 0);
        assert_eq!(ctl.cache().thread_len("alice"), 1);
        assert_eq!(store.read(StoreKey::Unread).unwrap().unwrap(), "{}");
    }

    #[test]
    fn messages_persisted_after_append() {
        let (mut ctl, store) = controller();
        let _ = ctl.on_private_message(from("bob", "saved"));
        let history = store.read(StoreKey::History).unwrap().unwrap();
        assert!(history.contains("saved"));
    }

    #[test]
    fn message_before_join_ignored() {
        let mut ctl = ConversationController::new(Arc::new(MemoryStore::new()));
        assert_eq!(ctl.on_private_message(from("bob", "early")), ViewUpdate::None);
        assert!(ctl.cache().peers().is_empty());
    }

    #[test]
    fn rejoin_redisplays_open_conversation() {
        let (mut ctl, _) = controller();
        let _ = ctl.select_peer("bob");
        let _ = ctl.on_private_message(from("bob", "x"));
        assert_matches!(ctl.on_joined("me"), ViewUpdate::Redisplay { messages, .. } if messages.len() == 1);
    }

    #[test]
    fn roster_excludes_self() {
        let (mut ctl, _) = controller();
        ctl.on_users_update(vec![
            PresenceEntry::online("me"),
            PresenceEntry::online("bob"),
            PresenceEntry::online("carol"),
        ]);
        let names: Vec<&str> = ctl.online_peers().iter().map(|e| e.username.as_str()).collect();
        assert_eq!(names, ["bob", "carol"]);
    }

    #[test]
    fn typing_only_from_active_peer() {
        let (mut ctl, _) = controller();
        assert_eq!(ctl.on_user_typing("bob", true), None);
        let _ = ctl.select_peer("bob");
        assert_eq!(
            ctl.on_user_typing("bob", true),
            Some(TypingIndicator { username: "bob".into(), is_typing: true })
        );
        assert_eq!(ctl.on_user_typing("carol", true), None);
    }

    #[test]
    fn badge_caps_at_ninety_nine() {
        assert_eq!(unread_badge(0), None);
        assert_eq!(unread_badge(7).as_deref(), Some("7"));
        assert_eq!(unread_badge(99).as_deref(), Some("99"));
        assert_eq!(unread_badge(100).as_deref(), Some("99+"));
    }

    #[test]
    fn compose_requires_text_and_peer() {
        let (mut ctl, _) = controller();
        assert_eq!(ctl.compose("hello"), Err(ComposeError::NoActivePeer));
        let _ = ctl.select_peer("bob");
        assert_eq!(ctl.compose("   "), Err(ComposeError::Empty));
        assert_eq!(
            ctl.compose("  hello "),
            Ok(ClientEvent::PrivateMessage { to: "bob".into(), message: "hello".into() })
        );
    }

    #[test]
    fn join_request_validates_locally() {
        assert_matches!(ConversationController::join_request("x"), Err(RelayError::UsernameTooShort));
        assert_eq!(
            ConversationController::join_request(" alice "),
            Ok(ClientEvent::Join { username: "alice".into() })
        );
    }

    #[test]
    fn logout_forgets_everything() {
        let (mut ctl, store) = controller();
        let _ = ctl.on_private_message(from("bob", "hi"));
        ctl.logout();
        assert_eq!(ctl.username(), None);
        assert_eq!(ctl.remembered_username(), None);
        assert!(ctl.cache().peers().is_empty());
        assert_eq!(store.read(StoreKey::History).unwrap(), None);
        assert_eq!(store.read(StoreKey::Unread).unwrap(), None);
    }

    #[test]
    fn join_remembers_username() {
        let (ctl, store) = controller();
        assert_eq!(ctl.remembered_username().as_deref(), Some("me"));
        assert_eq!(store.read(StoreKey::Username).unwrap().as_deref(), Some("me"));
    }
}
