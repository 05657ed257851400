//! Text rendering for the terminal client.

use chrono::Local;
use murmur_client::ConversationController;
use murmur_core::PrivateMessage;

/// One message line: `[14:02] alice: hello`.
pub fn message_line(message: &PrivateMessage) -> String {
    let at = message.timestamp.with_timezone(&Local).format("%H:%M");
    format!("[{at}] {}: {}", message.from, message.message)
}

/// Header shown when a conversation is (re)displayed.
pub fn conversation_header(peer: &str, count: usize) -> String {
    if count == 0 {
        format!("--- chat with {peer} (no messages yet) ---")
    } else {
        format!("--- chat with {peer} ---")
    }
}

/// Roster line: online peers with unread badges.
pub fn roster_line(controller: &ConversationController) -> String {
    let peers: Vec<String> = controller
        .online_peers()
        .iter()
        .map(|entry| match controller.badge(&entry.username) {
            Some(badge) => format!("{} ({badge})", entry.username),
            None => entry.username.clone(),
        })
        .collect();
    if peers.is_empty() {
        "online: nobody else".to_owned()
    } else {
        format!("online: {}", peers.join(", "))
    }
}

/// Notice for a message that arrived outside the open conversation.
pub fn unread_notice(peer: &str, badge: Option<&str>) -> String {
    match badge {
        Some(badge) => format!("* new message from {peer} ({badge} unread)"),
        None => format!("* new message from {peer}"),
    }
}
