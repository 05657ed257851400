//! Inbound frame dispatch: decodes one text frame as a [`ClientEvent`] and
//! hands it to the [`MessageRouter`].

use murmur_core::{ClientEvent, ConnectionId};
use tracing::{debug, instrument, warn};

use crate::router::MessageRouter;

/// What a frame turned into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dispatch {
    /// The frame decoded and the named event was routed.
    Routed(&'static str),
    /// The frame did not decode; the client was sent an error.
    Invalid,
}

/// Handle one inbound text frame from `connection_id`.
#[instrument(skip_all, fields(event))]
pub async fn handle_frame(text: &str, connection_id: &ConnectionId, router: &MessageRouter) -> Dispatch {
    let event = match ClientEvent::from_json(text) {
        Ok(event) => event,
        Err(err) => {
            warn!(conn_id = %connection_id, len = text.len(), "invalid event received");
            router.reject(connection_id, &err).await;
            return Dispatch::Invalid;
        }
    };

    let name = event.name();
    let _ = tracing::Span::current().record("event", name);
    debug!(conn_id = %connection_id, event = name, "dispatching event");

    // Rejections are already reported to the client by the router.
    match event {
        ClientEvent::Join { username } => {
            let _ = router.handle_join(connection_id, &username).await;
        }
        ClientEvent::PrivateMessage { to, message } => {
            let _ = router.handle_private_message(connection_id, &to, &message).await;
        }
        ClientEvent::Typing { to, is_typing } => {
            let _ = router.handle_typing(connection_id, &to, is_typing).await;
        }
    }
    Dispatch::Routed(name)
}
