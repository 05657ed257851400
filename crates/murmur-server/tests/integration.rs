//! End-to-end relay tests over real WebSocket connections.

use std::net::SocketAddr;
use std::time::Duration;

use futures::{SinkExt, StreamExt};
use murmur_server::{RelayServer, ServerConfig};
use serde_json::{Value, json};
use tokio::net::TcpStream;
use tokio::time::timeout;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};

type Ws = WebSocketStream<MaybeTlsStream<TcpStream>>;

const WAIT: Duration = Duration::from_secs(5);
const QUIET: Duration = Duration::from_millis(200);

async fn start(config: ServerConfig) -> (RelayServer, SocketAddr) {
    let server = RelayServer::new(config);
    let (addr, _handle) = server.listen().await.unwrap();
    (server, addr)
}

async fn start_default() -> (RelayServer, SocketAddr) {
    start(ServerConfig::default()).await
}

/// Connect and consume the `connected` greeting.
async fn connect(addr: SocketAddr) -> Ws {
    let (mut ws, _) = connect_async(format!("ws://{addr}/ws")).await.unwrap();
    let greeting = next_event(&mut ws).await;
    assert_eq!(greeting["type"], "connected");
    assert!(greeting["data"]["connectionId"].is_string());
    ws
}

async fn next_text(ws: &mut Ws) -> String {
    loop {
        let msg = timeout(WAIT, ws.next()).await.unwrap().unwrap().unwrap();
        if let Message::Text(text) = msg {
            return text.as_str().to_owned();
        }
    }
}

async fn next_event(ws: &mut Ws) -> Value {
    serde_json::from_str(&next_text(ws).await).unwrap()
}

async fn send(ws: &mut Ws, event: &Value) {
    ws.send(Message::text(event.to_string())).await.unwrap();
}

async fn expect_silence(ws: &mut Ws) {
    assert!(timeout(QUIET, ws.next()).await.is_err(), "unexpected frame");
}

fn usernames(update: &Value) -> Vec<&str> {
    assert_eq!(update["type"], "usersUpdate");
    update["data"]
        .as_array()
        .unwrap()
        .iter()
        .map(|e| e["username"].as_str().unwrap())
        .collect()
}

/// Connect and join as `name`, consuming `joined` and the first snapshot.
async fn join(addr: SocketAddr, name: &str) -> Ws {
    let mut ws = connect(addr).await;
    send(&mut ws, &json!({"type": "join", "data": {"username": name}})).await;
    let joined = next_event(&mut ws).await;
    assert_eq!(joined["type"], "joined");
    assert_eq!(joined["data"]["username"], name);
    let snapshot = next_event(&mut ws).await;
    assert!(usernames(&snapshot).contains(&name));
    ws
}

#[tokio::test]
async fn join_broadcasts_presence_to_everyone() {
    let (_server, addr) = start_default().await;
    let mut alice = join(addr, "alice").await;
    let mut bob = join(addr, "bob").await;

    let update = next_event(&mut alice).await;
    assert_eq!(usernames(&update), ["alice", "bob"]);
    assert_eq!(update["data"][1]["status"], "online");
    expect_silence(&mut bob).await;
}

#[tokio::test]
async fn private_message_echoed_identically() {
    let (_server, addr) = start_default().await;
    let mut alice = join(addr, "alice").await;
    let mut bob = join(addr, "bob").await;
    let _ = next_event(&mut alice).await;

    send(&mut alice, &json!({"type": "privateMessage", "data": {"to": "bob", "message": "hello"}})).await;

    let to_bob = next_text(&mut bob).await;
    let to_alice = next_text(&mut alice).await;
    assert_eq!(to_bob, to_alice);

    let event: Value = serde_json::from_str(&to_bob).unwrap();
    assert_eq!(event["type"], "privateMessage");
    assert_eq!(event["data"]["from"], "alice");
    assert_eq!(event["data"]["to"], "bob");
    assert_eq!(event["data"]["message"], "hello");
    assert!(event["data"]["id"].is_string());
    assert!(event["data"]["timestamp"].is_string());
}

#[tokio::test]
async fn taken_name_gets_error_and_no_presence() {
    let (_server, addr) = start_default().await;
    let mut alice = join(addr, "alice").await;
    let mut imposter = connect(addr).await;

    send(&mut imposter, &json!({"type": "join", "data": {"username": "alice"}})).await;
    let reply = next_event(&mut imposter).await;
    assert_eq!(reply["type"], "error");
    assert_eq!(reply["data"]["message"], "Username already taken");

    expect_silence(&mut imposter).await;
    expect_silence(&mut alice).await;
}

#[tokio::test]
async fn unknown_recipient_reported() {
    let (_server, addr) = start_default().await;
    let mut alice = join(addr, "alice").await;

    send(&mut alice, &json!({"type": "privateMessage", "data": {"to": "nobody", "message": "hi"}})).await;
    let reply = next_event(&mut alice).await;
    assert_eq!(reply["type"], "error");
    assert_eq!(reply["data"]["message"], "Recipient not found");
}

#[tokio::test]
async fn message_before_join_is_rejected() {
    let (_server, addr) = start_default().await;
    let mut lurker = connect(addr).await;
    let mut bob = join(addr, "bob").await;
    let _ = next_event(&mut lurker).await;

    send(&mut lurker, &json!({"type": "privateMessage", "data": {"to": "bob", "message": "hi"}})).await;
    let reply = next_event(&mut lurker).await;
    assert_eq!(reply["data"]["message"], "Sender not found");
    expect_silence(&mut bob).await;
}

#[tokio::test]
async fn typing_reaches_recipient_only() {
    let (_server, addr) = start_default().await;
    let mut alice = join(addr, "alice").await;
    let mut bob = join(addr, "bob").await;
    let _ = next_event(&mut alice).await;

    send(&mut alice, &json!({"type": "typing", "data": {"to": "bob", "isTyping": true}})).await;
    let notice = next_event(&mut bob).await;
    assert_eq!(notice["type"], "userTyping");
    assert_eq!(notice["data"]["username"], "alice");
    assert_eq!(notice["data"]["isTyping"], true);
    expect_silence(&mut alice).await;

    send(&mut alice, &json!({"type": "typing", "data": {"to": "ghost", "isTyping": true}})).await;
    expect_silence(&mut alice).await;
}

#[tokio::test]
async fn disconnect_updates_presence() {
    let (_server, addr) = start_default().await;
    let mut alice = join(addr, "alice").await;
    let mut bob = join(addr, "bob").await;
    let _ = next_event(&mut alice).await;

    alice.close(None).await.unwrap();
    let update = next_event(&mut bob).await;
    assert_eq!(usernames(&update), ["bob"]);

    // The name is free again.
    let _alice_again = join(addr, "alice").await;
}

#[tokio::test]
async fn invalid_frame_reported_to_sender() {
    let (_server, addr) = start_default().await;
    let mut ws = connect(addr).await;

    ws.send(Message::text("definitely not json")).await.unwrap();
    let reply = next_event(&mut ws).await;
    assert_eq!(reply["type"], "error");
    assert!(reply["data"]["message"].as_str().unwrap().starts_with("Invalid event: "));

    // The connection stays usable.
    send(&mut ws, &json!({"type": "join", "data": {"username": "carol"}})).await;
    assert_eq!(next_event(&mut ws).await["type"], "joined");
}

#[tokio::test]
async fn utf8_binary_frames_accepted() {
    let (_server, addr) = start_default().await;
    let mut ws = connect(addr).await;
    let frame = json!({"type": "join", "data": {"username": "dave"}}).to_string();
    ws.send(Message::binary(frame.into_bytes())).await.unwrap();
    assert_eq!(next_event(&mut ws).await["type"], "joined");
}

#[tokio::test]
async fn connections_beyond_limit_refused() {
    let (_server, addr) = start(ServerConfig {
        max_connections: 1,
        ..ServerConfig::default()
    })
    .await;
    let _first = connect(addr).await;

    match connect_async(format!("ws://{addr}/ws")).await {
        Err(tokio_tungstenite::tungstenite::Error::Http(resp)) => {
            assert_eq!(resp.status(), 503);
        }
        other => panic!("expected 503, got {:?}", other.map(|_| ())),
    }
}

#[tokio::test]
async fn silent_client_dropped_by_heartbeat() {
    let (_server, addr) = start(ServerConfig {
        heartbeat_interval: Duration::from_millis(50),
        heartbeat_timeout: Duration::from_millis(150),
        ..ServerConfig::default()
    })
    .await;
    let mut watcher = join(addr, "watcher").await;
    // Joined, then never read again, so pings go unanswered.
    let _sleeper = join(addr, "sleeper").await;

    let mut saw_departure = false;
    for _ in 0..20 {
        let update = next_event(&mut watcher).await;
        if usernames(&update) == ["watcher"] {
            saw_departure = true;
            break;
        }
    }
    assert!(saw_departure);
}

#[tokio::test]
async fn health_reflects_live_state() {
    let (_server, addr) = start_default().await;
    let _alice = join(addr, "alice").await;
    let _lurker = connect(addr).await;

    let mut stream = TcpStream::connect(addr).await.unwrap();
    tokio::io::AsyncWriteExt::write_all(
        &mut stream,
        b"GET /health HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n",
    )
    .await
    .unwrap();
    let mut raw = String::new();
    let _ = tokio::io::AsyncReadExt::read_to_string(&mut stream, &mut raw).await.unwrap();
    let body = raw.split("\r\n\r\n").nth(1).unwrap();
    let health: Value = serde_json::from_str(body).unwrap();
    assert_eq!(health["connections"], 2);
    assert_eq!(health["online_users"], 1);
}

#[tokio::test]
async fn shutdown_closes_clients() {
    let (server, addr) = start_default().await;
    let mut ws = join(addr, "alice").await;

    server.shutdown().shutdown();
    let closed = timeout(WAIT, async {
        loop {
            match ws.next().await {
                Some(Ok(Message::Close(_))) | None | Some(Err(_)) => break,
                Some(Ok(_)) => {}
            }
        }
    })
    .await;
    assert!(closed.is_ok());
}
