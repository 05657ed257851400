//! # murmur-chat
//!
//! Line-oriented terminal client for a murmur relay. Rejoins with the
//! remembered username at startup; see `/help` for commands.

#![deny(unsafe_code)]

mod command;
mod view;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use murmur_client::{
    ComposeError, ConversationController, FileStore, RelayConnection, RelayReceiver,
    TypingDebouncer, ViewUpdate,
};
use murmur_core::{ClientEvent, ServerEvent};
use murmur_settings::MurmurSettings;
use tokio::io::{AsyncBufReadExt, BufReader, Lines, Stdin};
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::command::{Command, HELP};

/// murmur terminal chat client.
#[derive(Parser, Debug)]
#[command(name = "murmur-chat", version, about = "Terminal client for a murmur relay")]
struct Cli {
    /// Relay WebSocket URL (overrides settings).
    #[arg(long)]
    url: Option<String>,

    /// Join as this name instead of the remembered one.
    #[arg(long)]
    username: Option<String>,

    /// Directory for history and unread counts (defaults to `~/.murmur/chat`).
    #[arg(long)]
    data_dir: Option<PathBuf>,

    /// Settings file (defaults to `~/.murmur/settings.json`).
    #[arg(long)]
    config: Option<PathBuf>,

    /// Log filter directive.
    #[arg(long)]
    log_level: Option<String>,
}

impl Cli {
    fn load_settings(&self) -> Result<MurmurSettings> {
        let mut settings = match &self.config {
            Some(path) => murmur_settings::load_settings_from_path(path)
                .with_context(|| format!("Failed to load settings from {}", path.display()))?,
            None => murmur_settings::load_settings().context("Failed to load settings")?,
        };
        if let Some(url) = &self.url {
            settings.client.relay_url.clone_from(url);
        }
        if let Some(level) = &self.log_level {
            settings.logging.level.clone_from(level);
        }
        Ok(settings)
    }

    fn data_dir(&self, settings: &MurmurSettings) -> PathBuf {
        self.data_dir
            .clone()
            .or_else(|| settings.client.data_dir.as_ref().map(PathBuf::from))
            .unwrap_or_else(|| murmur_settings::loader::murmur_home().join("chat"))
    }
}

/// Why a relay session ended.
#[derive(Debug, PartialEq, Eq)]
enum Exit {
    Quit,
    Logout,
}

/// One connection's worth of client state.
struct Session {
    controller: ConversationController,
    outbox: mpsc::UnboundedSender<ClientEvent>,
    typing: TypingDebouncer,
}

impl Session {
    fn send(&self, event: ClientEvent) {
        if self.outbox.send(event).is_err() {
            warn!("relay writer has stopped");
        }
    }

    fn show(update: ViewUpdate) {
        match update {
            ViewUpdate::None => {}
            ViewUpdate::Append(message) => println!("{}", view::message_line(&message)),
            ViewUpdate::Redisplay { peer, messages } => {
                println!("{}", view::conversation_header(&peer, messages.len()));
                for message in &messages {
                    println!("{}", view::message_line(message));
                }
            }
        }
    }

    fn on_event(&mut self, event: ServerEvent) {
        match event {
            ServerEvent::Connected { connection_id } => {
                debug!(%connection_id, "relay assigned connection id");
            }
            ServerEvent::Joined { username } => {
                println!("joined as {username}");
                Self::show(self.controller.on_joined(&username));
            }
            ServerEvent::Error { message } => println!("error: {message}"),
            ServerEvent::PrivateMessage(message) => {
                let peer = self
                    .controller
                    .username()
                    .map(|me| message.peer_of(me).to_owned());
                let update = self.controller.on_private_message(message);
                if update == ViewUpdate::None {
                    if let Some(peer) = peer {
                        let badge = self.controller.badge(&peer);
                        if badge.is_some() {
                            println!("{}", view::unread_notice(&peer, badge.as_deref()));
                        }
                    }
                }
                Self::show(update);
            }
            ServerEvent::UserTyping { username, is_typing } => {
                if let Some(indicator) = self.controller.on_user_typing(&username, is_typing) {
                    if indicator.is_typing {
                        println!("{} is typing...", indicator.username);
                    }
                }
            }
            ServerEvent::UsersUpdate(users) => {
                self.controller.on_users_update(users);
                println!("{}", view::roster_line(&self.controller));
            }
        }
    }

    fn on_line(&mut self, line: &str) -> Option<Exit> {
        match Command::parse(line) {
            Command::Join(name) => match ConversationController::join_request(&name) {
                Ok(join) => self.send(join),
                Err(e) => println!("error: {e}"),
            },
            Command::To(peer) => {
                self.typing.stop();
                Self::show(self.controller.select_peer(&peer));
            }
            Command::Users => println!("{}", view::roster_line(&self.controller)),
            Command::Logout => return Some(Exit::Logout),
            Command::Quit => return Some(Exit::Quit),
            Command::Help => println!("{HELP}"),
            Command::Unknown(input) => println!("unknown command {input}; try /help"),
            Command::Say(text) => match self.controller.compose(&text) {
                Ok(message) => {
                    self.typing.stop();
                    self.send(message);
                }
                // A blank line is the typing signal; it lapses after the idle window.
                Err(ComposeError::Empty) => {
                    if let Some(peer) = self.controller.active_peer() {
                        self.typing.keystroke(peer);
                    }
                }
                Err(e @ ComposeError::NoActivePeer) => println!("{e} (/to <peer>)"),
            },
        }
        None
    }
}

async fn run_session(
    settings: &MurmurSettings,
    store: Arc<FileStore>,
    username: Option<String>,
    lines: &mut Lines<BufReader<Stdin>>,
) -> Result<Exit> {
    let url = &settings.client.relay_url;
    let (mut sender, mut receiver) = RelayConnection::connect(url)
        .await
        .with_context(|| format!("Failed to connect to {url}"))?
        .split();

    let (outbox, mut outbox_rx) = mpsc::unbounded_channel::<ClientEvent>();
    let writer = tokio::spawn(async move {
        while let Some(event) = outbox_rx.recv().await {
            if let Err(e) = sender.send(&event).await {
                warn!(error = %e, "failed to send to relay");
                break;
            }
        }
        let _ = sender.close().await;
    });

    let mut session = Session {
        controller: ConversationController::new(store),
        typing: TypingDebouncer::new(Duration::from_millis(settings.client.typing_idle_ms), outbox.clone()),
        outbox,
    };

    match username.or_else(|| session.controller.remembered_username()) {
        Some(name) => match ConversationController::join_request(&name) {
            Ok(join) => session.send(join),
            Err(e) => println!("cannot join as {name}: {e}"),
        },
        None => println!("type /join <name> to start"),
    }

    let exit = event_loop(&mut session, &mut receiver, lines).await;

    if exit == Exit::Logout {
        session.controller.logout();
        println!("logged out");
    }
    session.typing.stop();
    drop(session);
    let _ = writer.await;
    Ok(exit)
}

async fn event_loop(
    session: &mut Session,
    receiver: &mut RelayReceiver,
    lines: &mut Lines<BufReader<Stdin>>,
) -> Exit {
    loop {
        tokio::select! {
            line = lines.next_line() => match line {
                Ok(Some(line)) => {
                    if let Some(exit) = session.on_line(&line) {
                        return exit;
                    }
                }
                Ok(None) => return Exit::Quit,
                Err(e) => {
                    warn!(error = %e, "failed to read input");
                    return Exit::Quit;
                }
            },
            event = receiver.next_event() => match event {
                Some(Ok(event)) => session.on_event(event),
                Some(Err(e)) => warn!(error = %e, "bad frame from relay"),
                None => {
                    println!("relay closed the connection");
                    return Exit::Quit;
                }
            },
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Cli::parse();
    let _ = murmur_settings::init_settings(args.load_settings()?);
    let settings = murmur_settings::get_settings();
    murmur_logging::init(&settings.logging.level, settings.logging.json);

    let store = Arc::new(FileStore::new(args.data_dir(settings)));
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut username = args.username.clone();

    // After a logout, reconnect fresh and wait for /join.
    while run_session(settings, store.clone(), username.take(), &mut lines).await? == Exit::Logout {}
    Ok(())
}
