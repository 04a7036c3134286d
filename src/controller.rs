//! The mounted chat view.
//!
//! One task per mount exclusively owns the [`ConversationView`], the event
//! channel [`Connection`] and the in-flight fetches. Everything else talks to
//! it through a [`ChatHandle`] and observes it through [`ViewSnapshot`]s.

use std::sync::Arc;

use log::{debug, info, warn};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;

use crate::api::Backend;
use crate::conversation::{ConversationView, LoadTicket, Outcome, ViewSnapshot};
use crate::error::{ApiError, TransportError};
use crate::history::load_history;
use crate::messages::ServerEvent;
use crate::models::{Message, User};
use crate::session::{AppSession, Route};
use crate::transport::{Connection, Connector};

#[derive(Clone)]
pub struct ChatContext {
    pub session: AppSession,
    pub backend: Arc<dyn Backend>,
    pub connector: Arc<dyn Connector>,
}

#[derive(Debug)]
enum Command {
    Send(String),
    SwitchPeer(String),
    ViewProfile,
    Unmount,
}

enum Fetched {
    History(LoadTicket, Result<Vec<Message>, ApiError>),
    Profile(LoadTicket, Result<User, ApiError>),
    Connected(LoadTicket, Result<Connection, TransportError>),
}

pub struct ChatHandle {
    commands: mpsc::UnboundedSender<Command>,
    snapshots: watch::Receiver<ViewSnapshot>,
    task: JoinHandle<()>,
}

impl ChatHandle {
    /// Queues `text` for the open conversation. Blank text is refused.
    pub fn send(&self, text: &str) -> bool {
        let text = text.trim();
        if text.is_empty() {
            return false;
        }
        self.commands.send(Command::Send(text.to_string())).is_ok()
    }

    pub fn switch_peer(&self, peer_id: &str) -> bool {
        self.commands
            .send(Command::SwitchPeer(peer_id.to_string()))
            .is_ok()
    }

    /// Navigates to the profile of the open peer, if any.
    pub fn view_profile(&self) -> bool {
        self.commands.send(Command::ViewProfile).is_ok()
    }

    pub fn snapshots(&self) -> watch::Receiver<ViewSnapshot> {
        self.snapshots.clone()
    }

    pub fn snapshot(&self) -> ViewSnapshot {
        self.snapshots.borrow().clone()
    }

    /// Closes the connection, cancels pending fetches and waits for the view
    /// task to finish.
    pub async fn unmount(self) {
        let _ = self.commands.send(Command::Unmount);
        if let Err(e) = self.task.await {
            warn!("chat view task ended abnormally: {}", e);
        }
    }
}

pub fn mount(ctx: ChatContext, peer_id: &str) -> ChatHandle {
    let (commands_tx, commands_rx) = mpsc::unbounded_channel();
    let (fetched_tx, fetched_rx) = mpsc::unbounded_channel();
    let (snapshot_tx, snapshot_rx) = watch::channel(ViewSnapshot::default());

    let chat = MountedChat {
        ctx,
        view: ConversationView::new(),
        connection: None,
        connecting: false,
        outbox: Vec::new(),
        fetches: Vec::new(),
        fetched_tx,
        snapshot_tx,
    };
    let task = tokio::spawn(chat.run(commands_rx, fetched_rx, peer_id.to_string()));

    ChatHandle {
        commands: commands_tx,
        snapshots: snapshot_rx,
        task,
    }
}

struct MountedChat {
    ctx: ChatContext,
    view: ConversationView,
    connection: Option<Connection>,
    /// Set while a connect for the open peer is in flight.
    connecting: bool,
    /// Sends queued until the pending connection has joined.
    outbox: Vec<String>,
    fetches: Vec<JoinHandle<()>>,
    fetched_tx: mpsc::UnboundedSender<Fetched>,
    snapshot_tx: watch::Sender<ViewSnapshot>,
}

async fn next_event(connection: &mut Option<Connection>) -> Option<ServerEvent> {
    match connection {
        Some(connection) => connection.recv().await,
        None => std::future::pending().await,
    }
}

impl MountedChat {
    async fn run(
        mut self,
        mut commands: mpsc::UnboundedReceiver<Command>,
        mut fetched: mpsc::UnboundedReceiver<Fetched>,
        peer_id: String,
    ) {
        self.open(&peer_id);
        self.publish();

        loop {
            tokio::select! {
                command = commands.recv() => match command {
                    Some(Command::Send(text)) => self.send(&text),
                    Some(Command::SwitchPeer(peer_id)) => self.open(&peer_id),
                    Some(Command::ViewProfile) => self.view_profile(),
                    Some(Command::Unmount) | None => break,
                },
                Some(result) = fetched.recv() => self.apply(result),
                event = next_event(&mut self.connection) => self.on_event(event),
            }
            self.publish();
        }

        self.release();
        info!("chat view unmounted");
    }

    fn open(&mut self, peer_id: &str) {
        self.release();

        let Some(local_user_id) = self.ctx.session.user_id() else {
            warn!("not opening chat with {}, nobody is logged in", peer_id);
            self.view.idle(Some(peer_id));
            return;
        };

        let ticket = self.view.open(peer_id);
        self.ctx.session.navigate(Route::Chat(peer_id.to_string()));
        self.publish();
        self.spawn_fetches(&ticket, &local_user_id);
        self.spawn_connect(ticket);
    }

    fn spawn_connect(&mut self, ticket: LoadTicket) {
        self.connecting = true;
        let connector = Arc::clone(&self.ctx.connector);
        let tx = self.fetched_tx.clone();
        self.fetches.push(tokio::spawn(async move {
            let result = connector.connect().await;
            let _ = tx.send(Fetched::Connected(ticket, result));
        }));
    }

    fn spawn_fetches(&mut self, ticket: &LoadTicket, local_user_id: &str) {
        let backend = Arc::clone(&self.ctx.backend);
        let tx = self.fetched_tx.clone();
        let history_ticket = ticket.clone();
        let local_user_id = local_user_id.to_string();
        self.fetches.push(tokio::spawn(async move {
            let result = load_history(backend.as_ref(), &local_user_id, history_ticket.peer_id()).await;
            let _ = tx.send(Fetched::History(history_ticket, result));
        }));

        let backend = Arc::clone(&self.ctx.backend);
        let tx = self.fetched_tx.clone();
        let profile_ticket = ticket.clone();
        self.fetches.push(tokio::spawn(async move {
            let result = backend.profile(profile_ticket.peer_id()).await;
            let _ = tx.send(Fetched::Profile(profile_ticket, result));
        }));
    }

    fn apply(&mut self, fetched: Fetched) {
        let outcome = match fetched {
            Fetched::History(ticket, result) => {
                let result = self.ctx.session.guard(result);
                self.view.apply_history(&ticket, result)
            }
            Fetched::Profile(ticket, result) => {
                let result = self.ctx.session.guard(result);
                self.view.apply_profile(&ticket, result)
            }
            Fetched::Connected(ticket, result) => {
                self.attach(&ticket, result);
                return;
            }
        };

        if outcome == Outcome::SessionExpired {
            self.release();
            self.view.idle(None);
        }
    }

    /// Joins the conversation on a freshly opened connection. A connection for
    /// a peer that is no longer open is closed unjoined.
    fn attach(&mut self, ticket: &LoadTicket, result: Result<Connection, TransportError>) {
        if !self.view.is_current(ticket) {
            if let Ok(connection) = result {
                info!("dropping event channel opened for {}", ticket.peer_id());
                connection.close();
            }
            return;
        }
        self.connecting = false;
        let outbox = std::mem::take(&mut self.outbox);

        let mut connection = match result {
            Ok(connection) => connection,
            // Not surfaced to the user; the history is still shown.
            Err(e) => {
                warn!("event channel unavailable, {} queued messages dropped: {}", outbox.len(), e);
                return;
            }
        };
        let Some(local_user_id) = self.ctx.session.user_id() else {
            connection.close();
            return;
        };
        match connection.join(&local_user_id, ticket.peer_id()) {
            Ok(()) => {
                self.connection = Some(connection);
                for text in outbox {
                    self.send(&text);
                }
            }
            Err(e) => warn!("could not join chat with {}: {}", ticket.peer_id(), e),
        }
    }

    fn view_profile(&self) {
        match (self.ctx.session.user_id(), self.view.peer_id()) {
            (Some(_), Some(peer_id)) => self.ctx.session.navigate(Route::Profile(peer_id.to_string())),
            _ => debug!("no open conversation, staying put"),
        }
    }

    fn on_event(&mut self, event: Option<ServerEvent>) {
        match event {
            Some(ServerEvent::MessageReceived(received)) => {
                let Some(local_user_id) = self.ctx.session.user_id() else {
                    return;
                };
                debug!("live message from {}", received.from_user);
                self.view.push_live(Message::from_live(received, &local_user_id));
            }
            None => {
                info!("event channel went away");
                self.connection = None;
            }
        }
    }

    fn send(&mut self, text: &str) {
        match &self.connection {
            Some(connection) => {
                if let Err(e) = connection.send(text) {
                    warn!("message not sent: {}", e);
                }
            }
            None if self.connecting => {
                debug!("event channel still connecting, queueing message");
                self.outbox.push(text.to_string());
            }
            None => warn!("message not sent, event channel is not connected"),
        }
    }

    fn release(&mut self) {
        for fetch in self.fetches.drain(..) {
            fetch.abort();
        }
        self.connecting = false;
        self.outbox.clear();
        if let Some(connection) = self.connection.take() {
            connection.close();
        }
    }

    fn publish(&self) {
        let snapshot = self.view.snapshot();
        self.snapshot_tx.send_if_modified(|current| {
            if *current == snapshot {
                return false;
            }
            *current = snapshot;
            true
        });
    }
}
