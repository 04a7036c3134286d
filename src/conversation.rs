use log::{debug, info, warn};

use crate::error::ApiError;
use crate::models::{Message, User};

pub const ACTIVE_STATUS: &str = "Active now";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Phase {
    #[default]
    Idle,
    Loading,
    Ready,
    Error(String),
}

/// Identifies one history or profile request. Results carrying a ticket from
/// an earlier `open` are discarded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadTicket {
    generation: u64,
    peer_id: String,
}

impl LoadTicket {
    pub fn peer_id(&self) -> &str {
        &self.peer_id
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Applied,
    Stale,
    SessionExpired,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Header {
    pub name: String,
    pub avatar_url: String,
    pub status: &'static str,
}

/// What the presentation layer reads.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ViewSnapshot {
    pub peer_id: Option<String>,
    pub phase: Phase,
    pub messages: Vec<Message>,
    pub header: Option<Header>,
    pub notice: Option<String>,
}

/// Ordered message list and load state for the open conversation.
#[derive(Debug, Default)]
pub struct ConversationView {
    peer_id: Option<String>,
    generation: u64,
    phase: Phase,
    messages: Vec<Message>,
    // Live messages that arrived while history was in flight.
    pending: Vec<Message>,
    peer: Option<User>,
    notice: Option<String>,
}

impl ConversationView {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts a conversation with `peer_id`, discarding everything shown for
    /// the previous peer.
    pub fn open(&mut self, peer_id: &str) -> LoadTicket {
        self.reset(Some(peer_id.to_string()));
        self.phase = Phase::Loading;
        debug!("conversation with {} is loading (generation {})", peer_id, self.generation);
        LoadTicket {
            generation: self.generation,
            peer_id: peer_id.to_string(),
        }
    }

    /// Shows `peer_id` without loading anything, e.g. when nobody is logged in.
    pub fn idle(&mut self, peer_id: Option<&str>) {
        self.reset(peer_id.map(str::to_string));
    }

    fn reset(&mut self, peer_id: Option<String>) {
        self.generation += 1;
        self.peer_id = peer_id;
        self.phase = Phase::Idle;
        self.messages.clear();
        self.pending.clear();
        self.peer = None;
        self.notice = None;
    }

    /// True while `ticket` belongs to the conversation that is open now.
    pub fn is_current(&self, ticket: &LoadTicket) -> bool {
        ticket.generation == self.generation && self.peer_id.as_deref() == Some(&ticket.peer_id)
    }

    pub fn apply_history(
        &mut self,
        ticket: &LoadTicket,
        result: Result<Vec<Message>, ApiError>,
    ) -> Outcome {
        if !self.is_current(ticket) {
            info!("discarding stale history for {}", ticket.peer_id);
            return Outcome::Stale;
        }
        if self.phase != Phase::Loading {
            return Outcome::Stale;
        }

        match result {
            Ok(history) => {
                self.messages = history;
                self.messages.append(&mut self.pending);
                self.phase = Phase::Ready;
                Outcome::Applied
            }
            Err(ApiError::Unauthorized) => {
                self.messages.clear();
                self.pending.clear();
                self.phase = Phase::Idle;
                Outcome::SessionExpired
            }
            Err(e) => {
                warn!("history for {} failed: {}", ticket.peer_id, e);
                self.messages = std::mem::take(&mut self.pending);
                self.phase = Phase::Error(e.notice().to_string());
                Outcome::Applied
            }
        }
    }

    pub fn apply_profile(&mut self, ticket: &LoadTicket, result: Result<User, ApiError>) -> Outcome {
        if !self.is_current(ticket) {
            return Outcome::Stale;
        }
        match result {
            Ok(user) => {
                self.peer = Some(user);
                Outcome::Applied
            }
            Err(ApiError::Unauthorized) => Outcome::SessionExpired,
            Err(e) => {
                warn!("profile for {} failed: {}", ticket.peer_id, e);
                self.notice = Some(e.notice().to_string());
                Outcome::Applied
            }
        }
    }

    /// Appends a live message at the tail. Arrival order is kept as-is.
    pub fn push_live(&mut self, message: Message) {
        match self.phase {
            Phase::Loading => self.pending.push(message),
            Phase::Ready | Phase::Error(_) => self.messages.push(message),
            Phase::Idle => debug!("dropping live message, no conversation is loaded"),
        }
    }

    pub fn phase(&self) -> &Phase {
        &self.phase
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn peer_id(&self) -> Option<&str> {
        self.peer_id.as_deref()
    }

    pub fn header(&self) -> Option<Header> {
        self.peer.as_ref().map(|peer| Header {
            name: peer.display_name(),
            avatar_url: peer.avatar_url().to_string(),
            status: ACTIVE_STATUS,
        })
    }

    pub fn snapshot(&self) -> ViewSnapshot {
        ViewSnapshot {
            peer_id: self.peer_id.clone(),
            phase: self.phase.clone(),
            messages: self.messages.clone(),
            header: self.header(),
            notice: self.notice.clone(),
        }
    }
}
