use std::ops::Range;

use chrono::Local;

use crate::composer::{Composer, PLACEHOLDER};
use crate::conversation::{Phase, ViewSnapshot};
use crate::models::Message;

pub const EMPTY_CONVERSATION: &str = "No messages yet. Say hi!";
pub const LOADING: &str = "Loading messages...";

/// Indices of the messages that fit in `height` rows, newest last.
pub fn visible_window(len: usize, height: usize) -> Range<usize> {
    len.saturating_sub(height)..len
}

fn bubble(message: &Message, width: usize) -> Vec<String> {
    let time = message.timestamp.with_timezone(&Local).format("%H:%M");
    let mut lines: Vec<String> = message.text.lines().map(str::to_string).collect();
    match lines.last_mut() {
        Some(last) => last.push_str(&format!("  {time}")),
        None => lines.push(time.to_string()),
    }
    if message.sender_is_self {
        lines.iter().map(|l| format!("{l:>width$}")).collect()
    } else {
        lines
    }
}

/// Renders the chat screen as plain text lines.
pub fn render(snapshot: &ViewSnapshot, composer: &Composer, width: usize, height: usize) -> Vec<String> {
    let mut out = Vec::new();

    match (&snapshot.header, &snapshot.peer_id) {
        (Some(header), _) => {
            out.push(format!("{}  ({})", header.name, header.status));
            out.push(format!("avatar: {}", header.avatar_url));
        }
        (None, Some(peer_id)) => out.push(format!("chat with {peer_id}")),
        (None, None) => out.push("no conversation selected".to_string()),
    }
    if let Some(notice) = &snapshot.notice {
        out.push(notice.clone());
    }
    out.push("-".repeat(width));

    match &snapshot.phase {
        Phase::Loading => out.push(LOADING.to_string()),
        Phase::Error(notice) => out.push(notice.clone()),
        Phase::Idle | Phase::Ready => {}
    }

    if snapshot.messages.is_empty() {
        if snapshot.phase != Phase::Loading {
            out.push(EMPTY_CONVERSATION.to_string());
        }
    } else {
        for message in &snapshot.messages[visible_window(snapshot.messages.len(), height)] {
            out.extend(bubble(message, width));
        }
    }

    out.push("-".repeat(width));
    if composer.text().is_empty() {
        out.push(format!("> {PLACEHOLDER}"));
    } else {
        out.push(format!("> {}", composer.text()));
    }
    out
}
