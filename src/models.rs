use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::{DEFAULT_AVATAR_FEMALE, DEFAULT_AVATAR_MALE};
use crate::messages::MessageReceived;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Gender {
    Male,
    Female,
    #[serde(other)]
    Other,
}

/// A user summary as returned by the profile endpoints.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    #[serde(rename = "_id")]
    pub id: String,
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub photo_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gender: Option<Gender>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub about: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub skills: Vec<String>,
}

impl User {
    pub fn display_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name).trim().to_string()
    }

    /// Uploaded photo, otherwise the default asset for the declared gender.
    pub fn avatar_url(&self) -> &str {
        match (&self.photo_url, self.gender) {
            (Some(url), _) if !url.is_empty() => url.as_str(),
            (_, Some(Gender::Female)) => DEFAULT_AVATAR_FEMALE,
            _ => DEFAULT_AVATAR_MALE,
        }
    }
}

/// One persisted chat message as stored by the backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryRecord {
    #[serde(rename = "_id")]
    pub id: String,
    pub sender_id: String,
    pub text: String,
    pub created_at: DateTime<Utc>,
}

/// A message as displayed in an open conversation. Never mutated once built.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub id: String,
    pub sender_is_self: bool,
    pub text: String,
    pub timestamp: DateTime<Utc>,
}

impl Message {
    pub fn from_record(record: HistoryRecord, local_user_id: &str) -> Self {
        Message {
            sender_is_self: record.sender_id == local_user_id,
            id: record.id,
            text: record.text,
            timestamp: record.created_at,
        }
    }

    pub fn from_live(event: MessageReceived, local_user_id: &str) -> Self {
        Message {
            id: Uuid::new_v4().to_string(),
            sender_is_self: event.from_user == local_user_id,
            text: event.text,
            timestamp: event.created_at.unwrap_or_else(Utc::now),
        }
    }
}
