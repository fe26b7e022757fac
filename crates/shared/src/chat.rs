//! Chat transcript types shared by the chat view and the history store.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

/// A file attached to a user message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttachedFile {
    pub name: String,
    #[serde(rename = "type", default)]
    pub mime_type: String,
    /// Inline data URL for images
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preview: Option<String>,
}

impl AttachedFile {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            mime_type: String::new(),
            preview: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub files: Vec<AttachedFile>,
}

impl ChatMessage {
    pub fn user(content: impl Into<String>, files: Vec<AttachedFile>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
            files,
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
            files: Vec::new(),
        }
    }
}

/// A conversation as kept in the saved-chat list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SavedChat {
    pub id: String,
    pub title: String,
    pub preview: String,
    /// Serialized as an ISO-8601 string
    pub timestamp: DateTime<Utc>,
    pub messages: Vec<ChatMessage>,
}

impl SavedChat {
    /// Sidebar group label relative to `now`.
    pub fn age_label(&self, now: DateTime<Utc>) -> String {
        let hours = now.signed_duration_since(self.timestamp).num_hours();
        if hours < 24 {
            "Today".to_string()
        } else if hours < 48 {
            "Yesterday".to_string()
        } else if hours < 168 {
            format!("{} days ago", hours / 24)
        } else {
            self.timestamp.format("%Y-%m-%d").to_string()
        }
    }
}
