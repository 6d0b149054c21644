//! Conversation types for Recall.
//!
//! These types model a chat transcript: speaker roles, immutable turns,
//! per-session snapshots, and the shapes exchanged with an external chat
//! model (configuration, structured input, streamed fragments).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use std::fmt;
use std::str::FromStr;

use crate::error::ArgumentError;

/// Role of the participant that produced a turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::System => write!(f, "system"),
            Role::User => write!(f, "user"),
            Role::Assistant => write!(f, "assistant"),
        }
    }
}

impl FromStr for Role {
    type Err = ArgumentError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "system" => Ok(Role::System),
            "user" | "human" => Ok(Role::User),
            "assistant" | "ai" => Ok(Role::Assistant),
            other => Err(ArgumentError::InvalidRole(other.to_string())),
        }
    }
}

/// A single message in a conversation.
///
/// Turns are immutable once created: fields are private and only exposed
/// through accessors.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Turn {
    role: Role,
    text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    timestamp: Option<DateTime<Utc>>,
}

impl Turn {
    /// Create an unstamped turn.
    pub fn new(role: Role, text: impl Into<String>) -> Self {
        Self {
            role,
            text: text.into(),
            timestamp: None,
        }
    }

    /// Create a turn stamped with the current time.
    pub fn stamped(role: Role, text: impl Into<String>) -> Self {
        Self {
            role,
            text: text.into(),
            timestamp: Some(Utc::now()),
        }
    }

    pub fn user(text: impl Into<String>) -> Self {
        Self::new(Role::User, text)
    }

    pub fn assistant(text: impl Into<String>) -> Self {
        Self::new(Role::Assistant, text)
    }

    pub fn system(text: impl Into<String>) -> Self {
        Self::new(Role::System, text)
    }

    /// Return a copy of this turn carrying the given timestamp.
    pub fn with_timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = Some(timestamp);
        self
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn timestamp(&self) -> Option<DateTime<Utc>> {
        self.timestamp
    }
}

/// A named, ordered conversation transcript.
///
/// Used as the snapshot/restore shape of the history store; the live store
/// never hands out its own `Session` values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub key: String,
    #[serde(default)]
    pub turns: Vec<Turn>,
}

/// Options forwarded to an external chat model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatConfig {
    #[serde(default = "default_model_name")]
    pub model_name: String,
    #[serde(default = "default_temperature")]
    pub temperature: f64,
    /// Natural language the assistant is instructed to answer in.
    #[serde(default = "default_language")]
    pub system_prompt_language: String,
}

fn default_model_name() -> String {
    "gpt-4o-mini".to_string()
}

fn default_temperature() -> f64 {
    0.7
}

fn default_language() -> String {
    "English".to_string()
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            model_name: default_model_name(),
            temperature: default_temperature(),
            system_prompt_language: default_language(),
        }
    }
}

/// Input to a conversation step.
///
/// Either a single user utterance, or a batch of already-formed turns
/// (e.g. a system instruction followed by a user message) appended in order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ChatInput {
    Text { text: String },
    Turns { turns: Vec<Turn> },
}

impl ChatInput {
    /// Convert the input into the turns that will be appended to history.
    pub fn into_turns(self) -> Vec<Turn> {
        match self {
            ChatInput::Text { text } => vec![Turn::stamped(Role::User, text)],
            ChatInput::Turns { turns } => turns,
        }
    }
}

impl From<&str> for ChatInput {
    fn from(text: &str) -> Self {
        ChatInput::Text {
            text: text.to_string(),
        }
    }
}

impl From<String> for ChatInput {
    fn from(text: String) -> Self {
        ChatInput::Text { text }
    }
}

/// An incremental piece of a streamed chat-model reply.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ResponseFragment {
    /// A slice of reply text, in delivery order.
    TextDelta { text: String },
    /// The reply is complete; no further fragments follow.
    Done,
}
