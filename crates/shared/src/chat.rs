//! Conversation data model.
//!
//! A conversation is an ordered list of [`Message`]s, oldest first. Model
//! turns may carry structured [`Recommendation`]s pulled out of the reply.

use serde::{Deserialize, Serialize};

/// Greeting every fresh conversation starts with.
pub const GREETING: &str = "Hello! I'm your AI assistant. How can I help you today?";

/// Prefix of the in-band message appended when a request fails.
pub const ERROR_PREFIX: &str = "Sorry, something went wrong: ";

/// Who authored a turn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Model,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Model => "model",
        }
    }
}

/// A structured suggestion the model appended to its reply
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Recommendation {
    pub title: String,
    pub rationale: String,
    pub action_items: Vec<String>,
}

/// One turn in the conversation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recommendations: Option<Vec<Recommendation>>,
}

impl Message {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
            recommendations: None,
        }
    }

    pub fn model(content: impl Into<String>) -> Self {
        Self {
            role: Role::Model,
            content: content.into(),
            recommendations: None,
        }
    }

    /// Model turn carrying whatever the reply parser extracted.
    pub fn model_with_recommendations(
        content: impl Into<String>,
        recommendations: Option<Vec<Recommendation>>,
    ) -> Self {
        Self {
            role: Role::Model,
            content: content.into(),
            recommendations,
        }
    }

    /// In-band error turn for a failed request.
    pub fn error(detail: &str) -> Self {
        Self::model(format!("{}{}", ERROR_PREFIX, detail))
    }

    /// The seeded greeting.
    pub fn greeting() -> Self {
        Self::model(GREETING)
    }

    pub fn is_user(&self) -> bool {
        self.role == Role::User
    }

    /// True for model turns produced by [`Message::error`].
    pub fn is_error(&self) -> bool {
        self.role == Role::Model && self.content.starts_with(ERROR_PREFIX)
    }

    pub fn has_recommendations(&self) -> bool {
        self.recommendations
            .as_ref()
            .map_or(false, |recs| !recs.is_empty())
    }
}

/// The state every conversation starts in, and returns to on clear.
pub fn seeded_conversation() -> Vec<Message> {
    vec![Message::greeting()]
}

/// Whether `messages` is exactly the seeded single-greeting state.
pub fn is_seeded(messages: &[Message]) -> bool {
    matches!(messages, [only] if only.role == Role::Model && only.content == GREETING)
}
