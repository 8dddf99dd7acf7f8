use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use log::warn;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::storage::StorageBackend;

/// Title given to a conversation before its first message arrives.
pub const DEFAULT_TITLE: &str = "New conversation";

/// How many leading characters of the first message become the title.
const TITLE_LEN: usize = 30;

/// Role of a message author
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, strum::Display,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
    System,
}

/// A single message in a conversation. Immutable once appended, except the
/// trailing streaming assistant message, which is replaced wholesale on
/// every delta rather than edited in place.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
    pub timestamp: Option<DateTime<Utc>>,
}

impl Message {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            timestamp: Some(Utc::now()),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }
}

/// One ordered thread of messages with its own identity and title
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Conversation {
    pub id: Uuid,
    pub title: String,
    pub messages: Vec<Message>,
    pub created_at: DateTime<Utc>,
}

impl Conversation {
    pub fn new() -> Self {
        Self {
            id: Uuid::new_v4(),
            title: DEFAULT_TITLE.to_string(),
            messages: Vec::new(),
            created_at: Utc::now(),
        }
    }
}

impl Default for Conversation {
    fn default() -> Self {
        Self::new()
    }
}

/// The complete set of conversations plus the active one, persisted to the
/// backend on every mutation. Insertion order is display order.
pub struct SessionStore {
    conversations: Vec<Conversation>,
    active_id: Option<Uuid>,
    backend: Box<dyn StorageBackend>,
}

impl SessionStore {
    /// Load session state from the backend. Corrupt data is recoverable:
    /// it is logged and the store starts empty rather than crashing. The
    /// most recently created conversation becomes active.
    pub fn load(backend: Box<dyn StorageBackend>) -> Self {
        let conversations = match backend.load() {
            Ok(conversations) => conversations,
            Err(e) => {
                warn!("discarding stored conversations: {e:#}");
                Vec::new()
            }
        };
        let active_id = conversations.last().map(|c| c.id);

        Self {
            conversations,
            active_id,
            backend,
        }
    }

    /// Create an empty conversation, append it after all existing ones,
    /// and make it active. Always succeeds.
    pub fn create_conversation(&mut self) -> Result<Uuid> {
        let conversation = Conversation::new();
        let id = conversation.id;
        self.conversations.push(conversation);
        self.active_id = Some(id);
        self.persist()?;
        Ok(id)
    }

    /// Make the conversation with `id` active. A missing id is a logged
    /// no-op; returns whether the selection changed anything.
    pub fn select_conversation(&mut self, id: Uuid) -> bool {
        if self.conversations.iter().any(|c| c.id == id) {
            self.active_id = Some(id);
            true
        } else {
            warn!("select_conversation: no conversation with id {id}");
            false
        }
    }

    /// The single mutation primitive: swap the identified conversation's
    /// full message list for `messages`, deriving the title from the first
    /// message if it is still the default. Used both for appending a user
    /// message and for every incremental streaming update.
    pub fn replace_messages(&mut self, id: Uuid, messages: Vec<Message>) -> Result<()> {
        let Some(conversation) = self.conversations.iter_mut().find(|c| c.id == id) else {
            warn!("replace_messages: no conversation with id {id}");
            return Ok(());
        };

        conversation.messages = messages;
        if conversation.title == DEFAULT_TITLE {
            if let Some(first) = conversation.messages.first() {
                conversation.title = first.content.chars().take(TITLE_LEN).collect();
            }
        }

        self.persist()
    }

    /// Append a user message to the active conversation, creating one
    /// implicitly if none exists. Returns the conversation's id.
    pub fn post_user_message(&mut self, content: &str) -> Result<Uuid> {
        let id = match self.active_id {
            Some(id) => id,
            None => self.create_conversation()?,
        };

        let mut messages = self
            .conversation(id)
            .map(|c| c.messages.clone())
            .unwrap_or_default();
        messages.push(Message::user(content));
        self.replace_messages(id, messages)?;
        Ok(id)
    }

    pub fn conversations(&self) -> &[Conversation] {
        &self.conversations
    }

    pub fn conversation(&self, id: Uuid) -> Option<&Conversation> {
        self.conversations.iter().find(|c| c.id == id)
    }

    pub fn active_id(&self) -> Option<Uuid> {
        self.active_id
    }

    pub fn active_conversation(&self) -> Option<&Conversation> {
        self.active_id.and_then(|id| self.conversation(id))
    }

    /// Write the entire session state back to durable storage.
    fn persist(&self) -> Result<()> {
        self.backend
            .save(&self.conversations)
            .context("Failed to persist session state")
    }
}
