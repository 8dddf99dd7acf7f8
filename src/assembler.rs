use anyhow::Result;
use chrono::Utc;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TryRecvError;
use uuid::Uuid;

use crate::gateway::StreamEvent;
use crate::session::{Message, Role, SessionStore};

/// Folds incremental deltas into a single growing assistant message.
///
/// Each delta produces a fresh snapshot: the messages captured at send time
/// plus one assistant message holding everything streamed so far. The
/// trailing message is replaced, never mutated, so the conversation's list
/// stays a valid prefix-consistent sequence at every step.
pub struct StreamAssembler {
    prior: Vec<Message>,
    accumulator: String,
}

impl StreamAssembler {
    pub fn new(prior: Vec<Message>) -> Self {
        Self {
            prior,
            accumulator: String::new(),
        }
    }

    /// Append a fragment and return the updated message list, the assistant
    /// message's timestamp refreshed to now.
    pub fn push_delta(&mut self, delta: &str) -> Vec<Message> {
        self.accumulator.push_str(delta);

        let mut messages = self.prior.clone();
        messages.push(Message {
            role: Role::Assistant,
            content: self.accumulator.clone(),
            timestamp: Some(Utc::now()),
        });
        messages
    }

    /// Full assistant reply assembled so far
    pub fn content(&self) -> &str {
        &self.accumulator
    }

    pub fn has_content(&self) -> bool {
        !self.accumulator.is_empty()
    }
}

/// Outcome of draining a turn's ready events
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TurnStatus {
    /// Stream still open, waiting on the next delta
    Streaming,
    /// Stream closed; the last incremental update is final
    Finished,
    /// Request or stream failed; assembled partial content stays visible
    Failed(String),
}

/// One in-flight exchange: a conversation, an assembler, and the event
/// stream feeding it.
pub struct Turn {
    conversation_id: Uuid,
    assembler: StreamAssembler,
    events: mpsc::Receiver<StreamEvent>,
}

impl Turn {
    pub fn new(
        conversation_id: Uuid,
        prior: Vec<Message>,
        events: mpsc::Receiver<StreamEvent>,
    ) -> Self {
        Self {
            conversation_id,
            assembler: StreamAssembler::new(prior),
            events,
        }
    }

    pub fn conversation_id(&self) -> Uuid {
        self.conversation_id
    }

    /// Drain every event that is ready, handing each snapshot to the
    /// store's replace primitive. Non-blocking; meant to be called once
    /// per tick of the event loop.
    pub fn poll(&mut self, store: &mut SessionStore) -> Result<TurnStatus> {
        loop {
            match self.events.try_recv() {
                Ok(StreamEvent::Delta(delta)) => {
                    let snapshot = self.assembler.push_delta(&delta);
                    store.replace_messages(self.conversation_id, snapshot)?;
                }
                Ok(StreamEvent::Done) => return Ok(TurnStatus::Finished),
                Ok(StreamEvent::Failed(reason)) => return Ok(TurnStatus::Failed(reason)),
                Err(TryRecvError::Empty) => return Ok(TurnStatus::Streaming),
                // Sender dropped without a terminal event; what we have is
                // what we get.
                Err(TryRecvError::Disconnected) => return Ok(TurnStatus::Finished),
            }
        }
    }
}
