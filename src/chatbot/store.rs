//! Message store: the conversation log and its persisted snapshot.
//!
//! Every append rewrites the whole slot. Storage failures never reach the
//! caller; after the first failed write the store keeps going in memory only.

use crate::chatbot::message::ChatMessage;
use crate::chatbot::storage::SlotStorage;
use tracing::{debug, info, warn};

pub struct MessageStore {
    storage: Box<dyn SlotStorage>,
    key: String,
    messages: Vec<ChatMessage>,
    memory_only: bool,
}

impl MessageStore {
    pub fn new(storage: Box<dyn SlotStorage>, key: impl Into<String>) -> Self {
        Self {
            storage,
            key: key.into(),
            messages: Vec::new(),
            memory_only: false,
        }
    }

    /// Append a message and persist the full log.
    pub fn append(&mut self, msg: ChatMessage) {
        self.messages.push(msg);
        self.persist();
    }

    /// Add a replayed message without writing it back.
    pub fn restore(&mut self, msg: ChatMessage) {
        self.messages.push(msg);
    }

    /// Read the persisted log. Missing or unparseable history is empty.
    pub fn load_all(&self) -> Vec<ChatMessage> {
        let raw = match self.storage.get(&self.key) {
            Ok(Some(raw)) => raw,
            Ok(None) => {
                info!("No chat history, starting fresh");
                return Vec::new();
            }
            Err(e) => {
                warn!("Failed to read chat history: {e}");
                return Vec::new();
            }
        };

        match serde_json::from_str::<Vec<ChatMessage>>(&raw) {
            Ok(messages) => {
                info!("Loaded chat history ({} messages)", messages.len());
                messages
            }
            Err(e) => {
                warn!("Failed to parse chat history: {e}");
                Vec::new()
            }
        }
    }

    /// Drop the log and remove the persisted slot.
    pub fn clear(&mut self) {
        self.messages.clear();
        if let Err(e) = self.storage.remove(&self.key) {
            warn!("Failed to remove chat history: {e}");
        }
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// True once a write has failed this session.
    pub fn is_memory_only(&self) -> bool {
        self.memory_only
    }

    fn persist(&mut self) {
        if self.memory_only {
            return;
        }

        let json = match serde_json::to_string(&self.messages) {
            Ok(json) => json,
            Err(e) => {
                warn!("Failed to serialize chat history: {e}");
                return;
            }
        };

        match self.storage.set(&self.key, &json) {
            Ok(()) => debug!("Saved chat history ({} messages)", self.messages.len()),
            Err(e) => {
                warn!("Failed to save chat history, continuing in memory: {e}");
                self.memory_only = true;
            }
        }
    }
}
