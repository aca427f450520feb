//! Chatbot module - the scripted booking assistant.

pub mod collaborators;
pub mod controller;
pub mod handoff;
pub mod message;
pub mod render;
pub mod replies;
pub mod scheduler;
pub mod storage;
pub mod store;


pub use collaborators::{AudioCue, BookingPopup, Clock, NoPopup, Silent, SystemClock, TerminalBell};
pub use controller::{ChatController, Collaborators, ControllerSettings, TurnState, QUICK_REPLIES};
pub use handoff::{BookingForm, HttpRelay, Relay, RelayError, RelaySettings};
pub use message::{ChatMessage, Speaker};
pub use render::{Bubble, Renderer, TerminalRenderer};
pub use storage::{MemoryStorage, SlotStorage, SqliteStorage, StorageError};
pub use store::MessageStore;
