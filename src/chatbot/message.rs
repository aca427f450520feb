//! Chat message types and the persisted wire shape.
//!
//! Messages are stored as `{"type": "user"|"bot", "text": ..., "timestamp": ...}`
//! so history written by older widget versions stays readable.

use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

/// Body of an assistant message that renders as the "Book Now" control.
pub const BOOKING_SENTINEL: &str = "__BOOKING_BUTTON__";

/// Text shown in place of the booking sentinel.
pub const BOOKING_PROMPT_TEXT: &str = "You can click the button below to open the booking form.";

/// Who sent a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Speaker {
    #[serde(rename = "user")]
    User,
    #[serde(rename = "bot")]
    Assistant,
}

impl Speaker {
    /// Label used in transcripts.
    pub fn label(&self) -> &'static str {
        match self {
            Speaker::User => "USER",
            Speaker::Assistant => "BOT",
        }
    }
}

/// A single entry in the conversation log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    #[serde(rename = "type")]
    pub speaker: Speaker,
    #[serde(rename = "text")]
    pub body: String,
    /// Local wall-clock time, `HH:MM`.
    #[serde(rename = "timestamp")]
    pub sent_at: String,
}

impl ChatMessage {
    pub fn new(speaker: Speaker, body: impl Into<String>, sent_at: impl Into<String>) -> Self {
        Self {
            speaker,
            body: body.into(),
            sent_at: sent_at.into(),
        }
    }

    /// True for the assistant's booking prompt.
    pub fn is_booking_prompt(&self) -> bool {
        self.speaker == Speaker::Assistant && self.body == BOOKING_SENTINEL
    }

    /// Text a visitor sees for this message. The sentinel never shows verbatim.
    pub fn display_text(&self) -> &str {
        if self.is_booking_prompt() {
            BOOKING_PROMPT_TEXT
        } else {
            &self.body
        }
    }
}

/// Format a UTC instant as `HH:MM` in the given timezone.
pub fn local_time(at: DateTime<Utc>, tz: Tz) -> String {
    at.with_timezone(&tz).format("%H:%M").to_string()
}
