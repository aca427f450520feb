//! Rendering surface for the chat panel.
//!
//! Bubble text is HTML-escaped so `<`, `>`, `&`, `"` become entities and a
//! visitor can't inject markup into the panel.

use std::io::Write;

use crate::chatbot::message::{ChatMessage, Speaker};

/// What the controller asks the page to display.
pub trait Renderer {
    fn render_message(&mut self, bubble: &Bubble);
    fn clear_messages(&mut self);
    fn show_typing(&mut self);
    fn hide_typing(&mut self);
    /// Show suggestions, replacing any that are already visible.
    fn show_quick_replies(&mut self, suggestions: &[&str]);
    fn hide_quick_replies(&mut self);
    fn clear_input(&mut self);
    fn reset_booking_form(&mut self);
    fn set_panel_visible(&mut self, visible: bool);
    /// User-visible alert.
    fn notify(&mut self, notice: &str);
}

/// A message as displayed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bubble {
    pub speaker: Speaker,
    pub text: String,
    pub time: String,
    /// Render a "Book Now" control under the text.
    pub booking_button: bool,
}

impl Bubble {
    pub fn from_message(msg: &ChatMessage) -> Self {
        Self {
            speaker: msg.speaker,
            text: msg.display_text().to_string(),
            time: msg.sent_at.clone(),
            booking_button: msg.is_booking_prompt(),
        }
    }

    /// Markup for the page's message list.
    ///
    /// ```html
    /// <div class="chat-message user" data-type="user"><p class="message-text">hi</p><span class="message-time">10:31</span></div>
    /// ```
    pub fn to_html(&self) -> String {
        let kind = match self.speaker {
            Speaker::User => "user",
            Speaker::Assistant => "bot",
        };
        let button = if self.booking_button {
            r#"<button class="booking-button" type="button">Book Now</button>"#
        } else {
            ""
        };
        format!(
            r#"<div class="chat-message {kind}" data-type="{kind}"><p class="message-text">{}</p><span class="message-time">{}</span>{button}</div>"#,
            html_escape(&self.text),
            html_escape(&self.time),
        )
    }
}

fn html_escape(s: &str) -> String {
    let mut result = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '<' => result.push_str("&lt;"),
            '>' => result.push_str("&gt;"),
            '&' => result.push_str("&amp;"),
            '"' => result.push_str("&quot;"),
            _ => result.push(c),
        }
    }
    result
}

/// Line-oriented renderer for a terminal session.
pub struct TerminalRenderer<W: Write> {
    out: W,
}

impl<W: Write> TerminalRenderer<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn line(&mut self, text: &str) {
        // Output errors only affect the display
        let _ = writeln!(self.out, "{text}");
        let _ = self.out.flush();
    }
}

impl<W: Write> Renderer for TerminalRenderer<W> {
    fn render_message(&mut self, bubble: &Bubble) {
        let who = match bubble.speaker {
            Speaker::User => "You",
            Speaker::Assistant => "Ubud Bot",
        };
        self.line(&format!("[{}] {}: {}", bubble.time, who, bubble.text));
        if bubble.booking_button {
            self.line("        [ Book Now ]  (type /button)");
        }
    }

    fn clear_messages(&mut self) {
        self.line("--- chat cleared ---");
    }

    fn show_typing(&mut self) {
        self.line("Ubud Bot is typing...");
    }

    fn hide_typing(&mut self) {}

    fn show_quick_replies(&mut self, suggestions: &[&str]) {
        let options: Vec<String> = suggestions
            .iter()
            .enumerate()
            .map(|(i, s)| format!("/{} {}", i + 1, s))
            .collect();
        self.line(&format!("  {}", options.join("  |  ")));
    }

    fn hide_quick_replies(&mut self) {}

    fn clear_input(&mut self) {}

    fn reset_booking_form(&mut self) {}

    fn set_panel_visible(&mut self, visible: bool) {
        if visible {
            self.line("--- chat open ---");
        } else {
            self.line("--- chat closed (type /open) ---");
        }
    }

    fn notify(&mut self, notice: &str) {
        self.line(&format!("!! {notice}"));
    }
}
