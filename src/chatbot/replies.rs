//! Canned replies chosen by keyword.
//!
//! Rules are checked in table order and the first rule with any keyword
//! contained in the lowercased utterance wins.

/// What the assistant answers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reply {
    Text(&'static str),
    /// Render the "Book Now" control instead of text.
    BookingPrompt,
    /// Answer with text, then open the booking popup shortly after.
    OpenBookingForm(&'static str),
}

#[derive(Debug)]
pub struct ReplyRule {
    pub keywords: &'static [&'static str],
    pub reply: Reply,
}

impl ReplyRule {
    fn matches(&self, lowered: &str) -> bool {
        self.keywords.iter().any(|k| lowered.contains(k))
    }
}

pub const GREETING: &str = "Hello! 👋 How can I help you with your Ubud tour today?";
pub const FALLBACK: &str = "I'm sorry, I didn't understand that. Could you please rephrase?";

pub static RULES: &[ReplyRule] = &[
    ReplyRule {
        keywords: &["hello", "hi"],
        reply: Reply::Text(GREETING),
    },
    ReplyRule {
        keywords: &["tour"],
        reply: Reply::Text(
            "We have Cultural Heritage, Nature & Wellness, Food & Cooking, and Beach & Sunset tours. Would you like to book one?",
        ),
    },
    ReplyRule {
        keywords: &["book", "booking"],
        reply: Reply::BookingPrompt,
    },
    ReplyRule {
        keywords: &["thank"],
        reply: Reply::Text("You're welcome! If you have any more questions, just ask."),
    },
    ReplyRule {
        keywords: &["price", "cost"],
        reply: Reply::Text(
            "Our prices range from $75 to $120 depending on the tour. Let me know if you want details about a specific tour.",
        ),
    },
    ReplyRule {
        keywords: &["contact"],
        reply: Reply::Text("You can reach us at +62 812 3456 7890 or info@ubudlocaldriver.com."),
    },
    // Shadowed by "book" above; kept so reordering the table brings it back.
    ReplyRule {
        keywords: &["open booking form", "open booking"],
        reply: Reply::OpenBookingForm("Opening the booking form for you now."),
    },
];

/// Pick the reply for a visitor utterance.
pub fn reply_for(utterance: &str) -> Reply {
    reply_from(RULES, utterance)
}

/// Pick a reply from an arbitrary rule table.
pub fn reply_from(rules: &[ReplyRule], utterance: &str) -> Reply {
    let lowered = utterance.to_lowercase();
    rules
        .iter()
        .find(|rule| rule.matches(&lowered))
        .map(|rule| rule.reply)
        .unwrap_or(Reply::Text(FALLBACK))
}
