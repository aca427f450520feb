//! Hand-off of the conversation to the booking form relay.

use async_trait::async_trait;
use tracing::{debug, info};

use crate::chatbot::message::ChatMessage;

pub const DEFAULT_ENDPOINT: &str = "https://api.web3forms.com/submit";
pub const DEFAULT_SUBJECT: &str = "New Booking Request with Chat History";

/// Field the host form uses for the visitor's name.
const NAME_FIELD: &str = "Full Name";

/// Render the log as one `[time] SPEAKER: body` line per message.
pub fn transcript(messages: &[ChatMessage]) -> String {
    messages
        .iter()
        .map(|m| format!("[{}] {}: {}\n", m.sent_at, m.speaker.label(), m.display_text()))
        .collect()
}

/// Fields of the page's booking form, in form order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BookingForm {
    pub fields: Vec<(String, String)>,
}

impl BookingForm {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn field(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.fields.push((name.into(), value.into()));
        self
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }

    /// Parse `Name=Value; Name=Value`. Entries without `=` are skipped.
    pub fn parse(input: &str) -> Self {
        let fields = input
            .split(';')
            .filter_map(|entry| {
                let (name, value) = entry.split_once('=')?;
                let name = name.trim();
                if name.is_empty() {
                    return None;
                }
                Some((name.to_string(), value.trim().to_string()))
            })
            .collect();
        Self { fields }
    }
}

/// Fixed values the relay expects with every submission.
#[derive(Debug, Clone)]
pub struct RelaySettings {
    pub access_key: String,
    pub subject: String,
    /// Page to return to after submission.
    pub redirect: Option<String>,
}

impl RelaySettings {
    pub fn new(access_key: impl Into<String>) -> Self {
        Self {
            access_key: access_key.into(),
            subject: DEFAULT_SUBJECT.to_string(),
            redirect: None,
        }
    }
}

/// Everything sent to the relay: the form's own fields, then ours.
pub fn submission_fields(
    form: &BookingForm,
    transcript: &str,
    settings: &RelaySettings,
) -> Vec<(String, String)> {
    let from_name = form
        .get(NAME_FIELD)
        .filter(|n| !n.trim().is_empty())
        .unwrap_or("Visitor")
        .to_string();

    let mut fields = form.fields.clone();
    fields.push(("chat_history".into(), transcript.to_string()));
    fields.push(("access_key".into(), settings.access_key.clone()));
    fields.push(("subject".into(), settings.subject.clone()));
    fields.push(("from_name".into(), from_name));
    if let Some(ref redirect) = settings.redirect {
        fields.push(("redirect".into(), redirect.clone()));
    }
    fields
}

/// `application/x-www-form-urlencoded` body for the given fields.
pub fn encode_form(fields: &[(String, String)]) -> String {
    fields
        .iter()
        .map(|(k, v)| format!("{}={}", urlencoding::encode(k), urlencoding::encode(v)))
        .collect::<Vec<_>>()
        .join("&")
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RelayError {
    /// The request never got a response.
    Network(String),
    /// The relay answered with a non-success status.
    Status(u16),
}

impl std::fmt::Display for RelayError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RelayError::Network(e) => write!(f, "network error: {e}"),
            RelayError::Status(code) => write!(f, "relay returned status {code}"),
        }
    }
}

impl std::error::Error for RelayError {}

/// Outbound form relay.
#[async_trait]
pub trait Relay: Send + Sync {
    async fn submit(&self, fields: &[(String, String)]) -> Result<(), RelayError>;
}

/// Relay over HTTP. Only the status code is interpreted.
pub struct HttpRelay {
    endpoint: String,
    http: reqwest::Client,
}

impl HttpRelay {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            http: reqwest::Client::new(),
        }
    }

    /// Use a preconfigured client (timeouts, proxy settings).
    pub fn with_client(endpoint: impl Into<String>, http: reqwest::Client) -> Self {
        Self {
            endpoint: endpoint.into(),
            http,
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl Relay for HttpRelay {
    async fn submit(&self, fields: &[(String, String)]) -> Result<(), RelayError> {
        info!("Submitting booking request ({} fields)", fields.len());
        let response = self
            .http
            .post(&self.endpoint)
            .header("content-type", "application/x-www-form-urlencoded")
            .header("accept", "application/json")
            .body(encode_form(fields))
            .send()
            .await
            .map_err(|e| RelayError::Network(e.to_string()))?;

        let status = response.status();
        debug!("Relay responded {}", status);
        if status.is_success() {
            Ok(())
        } else {
            Err(RelayError::Status(status.as_u16()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chatbot::message::{BOOKING_SENTINEL, Speaker};

    #[test]
    fn test_transcript_lines() {
        let messages = vec![
            ChatMessage::new(Speaker::User, "Hi", "10:00"),
            ChatMessage::new(Speaker::Assistant, "Hello!", "10:01"),
        ];
        assert_eq!(transcript(&messages), "[10:00] USER: Hi\n[10:01] BOT: Hello!\n");
    }

    #[test]
    fn test_transcript_empty() {
        assert_eq!(transcript(&[]), "");
    }

    #[test]
    fn test_transcript_hides_sentinel() {
        let messages = vec![ChatMessage::new(Speaker::Assistant, BOOKING_SENTINEL, "10:00")];
        let text = transcript(&messages);
        assert!(!text.contains(BOOKING_SENTINEL));
        assert!(text.contains("BOT: You can click the button below"));
    }

    #[test]
    fn test_submission_field_order() {
        let form = BookingForm::new()
            .field("Full Name", "Ayu")
            .field("Email", "ayu@example.com");
        let mut settings = RelaySettings::new("key-123");
        settings.redirect = Some("https://example.com/tours".into());

        let fields = submission_fields(&form, "[10:00] USER: Hi\n", &settings);
        let names: Vec<&str> = fields.iter().map(|(n, _)| n.as_str()).collect();
        assert_eq!(
            names,
            vec!["Full Name", "Email", "chat_history", "access_key", "subject", "from_name", "redirect"]
        );
        assert_eq!(fields[2].1, "[10:00] USER: Hi\n");
        assert_eq!(fields[3].1, "key-123");
        assert_eq!(fields[4].1, DEFAULT_SUBJECT);
        assert_eq!(fields[5].1, "Ayu");
    }

    #[test]
    fn test_from_name_fallback() {
        let settings = RelaySettings::new("k");
        let fields = submission_fields(&BookingForm::new(), "", &settings);
        let from = fields.iter().find(|(n, _)| n == "from_name").unwrap();
        assert_eq!(from.1, "Visitor");
        assert!(!fields.iter().any(|(n, _)| n == "redirect"));

        let blank = BookingForm::new().field("Full Name", "  ");
        let fields = submission_fields(&blank, "", &settings);
        let from = fields.iter().find(|(n, _)| n == "from_name").unwrap();
        assert_eq!(from.1, "Visitor");
    }

    #[test]
    fn test_encode_form() {
        let fields = vec![
            ("Full Name".to_string(), "Ayu & Made".to_string()),
            ("chat_history".to_string(), "[10:00] USER: Hi\n".to_string()),
        ];
        assert_eq!(
            encode_form(&fields),
            "Full%20Name=Ayu%20%26%20Made&chat_history=%5B10%3A00%5D%20USER%3A%20Hi%0A"
        );
    }

    #[test]
    fn test_parse_form() {
        let form = BookingForm::parse("Full Name=Ayu Lestari; Email = ayu@example.com ;junk; =x");
        assert_eq!(
            form.fields,
            vec![
                ("Full Name".to_string(), "Ayu Lestari".to_string()),
                ("Email".to_string(), "ayu@example.com".to_string()),
            ]
        );
        assert_eq!(form.get("Email"), Some("ayu@example.com"));
        assert_eq!(form.get("Phone"), None);
    }

    #[test]
    fn test_relay_error_display() {
        assert_eq!(RelayError::Status(500).to_string(), "relay returned status 500");
        assert!(RelayError::Network("refused".into()).to_string().contains("refused"));
    }
}
