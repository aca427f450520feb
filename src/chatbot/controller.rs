//! Conversation controller - drives the widget's turn cycle.
//!
//! A turn moves through `Idle -> AwaitingReply -> Typing -> Idle`. Delays are
//! scheduler tasks, so nothing happens until the host calls [`ChatController::advance`].
//! A message sent while a reply is pending is shown right away and its reply
//! is queued behind the current one.

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use chrono_tz::Tz;
use tracing::{debug, error, info, warn};

use crate::chatbot::collaborators::{AudioCue, BookingPopup, Clock, NoPopup, Silent, SystemClock};
use crate::chatbot::handoff::{self, BookingForm, Relay, RelayError, RelaySettings};
use crate::chatbot::message::{BOOKING_SENTINEL, ChatMessage, Speaker, local_time};
use crate::chatbot::render::{Bubble, Renderer};
use crate::chatbot::replies::{RULES, Reply, ReplyRule, reply_from};
use crate::chatbot::scheduler::Scheduler;
use crate::chatbot::storage::SlotStorage;
use crate::chatbot::store::MessageStore;

pub const QUICK_REPLIES: [&str; 4] = [
    "What tours do you offer?",
    "How do I book?",
    "What are the prices?",
    "Contact information",
];

pub const BOOK_NOW_GREETING: &str = "Hi! Let's get your tour booked. Please fill the booking form below. You can also use chat here to ask any question.";

pub const SUBMIT_OK_NOTICE: &str = "Thank you for your booking request! We will contact you shortly.";
pub const SUBMIT_REJECTED_NOTICE: &str = "There was an error sending your booking request. Please try again later.";
pub const SUBMIT_FAILED_NOTICE: &str = "Could not submit the form. Please try again later.";

pub const DEFAULT_STORAGE_KEY: &str = "ubudChatHistory";

/// Timing and identity settings for a controller.
#[derive(Debug, Clone)]
pub struct ControllerSettings {
    /// Pause before the typing indicator after a typed message.
    pub reply_delay: Duration,
    /// How long the typing indicator stays up.
    pub typing_delay: Duration,
    /// Delay before opening the booking popup from a reply.
    pub popup_delay: Duration,
    pub timezone: Tz,
    pub storage_key: String,
    pub relay: RelaySettings,
    /// Keyword table, checked in order.
    pub rules: &'static [ReplyRule],
}

impl Default for ControllerSettings {
    fn default() -> Self {
        Self {
            reply_delay: Duration::from_millis(800),
            typing_delay: Duration::from_millis(1200),
            popup_delay: Duration::from_millis(500),
            timezone: chrono_tz::Asia::Makassar,
            storage_key: DEFAULT_STORAGE_KEY.to_string(),
            relay: RelaySettings::new(""),
            rules: RULES,
        }
    }
}

/// Everything the controller talks to, injected once per session.
pub struct Collaborators {
    pub storage: Box<dyn SlotStorage>,
    pub renderer: Box<dyn Renderer>,
    pub relay: Arc<dyn Relay>,
    pub popup: Box<dyn BookingPopup>,
    pub audio: Box<dyn AudioCue>,
    pub clock: Box<dyn Clock>,
}

impl Collaborators {
    /// Required collaborators; popup and audio default to no-ops.
    pub fn new(storage: Box<dyn SlotStorage>, renderer: Box<dyn Renderer>, relay: Arc<dyn Relay>) -> Self {
        Self {
            storage,
            renderer,
            relay,
            popup: Box::new(NoPopup),
            audio: Box::new(Silent),
            clock: Box::new(SystemClock),
        }
    }

    pub fn with_popup(mut self, popup: Box<dyn BookingPopup>) -> Self {
        self.popup = popup;
        self
    }

    pub fn with_audio(mut self, audio: Box<dyn AudioCue>) -> Self {
        self.audio = audio;
        self
    }

    pub fn with_clock(mut self, clock: Box<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnState {
    Idle,
    /// User message shown, typing indicator not yet up.
    AwaitingReply,
    Typing,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Task {
    /// Carries the turn number it was scheduled for.
    StartTyping(u64),
    DeliverReply(u64),
    OpenBookingPopup,
}

#[derive(Debug)]
struct PendingTurn {
    utterance: String,
    pause: bool,
}

pub struct ChatController {
    settings: ControllerSettings,
    store: MessageStore,
    renderer: Box<dyn Renderer>,
    relay: Arc<dyn Relay>,
    popup: Box<dyn BookingPopup>,
    audio: Box<dyn AudioCue>,
    clock: Box<dyn Clock>,
    scheduler: Scheduler<Task>,
    state: TurnState,
    /// Utterance the current turn is answering.
    current: Option<String>,
    /// Bumped for every turn and on reset; tasks from older turns are dropped.
    turn: u64,
    queued: VecDeque<PendingTurn>,
    quick_replies_visible: bool,
    panel_visible: bool,
}

impl ChatController {
    pub fn new(parts: Collaborators, settings: ControllerSettings) -> Self {
        let store = MessageStore::new(parts.storage, settings.storage_key.clone());
        Self {
            settings,
            store,
            renderer: parts.renderer,
            relay: parts.relay,
            popup: parts.popup,
            audio: parts.audio,
            clock: parts.clock,
            scheduler: Scheduler::new(),
            state: TurnState::Idle,
            current: None,
            turn: 0,
            queued: VecDeque::new(),
            quick_replies_visible: false,
            panel_visible: false,
        }
    }

    /// Hide the panel and replay stored history. Replay only renders.
    pub fn start(&mut self) {
        self.panel_visible = false;
        self.renderer.set_panel_visible(false);

        let history = self.store.load_all();
        for msg in history {
            self.renderer.render_message(&Bubble::from_message(&msg));
            self.store.restore(msg);
        }
        info!("Chat started ({} messages restored)", self.store.len());
        self.refresh_quick_replies();
    }

    /// Submit typed text. Returns false if there was nothing to send.
    pub fn submit_text(&mut self, text: &str) -> bool {
        let text = text.trim();
        if text.is_empty() {
            return false;
        }
        self.post_user_message(text);
        self.enqueue_turn(PendingTurn {
            utterance: text.to_string(),
            pause: true,
        });
        true
    }

    /// Send one of the quick-reply suggestions.
    pub fn tap_quick_reply(&mut self, index: usize) -> bool {
        if !self.quick_replies_visible {
            debug!("Quick replies hidden, ignoring tap");
            return false;
        }
        let Some(&suggestion) = QUICK_REPLIES.get(index) else {
            debug!("No quick reply at index {index}");
            return false;
        };
        self.post_user_message(suggestion);
        self.enqueue_turn(PendingTurn {
            utterance: suggestion.to_string(),
            pause: false,
        });
        true
    }

    /// Move virtual time forward, running every task that falls due.
    pub fn advance(&mut self, elapsed: Duration) {
        let deadline = self.scheduler.now() + elapsed;
        while let Some((id, task)) = self.scheduler.pop_due(deadline) {
            debug!("Running task {} ({:?})", id.0, task);
            match task {
                Task::StartTyping(turn) | Task::DeliverReply(turn) if turn != self.turn => {
                    debug!("Dropping task from abandoned turn {turn}");
                }
                Task::StartTyping(_) => self.start_typing(),
                Task::DeliverReply(_) => self.deliver_reply(),
                Task::OpenBookingPopup => self.popup.open(),
            }
        }
    }

    /// Delay until the next scheduled task, if any.
    pub fn time_until_next_task(&self) -> Option<Duration> {
        self.scheduler.time_until_next()
    }

    /// The "Book Now" control inside a booking prompt was pressed.
    pub fn press_booking_button(&mut self) {
        self.popup.open();
    }

    /// A page-wide "Book Now" button was pressed.
    pub fn book_now(&mut self) {
        self.open_panel();
        self.post_assistant_message(BOOK_NOW_GREETING);
        self.refresh_quick_replies();
        self.popup.open();
    }

    pub fn open_panel(&mut self) {
        self.panel_visible = true;
        self.renderer.set_panel_visible(true);
    }

    pub fn close_panel(&mut self) {
        self.panel_visible = false;
        self.renderer.set_panel_visible(false);
    }

    /// Relay the booking form with the transcript attached.
    ///
    /// On success the conversation is wiped. On failure nothing changes and
    /// the visitor can submit again.
    pub async fn submit_booking(&mut self, form: &BookingForm) -> Result<(), RelayError> {
        let transcript = handoff::transcript(self.store.messages());
        let fields = handoff::submission_fields(form, &transcript, &self.settings.relay);
        let relay = Arc::clone(&self.relay);

        match relay.submit(&fields).await {
            Ok(()) => {
                info!("Booking request relayed ({} messages)", self.store.len());
                self.renderer.notify(SUBMIT_OK_NOTICE);
                self.popup.close();
                self.renderer.clear_input();
                self.renderer.reset_booking_form();
                self.abandon_turns();
                self.store.clear();
                self.renderer.clear_messages();
                self.refresh_quick_replies();
                Ok(())
            }
            Err(e) => {
                match e {
                    RelayError::Status(code) => {
                        warn!("Booking relay rejected request: {code}");
                        self.renderer.notify(SUBMIT_REJECTED_NOTICE);
                    }
                    RelayError::Network(ref msg) => {
                        error!("Booking relay unreachable: {msg}");
                        self.renderer.notify(SUBMIT_FAILED_NOTICE);
                    }
                }
                Err(e)
            }
        }
    }

    pub fn state(&self) -> TurnState {
        self.state
    }

    pub fn messages(&self) -> &[ChatMessage] {
        self.store.messages()
    }

    pub fn store(&self) -> &MessageStore {
        &self.store
    }

    pub fn quick_replies_visible(&self) -> bool {
        self.quick_replies_visible
    }

    pub fn panel_visible(&self) -> bool {
        self.panel_visible
    }

    /// Turns waiting behind the current one.
    pub fn queued_turns(&self) -> usize {
        self.queued.len()
    }

    fn timestamp(&self) -> String {
        local_time(self.clock.now(), self.settings.timezone)
    }

    fn post_user_message(&mut self, text: &str) {
        let msg = ChatMessage::new(Speaker::User, text, self.timestamp());
        self.renderer.render_message(&Bubble::from_message(&msg));
        self.store.append(msg);
        self.renderer.clear_input();
        self.hide_quick_replies();
    }

    fn post_assistant_message(&mut self, body: &str) {
        let msg = ChatMessage::new(Speaker::Assistant, body, self.timestamp());
        self.renderer.render_message(&Bubble::from_message(&msg));
        self.store.append(msg);
        if let Err(e) = self.audio.play() {
            debug!("Notification sound failed: {e}");
        }
    }

    fn enqueue_turn(&mut self, turn: PendingTurn) {
        if self.state == TurnState::Idle {
            self.begin_turn(turn);
        } else {
            debug!("Reply pending, queueing turn");
            self.queued.push_back(turn);
        }
    }

    fn begin_turn(&mut self, turn: PendingTurn) {
        self.turn += 1;
        self.current = Some(turn.utterance);
        if turn.pause {
            self.state = TurnState::AwaitingReply;
            self.scheduler
                .schedule(self.settings.reply_delay, Task::StartTyping(self.turn));
        } else {
            self.start_typing();
        }
    }

    fn start_typing(&mut self) {
        self.state = TurnState::Typing;
        self.renderer.show_typing();
        self.scheduler
            .schedule(self.settings.typing_delay, Task::DeliverReply(self.turn));
    }

    /// Drop the pending turn and everything queued behind it.
    fn abandon_turns(&mut self) {
        if self.state == TurnState::Idle {
            return;
        }
        info!("Abandoning pending reply ({} queued)", self.queued.len());
        if self.state == TurnState::Typing {
            self.renderer.hide_typing();
        }
        self.turn += 1;
        self.current = None;
        self.queued.clear();
        self.state = TurnState::Idle;
    }

    fn deliver_reply(&mut self) {
        self.renderer.hide_typing();
        let utterance = self.current.take().unwrap_or_default();

        match reply_from(self.settings.rules, &utterance) {
            Reply::Text(text) => self.post_assistant_message(text),
            Reply::BookingPrompt => self.post_assistant_message(BOOKING_SENTINEL),
            Reply::OpenBookingForm(text) => {
                self.post_assistant_message(text);
                self.scheduler.schedule(self.settings.popup_delay, Task::OpenBookingPopup);
            }
        }

        match self.queued.pop_front() {
            Some(next) => self.begin_turn(next),
            None => {
                self.state = TurnState::Idle;
                self.refresh_quick_replies();
            }
        }
    }

    /// Quick replies are only offered while no reply is pending.
    fn refresh_quick_replies(&mut self) {
        if self.state != TurnState::Idle {
            return;
        }
        self.renderer.show_quick_replies(&QUICK_REPLIES);
        self.quick_replies_visible = true;
    }

    fn hide_quick_replies(&mut self) {
        if self.quick_replies_visible {
            self.renderer.hide_quick_replies();
            self.quick_replies_visible = false;
        }
    }
}
