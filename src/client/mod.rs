//! Client side of the chat: conversation state and the transitions that
//! drive the relay, degrading to local canned replies when it is unreachable.

pub mod api;

use chrono::{DateTime, Local};
use tracing::{debug, warn};

use crate::chat::{next_message_id, ChatMessage, Sender};
use crate::fallback::CLIENT_REPLIES;

pub use api::{ChatApi, ClientError, HttpChatApi};

pub const OFFLINE_WELCOME: &str =
    "Hi! I'm your AI fitness assistant FLEX.AI , help with basic fitness tips!";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControllerState {
    Idle,
    AwaitingSessionStart,
    Ready,
    AwaitingReply,
}

/// A message as the client shows it, with its time in the local zone.
#[derive(Debug, Clone, PartialEq)]
pub struct DisplayMessage {
    pub id: u64,
    pub text: String,
    pub sender: Sender,
    pub timestamp: DateTime<Local>,
}

impl DisplayMessage {
    fn local(text: impl Into<String>, sender: Sender) -> Self {
        Self {
            id: next_message_id(),
            text: text.into(),
            sender,
            timestamp: Local::now(),
        }
    }

    /// `HH:MM` in local time.
    pub fn time_label(&self) -> String {
        self.timestamp.format("%H:%M").to_string()
    }
}

impl From<ChatMessage> for DisplayMessage {
    fn from(msg: ChatMessage) -> Self {
        Self {
            id: msg.id,
            text: msg.text,
            sender: msg.sender,
            timestamp: msg.timestamp.with_timezone(&Local),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct ConversationView {
    pub messages: Vec<DisplayMessage>,
    pub input: String,
    pub typing: bool,
    pub api_available: bool,
    pub session_id: Option<String>,
}

pub struct ConversationController<A> {
    api: A,
    state: ControllerState,
    view: ConversationView,
}

impl<A: ChatApi> ConversationController<A> {
    pub fn new(api: A) -> Self {
        Self {
            api,
            state: ControllerState::Idle,
            view: ConversationView {
                api_available: true,
                ..Default::default()
            },
        }
    }

    pub fn state(&self) -> ControllerState {
        self.state
    }

    pub fn view(&self) -> &ConversationView {
        &self.view
    }

    /// Input is accepted only while no request is in flight.
    pub fn input_enabled(&self) -> bool {
        self.state == ControllerState::Ready
    }

    pub fn set_input(&mut self, input: impl Into<String>) {
        if self.input_enabled() {
            self.view.input = input.into();
        }
    }

    pub async fn mount(&mut self) {
        self.start_session().await;
    }

    async fn start_session(&mut self) {
        self.state = ControllerState::AwaitingSessionStart;

        match self.api.start_session().await {
            Ok(started) => {
                debug!("Chat session {} started", started.session_id);
                self.view.session_id = Some(started.session_id);
                self.view.messages = vec![started.message.into()];
                self.view.api_available = true;
            }
            Err(e) => {
                warn!("Error starting chat session: {}", e);
                self.view.session_id = None;
                self.view.messages = vec![DisplayMessage::local(OFFLINE_WELCOME, Sender::Bot)];
                self.view.api_available = false;
            }
        }

        self.state = ControllerState::Ready;
    }

    /// Sends the current input. Returns false when there was nothing to send
    /// or a request is already in flight.
    pub async fn submit(&mut self) -> bool {
        if !self.input_enabled() || self.view.input.trim().is_empty() {
            return false;
        }

        let text = std::mem::take(&mut self.view.input);
        self.view
            .messages
            .push(DisplayMessage::local(text.clone(), Sender::User));
        self.view.typing = true;
        self.state = ControllerState::AwaitingReply;

        let result = match self.view.session_id.as_deref() {
            Some(session_id) => self.api.send_message(session_id, &text).await,
            None => Err(ClientError::NoSession),
        };

        match result {
            Ok(resp) => {
                self.view.api_available = !resp.is_offline;
                self.view.messages.push(resp.message.into());
            }
            Err(e) => {
                warn!("Error sending message: {}", e);
                self.view.api_available = false;
                self.view.messages.push(DisplayMessage::local(
                    CLIENT_REPLIES.reply_for(&text),
                    Sender::Bot,
                ));
            }
        }

        self.view.typing = false;
        self.state = ControllerState::Ready;
        true
    }

    /// Drops the server session, if any, and starts over. Before `mount` this
    /// just starts the first session; while a request is in flight it does
    /// nothing.
    pub async fn clear(&mut self) {
        if !matches!(self.state, ControllerState::Idle | ControllerState::Ready) {
            return;
        }

        if let Some(session_id) = self.view.session_id.take() {
            if let Err(e) = self.api.delete_session(&session_id).await {
                debug!("Ignoring failed session delete: {}", e);
            }
        }
        self.view.input.clear();
        self.start_session().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::{SendMessageResponse, StartChatResponse};
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    /// Scripted transport: each call pops the next canned outcome.
    #[derive(Default)]
    struct FakeApi {
        starts: Mutex<VecDeque<Result<StartChatResponse, ClientError>>>,
        sends: Mutex<VecDeque<Result<SendMessageResponse, ClientError>>>,
        deleted: Mutex<Vec<String>>,
        fail_delete: bool,
    }

    impl FakeApi {
        fn start_ok(self, id: &str) -> Self {
            self.starts.lock().unwrap().push_back(Ok(StartChatResponse {
                session_id: id.into(),
                message: ChatMessage::bot("welcome"),
            }));
            self
        }

        fn start_err(self) -> Self {
            self.starts
                .lock()
                .unwrap()
                .push_back(Err(ClientError::Status(500)));
            self
        }

        fn reply(self, text: &str, offline: bool) -> Self {
            self.sends.lock().unwrap().push_back(Ok(SendMessageResponse {
                message: ChatMessage::bot(text),
                is_offline: offline,
            }));
            self
        }

        fn send_err(self) -> Self {
            self.sends
                .lock()
                .unwrap()
                .push_back(Err(ClientError::Status(502)));
            self
        }
    }

    #[async_trait]
    impl ChatApi for FakeApi {
        async fn start_session(&self) -> Result<StartChatResponse, ClientError> {
            self.starts
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or(Err(ClientError::Status(503)))
        }

        async fn send_message(
            &self,
            _session_id: &str,
            _text: &str,
        ) -> Result<SendMessageResponse, ClientError> {
            self.sends
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or(Err(ClientError::Status(503)))
        }

        async fn delete_session(&self, session_id: &str) -> Result<(), ClientError> {
            self.deleted.lock().unwrap().push(session_id.to_string());
            if self.fail_delete {
                Err(ClientError::Status(404))
            } else {
                Ok(())
            }
        }
    }

    fn senders(view: &ConversationView) -> Vec<Sender> {
        view.messages.iter().map(|m| m.sender).collect()
    }

    #[tokio::test]
    async fn mount_online() {
        let mut controller = ConversationController::new(FakeApi::default().start_ok("ses_1"));
        assert_eq!(controller.state(), ControllerState::Idle);

        controller.mount().await;

        assert_eq!(controller.state(), ControllerState::Ready);
        let view = controller.view();
        assert_eq!(view.session_id.as_deref(), Some("ses_1"));
        assert!(view.api_available);
        assert_eq!(view.messages.len(), 1);
        assert_eq!(view.messages[0].text, "welcome");
    }

    #[tokio::test]
    async fn mount_offline_uses_local_welcome() {
        let mut controller = ConversationController::new(FakeApi::default().start_err());
        controller.mount().await;

        assert_eq!(controller.state(), ControllerState::Ready);
        let view = controller.view();
        assert!(view.session_id.is_none());
        assert!(!view.api_available);
        assert_eq!(view.messages[0].text, OFFLINE_WELCOME);
        assert_eq!(view.messages[0].sender, Sender::Bot);
    }

    #[tokio::test]
    async fn blank_input_is_ignored() {
        let mut controller = ConversationController::new(FakeApi::default().start_ok("ses_1"));
        controller.mount().await;

        controller.set_input("   ");
        assert!(!controller.submit().await);
        assert_eq!(controller.view().messages.len(), 1);
    }

    #[tokio::test]
    async fn input_is_locked_until_mounted() {
        let mut controller = ConversationController::new(FakeApi::default().start_ok("ses_1"));
        assert!(!controller.input_enabled());
        controller.set_input("hello");
        assert!(controller.view().input.is_empty());
    }

    #[tokio::test]
    async fn reply_appended_and_availability_follows_flag() {
        let api = FakeApi::default()
            .start_ok("ses_1")
            .reply("do squats", false)
            .reply("offline tip", true)
            .reply("back online", false);
        let mut controller = ConversationController::new(api);
        controller.mount().await;

        controller.set_input("legs?");
        assert!(controller.submit().await);
        assert!(controller.view().api_available);
        assert!(controller.view().input.is_empty());
        assert!(!controller.view().typing);

        controller.set_input("again");
        controller.submit().await;
        assert!(!controller.view().api_available);

        controller.set_input("and again");
        controller.submit().await;
        assert!(controller.view().api_available);

        let view = controller.view();
        assert_eq!(
            senders(view),
            vec![
                Sender::Bot,
                Sender::User,
                Sender::Bot,
                Sender::User,
                Sender::Bot,
                Sender::User,
                Sender::Bot
            ]
        );
        assert_eq!(view.messages[2].text, "do squats");
        assert_eq!(controller.state(), ControllerState::Ready);
    }

    #[tokio::test]
    async fn transport_failure_uses_client_fallback() {
        let api = FakeApi::default().start_ok("ses_1").send_err();
        let mut controller = ConversationController::new(api);
        controller.mount().await;

        controller.set_input("need motivation");
        controller.submit().await;

        let view = controller.view();
        assert!(!view.api_available);
        assert_eq!(view.messages.last().unwrap().text, CLIENT_REPLIES.motivation);
        assert_eq!(controller.state(), ControllerState::Ready);
    }

    #[tokio::test]
    async fn offline_mount_still_answers_locally() {
        let mut controller = ConversationController::new(FakeApi::default().start_err());
        controller.mount().await;

        controller.set_input("hello there");
        assert!(controller.submit().await);

        let last = controller.view().messages.last().unwrap();
        assert_eq!(last.text, CLIENT_REPLIES.default);
    }

    #[tokio::test]
    async fn clear_deletes_and_restarts() {
        let api = FakeApi::default()
            .start_ok("ses_1")
            .start_ok("ses_2")
            .reply("hi", false);
        let mut controller = ConversationController::new(api);
        controller.mount().await;
        controller.set_input("hello");
        controller.submit().await;

        controller.clear().await;

        let view = controller.view();
        assert_eq!(view.session_id.as_deref(), Some("ses_2"));
        assert_eq!(view.messages.len(), 1);
        assert_eq!(*controller.api.deleted.lock().unwrap(), vec!["ses_1".to_string()]);
    }

    #[tokio::test]
    async fn clear_ignores_delete_failure() {
        let api = FakeApi {
            fail_delete: true,
            ..FakeApi::default()
        }
        .start_ok("ses_1")
        .start_ok("ses_2");
        let mut controller = ConversationController::new(api);
        controller.mount().await;

        controller.clear().await;

        assert_eq!(controller.view().session_id.as_deref(), Some("ses_2"));
        assert!(controller.view().api_available);
    }

    #[tokio::test]
    async fn clear_before_mount_starts_session() {
        let api = FakeApi::default().start_ok("ses_1");
        let mut controller = ConversationController::new(api);
        assert_eq!(controller.state(), ControllerState::Idle);

        controller.clear().await;

        assert_eq!(controller.state(), ControllerState::Ready);
        assert_eq!(controller.view().session_id.as_deref(), Some("ses_1"));
        assert_eq!(controller.view().messages.len(), 1);
        assert!(controller.api.deleted.lock().unwrap().is_empty());
    }

    #[test]
    fn server_message_converts_to_local_time() {
        let msg = ChatMessage::bot("hey");
        let display: DisplayMessage = msg.clone().into();

        assert_eq!(display.id, msg.id);
        assert_eq!(display.timestamp, msg.timestamp);
        assert_eq!(display.time_label().len(), 5);
    }
}
