//! Conversation controller.
//!
//! Owns the message list and the send/retry/clear flows. Each request is
//! split in two so the GUI never blocks: [`ConversationController::send`] and
//! [`ConversationController::retry`] update state and hand back a
//! [`PendingRequest`]; [`ConversationController::settle`] applies the
//! transport's answer. At most one request is outstanding at a time.

use crate::storage::KeyValueStore;
use providers::{ChatTransport, TransportError};
use shared::chat::{self, Message};
use shared::reply::parse_reply;

/// Shown when retry is pressed but no user turn exists.
pub const NOTHING_TO_RETRY: &str =
    "Could not find a message to retry. Please type a new message.";

/// Text that must be sent to the transport, then passed back to `settle`.
#[derive(Debug, Clone, PartialEq, Eq)]
#[must_use]
pub struct PendingRequest {
    pub text: String,
}

pub struct ConversationController {
    messages: Vec<Message>,
    awaiting_reply: bool,
    error: Option<String>,
    input: String,
    store: Box<dyn KeyValueStore>,
    slot: String,
    scroll_requested: bool,
}

impl ConversationController {
    /// Restore the conversation saved under `slot`, or start from the greeting.
    pub fn restore(store: Box<dyn KeyValueStore>, slot: impl Into<String>) -> Self {
        let slot = slot.into();
        let messages = load_messages(store.as_ref(), &slot);
        tracing::info!(messages = messages.len(), "conversation restored");
        Self {
            messages,
            awaiting_reply: false,
            error: None,
            input: String::new(),
            store,
            slot,
            scroll_requested: true,
        }
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn is_awaiting_reply(&self) -> bool {
        self.awaiting_reply
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn input(&self) -> &str {
        &self.input
    }

    pub fn input_mut(&mut self) -> &mut String {
        &mut self.input
    }

    /// Whether the view should scroll to the newest message. Resets the flag.
    pub fn take_scroll_request(&mut self) -> bool {
        std::mem::take(&mut self.scroll_requested)
    }

    /// Submit `text` as a new user turn.
    ///
    /// Returns `None` (and changes nothing) when the text is blank or a
    /// reply is still pending.
    pub fn send(&mut self, text: &str) -> Option<PendingRequest> {
        let trimmed = text.trim();
        if trimmed.is_empty() || self.awaiting_reply {
            return None;
        }

        self.push(Message::user(trimmed));
        self.input.clear();
        self.awaiting_reply = true;
        self.error = None;
        Some(PendingRequest {
            text: trimmed.to_string(),
        })
    }

    /// Submit whatever is in the input box.
    pub fn submit_input(&mut self) -> Option<PendingRequest> {
        let text = self.input.clone();
        self.send(&text)
    }

    /// Re-issue the most recent user turn, dropping the trailing error reply.
    pub fn retry(&mut self) -> Option<PendingRequest> {
        if self.awaiting_reply {
            return None;
        }
        let Some(text) = self
            .messages
            .iter()
            .rev()
            .find(|m| m.is_user())
            .map(|m| m.content.clone())
        else {
            self.error = Some(NOTHING_TO_RETRY.to_string());
            return None;
        };

        self.awaiting_reply = true;
        self.error = None;
        if self.messages.last().map_or(false, Message::is_error) {
            self.messages.pop();
            self.changed();
        }
        tracing::info!("retrying last user message");
        Some(PendingRequest { text })
    }

    /// Apply the outcome of the outstanding request.
    pub fn settle(&mut self, result: Result<String, TransportError>) {
        if !self.awaiting_reply {
            tracing::debug!("ignoring reply with no request outstanding");
            return;
        }
        self.awaiting_reply = false;

        match result {
            Ok(raw) => {
                let parsed = parse_reply(&raw);
                self.push(Message::model_with_recommendations(
                    parsed.cleaned_content,
                    parsed.recommendations,
                ));
            }
            Err(e) => {
                tracing::warn!("chat request failed: {}", e.detail());
                let shown = e.to_string();
                self.push(Message::error(&shown));
                self.error = Some(shown);
            }
        }
    }

    /// Start over from the greeting.
    pub fn clear(&mut self) {
        self.messages = chat::seeded_conversation();
        self.error = None;
        self.changed();
    }

    /// `send` followed by the transport call and `settle`.
    pub async fn send_with(&mut self, transport: &dyn ChatTransport, text: &str) {
        if let Some(request) = self.send(text) {
            let result = transport.send_message(&request.text).await;
            self.settle(result);
        }
    }

    /// `retry` followed by the transport call and `settle`.
    pub async fn retry_with(&mut self, transport: &dyn ChatTransport) {
        if let Some(request) = self.retry() {
            let result = transport.send_message(&request.text).await;
            self.settle(result);
        }
    }

    fn push(&mut self, msg: Message) {
        self.messages.push(msg);
        self.changed();
    }

    fn changed(&mut self) {
        self.scroll_requested = true;
        self.persist();
    }

    fn persist(&mut self) {
        let result = if chat::is_seeded(&self.messages) {
            self.store.remove(&self.slot)
        } else {
            match serde_json::to_string(&self.messages) {
                Ok(json) => self.store.set(&self.slot, json),
                Err(e) => Err(e.into()),
            }
        };
        if let Err(e) = result {
            tracing::warn!("Failed to save conversation: {}", e);
        }
    }
}

fn load_messages(store: &dyn KeyValueStore, slot: &str) -> Vec<Message> {
    let Some(saved) = store.get(slot) else {
        return chat::seeded_conversation();
    };
    match serde_json::from_str::<Vec<Message>>(&saved) {
        Ok(messages) if !messages.is_empty() => messages,
        Ok(_) => chat::seeded_conversation(),
        Err(e) => {
            tracing::warn!("Failed to load saved conversation: {}", e);
            chat::seeded_conversation()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{MemoryStore, StorageError};
    use async_trait::async_trait;
    use parking_lot::Mutex;
    use shared::chat::{Recommendation, Role, GREETING};
    use std::collections::HashMap;
    use std::collections::VecDeque;
    use std::sync::Arc;

    const SLOT: &str = "chatHistory";

    /// Memory store whose contents stay inspectable after being boxed.
    #[derive(Clone, Default)]
    struct SharedStore(Arc<Mutex<HashMap<String, String>>>);

    impl SharedStore {
        fn slot(&self) -> Option<String> {
            self.0.lock().get(SLOT).cloned()
        }
    }

    impl KeyValueStore for SharedStore {
        fn get(&self, key: &str) -> Option<String> {
            self.0.lock().get(key).cloned()
        }

        fn set(&mut self, key: &str, value: String) -> Result<(), StorageError> {
            self.0.lock().insert(key.to_string(), value);
            Ok(())
        }

        fn remove(&mut self, key: &str) -> Result<(), StorageError> {
            self.0.lock().remove(key);
            Ok(())
        }
    }

    /// Replays scripted outcomes and records what it was asked.
    #[derive(Default)]
    struct ScriptedTransport {
        replies: Mutex<VecDeque<Result<String, TransportError>>>,
        calls: Mutex<Vec<String>>,
    }

    impl ScriptedTransport {
        fn with(replies: Vec<Result<String, TransportError>>) -> Self {
            Self {
                replies: Mutex::new(replies.into()),
                calls: Mutex::new(Vec::new()),
            }
        }

        fn calls(&self) -> Vec<String> {
            self.calls.lock().clone()
        }
    }

    #[async_trait]
    impl ChatTransport for ScriptedTransport {
        async fn send_message(&self, text: &str) -> Result<String, TransportError> {
            self.calls.lock().push(text.to_string());
            self.replies
                .lock()
                .pop_front()
                .unwrap_or_else(|| Ok("ok".to_string()))
        }
    }

    fn controller() -> (ConversationController, SharedStore) {
        let store = SharedStore::default();
        let ctl = ConversationController::restore(Box::new(store.clone()), SLOT);
        (ctl, store)
    }

    #[test]
    fn test_starts_with_greeting() {
        let (ctl, store) = controller();
        assert_eq!(ctl.messages(), &[Message::greeting()]);
        assert!(!ctl.is_awaiting_reply());
        assert!(ctl.error().is_none());
        assert!(store.slot().is_none());
    }

    #[tokio::test]
    async fn test_blank_send_is_noop() {
        let (mut ctl, store) = controller();
        let transport = ScriptedTransport::default();

        ctl.send_with(&transport, "").await;
        ctl.send_with(&transport, "   ").await;

        assert_eq!(ctl.messages().len(), 1);
        assert!(transport.calls().is_empty());
        assert!(store.slot().is_none());
    }

    #[test]
    fn test_send_while_awaiting_is_noop() {
        let (mut ctl, _store) = controller();
        let first = ctl.send("hello").unwrap();
        assert_eq!(first.text, "hello");
        assert!(ctl.is_awaiting_reply());

        assert!(ctl.send("again").is_none());
        assert!(ctl.retry().is_none());
        assert_eq!(ctl.messages().len(), 2);
    }

    #[tokio::test]
    async fn test_send_trims_and_parses_reply() {
        let (mut ctl, store) = controller();
        let reply = "Here is advice.\n\n```json:recommendations\n[{\"title\":\"Backup data\",\"rationale\":\"Avoid loss\",\"actionItems\":[\"Buy drive\",\"Run backup\"]}]\n```";
        let transport = ScriptedTransport::with(vec![Ok(reply.to_string())]);
        *ctl.input_mut() = "  How do I keep my files safe?  ".to_string();

        let input = ctl.input().to_string();
        ctl.send_with(&transport, &input).await;

        assert_eq!(transport.calls(), vec!["How do I keep my files safe?"]);
        assert_eq!(ctl.input(), "");
        assert!(!ctl.is_awaiting_reply());

        let msgs = ctl.messages();
        assert_eq!(msgs.len(), 3);
        assert_eq!(msgs[1], Message::user("How do I keep my files safe?"));
        assert_eq!(msgs[2].role, Role::Model);
        assert_eq!(msgs[2].content, "Here is advice.");
        assert_eq!(
            msgs[2].recommendations,
            Some(vec![Recommendation {
                title: "Backup data".into(),
                rationale: "Avoid loss".into(),
                action_items: vec!["Buy drive".into(), "Run backup".into()],
            }])
        );

        let saved: Vec<Message> = serde_json::from_str(&store.slot().unwrap()).unwrap();
        assert_eq!(saved, msgs);
    }

    #[test]
    fn test_submit_input_uses_pending_text() {
        let (mut ctl, _store) = controller();
        ctl.input_mut().push_str("typed");
        let request = ctl.submit_input().unwrap();
        assert_eq!(request.text, "typed");
        assert_eq!(ctl.input(), "");
    }

    #[tokio::test]
    async fn test_network_failure_uses_fixed_phrasing() {
        let (mut ctl, _store) = controller();
        let transport = ScriptedTransport::with(vec![Err(TransportError::from_message(
            "xhr error: timeout",
        ))]);

        ctl.send_with(&transport, "hi").await;

        assert_eq!(
            ctl.error(),
            Some("A network error occurred. Please check your connection and try again.")
        );
        let last = ctl.messages().last().unwrap();
        assert_eq!(
            last.content,
            "Sorry, something went wrong: A network error occurred. Please check your connection and try again."
        );
        assert!(last.is_error());
        assert!(!ctl.is_awaiting_reply());
    }

    #[tokio::test]
    async fn test_generic_failure_wraps_message() {
        let (mut ctl, _store) = controller();
        let transport =
            ScriptedTransport::with(vec![Err(TransportError::Api("gemini error: 500".into()))]);

        ctl.send_with(&transport, "hi").await;

        assert_eq!(
            ctl.error(),
            Some("Failed to get response from AI: gemini error: 500")
        );
        assert_eq!(
            ctl.messages().last().unwrap().content,
            "Sorry, something went wrong: Failed to get response from AI: gemini error: 500"
        );
    }

    #[tokio::test]
    async fn test_new_send_clears_error() {
        let (mut ctl, _store) = controller();
        let transport =
            ScriptedTransport::with(vec![Err(TransportError::Other("x".into())), Ok("fine".into())]);
        ctl.send_with(&transport, "one").await;
        assert!(ctl.error().is_some());
        ctl.send_with(&transport, "two").await;
        assert!(ctl.error().is_none());
        assert_eq!(ctl.messages().len(), 5);
    }

    #[tokio::test]
    async fn test_retry_without_user_message() {
        let (mut ctl, store) = controller();
        let transport = ScriptedTransport::default();

        ctl.retry_with(&transport).await;

        assert_eq!(ctl.error(), Some(NOTHING_TO_RETRY));
        assert!(transport.calls().is_empty());
        assert!(!ctl.is_awaiting_reply());
        assert_eq!(ctl.messages(), &[Message::greeting()]);
        assert!(store.slot().is_none());
    }

    #[tokio::test]
    async fn test_retry_replaces_error_reply() {
        let (mut ctl, _store) = controller();
        let transport = ScriptedTransport::with(vec![
            Err(TransportError::Network("down".into())),
            Ok("Recovered".into()),
        ]);

        ctl.send_with(&transport, "What's new?").await;
        assert_eq!(ctl.messages().len(), 3);

        let request = ctl.retry().unwrap();
        assert_eq!(request.text, "What's new?");
        assert_eq!(ctl.messages().len(), 2);
        assert!(ctl.error().is_none());
        assert!(ctl.is_awaiting_reply());

        let result = transport.send_message(&request.text).await;
        ctl.settle(result);

        assert_eq!(transport.calls(), vec!["What's new?", "What's new?"]);
        let msgs = ctl.messages();
        assert_eq!(msgs.len(), 3);
        assert_eq!(msgs[2], Message::model("Recovered"));
    }

    /// Only a trailing error turn is eligible for removal on retry. With a
    /// normal reply at the tail the user turn is re-sent and nothing is dropped.
    #[tokio::test]
    async fn test_retry_only_removes_error_tail() {
        let (mut ctl, _store) = controller();
        let transport = ScriptedTransport::default();
        ctl.send_with(&transport, "hello").await;
        let before = ctl.messages().len();

        let request = ctl.retry().unwrap();
        assert_eq!(request.text, "hello");
        assert_eq!(ctl.messages().len(), before);
    }

    #[tokio::test]
    async fn test_clear_resets_and_removes_slot() {
        let (mut ctl, store) = controller();
        let transport = ScriptedTransport::with(vec![Err(TransportError::Other("x".into()))]);
        ctl.send_with(&transport, "hello").await;
        assert!(store.slot().is_some());
        assert!(ctl.error().is_some());

        ctl.clear();

        assert_eq!(ctl.messages(), &[Message::greeting()]);
        assert_eq!(ctl.messages()[0].content, GREETING);
        assert!(ctl.error().is_none());
        assert!(store.slot().is_none());
    }

    #[test]
    fn test_settle_without_request_is_ignored() {
        let (mut ctl, _store) = controller();
        ctl.settle(Ok("stray".into()));
        assert_eq!(ctl.messages().len(), 1);
    }

    #[tokio::test]
    async fn test_round_trip_through_store() {
        let (mut ctl, store) = controller();
        let transport = ScriptedTransport::with(vec![Ok(
            "Sure.\n```json:recommendations\n[{\"title\":\"t\",\"rationale\":\"r\",\"actionItems\":[]}]\n```"
                .into(),
        )]);
        ctl.send_with(&transport, "advise me").await;

        let restored = ConversationController::restore(Box::new(store.clone()), SLOT);
        assert_eq!(restored.messages(), ctl.messages());
    }

    #[test]
    fn test_restore_falls_back_to_seed() {
        for saved in ["not json", "[]", "{\"role\":\"user\"}"] {
            let mut store = MemoryStore::new();
            store.set(SLOT, saved.to_string()).unwrap();
            let ctl = ConversationController::restore(Box::new(store), SLOT);
            assert_eq!(ctl.messages(), &[Message::greeting()], "saved: {}", saved);
        }
    }

    #[tokio::test]
    async fn test_scroll_requested_on_append() {
        let (mut ctl, _store) = controller();
        assert!(ctl.take_scroll_request());
        assert!(!ctl.take_scroll_request());

        ctl.send_with(&ScriptedTransport::default(), "hi").await;
        assert!(ctl.take_scroll_request());
    }
}
