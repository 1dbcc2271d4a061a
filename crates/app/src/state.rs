//! Application state: the conversation controller plus the bits of UI state
//! that sit around it (the in-flight request, dialogs, HTML views).

use crate::html_view::HtmlView;
use crate::modals::ConfirmDialog;
use conversation::{
    ConversationController, FileStore, KeyValueStore, MemoryStore, PendingRequest,
    RequestHandle, RequestRunner,
};
use providers::{ChatTransport, GeminiTransport, TransportError};
use shared::chat::Message;
use shared::settings::AppSettings;
use std::collections::HashMap;
use std::sync::Arc;

pub struct AppState {
    pub settings: AppSettings,
    pub controller: ConversationController,
    pub clear_dialog: ConfirmDialog,
    runner: Option<RequestRunner>,
    in_flight: Option<RequestHandle>,
    stopping: bool,
    html_views: HashMap<usize, HtmlView>,
}

impl AppState {
    /// Wire up the real store and the Gemini transport.
    pub fn new(settings: AppSettings) -> Self {
        let store: Box<dyn KeyValueStore> = match FileStore::open_default() {
            Ok(store) => {
                tracing::info!("conversation store at {}", store.path().display());
                Box::new(store)
            }
            Err(e) => {
                tracing::warn!("Falling back to in-memory conversation store: {}", e);
                Box::new(MemoryStore::new())
            }
        };
        let transport = Arc::new(GeminiTransport::new(settings.clone()));
        tracing::info!(model = transport.model(), "using Gemini transport");
        Self::with_parts(settings, store, transport)
    }

    pub fn with_parts(
        settings: AppSettings,
        store: Box<dyn KeyValueStore>,
        transport: Arc<dyn ChatTransport>,
    ) -> Self {
        let controller = ConversationController::restore(store, settings.storage_slot.clone());
        let runner = match RequestRunner::new(transport, settings.request_timeout()) {
            Ok(runner) => Some(runner),
            Err(e) => {
                tracing::error!("Failed to start async runtime: {}", e);
                None
            }
        };
        Self {
            settings,
            controller,
            clear_dialog: ConfirmDialog::new(
                "clear_chat",
                "Clear Conversation",
                "Are you sure you want to delete the entire chat history? This action cannot be undone.",
            )
            .with_confirm_label("Clear"),
            runner,
            in_flight: None,
            stopping: false,
            html_views: HashMap::new(),
        }
    }

    pub fn is_thinking(&self) -> bool {
        self.controller.is_awaiting_reply()
    }

    pub fn is_stopping(&self) -> bool {
        self.stopping
    }

    /// Send whatever is in the input box.
    pub fn send_message(&mut self) {
        if let Some(request) = self.controller.submit_input() {
            self.dispatch(request);
        }
    }

    pub fn retry(&mut self) {
        if let Some(request) = self.controller.retry() {
            self.dispatch(request);
        }
    }

    fn dispatch(&mut self, request: PendingRequest) {
        match &self.runner {
            Some(runner) => self.in_flight = Some(runner.dispatch(request)),
            None => self.controller.settle(Err(TransportError::NotInitialized(
                "no async runtime available".to_string(),
            ))),
        }
    }

    /// Stop the outstanding request. It settles on the next poll.
    pub fn cancel_ai(&mut self) {
        if let Some(handle) = &self.in_flight {
            handle.cancel();
            self.stopping = true;
        }
    }

    /// Non-blocking check for the reply; call once per frame.
    pub fn poll_ai_response(&mut self) {
        let Some(handle) = &self.in_flight else {
            return;
        };
        if let Some(result) = handle.poll() {
            self.in_flight = None;
            self.stopping = false;
            self.controller.settle(result);
        }
    }

    /// Flip the theme and remember it for next launch.
    pub fn toggle_dark_mode(&mut self) {
        self.settings.dark_mode = !self.settings.dark_mode;
        if let Err(e) = shared::settings::save_settings(&self.settings) {
            tracing::warn!("Failed to save settings: {}", e);
        }
    }

    pub fn confirm_clear(&mut self) {
        self.controller.clear();
        self.html_views.clear();
    }

    /// Messages alongside the HTML views cached for them, keyed by index.
    pub fn messages_and_views(&mut self) -> (&[Message], &mut HashMap<usize, HtmlView>) {
        (self.controller.messages(), &mut self.html_views)
    }
}

/// Cached sandboxed view for the HTML message at `index`.
pub fn html_view_for<'a>(
    views: &'a mut HashMap<usize, HtmlView>,
    index: usize,
    source: &str,
) -> &'a mut HtmlView {
    let view = views.entry(index).or_insert_with(|| HtmlView::new(source));
    if !view.matches(source) {
        *view = HtmlView::new(source);
    }
    view
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::time::{Duration, Instant};

    struct Canned(Result<String, TransportError>);

    #[async_trait]
    impl ChatTransport for Canned {
        async fn send_message(&self, _text: &str) -> Result<String, TransportError> {
            self.0.clone()
        }
    }

    struct Stalled;

    #[async_trait]
    impl ChatTransport for Stalled {
        async fn send_message(&self, _text: &str) -> Result<String, TransportError> {
            tokio::time::sleep(Duration::from_secs(3600)).await;
            Ok(String::new())
        }
    }

    fn state(transport: impl ChatTransport + 'static) -> AppState {
        AppState::with_parts(
            AppSettings::default(),
            Box::new(MemoryStore::new()),
            Arc::new(transport),
        )
    }

    fn poll_until_settled(s: &mut AppState) {
        let deadline = Instant::now() + Duration::from_secs(5);
        while s.is_thinking() && Instant::now() < deadline {
            s.poll_ai_response();
            std::thread::sleep(Duration::from_millis(10));
        }
        assert!(!s.is_thinking(), "request never settled");
    }

    #[test]
    fn test_send_and_poll_reply() {
        let mut s = state(Canned(Ok("<!DOCTYPE html><html><body>Hi</body></html>".into())));
        s.controller.input_mut().push_str("make a page");
        s.send_message();
        assert!(s.is_thinking());

        poll_until_settled(&mut s);

        let (messages, views) = s.messages_and_views();
        assert_eq!(messages.len(), 3);
        let source = messages[2].content.clone();
        let view = html_view_for(views, 2, &source);
        assert!(view.matches(&source));
    }

    #[test]
    fn test_cancel_appends_error_and_allows_retry() {
        let mut s = state(Stalled);
        s.controller.input_mut().push_str("hello");
        s.send_message();
        s.cancel_ai();
        assert!(s.is_stopping());

        poll_until_settled(&mut s);

        assert!(!s.is_stopping());
        assert_eq!(s.controller.error(), Some("The request was cancelled."));
        assert!(s.controller.messages().last().unwrap().is_error());

        s.retry();
        assert!(s.is_thinking());
        assert_eq!(s.controller.messages().len(), 2);
    }

    #[test]
    fn test_confirm_clear_resets() {
        let mut s = state(Canned(Err(TransportError::Network("offline".into()))));
        s.controller.input_mut().push_str("hello");
        s.send_message();
        poll_until_settled(&mut s);
        assert_eq!(s.controller.messages().len(), 3);

        s.confirm_clear();
        assert_eq!(s.controller.messages(), &[Message::greeting()]);
        assert!(s.controller.error().is_none());
    }
}
