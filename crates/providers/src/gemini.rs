use crate::transport::{ChatTransport, TransportError};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use shared::chat::Role;
use shared::settings::AppSettings;
use std::time::Duration;
use tokio::sync::Mutex;

/// Instruction sent once when a chat session is opened.
pub const SYSTEM_INSTRUCTION: &str = "You are a helpful and friendly assistant. If asked to create a visual element or a simple webpage, you can respond with a single, self-contained HTML file content starting with <!DOCTYPE html>. When providing recommendations, format them as a JSON code block with the language specifier 'json:recommendations'. The JSON should be an array of objects, each with 'title', 'rationale', and 'actionItems' (an array of strings). Place this block at the end of your response.";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
struct GeminiContent {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    parts: Vec<GeminiPart>,
}

impl GeminiContent {
    fn text(role: Option<Role>, text: &str) -> Self {
        Self {
            role: role.map(|r| r.as_str().to_string()),
            parts: vec![GeminiPart {
                text: text.to_string(),
            }],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
struct GeminiPart {
    text: String,
}

#[derive(Debug, Serialize)]
struct GeminiRequest<'a> {
    contents: &'a [GeminiContent],
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<GeminiContent>,
}

#[derive(Debug, Deserialize)]
struct GeminiCandidatePart {
    #[serde(default)]
    text: String,
}

#[derive(Debug, Deserialize)]
struct GeminiCandidateContent {
    #[serde(default)]
    parts: Vec<GeminiCandidatePart>,
}

#[derive(Debug, Deserialize)]
struct GeminiCandidate {
    content: Option<GeminiCandidateContent>,
}

#[derive(Debug, Deserialize)]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
}

impl GeminiResponse {
    /// Concatenated text of the first candidate.
    fn text(&self) -> String {
        self.candidates
            .first()
            .and_then(|c| c.content.as_ref())
            .map(|c| c.parts.iter().map(|p| p.text.as_str()).collect::<String>())
            .unwrap_or_default()
    }
}

/// Stateless `generateContent` client.
pub struct GeminiClient {
    http: Client,
    auth_token: String,
    model: String,
    base_url: String,
}

impl GeminiClient {
    pub fn new(model: &str, auth_token: String) -> Result<Self, TransportError> {
        let http = Client::builder()
            .connect_timeout(Duration::from_secs(15))
            .build()
            .map_err(|e| TransportError::NotInitialized(e.to_string()))?;
        Ok(Self {
            http,
            auth_token,
            model: model.to_string(),
            base_url: "https://generativelanguage.googleapis.com/v1beta".to_string(),
        })
    }

    pub fn from_settings(settings: &AppSettings) -> Result<Self, TransportError> {
        let key = settings.gemini_auth.resolve_api_key().ok_or_else(|| {
            TransportError::NotInitialized("No Gemini API key configured".to_string())
        })?;
        Self::new(&settings.gemini_model, key)
    }

    async fn generate(
        &self,
        system_instruction: &str,
        contents: &[GeminiContent],
    ) -> Result<String, TransportError> {
        let url = format!("{}/models/{}:generateContent", self.base_url, self.model);
        let req = GeminiRequest {
            contents,
            system_instruction: Some(GeminiContent::text(None, system_instruction)),
        };
        tracing::debug!(model = %self.model, turns = contents.len(), "gemini request");
        let resp = self
            .http
            .post(url)
            .header("x-goog-api-key", &self.auth_token)
            .json(&req)
            .send()
            .await?;
        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            let body = body.trim();
            if body.is_empty() {
                return Err(TransportError::Api(format!("gemini error: {}", status)));
            }
            let body = if body.len() > 800 {
                let mut end = 800;
                while !body.is_char_boundary(end) {
                    end -= 1;
                }
                format!("{}...", &body[..end])
            } else {
                body.to_string()
            };
            return Err(TransportError::Api(format!(
                "gemini error: {}\n{}",
                status, body
            )));
        }
        let body: GeminiResponse = resp.json().await?;
        Ok(body.text())
    }
}

/// A multi-turn chat: the system instruction plus the running history.
pub struct ChatSession {
    client: GeminiClient,
    system_instruction: String,
    history: Vec<GeminiContent>,
}

impl ChatSession {
    pub fn new(client: GeminiClient, system_instruction: impl Into<String>) -> Self {
        Self {
            client,
            system_instruction: system_instruction.into(),
            history: Vec::new(),
        }
    }

    /// Send a user turn. History only grows when the model answers.
    pub async fn send_message(&mut self, text: &str) -> Result<String, TransportError> {
        let mut contents = self.history.clone();
        contents.push(GeminiContent::text(Some(Role::User), text));
        let reply = self
            .client
            .generate(&self.system_instruction, &contents)
            .await?;
        self.history = contents;
        self.history.push(GeminiContent::text(Some(Role::Model), &reply));
        Ok(reply)
    }
}

/// Gemini-backed transport. The session is opened on first use and reused
/// for the lifetime of the transport.
pub struct GeminiTransport {
    settings: AppSettings,
    session: Mutex<Option<ChatSession>>,
}

impl GeminiTransport {
    pub fn new(settings: AppSettings) -> Self {
        Self {
            settings,
            session: Mutex::new(None),
        }
    }

    pub fn model(&self) -> &str {
        &self.settings.gemini_model
    }
}

#[async_trait]
impl ChatTransport for GeminiTransport {
    async fn send_message(&self, text: &str) -> Result<String, TransportError> {
        let mut guard = self.session.lock().await;
        if guard.is_none() {
            let client = GeminiClient::from_settings(&self.settings)?;
            tracing::info!(model = %self.settings.gemini_model, "opening chat session");
            *guard = Some(ChatSession::new(client, SYSTEM_INSTRUCTION));
        }
        let Some(session) = guard.as_mut() else {
            return Err(TransportError::NotInitialized(
                "Chat could not be initialized.".to_string(),
            ));
        };
        session.send_message(text).await.map_err(|e| {
            if e.is_network() {
                tracing::warn!("Gemini API unreachable: {}", e.detail());
            } else {
                tracing::error!("Error sending message to Gemini API: {}", e.detail());
            }
            e
        })
    }
}
