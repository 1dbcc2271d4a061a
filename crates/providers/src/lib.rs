//! Model providers for the chat client.

pub mod gemini;
pub mod transport;

pub use gemini::{ChatSession, GeminiClient, GeminiTransport, SYSTEM_INSTRUCTION};
pub use transport::{ChatTransport, TransportError, NETWORK_ERROR_MESSAGE};
