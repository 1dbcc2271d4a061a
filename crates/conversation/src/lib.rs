//! Conversation state for the chat client: the controller, its durable
//! storage, and the background request runner.

pub mod controller;
pub mod runner;
pub mod storage;

pub use controller::{ConversationController, PendingRequest, NOTHING_TO_RETRY};
pub use runner::{RequestHandle, RequestRunner};
pub use storage::{FileStore, KeyValueStore, MemoryStore, StorageError};
