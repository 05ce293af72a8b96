//! Chat request pipeline
//!
//! Conversation state, request spacing, retry policy and the endpoint client
//! that together turn a user message into an assistant reply.

pub mod conversation;
pub mod endpoint;
pub mod message;
pub mod pipeline;
pub mod rate;
pub mod registry;
pub mod retry;

pub use conversation::{Conversation, MAX_RECENT_MESSAGES};
pub use endpoint::{ChatEndpoint, ChatRequest, HttpChatEndpoint};
pub use message::{Message, Role};
pub use pipeline::{ChatPipeline, ChatSettings, DEFAULT_SYSTEM_PROMPT};
pub use rate::RateState;
pub use registry::{SessionRegistry, SharedPipeline};
pub use retry::RetryPolicy;
