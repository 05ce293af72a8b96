//! MindMate - mental health companion chat service
//!
//! This library provides the core functionality for MindMate:
//! - A chat pipeline with adaptive rate limiting and retry
//! - Per-identity conversation persistence in `SQLite`
//! - A daily mood log
//! - Emergency resources by country
//! - An HTTP API exposing all of the above
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────┐
//! │              HTTP API  │  CLI chat                   │
//! └────────────────────┬────────────────────────────────┘
//!                      │
//! ┌────────────────────▼────────────────────────────────┐
//! │   SessionRegistry  →  ChatPipeline (per identity)    │
//! │   RateState  │  RetryPolicy  │  Conversation         │
//! └──────────┬──────────────────────────┬───────────────┘
//!            │                          │
//! ┌──────────▼──────────┐    ┌──────────▼───────────────┐
//! │   ChatEndpoint      │    │  ConversationStore       │
//! │   (proxy / LLM)     │    │  MoodRepo (SQLite)       │
//! └─────────────────────┘    └──────────────────────────┘
//! ```

pub mod api;
pub mod chat;
pub mod config;
pub mod db;
pub mod error;
pub mod resources;
pub mod session;

pub use chat::{ChatEndpoint, ChatPipeline, ChatSettings, HttpChatEndpoint, Message, Role, SessionRegistry};
pub use config::Config;
pub use db::{ConversationStore, DbConn, DbPool, Mood, MoodRepo, SqliteConversationStore};
pub use error::{Error, Result};
pub use resources::{EmergencyResource, emergency_resources};
pub use session::{Identity, SessionProvider};
