//! Shared test utilities

#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use mindmate::chat::ChatRequest;
use mindmate::{
    ChatEndpoint, ChatPipeline, ChatSettings, ConversationStore, DbPool, Error, Identity, Message,
    Result, SessionProvider, db,
};
use tokio::time::Instant;

/// Set up an in-memory test database
#[must_use]
pub fn setup_test_db() -> DbPool {
    db::init_memory().expect("failed to init test db")
}

/// One scripted endpoint reply
#[derive(Debug, Clone)]
pub enum Reply {
    Text(&'static str),
    Status(u16),
}

/// Endpoint that plays back scripted replies and records every call
#[derive(Default)]
pub struct MockEndpoint {
    replies: Mutex<VecDeque<Reply>>,
    calls: Mutex<Vec<(Instant, ChatRequest)>>,
    unconfigured: bool,
}

impl MockEndpoint {
    pub fn new(replies: impl IntoIterator<Item = Reply>) -> Arc<Self> {
        Arc::new(Self {
            replies: Mutex::new(replies.into_iter().collect()),
            ..Self::default()
        })
    }

    /// An endpoint with no credential
    pub fn unconfigured() -> Arc<Self> {
        Arc::new(Self {
            unconfigured: true,
            ..Self::default()
        })
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    pub fn call_times(&self) -> Vec<Instant> {
        self.calls.lock().unwrap().iter().map(|(at, _)| *at).collect()
    }

    pub fn requests(&self) -> Vec<ChatRequest> {
        self.calls.lock().unwrap().iter().map(|(_, r)| r.clone()).collect()
    }
}

#[async_trait]
impl ChatEndpoint for MockEndpoint {
    fn ensure_configured(&self) -> Result<()> {
        if self.unconfigured {
            return Err(Error::Misconfigured("API key not configured".to_string()));
        }
        Ok(())
    }

    async fn complete(&self, request: &ChatRequest) -> Result<String> {
        self.calls
            .lock()
            .unwrap()
            .push((Instant::now(), request.clone()));

        let reply = self.replies.lock().unwrap().pop_front();
        match reply {
            Some(Reply::Text(text)) => Ok(text.to_string()),
            Some(Reply::Status(status)) => Err(Error::Endpoint {
                status: Some(status),
                message: format!("scripted {status}"),
            }),
            None => Ok("ok".to_string()),
        }
    }
}

/// In-memory store with switchable failures
#[derive(Default)]
pub struct MemoryStore {
    docs: Mutex<HashMap<String, Vec<Message>>>,
    writes: Mutex<usize>,
    pub fail_reads: bool,
    pub fail_writes: bool,
    pub write_delay: Option<Duration>,
}

impl MemoryStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn failing_writes() -> Arc<Self> {
        Arc::new(Self {
            fail_writes: true,
            ..Self::default()
        })
    }

    pub fn failing_reads() -> Arc<Self> {
        Arc::new(Self {
            fail_reads: true,
            ..Self::default()
        })
    }

    /// Every write takes `delay` before it lands
    pub fn slow_writes(delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            write_delay: Some(delay),
            ..Self::default()
        })
    }

    pub fn seed(&self, user_id: &str, messages: Vec<Message>) {
        self.docs
            .lock()
            .unwrap()
            .insert(user_id.to_string(), messages);
    }

    pub fn get(&self, user_id: &str) -> Option<Vec<Message>> {
        self.docs.lock().unwrap().get(user_id).cloned()
    }

    pub fn write_count(&self) -> usize {
        *self.writes.lock().unwrap()
    }
}

#[async_trait]
impl ConversationStore for MemoryStore {
    async fn read(&self, user_id: &str) -> Result<Option<Vec<Message>>> {
        if self.fail_reads {
            return Err(Error::Persistence("store unavailable".to_string()));
        }
        Ok(self.get(user_id))
    }

    async fn write(&self, user_id: &str, messages: &[Message]) -> Result<()> {
        *self.writes.lock().unwrap() += 1;
        if let Some(delay) = self.write_delay {
            tokio::time::sleep(delay).await;
        }
        if self.fail_writes {
            return Err(Error::Persistence("store unavailable".to_string()));
        }
        self.seed(user_id, messages.to_vec());
        Ok(())
    }
}

/// Build a pipeline wired to the given fakes
pub fn pipeline(
    endpoint: Arc<MockEndpoint>,
    store: Arc<MemoryStore>,
    provider: &SessionProvider,
) -> ChatPipeline {
    ChatPipeline::new(
        ChatSettings::default(),
        endpoint,
        store,
        provider.subscribe(),
    )
}

pub fn alice() -> Identity {
    Identity::user("alice")
}
