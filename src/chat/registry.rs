//! One chat pipeline per identity for the HTTP server

use std::num::NonZeroUsize;
use std::sync::Arc;

use lru::LruCache;
use tokio::sync::Mutex;

use super::endpoint::ChatEndpoint;
use super::pipeline::{ChatPipeline, ChatSettings};
use crate::db::ConversationStore;
use crate::session::{Identity, SessionProvider};

/// Shared handle to one identity's pipeline
pub type SharedPipeline = Arc<Mutex<ChatPipeline>>;

/// Cached pipelines kept by default
pub const DEFAULT_MAX_SESSIONS: usize = 1024;

/// Lazily creates and caches a pipeline per identity
///
/// Requests for the same identity serialize on that pipeline's mutex;
/// different identities proceed independently. At most `capacity`
/// pipelines stay cached; the least recently used one is flushed and
/// dropped to make room. Its history reloads from the store on next use.
pub struct SessionRegistry {
    settings: ChatSettings,
    endpoint: Arc<dyn ChatEndpoint>,
    store: Arc<dyn ConversationStore>,
    sessions: Mutex<LruCache<String, SharedPipeline>>,
}

impl SessionRegistry {
    #[must_use]
    pub fn new(
        settings: ChatSettings,
        endpoint: Arc<dyn ChatEndpoint>,
        store: Arc<dyn ConversationStore>,
    ) -> Self {
        Self {
            settings,
            endpoint,
            store,
            sessions: Mutex::new(LruCache::new(capacity(DEFAULT_MAX_SESSIONS))),
        }
    }

    /// Cap the number of cached pipelines (a zero cap is raised to one)
    #[must_use]
    pub fn with_capacity(mut self, max_sessions: usize) -> Self {
        self.sessions = Mutex::new(LruCache::new(capacity(max_sessions)));
        self
    }

    /// Pipeline for `identity`, created on first use
    pub async fn pipeline_for(&self, identity: &Identity) -> SharedPipeline {
        let (shared, evicted) = {
            let mut sessions = self.sessions.lock().await;
            if let Some(existing) = sessions.get(&identity.uid) {
                return Arc::clone(existing);
            }

            // The provider is only needed to seed the receiver; the receiver keeps
            // the identity after the sender is dropped
            let provider = SessionProvider::signed_in(identity.clone());
            let pipeline = ChatPipeline::new(
                self.settings.clone(),
                Arc::clone(&self.endpoint),
                Arc::clone(&self.store),
                provider.subscribe(),
            );

            let shared = Arc::new(Mutex::new(pipeline));
            let evicted = sessions.push(identity.uid.clone(), Arc::clone(&shared));
            tracing::debug!(uid = %identity.uid, active = sessions.len(), "created chat pipeline");
            (shared, evicted)
        };

        if let Some((uid, old)) = evicted {
            tracing::debug!(uid = %uid, "evicting idle chat pipeline");
            old.lock().await.flush().await;
        }

        shared
    }

    /// Wait for every cached pipeline's pending write
    pub async fn flush_all(&self) {
        let pipelines: Vec<SharedPipeline> = {
            let sessions = self.sessions.lock().await;
            sessions.iter().map(|(_, p)| Arc::clone(p)).collect()
        };

        for pipeline in &pipelines {
            pipeline.lock().await.flush().await;
        }
        tracing::info!(pipelines = pipelines.len(), "flushed chat pipelines");
    }

    /// Number of cached pipelines
    pub async fn len(&self) -> usize {
        self.sessions.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.sessions.lock().await.is_empty()
    }

    /// Whether the endpoint can serve requests
    #[must_use]
    pub fn endpoint_configured(&self) -> bool {
        self.endpoint.ensure_configured().is_ok()
    }
}

fn capacity(max_sessions: usize) -> NonZeroUsize {
    NonZeroUsize::new(max_sessions).unwrap_or(NonZeroUsize::MIN)
}
