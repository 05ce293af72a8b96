//! Chat request pipeline
//!
//! Owns one identity's conversation and drives every request through the
//! same steps: identity and configuration checks, request spacing, history
//! trimming, retry with backoff, then a background write to the store.

use std::sync::Arc;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::Instant;

use super::conversation::{Conversation, MAX_RECENT_MESSAGES};
use super::endpoint::{ChatEndpoint, ChatRequest};
use super::message::{Message, Role};
use super::rate::RateState;
use super::retry::RetryPolicy;
use crate::db::ConversationStore;
use crate::session::Identity;
use crate::{Error, Result};

/// Default system prompt for the assistant
pub const DEFAULT_SYSTEM_PROMPT: &str = "You are a helpful mental health assistant called MindMate \
that helps with anxiety and stress. Be empathetic and supportive.";

/// Generation parameters and prompt shared by every request
#[derive(Debug, Clone)]
pub struct ChatSettings {
    pub model: String,
    pub max_tokens: u32,
    pub temperature: f32,
    pub system_prompt: String,
    /// Non-system messages kept in history
    pub max_recent_messages: usize,
}

impl Default for ChatSettings {
    fn default() -> Self {
        Self {
            model: "claude-3-opus-20240229".to_string(),
            max_tokens: 350,
            temperature: 0.7,
            system_prompt: DEFAULT_SYSTEM_PROMPT.to_string(),
            max_recent_messages: MAX_RECENT_MESSAGES,
        }
    }
}

/// Per-identity chat pipeline
///
/// `&mut self` on every operation keeps at most one submission in flight.
pub struct ChatPipeline {
    settings: ChatSettings,
    endpoint: Arc<dyn ChatEndpoint>,
    store: Arc<dyn ConversationStore>,
    session: watch::Receiver<Option<Identity>>,
    /// Identity the in-memory conversation belongs to
    owner: Option<Identity>,
    conversation: Conversation,
    rate: RateState,
    retry: RetryPolicy,
    pending_write: Option<JoinHandle<()>>,
}

impl ChatPipeline {
    /// Create a pipeline listening on `session` for identity changes
    #[must_use]
    pub fn new(
        settings: ChatSettings,
        endpoint: Arc<dyn ChatEndpoint>,
        store: Arc<dyn ConversationStore>,
        session: watch::Receiver<Option<Identity>>,
    ) -> Self {
        let conversation = Conversation::new(&settings.system_prompt);
        Self {
            settings,
            endpoint,
            store,
            session,
            owner: None,
            conversation,
            rate: RateState::new(),
            retry: RetryPolicy::default(),
            pending_write: None,
        }
    }

    /// Override the retry policy
    #[must_use]
    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Override the starting request spacing
    #[must_use]
    pub fn with_rate_state(mut self, rate: RateState) -> Self {
        self.rate = rate;
        self
    }

    /// Current request spacing
    #[must_use]
    pub const fn min_interval(&self) -> std::time::Duration {
        self.rate.min_interval()
    }

    /// When the last outbound request was sent
    #[must_use]
    pub const fn last_request(&self) -> Option<Instant> {
        self.rate.last_request()
    }

    /// Visible history (system prompt filtered out)
    #[must_use]
    pub fn history(&self) -> Vec<Message> {
        self.conversation.visible()
    }

    /// Full in-memory conversation, system prompt included
    #[must_use]
    pub const fn conversation(&self) -> &Conversation {
        &self.conversation
    }

    /// Identity whose history is loaded
    #[must_use]
    pub const fn owner(&self) -> Option<&Identity> {
        self.owner.as_ref()
    }

    /// Visible history for the signed-in identity
    ///
    /// The store is read when the identity changes; an absent or unusable
    /// stored history is replaced with a fresh system-only conversation,
    /// which is written back. For an unchanged identity the in-memory
    /// history is returned as is, including a user message left by a
    /// failed `submit`.
    ///
    /// # Errors
    ///
    /// Returns `Error::Unauthenticated` if nobody is signed in
    pub async fn load_history(&mut self) -> Result<Vec<Message>> {
        self.sync_identity().await.ok_or(Error::Unauthenticated)?;

        Ok(self.history())
    }

    /// Send a user message and return the assistant's reply
    ///
    /// The user message stays in history even if the request ultimately
    /// fails, so it can be resent.
    ///
    /// # Errors
    ///
    /// - `Error::Unauthenticated` if nobody is signed in
    /// - `Error::Misconfigured` if the endpoint lacks a credential or address
    /// - `Error::InvalidInput` for blank messages
    /// - `Error::RateLimited` if every attempt was answered with 429
    /// - the last endpoint error otherwise
    pub async fn submit(&mut self, text: &str) -> Result<String> {
        let identity = self.sync_identity().await.ok_or(Error::Unauthenticated)?;
        self.endpoint.ensure_configured()?;

        let text = text.trim();
        if text.is_empty() {
            return Err(Error::InvalidInput("message is empty".to_string()));
        }

        self.conversation.push(Role::User, text);

        self.rate.wait_turn().await;

        let evicted = self.conversation.trim(self.settings.max_recent_messages);
        if evicted > 0 {
            tracing::debug!(uid = %identity.uid, evicted, "trimmed conversation history");
        }

        let request = self.build_request();
        let reply = self.send_with_retry(&request).await?;

        self.conversation.push(Role::Assistant, reply.clone());
        let interval = self.rate.on_success();
        tracing::debug!(
            uid = %identity.uid,
            min_interval_ms = interval.as_millis(),
            "chat reply received"
        );

        self.persist_in_background(&identity);
        Ok(reply)
    }

    /// Reset history to just the system prompt and persist it
    ///
    /// # Errors
    ///
    /// Returns `Error::Unauthenticated` if nobody is signed in; the store is
    /// left untouched in that case
    pub async fn clear(&mut self) -> Result<()> {
        let identity = self.sync_identity().await.ok_or(Error::Unauthenticated)?;

        self.conversation = Conversation::new(&self.settings.system_prompt);
        self.persist_now(&identity).await;

        tracing::info!(uid = %identity.uid, "conversation cleared");
        Ok(())
    }

    /// Wait for the last background write to finish
    pub async fn flush(&mut self) {
        if let Some(handle) = self.pending_write.take() {
            if let Err(e) = handle.await {
                tracing::warn!(error = %e, "conversation write task failed");
            }
        }
    }

    /// Apply any identity change published since the last operation
    ///
    /// A new identity gets its history loaded; sign-out resets to a fresh
    /// system-only conversation. Returns the current identity.
    async fn sync_identity(&mut self) -> Option<Identity> {
        let current = self.session.borrow_and_update().clone();
        if current == self.owner {
            return current;
        }

        self.owner.clone_from(&current);
        match &current {
            Some(identity) => {
                tracing::info!(uid = %identity.uid, anonymous = identity.anonymous, "loading conversation for identity");
                self.restore(identity).await;
                current
            }
            None => {
                tracing::info!("identity cleared, resetting conversation");
                self.flush().await;
                self.conversation = Conversation::new(&self.settings.system_prompt);
                None
            }
        }
    }

    async fn restore(&mut self, identity: &Identity) {
        // Earlier writes must land before we read them back
        self.flush().await;

        match self.store.read(&identity.uid).await {
            Ok(Some(messages)) => {
                if let Some(conversation) = Conversation::restore(messages) {
                    tracing::debug!(uid = %identity.uid, messages = conversation.len(), "conversation restored");
                    self.conversation = conversation;
                    return;
                }
                tracing::warn!(uid = %identity.uid, "stored conversation is invalid, starting fresh");
            }
            Ok(None) => {
                tracing::debug!(uid = %identity.uid, "no stored conversation, starting fresh");
            }
            Err(e) => {
                // Keep the stored copy intact; it may be readable next time
                tracing::warn!(uid = %identity.uid, error = %e, "failed to read conversation");
                self.conversation = Conversation::new(&self.settings.system_prompt);
                return;
            }
        }

        self.conversation = Conversation::new(&self.settings.system_prompt);
        self.persist_now(identity).await;
    }

    fn build_request(&self) -> ChatRequest {
        let (system, messages) = self.conversation.split_system();
        ChatRequest {
            model: self.settings.model.clone(),
            messages: messages.to_vec(),
            system: system.map(ToString::to_string),
            max_tokens: self.settings.max_tokens,
            temperature: self.settings.temperature,
        }
    }

    async fn send_with_retry(&mut self, request: &ChatRequest) -> Result<String> {
        let mut attempt = 1;
        loop {
            self.rate.record_request(Instant::now());

            let error = match self.endpoint.complete(request).await {
                Ok(reply) => return Ok(reply),
                Err(e) => e,
            };

            if error.is_too_many_requests() {
                let interval = self.rate.on_rate_limited();
                tracing::warn!(
                    attempt,
                    min_interval_ms = interval.as_millis(),
                    "chat endpoint rate limited"
                );
            }

            if !self.retry.should_retry(attempt, &error) {
                tracing::warn!(attempt, error = %error, "chat request failed");
                return Err(if error.is_too_many_requests() {
                    Error::RateLimited
                } else {
                    error
                });
            }

            let delay = self.retry.delay_for(&error);
            tracing::warn!(
                attempt,
                delay_ms = delay.as_millis(),
                error = %error,
                "chat request failed, retrying"
            );
            tokio::time::sleep(delay).await;
            attempt += 1;
        }
    }

    /// Queue a store write without delaying the caller
    ///
    /// Writes are chained so they land in submission order.
    fn persist_in_background(&mut self, identity: &Identity) {
        let store = Arc::clone(&self.store);
        let uid = identity.uid.clone();
        let messages = self.conversation.messages().to_vec();
        let previous = self.pending_write.take();

        self.pending_write = Some(tokio::spawn(async move {
            if let Some(previous) = previous {
                let _ = previous.await;
            }
            if let Err(e) = store.write(&uid, &messages).await {
                tracing::warn!(uid = %uid, error = %e, "failed to persist conversation");
            }
        }));
    }

    async fn persist_now(&mut self, identity: &Identity) {
        self.flush().await;
        if let Err(e) = self
            .store
            .write(&identity.uid, self.conversation.messages())
            .await
        {
            tracing::warn!(uid = %identity.uid, error = %e, "failed to persist conversation");
        }
    }
}

impl std::fmt::Debug for ChatPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChatPipeline")
            .field("owner", &self.owner)
            .field("messages", &self.conversation.len())
            .field("rate", &self.rate)
            .finish_non_exhaustive()
    }
}
