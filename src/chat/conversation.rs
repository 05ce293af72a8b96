//! In-memory conversation history with bounded trimming
//!
//! A conversation holds at most one system message, always at index 0.
//! Trimming evicts the oldest non-system messages and never rewrites
//! the ones it keeps.

use super::message::{Message, Role};

/// Number of non-system messages kept when trimming
pub const MAX_RECENT_MESSAGES: usize = 10;

/// Ordered message history for one identity
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Conversation {
    messages: Vec<Message>,
}

impl Conversation {
    /// Start a conversation containing only the system prompt
    #[must_use]
    pub fn new(system_prompt: &str) -> Self {
        Self {
            messages: vec![Message::system(system_prompt)],
        }
    }

    /// Rebuild a conversation from persisted messages
    ///
    /// Returns `None` when the stored history is unusable: empty, not led by
    /// a system message, or with a second system message later on.
    #[must_use]
    pub fn restore(messages: Vec<Message>) -> Option<Self> {
        let (first, rest) = messages.split_first()?;
        if !first.is_system() || rest.iter().any(Message::is_system) {
            return None;
        }

        Some(Self { messages })
    }

    /// Append a message to the end of the history
    pub fn push(&mut self, role: Role, content: impl Into<String>) {
        debug_assert!(role != Role::System, "system message is fixed at creation");
        self.messages.push(Message::new(role, content));
    }

    /// Keep the system message plus the `max_recent` newest messages
    ///
    /// Returns the number of evicted messages. Trimming an already-trimmed
    /// history is a no-op.
    pub fn trim(&mut self, max_recent: usize) -> usize {
        let offset = usize::from(self.has_system());
        let recent = self.messages.len() - offset;
        if recent <= max_recent {
            return 0;
        }

        let evict = recent - max_recent;
        self.messages.drain(offset..offset + evict);
        evict
    }

    /// The system prompt, if present
    #[must_use]
    pub fn system(&self) -> Option<&str> {
        self.messages
            .first()
            .filter(|m| m.is_system())
            .map(|m| m.content.as_str())
    }

    /// Split into the system prompt and the remaining exchange
    #[must_use]
    pub fn split_system(&self) -> (Option<&str>, &[Message]) {
        let offset = usize::from(self.has_system());
        (self.system(), &self.messages[offset..])
    }

    /// Messages with the system prompt filtered out
    #[must_use]
    pub fn visible(&self) -> Vec<Message> {
        self.split_system().1.to_vec()
    }

    /// Every message, system prompt included
    #[must_use]
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.messages.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// The most recent message
    #[must_use]
    pub fn last(&self) -> Option<&Message> {
        self.messages.last()
    }

    fn has_system(&self) -> bool {
        self.messages.first().is_some_and(Message::is_system)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PROMPT: &str = "You are MindMate.";

    fn long_conversation(exchanges: usize) -> Conversation {
        let mut conv = Conversation::new(PROMPT);
        for i in 0..exchanges {
            conv.push(Role::User, format!("question {i}"));
            conv.push(Role::Assistant, format!("answer {i}"));
        }
        conv
    }

    #[test]
    fn new_holds_only_system() {
        let conv = Conversation::new(PROMPT);
        assert_eq!(conv.len(), 1);
        assert_eq!(conv.system(), Some(PROMPT));
        assert!(conv.visible().is_empty());
    }

    #[test]
    fn trim_keeps_system_and_newest() {
        let mut conv = long_conversation(8);
        assert_eq!(conv.len(), 17);

        let evicted = conv.trim(MAX_RECENT_MESSAGES);
        assert_eq!(evicted, 6);
        assert_eq!(conv.len(), 11);
        assert_eq!(conv.system(), Some(PROMPT));

        let visible = conv.visible();
        assert_eq!(visible.first().unwrap().content, "question 3");
        assert_eq!(visible.last().unwrap().content, "answer 7");
    }

    #[test]
    fn trim_is_idempotent() {
        let mut once = long_conversation(12);
        once.trim(MAX_RECENT_MESSAGES);

        let mut twice = once.clone();
        assert_eq!(twice.trim(MAX_RECENT_MESSAGES), 0);
        assert_eq!(once, twice);
    }

    #[test]
    fn trim_under_limit_is_noop() {
        let mut conv = long_conversation(5);
        let before = conv.clone();
        assert_eq!(conv.trim(MAX_RECENT_MESSAGES), 0);
        assert_eq!(conv, before);
    }

    #[test]
    fn trim_without_system_counts_every_message() {
        let mut conv = Conversation {
            messages: (0..4).map(|i| Message::user(format!("m{i}"))).collect(),
        };

        conv.trim(2);
        assert_eq!(conv.len(), 2);
        assert_eq!(conv.messages()[0].content, "m2");
    }

    #[test]
    fn split_system_separates_prompt() {
        let conv = long_conversation(1);
        let (system, rest) = conv.split_system();
        assert_eq!(system, Some(PROMPT));
        assert_eq!(rest.len(), 2);
        assert!(rest.iter().all(|m| !m.is_system()));
    }

    #[test]
    fn restore_rejects_empty_and_misplaced_system() {
        assert!(Conversation::restore(Vec::new()).is_none());

        let misplaced = vec![Message::user("hi"), Message::system("late")];
        assert!(Conversation::restore(misplaced).is_none());

        let duplicated = vec![Message::system("a"), Message::system("b")];
        assert!(Conversation::restore(duplicated).is_none());
    }

    #[test]
    fn restore_rejects_missing_system() {
        assert!(Conversation::restore(vec![Message::user("hi")]).is_none());
        assert!(Conversation::restore(vec![Message::assistant("hello"), Message::user("hi")]).is_none());
    }

    #[test]
    fn restore_keeps_stored_system() {
        let stored = vec![Message::system("older prompt"), Message::user("hi")];
        let conv = Conversation::restore(stored).unwrap();
        assert_eq!(conv.system(), Some("older prompt"));
    }
}
