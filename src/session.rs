//! Signed-in identity and the channel that publishes it

use tokio::sync::watch;

/// The principal a conversation and mood log belong to
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Identity {
    /// Stable user id from the auth provider
    pub uid: String,
    /// Guest (anonymous) sign-in
    pub anonymous: bool,
}

impl Identity {
    #[must_use]
    pub fn user(uid: impl Into<String>) -> Self {
        Self {
            uid: uid.into(),
            anonymous: false,
        }
    }

    #[must_use]
    pub fn guest(uid: impl Into<String>) -> Self {
        Self {
            uid: uid.into(),
            anonymous: true,
        }
    }
}

/// Publishes the current identity to interested pipelines
///
/// Wraps a `watch` channel: subscribers always observe the latest value and
/// never run callbacks on the publisher's stack.
#[derive(Debug)]
pub struct SessionProvider {
    tx: watch::Sender<Option<Identity>>,
}

impl Default for SessionProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionProvider {
    /// Start with nobody signed in
    #[must_use]
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(None);
        Self { tx }
    }

    /// Start with `identity` already signed in
    #[must_use]
    pub fn signed_in(identity: Identity) -> Self {
        let (tx, _rx) = watch::channel(Some(identity));
        Self { tx }
    }

    pub fn sign_in(&self, identity: Identity) {
        tracing::info!(uid = %identity.uid, anonymous = identity.anonymous, "identity signed in");
        self.tx.send_replace(Some(identity));
    }

    pub fn sign_out(&self) {
        if let Some(previous) = self.tx.send_replace(None) {
            tracing::info!(uid = %previous.uid, "identity signed out");
        }
    }

    /// Snapshot of the current identity
    #[must_use]
    pub fn current(&self) -> Option<Identity> {
        self.tx.borrow().clone()
    }

    /// Receiver that tracks identity changes
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<Option<Identity>> {
        self.tx.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn subscribers_see_latest_identity() {
        let provider = SessionProvider::new();
        let rx = provider.subscribe();
        assert!(rx.borrow().is_none());

        provider.sign_in(Identity::guest("g-1"));
        assert_eq!(rx.borrow().as_ref().map(|i| i.uid.as_str()), Some("g-1"));
        assert!(rx.borrow().as_ref().is_some_and(|i| i.anonymous));

        provider.sign_out();
        assert!(rx.borrow().is_none());
        assert!(provider.current().is_none());
    }

    #[test]
    fn receiver_keeps_last_value_after_provider_drop() {
        let provider = SessionProvider::signed_in(Identity::user("u-1"));
        let rx = provider.subscribe();
        drop(provider);
        assert_eq!(rx.borrow().clone(), Some(Identity::user("u-1")));
    }

    #[test]
    fn sign_in_wakes_waiting_receiver() {
        let provider = SessionProvider::new();
        let mut rx = provider.subscribe();

        provider.sign_in(Identity::user("u-2"));
        tokio_test::assert_ok!(tokio_test::block_on(rx.changed()));
        assert_eq!(rx.borrow_and_update().as_ref().map(|i| i.uid.as_str()), Some("u-2"));
    }
}
