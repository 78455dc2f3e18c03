//! Session lifecycle notifications.

use tokio::sync::broadcast;

/// Something the embedding application may need to react to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEvent {
    /// Credentials were cleared after an unrecoverable 401; show the login screen.
    LoginRequired,
    /// A 401 was recovered by refreshing the credential pair.
    TokensRefreshed,
    /// The user logged out explicitly.
    SignedOut,
}

/// Broadcast channel carrying `SessionEvent`s to any number of listeners.
#[derive(Debug, Clone)]
pub struct SessionEvents {
    tx: broadcast::Sender<SessionEvent>,
}

impl SessionEvents {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(16);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.tx.subscribe()
    }

    /// Publish `event`. Having no listeners is fine.
    pub fn notify(&self, event: SessionEvent) {
        let _ = self.tx.send(event);
    }
}

impl Default for SessionEvents {
    fn default() -> Self {
        Self::new()
    }
}
