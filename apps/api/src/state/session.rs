//! # Session Hub
//!
//! Pushes sign-in state to whoever is listening for one token.
//!
//! ```text
//! subscribe(jti, identity) ──► watch::Receiver ──► /api/auth/session/stream
//!                                     ▲            /api/live/{entity}
//! sign_out(jti) ── SignedOut ─────────┘  then the sender is dropped,
//!                                        which ends every stream
//! ```
//!
//! Channels without receivers are pruned on the next subscribe.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use serde::Serialize;
use tokio::sync::watch;
use tracing::debug;

use moinho_core::Identity;

/// What a session listener sees.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "camelCase")]
pub enum SessionState {
    SignedIn { identity: Identity },
    SignedOut,
}

#[derive(Debug, Clone, Default)]
pub struct SessionHub {
    channels: Arc<Mutex<HashMap<String, watch::Sender<SessionState>>>>,
}

impl SessionHub {
    pub fn new() -> Self {
        Self::default()
    }

    /// Listens to the session of token `jti`.
    ///
    /// The receiver starts with `SignedIn { identity }`.
    pub fn subscribe(&self, jti: &str, identity: &Identity) -> watch::Receiver<SessionState> {
        let mut channels = self.channels.lock().unwrap_or_else(|e| e.into_inner());
        channels.retain(|_, tx| tx.receiver_count() > 0);

        channels
            .entry(jti.to_string())
            .or_insert_with(|| {
                watch::Sender::new(SessionState::SignedIn {
                    identity: identity.clone(),
                })
            })
            .subscribe()
    }

    /// Tells the token's listeners it signed out, and closes their streams.
    pub fn sign_out(&self, jti: &str) {
        let sender = {
            let mut channels = self.channels.lock().unwrap_or_else(|e| e.into_inner());
            channels.remove(jti)
        };

        if let Some(tx) = sender {
            debug!(listeners = tx.receiver_count(), "Signing out session listeners");
            tx.send_replace(SessionState::SignedOut);
        }
    }

    /// Tokens with a channel, listened to or not yet pruned.
    pub fn len(&self) -> usize {
        self.channels.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn identity() -> Identity {
        Identity {
            user_id: "u-1".to_string(),
            email: "ana@moinho.app".to_string(),
            full_name: "Ana Lima".to_string(),
        }
    }

    #[tokio::test]
    async fn test_sign_out_notifies_and_closes() {
        let hub = SessionHub::new();
        let mut rx = hub.subscribe("jti-1", &identity());
        assert!(matches!(*rx.borrow(), SessionState::SignedIn { .. }));

        hub.sign_out("jti-1");

        rx.changed().await.unwrap();
        assert_eq!(*rx.borrow_and_update(), SessionState::SignedOut);
        assert!(rx.changed().await.is_err());
        assert!(hub.is_empty());
    }

    #[tokio::test]
    async fn test_other_tokens_unaffected() {
        let hub = SessionHub::new();
        let a = hub.subscribe("jti-a", &identity());
        let _b = hub.subscribe("jti-b", &identity());

        hub.sign_out("jti-b");
        assert!(matches!(*a.borrow(), SessionState::SignedIn { .. }));
        assert_eq!(hub.len(), 1);
    }

    #[test]
    fn test_dropped_listeners_are_pruned() {
        let hub = SessionHub::new();
        drop(hub.subscribe("jti-a", &identity()));
        let _b = hub.subscribe("jti-b", &identity());
        assert_eq!(hub.len(), 1);
    }

    #[test]
    fn test_serialized_shape() {
        let json = serde_json::to_value(SessionState::SignedOut).unwrap();
        assert_eq!(json["status"], "signedOut");
        let json = serde_json::to_value(SessionState::SignedIn { identity: identity() }).unwrap();
        assert_eq!(json["identity"]["fullName"], "Ana Lima");
    }
}
