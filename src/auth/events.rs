//! Auth state change notifications.
//!
//! One [`AuthEvents`] hub is created at startup and handed to whatever needs
//! it through the app state. Subscribers get an [`AuthSubscription`] that can
//! be dropped or unsubscribed at any time. After [`AuthEvents::teardown`] no
//! subscription yields another event, including ones already queued.

use serde::Serialize;
use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum AuthEvent {
    UserCreated { user_id: Uuid },
    SignedIn { user_id: Uuid },
    SignedOut { user_id: Uuid },
    TokenRefreshed { user_id: Uuid },
}

pub struct AuthEvents {
    tx: broadcast::Sender<AuthEvent>,
    closed: watch::Sender<bool>,
}

impl AuthEvents {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        let (closed, _) = watch::channel(false);
        Self { tx, closed }
    }

    /// Fire-and-forget. Dropped silently when nobody listens or after teardown.
    pub fn publish(&self, event: AuthEvent) {
        if self.is_closed() {
            return;
        }
        let _ = self.tx.send(event);
    }

    pub fn subscribe(&self) -> AuthSubscription {
        AuthSubscription {
            rx: self.tx.subscribe(),
            closed: self.closed.subscribe(),
        }
    }

    pub fn is_closed(&self) -> bool {
        *self.closed.borrow()
    }

    pub fn teardown(&self) {
        self.closed.send_replace(true);
    }
}

impl Default for AuthEvents {
    fn default() -> Self {
        Self::new(64)
    }
}

pub struct AuthSubscription {
    rx: broadcast::Receiver<AuthEvent>,
    closed: watch::Receiver<bool>,
}

impl AuthSubscription {
    /// Next event, or `None` once the hub is torn down.
    pub async fn next(&mut self) -> Option<AuthEvent> {
        loop {
            if *self.closed.borrow() {
                return None;
            }

            tokio::select! {
                biased;
                changed = self.closed.changed() => {
                    if changed.is_err() {
                        return None;
                    }
                }
                received = self.rx.recv() => match received {
                    Ok(event) => {
                        if *self.closed.borrow() {
                            return None;
                        }
                        return Some(event);
                    }
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        tracing::warn!("Auth subscriber lagged, skipped {skipped} events");
                    }
                    Err(broadcast::error::RecvError::Closed) => return None,
                },
            }
        }
    }

    pub fn unsubscribe(self) {}
}

/// Log every auth event until teardown.
pub async fn log_events(mut subscription: AuthSubscription) {
    while let Some(event) = subscription.next().await {
        match &event {
            AuthEvent::UserCreated { user_id } => tracing::info!(%user_id, "User created"),
            AuthEvent::SignedIn { user_id } => tracing::info!(%user_id, "User signed in"),
            AuthEvent::SignedOut { user_id } => tracing::info!(%user_id, "User signed out"),
            AuthEvent::TokenRefreshed { user_id } => {
                tracing::debug!(%user_id, "Session refreshed")
            }
        }
    }
    tracing::debug!("Auth event logger stopped");
}

/// Tear the hub down and wait for a subscriber task to drain out.
pub async fn shutdown(events: &AuthEvents, subscriber: JoinHandle<()>) {
    events.teardown();
    if let Err(e) = subscriber.await {
        tracing::warn!("Auth event subscriber ended abnormally: {e}");
    }
}
