use crate::domain_model::*;
use crate::server::{ConnMessage, ConnSender, LiveChannel};
use anyhow::anyhow;
use dashmap::DashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::mpsc::{Receiver, Sender};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

const MAILBOX_CAP: usize = 256;

pub struct ClientRecord {
    session: u64,
    mailbox: Sender<ConnMessage>,
    actor_handle: Mutex<Option<JoinHandle<()>>>,
    cancellation_token: CancellationToken,
}

/// Registry of connected recipients. Each attached client gets a bounded
/// mailbox drained by its own pump task; `emit` enqueues without waiting.
pub struct SessionHub {
    online_users: Arc<DashMap<UserId, ClientRecord>>,
    session_counter: AtomicU64,
}

impl SessionHub {
    pub fn new() -> Self {
        Self {
            online_users: Arc::new(DashMap::new()),
            session_counter: AtomicU64::new(0),
        }
    }

    /// Registers `user_id` as connected and starts pumping its mailbox into
    /// `transport`. A previous session for the same user is cancelled.
    pub fn attach(&self, user_id: UserId, transport: Box<dyn ConnSender>) {
        if let Some((_, old)) = self.online_users.remove(&user_id) {
            old.cancellation_token.cancel();
        }

        let session = self.session_counter.fetch_add(1, Ordering::Relaxed);
        let cancellation_token = CancellationToken::new();
        let (mailbox_tx, mailbox_rx) = tokio::sync::mpsc::channel(MAILBOX_CAP);

        let actor_handle = tokio::spawn(outbound_pump(
            user_id,
            session,
            transport,
            mailbox_rx,
            cancellation_token.clone(),
            self.online_users.clone(),
        ));

        self.online_users.insert(
            user_id,
            ClientRecord {
                session,
                mailbox: mailbox_tx,
                actor_handle: Mutex::new(Some(actor_handle)),
                cancellation_token,
            },
        );
    }

    pub fn detach(&self, user_id: UserId) {
        if let Some((_, record)) = self.online_users.remove(&user_id) {
            record.cancellation_token.cancel();
        }
    }

    pub async fn shutdown(&self) {
        tracing::info!("SessionHub shutting down...");

        for entry in self.online_users.iter() {
            entry.cancellation_token.cancel();
        }

        let mut handles = Vec::new();
        for entry in self.online_users.iter() {
            if let Ok(mut lock) = entry.actor_handle.lock() {
                if let Some(handle) = lock.take() {
                    handles.push(handle);
                }
            }
        }

        for handle in handles {
            let _ = handle.await;
        }
        self.online_users.clear();

        tracing::info!("All SessionHub pumps shut down.");
    }
}

impl Default for SessionHub {
    fn default() -> Self {
        Self::new()
    }
}

async fn outbound_pump(
    user_id: UserId,
    session: u64,
    mut transport: Box<dyn ConnSender>,
    mut mailbox_rx: Receiver<ConnMessage>,
    cancellation_token: CancellationToken,
    online_users: Arc<DashMap<UserId, ClientRecord>>,
) {
    tracing::debug!("pump for [{user_id}] starting");

    while let Some(message) = tokio::select! {
        biased;
        _ = cancellation_token.cancelled() => None,
        m = mailbox_rx.recv() => m,
    } {
        let closing = matches!(message, ConnMessage::Close);
        if transport.send(message).await.is_err() {
            tracing::debug!("transport for [{user_id}] gone, pump shutting down");
            break;
        }
        if closing {
            break;
        }
    }

    // only unregister our own session; a reattach may have replaced it
    online_users.remove_if(&user_id, |_, record| record.session == session);
    tracing::debug!("pump for [{user_id}] stopped");
}

#[async_trait::async_trait]
impl LiveChannel for SessionHub {
    fn is_connected(&self, user: UserId) -> bool {
        self.online_users.contains_key(&user)
    }

    async fn emit(&self, user: UserId, event: &LiveEvent) -> anyhow::Result<()> {
        if let Some(record) = self.online_users.get(&user) {
            let message = serde_json::to_string(event)?;
            match record.mailbox.try_send(ConnMessage::Text(message)) {
                Ok(_) => Ok(()),
                Err(TrySendError::Full(..)) => Err(anyhow!("mailbox full, event dropped")),
                Err(e) => Err(anyhow!("failed to enqueue event: {e}")),
            }
        } else {
            Err(anyhow!("user {} not connected", user))
        }
    }
}
