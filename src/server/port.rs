use crate::domain_model::*;
use tokio::sync::mpsc::Sender;

// region conn message

/// Wire frame pushed to a connected client. The transport behind a
/// `ConnSender` (sockets, SSE, a test channel) is out of scope here.
#[derive(Debug)]
pub enum ConnMessage {
    Text(String),
    Close,
}

// endregion

// region conn sender

#[async_trait::async_trait]
pub trait ConnSender: Send + Sync {
    async fn send(&mut self, message: ConnMessage) -> anyhow::Result<()>;
}

#[async_trait::async_trait]
impl ConnSender for Sender<ConnMessage> {
    async fn send(&mut self, message: ConnMessage) -> anyhow::Result<()> {
        Sender::<ConnMessage>::send(self, message).await?;
        Ok(())
    }
}

// endregion

/// Per-recipient live push. `emit` is fire-and-forget from the caller's
/// point of view: no acknowledgment, no retry — the durable inbox is the
/// retry path.
#[async_trait::async_trait]
pub trait LiveChannel: Send + Sync {
    fn is_connected(&self, user: UserId) -> bool;

    async fn emit(&self, user: UserId, event: &LiveEvent) -> anyhow::Result<()>;
}
