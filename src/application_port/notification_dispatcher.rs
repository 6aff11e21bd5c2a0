use crate::application_port::NotificationError;
use crate::domain_model::{Notification, NotificationPayload, UserId};

/// Two-tier delivery: a durable inbox write that must succeed, then a
/// best-effort push to the recipient's live channel. The push carries no
/// guarantee; the persisted row is the retry path.
#[async_trait::async_trait]
pub trait NotificationDispatcher: Send + Sync {
    async fn dispatch(
        &self,
        recipient: UserId,
        title: &str,
        message: &str,
        payload: NotificationPayload,
    ) -> Result<Notification, NotificationError>;
}
