use crate::application_port::{NotificationDispatcher, NotificationError, NotificationService};
use crate::domain_model::*;
use crate::server::LiveChannel;
use std::sync::Arc;

/// Couples the durable inbox with the live channel.
///
/// The two phases carry different guarantees and are never rolled into one:
/// the inbox write is authoritative and its failure fails the call; the
/// live emit happens only for connected recipients and its failure is
/// logged and swallowed — the recipient finds the row on their next poll.
pub struct NotificationFanout {
    notification_service: Arc<dyn NotificationService>,
    live_channel: Arc<dyn LiveChannel>,
}

impl NotificationFanout {
    pub fn new(
        notification_service: Arc<dyn NotificationService>,
        live_channel: Arc<dyn LiveChannel>,
    ) -> Self {
        Self {
            notification_service,
            live_channel,
        }
    }
}

#[async_trait::async_trait]
impl NotificationDispatcher for NotificationFanout {
    async fn dispatch(
        &self,
        recipient: UserId,
        title: &str,
        message: &str,
        payload: NotificationPayload,
    ) -> Result<Notification, NotificationError> {
        let notification = self
            .notification_service
            .create_notification(recipient, title, message, payload)
            .await?;

        if self.live_channel.is_connected(recipient) {
            let event = LiveEvent::from(&notification);
            if let Err(e) = self.live_channel.emit(recipient, &event).await {
                tracing::warn!("live push to {recipient} dropped (inbox only): {e:#}");
            }
        } else {
            tracing::debug!("{recipient} offline, inbox only");
        }

        Ok(notification)
    }
}
