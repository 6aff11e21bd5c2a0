use crate::domain_model::{Notification, NotificationId, NotificationKind, NotificationPayload};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Server-to-client event pushed over a recipient's live channel.
/// Delivery is best-effort; the durable inbox is the source of truth.
#[derive(Debug, Serialize, Deserialize)]
#[serde(tag = "type", content = "content")]
pub enum LiveEvent {
    #[serde(rename = "notification.new")]
    NotificationNew(NotificationNew),
}

#[derive(Debug, Serialize, Deserialize)]
pub struct NotificationNew {
    pub notification_id: NotificationId,
    pub kind: NotificationKind,
    pub title: String,
    pub message: String,
    pub payload: NotificationPayload,
    pub created_at: DateTime<Utc>,
}

impl From<&Notification> for LiveEvent {
    fn from(n: &Notification) -> Self {
        LiveEvent::NotificationNew(NotificationNew {
            notification_id: n.notification_id,
            kind: n.kind,
            title: n.title.clone(),
            message: n.message.clone(),
            payload: n.payload.clone(),
            created_at: n.created_at,
        })
    }
}
