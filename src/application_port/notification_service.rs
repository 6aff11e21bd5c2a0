use crate::domain_model::*;

#[derive(Debug, thiserror::Error)]
pub enum NotificationError {
    // one message for both "absent" and "not owned", so existence of another
    // user's row is never leaked
    #[error("notification not found")]
    NotFound,
    #[error("store error: {0}")]
    Store(String),
}

#[async_trait::async_trait]
pub trait NotificationService: Send + Sync {
    /// Persists an unread notification for `user`.
    async fn create_notification(
        &self,
        user: UserId,
        title: &str,
        message: &str,
        payload: NotificationPayload,
    ) -> Result<Notification, NotificationError>;

    /// The user's inbox, newest first. Payloads are always structured values.
    async fn user_notifications(
        &self,
        user: UserId,
        query: InboxQuery,
    ) -> Result<Vec<Notification>, NotificationError>;

    async fn unread_count(&self, user: UserId) -> Result<u64, NotificationError>;

    /// Idempotent: marking an already-read notification is a no-op that
    /// returns the row unchanged without issuing a write.
    async fn mark_read(
        &self,
        id: NotificationId,
        user: UserId,
    ) -> Result<Notification, NotificationError>;

    /// Bulk unread → read; returns the number of rows transitioned.
    async fn mark_all_read(&self, user: UserId) -> Result<u64, NotificationError>;

    async fn delete_notification(
        &self,
        id: NotificationId,
        user: UserId,
    ) -> Result<(), NotificationError>;
}
