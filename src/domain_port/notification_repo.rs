use crate::application_port::NotificationError;
use crate::domain_model::*;

/// Per-row operations are keyed on the composite `(id, user_id)`: a row
/// owned by someone else is indistinguishable from a missing row by
/// construction, with no separate ownership check to forget.
#[async_trait::async_trait]
pub trait NotificationRepo: Send + Sync {
    async fn insert(&self, notification: &Notification) -> Result<(), NotificationError>;

    async fn list_for_user(
        &self,
        user: UserId,
        query: &InboxQuery,
    ) -> Result<Vec<Notification>, NotificationError>;

    async fn count_unread(&self, user: UserId) -> Result<u64, NotificationError>;

    async fn find_owned(
        &self,
        id: NotificationId,
        user: UserId,
    ) -> Result<Option<Notification>, NotificationError>;

    /// Transitions an unread owned row to read. False when no unread owned
    /// row matched.
    async fn mark_read(&self, id: NotificationId, user: UserId)
    -> Result<bool, NotificationError>;

    async fn mark_all_read(&self, user: UserId) -> Result<u64, NotificationError>;

    async fn delete_owned(
        &self,
        id: NotificationId,
        user: UserId,
    ) -> Result<bool, NotificationError>;
}
