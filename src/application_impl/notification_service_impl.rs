use crate::application_port::{NotificationError, NotificationService};
use crate::domain_model::*;
use crate::domain_port::NotificationRepo;
use chrono::Utc;
use std::sync::Arc;

pub struct RealNotificationService {
    notification_repo: Arc<dyn NotificationRepo>,
}

impl RealNotificationService {
    pub fn new(notification_repo: Arc<dyn NotificationRepo>) -> RealNotificationService {
        RealNotificationService { notification_repo }
    }
}

#[async_trait::async_trait]
impl NotificationService for RealNotificationService {
    async fn create_notification(
        &self,
        user: UserId,
        title: &str,
        message: &str,
        payload: NotificationPayload,
    ) -> Result<Notification, NotificationError> {
        let notification = Notification::new(user, title, message, payload, Utc::now());
        self.notification_repo.insert(&notification).await?;
        Ok(notification)
    }

    async fn user_notifications(
        &self,
        user: UserId,
        query: InboxQuery,
    ) -> Result<Vec<Notification>, NotificationError> {
        self.notification_repo.list_for_user(user, &query).await
    }

    async fn unread_count(&self, user: UserId) -> Result<u64, NotificationError> {
        self.notification_repo.count_unread(user).await
    }

    async fn mark_read(
        &self,
        id: NotificationId,
        user: UserId,
    ) -> Result<Notification, NotificationError> {
        let mut notification = self
            .notification_repo
            .find_owned(id, user)
            .await?
            .ok_or(NotificationError::NotFound)?;

        if notification.is_read {
            // already read: no write, same final state
            return Ok(notification);
        }

        if !self.notification_repo.mark_read(id, user).await? {
            // a concurrent caller got there first; the end state is the same
            tracing::debug!("notification {id} was read concurrently");
        }
        notification.is_read = true;

        Ok(notification)
    }

    async fn mark_all_read(&self, user: UserId) -> Result<u64, NotificationError> {
        self.notification_repo.mark_all_read(user).await
    }

    async fn delete_notification(
        &self,
        id: NotificationId,
        user: UserId,
    ) -> Result<(), NotificationError> {
        self.notification_repo
            .find_owned(id, user)
            .await?
            .ok_or(NotificationError::NotFound)?;

        if !self.notification_repo.delete_owned(id, user).await? {
            tracing::debug!("notification {id} was deleted concurrently");
        }

        Ok(())
    }
}
