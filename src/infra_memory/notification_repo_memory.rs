use crate::application_port::NotificationError;
use crate::domain_model::*;
use crate::domain_port::NotificationRepo;
use dashmap::DashMap;

#[derive(Default)]
pub struct MemoryNotificationRepo {
    by_id: DashMap<NotificationId, Notification>,
}

impl MemoryNotificationRepo {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait::async_trait]
impl NotificationRepo for MemoryNotificationRepo {
    async fn insert(&self, notification: &Notification) -> Result<(), NotificationError> {
        self.by_id
            .insert(notification.notification_id, notification.clone());
        Ok(())
    }

    async fn list_for_user(
        &self,
        user: UserId,
        query: &InboxQuery,
    ) -> Result<Vec<Notification>, NotificationError> {
        let mut rows: Vec<Notification> = self
            .by_id
            .iter()
            .filter(|entry| {
                let n = entry.value();
                n.user_id == user && (!query.unread_only || !n.is_read)
            })
            .map(|entry| entry.value().clone())
            .collect();
        rows.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then(a.notification_id.cmp(&b.notification_id))
        });
        Ok(rows
            .into_iter()
            .skip(query.offset as usize)
            .take(query.page_size.0 as usize)
            .collect())
    }

    async fn count_unread(&self, user: UserId) -> Result<u64, NotificationError> {
        let count = self
            .by_id
            .iter()
            .filter(|entry| entry.value().user_id == user && !entry.value().is_read)
            .count();
        Ok(count as u64)
    }

    async fn find_owned(
        &self,
        id: NotificationId,
        user: UserId,
    ) -> Result<Option<Notification>, NotificationError> {
        Ok(self
            .by_id
            .get(&id)
            .filter(|entry| entry.value().user_id == user)
            .map(|entry| entry.value().clone()))
    }

    async fn mark_read(
        &self,
        id: NotificationId,
        user: UserId,
    ) -> Result<bool, NotificationError> {
        match self.by_id.get_mut(&id) {
            Some(mut entry) if entry.value().user_id == user && !entry.value().is_read => {
                entry.value_mut().is_read = true;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn mark_all_read(&self, user: UserId) -> Result<u64, NotificationError> {
        let mut transitioned = 0;
        for mut entry in self.by_id.iter_mut() {
            let n = entry.value_mut();
            if n.user_id == user && !n.is_read {
                n.is_read = true;
                transitioned += 1;
            }
        }
        Ok(transitioned)
    }

    async fn delete_owned(
        &self,
        id: NotificationId,
        user: UserId,
    ) -> Result<bool, NotificationError> {
        Ok(self
            .by_id
            .remove_if(&id, |_, n| n.user_id == user)
            .is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};

    fn notification(user: UserId, minutes_ago: i64) -> Notification {
        let connection_id = ConnectionId(uuid::Uuid::new_v4());
        Notification::new(
            user,
            "New connection request",
            "someone wants to connect with you",
            NotificationPayload::ConnectionRequest {
                connection_id,
                requester_id: UserId(uuid::Uuid::new_v4()),
                requester_name: "alice".to_owned(),
            },
            Utc::now() - Duration::minutes(minutes_ago),
        )
    }

    #[tokio::test]
    async fn listing_is_newest_first_and_paginated() {
        let repo = MemoryNotificationRepo::new();
        let user = UserId(uuid::Uuid::new_v4());
        for minutes_ago in [30, 20, 10] {
            repo.insert(&notification(user, minutes_ago)).await.unwrap();
        }

        let page = repo
            .list_for_user(
                user,
                &InboxQuery {
                    page_size: PageSize(2),
                    offset: 0,
                    unread_only: false,
                },
            )
            .await
            .unwrap();
        assert_eq!(page.len(), 2);
        assert!(page[0].created_at > page[1].created_at);

        let rest = repo
            .list_for_user(
                user,
                &InboxQuery {
                    page_size: PageSize(2),
                    offset: 2,
                    unread_only: false,
                },
            )
            .await
            .unwrap();
        assert_eq!(rest.len(), 1);
    }

    #[tokio::test]
    async fn unread_filter_and_counts_track_mark_read() {
        let repo = MemoryNotificationRepo::new();
        let user = UserId(uuid::Uuid::new_v4());
        let n = notification(user, 5);
        repo.insert(&n).await.unwrap();
        repo.insert(&notification(user, 1)).await.unwrap();

        assert_eq!(repo.count_unread(user).await.unwrap(), 2);
        assert!(repo.mark_read(n.notification_id, user).await.unwrap());
        // second transition has nothing unread to do
        assert!(!repo.mark_read(n.notification_id, user).await.unwrap());
        assert_eq!(repo.count_unread(user).await.unwrap(), 1);

        let unread = repo
            .list_for_user(
                user,
                &InboxQuery {
                    unread_only: true,
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(unread.len(), 1);
    }

    #[tokio::test]
    async fn cross_user_rows_are_invisible() {
        let repo = MemoryNotificationRepo::new();
        let owner = UserId(uuid::Uuid::new_v4());
        let stranger = UserId(uuid::Uuid::new_v4());
        let n = notification(owner, 1);
        repo.insert(&n).await.unwrap();

        assert!(
            repo.find_owned(n.notification_id, stranger)
                .await
                .unwrap()
                .is_none()
        );
        assert!(!repo.mark_read(n.notification_id, stranger).await.unwrap());
        assert!(!repo.delete_owned(n.notification_id, stranger).await.unwrap());
        // the owner still sees it
        assert!(
            repo.find_owned(n.notification_id, owner)
                .await
                .unwrap()
                .is_some()
        );
    }
}
