use crate::application_port::NotificationError;
use crate::domain_model::*;
use crate::domain_port::NotificationRepo;
use chrono::{DateTime, Utc};
use sqlx::encode::IsNull;
use sqlx::error::BoxDynError;
use sqlx::mysql::MySqlRow;
use sqlx::types::JsonValue;
use sqlx::{Database, Decode, Encode, MySqlPool, Row, Type};

impl<'r, DB: Database> Decode<'r, DB> for NotificationKind
where
    &'r str: Decode<'r, DB>,
{
    fn decode(value: <DB as Database>::ValueRef<'r>) -> Result<Self, BoxDynError> {
        let s = <&str as Decode<DB>>::decode(value)?;
        Ok(s.parse()?)
    }
}

impl<'q, DB: Database> Encode<'q, DB> for NotificationKind
where
    String: Encode<'q, DB>,
{
    fn encode_by_ref(
        &self,
        buf: &mut <DB as Database>::ArgumentBuffer<'q>,
    ) -> Result<IsNull, BoxDynError> {
        self.to_string().encode_by_ref(buf)
    }
}

impl<DB: Database> Type<DB> for NotificationKind
where
    String: Type<DB>,
{
    fn type_info() -> <DB as Database>::TypeInfo {
        <String as Type<DB>>::type_info()
    }
}

pub struct MySqlNotificationRepo {
    pool: MySqlPool,
}

impl MySqlNotificationRepo {
    pub fn new(pool: MySqlPool) -> Self {
        MySqlNotificationRepo { pool }
    }

    fn row_to_notification(r: &MySqlRow) -> Result<Notification, NotificationError> {
        let payload_json: JsonValue = r.get("payload_json");
        let payload = NotificationPayload::from_db_value(payload_json)
            .map_err(|e| NotificationError::Store(format!("decode notification payload: {e}")))?;

        Ok(Notification {
            notification_id: r.get::<NotificationId, _>("notification_id"),
            user_id: r.get::<UserId, _>("user_id"),
            kind: r.get::<NotificationKind, _>("kind"),
            title: r.get::<String, _>("title"),
            message: r.get::<String, _>("message"),
            payload,
            is_read: r.get::<bool, _>("is_read"),
            created_at: r.get::<DateTime<Utc>, _>("created_at"),
        })
    }
}

#[async_trait::async_trait]
impl NotificationRepo for MySqlNotificationRepo {
    async fn insert(&self, notification: &Notification) -> Result<(), NotificationError> {
        let payload_json = serde_json::to_value(&notification.payload)
            .map_err(|e| NotificationError::Store(format!("encode notification payload: {e}")))?;

        sqlx::query(
            r#"
INSERT INTO notification (notification_id, user_id, kind, title, message, payload_json, is_read, created_at)
VALUES (?, ?, ?, ?, ?, ?, ?, ?)
"#,
        )
        .bind(notification.notification_id)
        .bind(notification.user_id)
        .bind(notification.kind)
        .bind(&notification.title)
        .bind(&notification.message)
        .bind(&payload_json)
        .bind(notification.is_read)
        .bind(notification.created_at)
        .execute(&self.pool)
        .await
        .map_err(|e| NotificationError::Store(format!("insert notification: {e}")))?;

        Ok(())
    }

    async fn list_for_user(
        &self,
        user: UserId,
        query: &InboxQuery,
    ) -> Result<Vec<Notification>, NotificationError> {
        let rows = if query.unread_only {
            sqlx::query(
                r#"
SELECT notification_id, user_id, kind, title, message, payload_json, is_read, created_at
FROM notification
WHERE user_id = ? AND is_read = 0
ORDER BY created_at DESC
LIMIT ? OFFSET ?
"#,
            )
            .bind(user)
            .bind(query.page_size.0 as i64)
            .bind(query.offset as i64)
            .fetch_all(&self.pool)
            .await
        } else {
            sqlx::query(
                r#"
SELECT notification_id, user_id, kind, title, message, payload_json, is_read, created_at
FROM notification
WHERE user_id = ?
ORDER BY created_at DESC
LIMIT ? OFFSET ?
"#,
            )
            .bind(user)
            .bind(query.page_size.0 as i64)
            .bind(query.offset as i64)
            .fetch_all(&self.pool)
            .await
        }
        .map_err(|e| NotificationError::Store(format!("list notifications: {e}")))?;

        rows.iter().map(Self::row_to_notification).collect()
    }

    async fn count_unread(&self, user: UserId) -> Result<u64, NotificationError> {
        let count: i64 = sqlx::query_scalar(
            r#"SELECT COUNT(*) FROM notification WHERE user_id = ? AND is_read = 0"#,
        )
        .bind(user)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| NotificationError::Store(format!("count unread notifications: {e}")))?;

        Ok(count as u64)
    }

    async fn find_owned(
        &self,
        id: NotificationId,
        user: UserId,
    ) -> Result<Option<Notification>, NotificationError> {
        let row = sqlx::query(
            r#"
SELECT notification_id, user_id, kind, title, message, payload_json, is_read, created_at
FROM notification
WHERE notification_id = ? AND user_id = ?
"#,
        )
        .bind(id)
        .bind(user)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| NotificationError::Store(format!("select notification: {e}")))?;

        row.map(|r| Self::row_to_notification(&r)).transpose()
    }

    async fn mark_read(
        &self,
        id: NotificationId,
        user: UserId,
    ) -> Result<bool, NotificationError> {
        let res = sqlx::query(
            r#"
UPDATE notification
SET is_read = 1
WHERE notification_id = ? AND user_id = ? AND is_read = 0
"#,
        )
        .bind(id)
        .bind(user)
        .execute(&self.pool)
        .await
        .map_err(|e| NotificationError::Store(format!("mark notification read: {e}")))?;

        Ok(res.rows_affected() > 0)
    }

    async fn mark_all_read(&self, user: UserId) -> Result<u64, NotificationError> {
        let res = sqlx::query(
            r#"
UPDATE notification
SET is_read = 1
WHERE user_id = ? AND is_read = 0
"#,
        )
        .bind(user)
        .execute(&self.pool)
        .await
        .map_err(|e| NotificationError::Store(format!("mark all notifications read: {e}")))?;

        Ok(res.rows_affected())
    }

    async fn delete_owned(
        &self,
        id: NotificationId,
        user: UserId,
    ) -> Result<bool, NotificationError> {
        let res = sqlx::query("DELETE FROM notification WHERE notification_id = ? AND user_id = ?")
            .bind(id)
            .bind(user)
            .execute(&self.pool)
            .await
            .map_err(|e| NotificationError::Store(format!("delete notification: {e}")))?;

        Ok(res.rows_affected() > 0)
    }
}
