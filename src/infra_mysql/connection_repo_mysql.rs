use super::util::is_dup_key;
use crate::application_port::RelationError;
use crate::domain_model::*;
use crate::domain_port::{ConnectionRepo, InsertOutcome};
use chrono::{DateTime, Utc};
use sqlx::encode::IsNull;
use sqlx::error::BoxDynError;
use sqlx::mysql::MySqlRow;
use sqlx::{Database, Decode, Encode, MySqlPool, Row, Type};

impl<'r, DB: Database> Decode<'r, DB> for ConnectionStatus
where
    &'r str: Decode<'r, DB>,
{
    fn decode(value: <DB as Database>::ValueRef<'r>) -> Result<Self, BoxDynError> {
        let s = <&str as Decode<DB>>::decode(value)?;
        Ok(s.parse()?)
    }
}

impl<'q, DB: Database> Encode<'q, DB> for ConnectionStatus
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

impl<DB: Database> Type<DB> for ConnectionStatus
where
    String: Type<DB>,
{
    fn type_info() -> <DB as Database>::TypeInfo {
        <String as Type<DB>>::type_info()
    }
}

pub struct MySqlConnectionRepo {
    pool: MySqlPool,
}

impl MySqlConnectionRepo {
    pub fn new(pool: MySqlPool) -> Self {
        MySqlConnectionRepo { pool }
    }

    fn row_to_connection(r: &MySqlRow) -> Connection {
        let user_min = r.get::<UserId, _>("user_min");
        let user_max = r.get::<UserId, _>("user_max");
        let requester = r.get::<UserId, _>("requested_by");
        let receiver = if requester == user_min { user_max } else { user_min };

        Connection {
            connection_id: r.get::<ConnectionId, _>("connection_id"),
            requester,
            receiver,
            status: r.get::<ConnectionStatus, _>("status"),
            message: r.get::<Option<String>, _>("message"),
            created_at: r.get::<DateTime<Utc>, _>("created_at"),
            updated_at: r.get::<DateTime<Utc>, _>("updated_at"),
        }
    }

    fn row_to_summary(r: &MySqlRow) -> ConnectionSummary {
        let connection = Self::row_to_connection(r);
        let peer_id = r.get::<UserId, _>("peer_id");
        ConnectionSummary {
            connection_id: connection.connection_id,
            requester: connection.requester,
            receiver: connection.receiver,
            status: connection.status,
            message: connection.message,
            created_at: connection.created_at,
            updated_at: connection.updated_at,
            peer: PeerProfile {
                user_id: peer_id,
                username: r.get::<String, _>("username"),
            },
        }
    }
}

#[async_trait::async_trait]
impl ConnectionRepo for MySqlConnectionRepo {
    async fn insert(&self, connection: &Connection) -> Result<InsertOutcome, RelationError> {
        let pair = UserPair::new(connection.requester, connection.receiver);

        let res = sqlx::query(
            r#"
INSERT INTO connection (connection_id, user_min, user_max, requested_by, status, message, created_at, updated_at)
VALUES (?, ?, ?, ?, ?, ?, ?, ?)
"#,
        )
        .bind(connection.connection_id)
        .bind(pair.min())
        .bind(pair.max())
        .bind(connection.requester)
        .bind(connection.status)
        .bind(&connection.message)
        .bind(connection.created_at)
        .bind(connection.updated_at)
        .execute(&self.pool)
        .await;

        match res {
            Ok(_) => Ok(InsertOutcome::Inserted),
            Err(e) if is_dup_key(&e) => Ok(InsertOutcome::DuplicatePair),
            Err(e) => Err(RelationError::Store(format!("insert connection: {e}"))),
        }
    }

    async fn find_by_id(&self, id: ConnectionId) -> Result<Option<Connection>, RelationError> {
        let row = sqlx::query(
            r#"
SELECT connection_id, user_min, user_max, requested_by, status, message, created_at, updated_at
FROM connection
WHERE connection_id = ?
"#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| RelationError::Store(format!("select connection by id: {e}")))?;

        Ok(row.map(|r| Self::row_to_connection(&r)))
    }

    async fn find_between(
        &self,
        a: UserId,
        b: UserId,
    ) -> Result<Option<Connection>, RelationError> {
        let pair = UserPair::new(a, b);

        let row = sqlx::query(
            r#"
SELECT connection_id, user_min, user_max, requested_by, status, message, created_at, updated_at
FROM connection
WHERE user_min = ? AND user_max = ?
"#,
        )
        .bind(pair.min())
        .bind(pair.max())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| RelationError::Store(format!("select connection by pair: {e}")))?;

        Ok(row.map(|r| Self::row_to_connection(&r)))
    }

    async fn exists_between(&self, a: UserId, b: UserId) -> Result<bool, RelationError> {
        let pair = UserPair::new(a, b);

        let count: i64 = sqlx::query_scalar(
            r#"SELECT COUNT(1) FROM connection WHERE user_min = ? AND user_max = ?"#,
        )
        .bind(pair.min())
        .bind(pair.max())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| RelationError::Store(format!("count connection by pair: {e}")))?;

        Ok(count > 0)
    }

    async fn list_received(
        &self,
        user: UserId,
        status: Option<ConnectionStatus>,
    ) -> Result<Vec<ConnectionSummary>, RelationError> {
        // peer of a received connection is its requester
        let rows = if let Some(status) = status {
            sqlx::query(
                r#"
SELECT c.connection_id, c.user_min, c.user_max, c.requested_by, c.status, c.message,
       c.created_at, c.updated_at, u.user_id AS peer_id, u.username
FROM connection c
JOIN user u ON u.user_id = c.requested_by
WHERE (c.user_min = ? OR c.user_max = ?)
  AND c.requested_by <> ?
  AND c.status = ?
ORDER BY c.created_at DESC
"#,
            )
            .bind(user)
            .bind(user)
            .bind(user)
            .bind(status)
            .fetch_all(&self.pool)
            .await
        } else {
            sqlx::query(
                r#"
SELECT c.connection_id, c.user_min, c.user_max, c.requested_by, c.status, c.message,
       c.created_at, c.updated_at, u.user_id AS peer_id, u.username
FROM connection c
JOIN user u ON u.user_id = c.requested_by
WHERE (c.user_min = ? OR c.user_max = ?)
  AND c.requested_by <> ?
ORDER BY c.created_at DESC
"#,
            )
            .bind(user)
            .bind(user)
            .bind(user)
            .fetch_all(&self.pool)
            .await
        }
        .map_err(|e| RelationError::Store(format!("list received connections: {e}")))?;

        Ok(rows.iter().map(Self::row_to_summary).collect())
    }

    async fn list_sent(
        &self,
        user: UserId,
        status: Option<ConnectionStatus>,
    ) -> Result<Vec<ConnectionSummary>, RelationError> {
        // peer of a sent connection is the side that is not the requester
        let rows = if let Some(status) = status {
            sqlx::query(
                r#"
SELECT c.connection_id, c.user_min, c.user_max, c.requested_by, c.status, c.message,
       c.created_at, c.updated_at, u.user_id AS peer_id, u.username
FROM connection c
JOIN user u ON u.user_id = IF(c.requested_by = c.user_min, c.user_max, c.user_min)
WHERE c.requested_by = ?
  AND c.status = ?
ORDER BY c.created_at DESC
"#,
            )
            .bind(user)
            .bind(status)
            .fetch_all(&self.pool)
            .await
        } else {
            sqlx::query(
                r#"
SELECT c.connection_id, c.user_min, c.user_max, c.requested_by, c.status, c.message,
       c.created_at, c.updated_at, u.user_id AS peer_id, u.username
FROM connection c
JOIN user u ON u.user_id = IF(c.requested_by = c.user_min, c.user_max, c.user_min)
WHERE c.requested_by = ?
ORDER BY c.created_at DESC
"#,
            )
            .bind(user)
            .fetch_all(&self.pool)
            .await
        }
        .map_err(|e| RelationError::Store(format!("list sent connections: {e}")))?;

        Ok(rows.iter().map(Self::row_to_summary).collect())
    }

    async fn list_accepted(&self, user: UserId) -> Result<Vec<PeerSummary>, RelationError> {
        let rows = sqlx::query(
            r#"
SELECT IF(? = c.user_min, c.user_max, c.user_min) AS peer_id,
       u.username,
       c.updated_at AS since
FROM connection c
JOIN user u ON u.user_id = IF(? = c.user_min, c.user_max, c.user_min)
WHERE c.status = 'accepted'
  AND (? = c.user_min OR ? = c.user_max)
ORDER BY c.updated_at DESC,
         u.username ASC
"#,
        )
        .bind(user)
        .bind(user)
        .bind(user)
        .bind(user)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| RelationError::Store(format!("list accepted connections: {e}")))?;

        let out = rows
            .into_iter()
            .map(|r| PeerSummary {
                user_id: r.get::<UserId, _>("peer_id"),
                username: r.get::<String, _>("username"),
                since: r.get::<DateTime<Utc>, _>("since"),
            })
            .collect();

        Ok(out)
    }

    async fn update_status(
        &self,
        id: ConnectionId,
        expected: ConnectionStatus,
        new_status: ConnectionStatus,
        at: DateTime<Utc>,
    ) -> Result<bool, RelationError> {
        // the status predicate makes this a compare-and-swap: a concurrent
        // transition that already moved the row leaves nothing to update
        let res = sqlx::query(
            r#"
UPDATE connection
SET status = ?, updated_at = ?
WHERE connection_id = ? AND status = ?
"#,
        )
        .bind(new_status)
        .bind(at)
        .bind(id)
        .bind(expected)
        .execute(&self.pool)
        .await
        .map_err(|e| RelationError::Store(format!("update connection status: {e}")))?;

        Ok(res.rows_affected() > 0)
    }

    async fn delete(&self, id: ConnectionId) -> Result<bool, RelationError> {
        let res = sqlx::query("DELETE FROM connection WHERE connection_id = ?")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| RelationError::Store(format!("delete connection: {e}")))?;

        Ok(res.rows_affected() > 0)
    }

    async fn rank_by_accepted(&self, limit: PageSize) -> Result<Vec<PeerRank>, RelationError> {
        let rows = sqlx::query(
            r#"
SELECT u.user_id, u.username, COUNT(*) AS accepted_count
FROM connection c
JOIN user u ON (u.user_id = c.user_min OR u.user_id = c.user_max)
WHERE c.status = 'accepted'
  AND u.is_active = 1
GROUP BY u.user_id, u.username
ORDER BY accepted_count DESC,
         u.username ASC
LIMIT ?
"#,
        )
        .bind(limit.0 as i64)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| RelationError::Store(format!("rank users by accepted: {e}")))?;

        let out = rows
            .into_iter()
            .map(|r| PeerRank {
                user_id: r.get::<UserId, _>("user_id"),
                username: r.get::<String, _>("username"),
                accepted_count: r.get::<i64, _>("accepted_count") as u64,
            })
            .collect();

        Ok(out)
    }

    async fn friends_of_friends(
        &self,
        user: UserId,
        limit: PageSize,
    ) -> Result<Vec<RecommendedPeer>, RelationError> {
        // one row per (my peer, their peer) path; COUNT(*) is the number of
        // shared connections since a pair can hold at most one row
        let rows = sqlx::query(
            r#"
WITH peers AS (
    SELECT IF(user_min = ?, user_max, user_min) AS peer
    FROM connection
    WHERE status = 'accepted'
      AND (user_min = ? OR user_max = ?)
)
SELECT u.user_id, u.username, COUNT(*) AS mutual_count
FROM peers p
JOIN connection c
  ON c.status = 'accepted'
 AND (c.user_min = p.peer OR c.user_max = p.peer)
JOIN user u ON u.user_id = IF(c.user_min = p.peer, c.user_max, c.user_min)
WHERE u.user_id <> ?
  AND u.is_active = 1
  AND NOT EXISTS (
      SELECT 1 FROM connection e
      WHERE e.user_min = LEAST(?, u.user_id)
        AND e.user_max = GREATEST(?, u.user_id)
  )
GROUP BY u.user_id, u.username
ORDER BY mutual_count DESC,
         u.username ASC
LIMIT ?
"#,
        )
        .bind(user)
        .bind(user)
        .bind(user)
        .bind(user)
        .bind(user)
        .bind(user)
        .bind(limit.0 as i64)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| RelationError::Store(format!("list recommended connections: {e}")))?;

        let out = rows
            .into_iter()
            .map(|r| RecommendedPeer {
                user_id: r.get::<UserId, _>("user_id"),
                username: r.get::<String, _>("username"),
                mutual_count: r.get::<i64, _>("mutual_count") as u64,
            })
            .collect();

        Ok(out)
    }
}
