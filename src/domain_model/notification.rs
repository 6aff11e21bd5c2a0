use crate::domain_model::{ConnectionId, PageSize, UserId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(
    Debug, Clone, Copy, Ord, PartialOrd, Eq, PartialEq, Hash, Serialize, Deserialize, sqlx::Type,
)]
#[sqlx(transparent)]
pub struct NotificationId(pub uuid::Uuid);

impl fmt::Display for NotificationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub enum NotificationKind {
    #[serde(rename = "connection.request")]
    ConnectionRequest,
    #[serde(rename = "connection.accepted")]
    ConnectionAccepted,
    #[serde(rename = "connection.rejected")]
    ConnectionRejected,
}

impl fmt::Display for NotificationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            NotificationKind::ConnectionRequest => "connection.request",
            NotificationKind::ConnectionAccepted => "connection.accepted",
            NotificationKind::ConnectionRejected => "connection.rejected",
        };
        f.write_str(s)
    }
}

impl FromStr for NotificationKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "connection.request" => Ok(Self::ConnectionRequest),
            "connection.accepted" => Ok(Self::ConnectionAccepted),
            "connection.rejected" => Ok(Self::ConnectionRejected),
            other => Err(format!("unknown notification kind: {other}")),
        }
    }
}

/// Structured notification payload, tagged by kind. One variant per
/// notification kind; the `kind` column and the payload tag always agree
/// because the kind is derived from the payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind")]
pub enum NotificationPayload {
    #[serde(rename = "connection.request")]
    ConnectionRequest {
        connection_id: ConnectionId,
        requester_id: UserId,
        requester_name: String,
    },
    #[serde(rename = "connection.accepted")]
    ConnectionAccepted {
        connection_id: ConnectionId,
        accepter_id: UserId,
        accepter_name: String,
    },
    #[serde(rename = "connection.rejected")]
    ConnectionRejected {
        connection_id: ConnectionId,
        rejecter_id: UserId,
    },
}

impl NotificationPayload {
    pub fn kind(&self) -> NotificationKind {
        match self {
            NotificationPayload::ConnectionRequest { .. } => NotificationKind::ConnectionRequest,
            NotificationPayload::ConnectionAccepted { .. } => NotificationKind::ConnectionAccepted,
            NotificationPayload::ConnectionRejected { .. } => NotificationKind::ConnectionRejected,
        }
    }

    /// Decodes a stored payload. Rows written as a JSON object decode
    /// directly; rows whose payload was serialized as a JSON string (a
    /// double-encoded object) are unwrapped first, so callers always get a
    /// structured value.
    pub fn from_db_value(value: serde_json::Value) -> Result<Self, serde_json::Error> {
        match value {
            serde_json::Value::String(s) => serde_json::from_str(&s),
            other => serde_json::from_value(other),
        }
    }
}

/// A durable inbox entry. Owned exclusively by `user_id`; the sender of the
/// underlying event never appears as an owner.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Notification {
    pub notification_id: NotificationId,
    pub user_id: UserId,
    pub kind: NotificationKind,
    pub title: String,
    pub message: String,
    pub payload: NotificationPayload,
    pub is_read: bool,
    pub created_at: DateTime<Utc>,
}

impl Notification {
    pub fn new(
        user_id: UserId,
        title: &str,
        message: &str,
        payload: NotificationPayload,
        now: DateTime<Utc>,
    ) -> Self {
        Notification {
            notification_id: NotificationId(uuid::Uuid::new_v4()),
            user_id,
            kind: payload.kind(),
            title: title.to_owned(),
            message: message.to_owned(),
            payload,
            is_read: false,
            created_at: now,
        }
    }
}

/// Limit/offset window over a user's inbox, newest first.
#[derive(Debug, Clone, Copy)]
pub struct InboxQuery {
    pub page_size: PageSize,
    pub offset: u32,
    pub unread_only: bool,
}

impl Default for InboxQuery {
    fn default() -> Self {
        InboxQuery {
            page_size: PageSize(20),
            offset: 0,
            unread_only: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_is_derived_from_payload() {
        let payload = NotificationPayload::ConnectionRequest {
            connection_id: ConnectionId(uuid::Uuid::new_v4()),
            requester_id: UserId(uuid::Uuid::new_v4()),
            requester_name: "alice".to_owned(),
        };
        let n = Notification::new(
            UserId(uuid::Uuid::new_v4()),
            "New connection request",
            "alice wants to connect with you",
            payload,
            Utc::now(),
        );
        assert_eq!(n.kind, NotificationKind::ConnectionRequest);
        assert!(!n.is_read);
    }

    #[test]
    fn payload_decodes_from_object_and_from_wrapped_string() {
        let payload = NotificationPayload::ConnectionAccepted {
            connection_id: ConnectionId(uuid::Uuid::new_v4()),
            accepter_id: UserId(uuid::Uuid::new_v4()),
            accepter_name: "bob".to_owned(),
        };
        let object = serde_json::to_value(&payload).unwrap();
        let wrapped = serde_json::Value::String(serde_json::to_string(&payload).unwrap());

        for value in [object, wrapped] {
            let decoded = NotificationPayload::from_db_value(value).unwrap();
            assert_eq!(decoded.kind(), NotificationKind::ConnectionAccepted);
        }
    }
}
