use crate::domain_model::{PeerProfile, UserId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(
    Debug, Clone, Copy, Ord, PartialOrd, Eq, PartialEq, Hash, Serialize, Deserialize, sqlx::Type,
)]
#[sqlx(transparent)]
pub struct ConnectionId(pub uuid::Uuid);

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Upper bound on the optional request message, in characters.
pub const MAX_MESSAGE_LEN: usize = 500;

#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionStatus {
    Pending,
    Accepted,
    Rejected,
    Blocked,
}

impl fmt::Display for ConnectionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ConnectionStatus::Pending => "pending",
            ConnectionStatus::Accepted => "accepted",
            ConnectionStatus::Rejected => "rejected",
            ConnectionStatus::Blocked => "blocked",
        };
        f.write_str(s)
    }
}

impl FromStr for ConnectionStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "accepted" => Ok(Self::Accepted),
            "rejected" => Ok(Self::Rejected),
            "blocked" => Ok(Self::Blocked),
            other => Err(format!("unknown connection status: {other}")),
        }
    }
}

/// A bidirectional connection between two users.
///
/// Lifecycle: created as `pending` by the requester; the receiver may move it
/// to `accepted` or `rejected`; either participant may move a pending or
/// accepted connection to `blocked`. `rejected` and `blocked` are terminal.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Connection {
    pub connection_id: ConnectionId,
    pub requester: UserId,
    pub receiver: UserId,
    pub status: ConnectionStatus,
    pub message: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Connection {
    pub fn new_request(
        requester: UserId,
        receiver: UserId,
        message: Option<String>,
        now: DateTime<Utc>,
    ) -> Self {
        Connection {
            connection_id: ConnectionId(uuid::Uuid::new_v4()),
            requester,
            receiver,
            status: ConnectionStatus::Pending,
            message,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn can_be_accepted(&self) -> bool {
        self.status == ConnectionStatus::Pending
    }

    pub fn can_be_rejected(&self) -> bool {
        self.status == ConnectionStatus::Pending
    }

    pub fn can_be_blocked(&self) -> bool {
        matches!(
            self.status,
            ConnectionStatus::Pending | ConnectionStatus::Accepted
        )
    }

    pub fn involves(&self, user: UserId) -> bool {
        self.requester == user || self.receiver == user
    }

    /// The other participant, when `user` is one of the two.
    pub fn counterpart(&self, user: UserId) -> Option<UserId> {
        if user == self.requester {
            Some(self.receiver)
        } else if user == self.receiver {
            Some(self.requester)
        } else {
            None
        }
    }

    pub fn is_valid(&self) -> bool {
        let message_ok = self
            .message
            .as_ref()
            .is_none_or(|m| m.chars().count() <= MAX_MESSAGE_LEN);
        self.requester != self.receiver && message_ok
    }
}

/// A connection row joined with the counterpart's public profile,
/// as returned by the received/sent listings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectionSummary {
    pub connection_id: ConnectionId,
    pub requester: UserId,
    pub receiver: UserId,
    pub status: ConnectionStatus,
    pub message: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub peer: PeerProfile,
}

/// One row of the accepted-connections listing; `since` is the accept time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PeerSummary {
    pub user_id: UserId,
    pub username: String,
    pub since: DateTime<Utc>,
}

/// One row of the accepted-count ranking.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PeerRank {
    pub user_id: UserId,
    pub username: String,
    pub accepted_count: u64,
}

/// A friends-of-friends suggestion with the number of shared connections.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecommendedPeer {
    pub user_id: UserId,
    pub username: String,
    pub mutual_count: u64,
}

#[derive(Debug, Clone, Copy, Default, Eq, PartialEq, Serialize, Deserialize)]
pub struct DirectionStats {
    pub total: u64,
    pub pending: u64,
    pub accepted: u64,
    pub rejected: u64,
}

impl DirectionStats {
    fn tally(rows: &[ConnectionSummary]) -> Self {
        let mut stats = DirectionStats {
            total: rows.len() as u64,
            ..Default::default()
        };
        for row in rows {
            match row.status {
                ConnectionStatus::Pending => stats.pending += 1,
                ConnectionStatus::Accepted => stats.accepted += 1,
                ConnectionStatus::Rejected => stats.rejected += 1,
                ConnectionStatus::Blocked => {}
            }
        }
        stats
    }
}

/// Per-user counters reduced from the received/sent/accepted sets.
/// `total == received.total + sent.total` holds by construction.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Serialize, Deserialize)]
pub struct ConnectionStats {
    pub total: u64,
    pub received: DirectionStats,
    pub sent: DirectionStats,
    pub friends: u64,
}

impl ConnectionStats {
    pub fn reduce(
        received: &[ConnectionSummary],
        sent: &[ConnectionSummary],
        accepted: &[PeerSummary],
    ) -> Self {
        let received = DirectionStats::tally(received);
        let sent = DirectionStats::tally(sent);
        ConnectionStats {
            total: received.total + sent.total,
            received,
            sent,
            friends: accepted.len() as u64,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn connection(status: ConnectionStatus) -> Connection {
        let mut c = Connection::new_request(
            UserId(uuid::Uuid::new_v4()),
            UserId(uuid::Uuid::new_v4()),
            Some("Hi there".to_owned()),
            Utc::now(),
        );
        c.status = status;
        c
    }

    #[test]
    fn accept_and_reject_guards_hold_only_for_pending() {
        for status in [
            ConnectionStatus::Pending,
            ConnectionStatus::Accepted,
            ConnectionStatus::Rejected,
            ConnectionStatus::Blocked,
        ] {
            let c = connection(status);
            assert_eq!(c.can_be_accepted(), status == ConnectionStatus::Pending);
            assert_eq!(c.can_be_rejected(), status == ConnectionStatus::Pending);
        }
    }

    #[test]
    fn block_guard_holds_for_pending_and_accepted() {
        assert!(connection(ConnectionStatus::Pending).can_be_blocked());
        assert!(connection(ConnectionStatus::Accepted).can_be_blocked());
        assert!(!connection(ConnectionStatus::Rejected).can_be_blocked());
        assert!(!connection(ConnectionStatus::Blocked).can_be_blocked());
    }

    #[test]
    fn validity_rejects_self_pairs_and_oversize_messages() {
        let user = UserId(uuid::Uuid::new_v4());
        let mut c = connection(ConnectionStatus::Pending);
        assert!(c.is_valid());

        c.message = Some("x".repeat(MAX_MESSAGE_LEN + 1));
        assert!(!c.is_valid());
        c.message = None;
        assert!(c.is_valid());

        c.requester = user;
        c.receiver = user;
        assert!(!c.is_valid());
    }

    #[test]
    fn counterpart_resolves_either_side() {
        let c = connection(ConnectionStatus::Pending);
        assert_eq!(c.counterpart(c.requester), Some(c.receiver));
        assert_eq!(c.counterpart(c.receiver), Some(c.requester));
        assert_eq!(c.counterpart(UserId(uuid::Uuid::new_v4())), None);
    }

    #[test]
    fn user_pair_normalizes_direction() {
        let a = UserId(uuid::Uuid::new_v4());
        let b = UserId(uuid::Uuid::new_v4());
        let ab = crate::domain_model::UserPair::new(a, b);
        let ba = crate::domain_model::UserPair::new(b, a);
        assert_eq!(ab.min(), ba.min());
        assert_eq!(ab.max(), ba.max());
        assert!(ab.min() < ab.max());
    }

    #[test]
    fn stats_reduce_counts_by_direction_and_status() {
        let rows = |statuses: &[ConnectionStatus]| {
            statuses
                .iter()
                .map(|s| {
                    let c = connection(*s);
                    ConnectionSummary {
                        connection_id: c.connection_id,
                        requester: c.requester,
                        receiver: c.receiver,
                        status: c.status,
                        message: None,
                        created_at: c.created_at,
                        updated_at: c.updated_at,
                        peer: PeerProfile {
                            user_id: c.requester,
                            username: "peer".to_owned(),
                        },
                    }
                })
                .collect::<Vec<_>>()
        };

        let received = rows(&[
            ConnectionStatus::Pending,
            ConnectionStatus::Accepted,
            ConnectionStatus::Blocked,
        ]);
        let sent = rows(&[ConnectionStatus::Rejected]);
        let accepted = vec![PeerSummary {
            user_id: UserId(uuid::Uuid::new_v4()),
            username: "peer".to_owned(),
            since: Utc::now(),
        }];

        let stats = ConnectionStats::reduce(&received, &sent, &accepted);
        assert_eq!(stats.total, 4);
        assert_eq!(stats.total, stats.received.total + stats.sent.total);
        assert_eq!(stats.received.pending, 1);
        assert_eq!(stats.received.accepted, 1);
        assert_eq!(stats.received.rejected, 0);
        assert_eq!(stats.sent.rejected, 1);
        assert_eq!(stats.friends, 1);
    }
}
