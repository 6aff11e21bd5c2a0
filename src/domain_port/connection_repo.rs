use crate::application_port::RelationError;
use crate::domain_model::*;
use chrono::{DateTime, Utc};

/// Result of an insert attempt. The storage uniqueness constraint on the
/// normalized pair is the authoritative duplicate signal; `DuplicatePair`
/// is distinguishable from every other write failure.
#[derive(Debug, Eq, PartialEq)]
pub enum InsertOutcome {
    Inserted,
    DuplicatePair,
}

#[async_trait::async_trait]
pub trait ConnectionRepo: Send + Sync {
    async fn insert(&self, connection: &Connection) -> Result<InsertOutcome, RelationError>;

    async fn find_by_id(&self, id: ConnectionId) -> Result<Option<Connection>, RelationError>;

    /// The row for the pair, whichever direction it was requested in.
    async fn find_between(&self, a: UserId, b: UserId)
    -> Result<Option<Connection>, RelationError>;

    /// Best-effort pre-check only; concurrent creates race past it and are
    /// settled by the unique key at insert time.
    async fn exists_between(&self, a: UserId, b: UserId) -> Result<bool, RelationError>;

    /// Connections where `user` is the receiver, joined with the requester's
    /// profile, newest first.
    async fn list_received(
        &self,
        user: UserId,
        status: Option<ConnectionStatus>,
    ) -> Result<Vec<ConnectionSummary>, RelationError>;

    /// Connections requested by `user`, joined with the receiver's profile,
    /// newest first.
    async fn list_sent(
        &self,
        user: UserId,
        status: Option<ConnectionStatus>,
    ) -> Result<Vec<ConnectionSummary>, RelationError>;

    /// Accepted connections with the counterpart resolved per row.
    async fn list_accepted(&self, user: UserId) -> Result<Vec<PeerSummary>, RelationError>;

    /// Compare-and-swap status transition: the write applies only while the
    /// stored status still equals `expected`. Returns false when it no
    /// longer does (or the row is gone) — the caller lost the race.
    async fn update_status(
        &self,
        id: ConnectionId,
        expected: ConnectionStatus,
        new_status: ConnectionStatus,
        at: DateTime<Utc>,
    ) -> Result<bool, RelationError>;

    async fn delete(&self, id: ConnectionId) -> Result<bool, RelationError>;

    async fn rank_by_accepted(&self, limit: PageSize) -> Result<Vec<PeerRank>, RelationError>;

    /// Two-hop peers of `user` with mutual counts, excluding `user` and
    /// anyone already holding a connection with them in any status.
    async fn friends_of_friends(
        &self,
        user: UserId,
        limit: PageSize,
    ) -> Result<Vec<RecommendedPeer>, RelationError>;
}
