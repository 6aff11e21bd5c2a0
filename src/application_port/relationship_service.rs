use crate::domain_model::*;

#[derive(Debug, thiserror::Error)]
pub enum RelationError {
    #[error("connection not found")]
    NotFound,
    #[error("caller is not a participant allowed to perform this operation")]
    Forbidden,
    #[error("conflict: {0}")]
    Conflict(String),
    #[error("invalid request: {0}")]
    Validation(String),
    #[error("store error: {0}")]
    Store(String),
}

/// Outcome of a create call. "Already exists" is a success variant carrying
/// the existing row, never an error; callers must branch on it explicitly.
#[derive(Debug)]
pub enum CreateOutcome {
    Created(Connection),
    Existing(Connection),
}

impl CreateOutcome {
    pub fn connection(&self) -> &Connection {
        match self {
            CreateOutcome::Created(c) | CreateOutcome::Existing(c) => c,
        }
    }
}

#[async_trait::async_trait]
pub trait RelationshipService: Send + Sync {
    /// Creates a pending connection from `requester` to `receiver`.
    /// Returns `Existing` when the pair already holds a row, whichever
    /// direction it was requested in.
    async fn create_connection(
        &self,
        requester: UserId,
        receiver: UserId,
        message: Option<String>,
    ) -> Result<CreateOutcome, RelationError>;

    /// Receiver-only transition pending → accepted.
    async fn accept_connection(
        &self,
        id: ConnectionId,
        caller: UserId,
    ) -> Result<Connection, RelationError>;

    /// Receiver-only transition pending → rejected.
    async fn reject_connection(
        &self,
        id: ConnectionId,
        caller: UserId,
    ) -> Result<Connection, RelationError>;

    /// Either participant may block a pending or accepted connection.
    async fn block_connection(
        &self,
        id: ConnectionId,
        caller: UserId,
    ) -> Result<Connection, RelationError>;

    /// Either participant may remove the connection entirely.
    async fn delete_connection(&self, id: ConnectionId, caller: UserId)
    -> Result<(), RelationError>;

    async fn list_received(
        &self,
        user: UserId,
        status: Option<ConnectionStatus>,
    ) -> Result<Vec<ConnectionSummary>, RelationError>;

    async fn list_sent(
        &self,
        user: UserId,
        status: Option<ConnectionStatus>,
    ) -> Result<Vec<ConnectionSummary>, RelationError>;

    async fn list_accepted(&self, user: UserId) -> Result<Vec<PeerSummary>, RelationError>;

    async fn connection_stats(&self, user: UserId) -> Result<ConnectionStats, RelationError>;

    /// Users ranked by accepted-connection count.
    async fn popular_users(&self, limit: PageSize) -> Result<Vec<PeerRank>, RelationError>;

    /// Friends-of-friends suggestions for `user`, most mutuals first.
    async fn recommended_connections(
        &self,
        user: UserId,
        limit: PageSize,
    ) -> Result<Vec<RecommendedPeer>, RelationError>;
}
