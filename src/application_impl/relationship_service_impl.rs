use crate::application_impl::EntityCache;
use crate::application_port::*;
use crate::domain_model::*;
use crate::domain_port::{ConnectionRepo, InsertOutcome, UserRepo};
use chrono::Utc;
use serde::Serialize;
use std::sync::Arc;

/// Cache key discriminator for the received/sent listings.
#[derive(Serialize)]
struct ListFilter {
    scope: &'static str,
    status: Option<ConnectionStatus>,
}

pub struct RealRelationshipService {
    connection_repo: Arc<dyn ConnectionRepo>,
    user_repo: Arc<dyn UserRepo>,
    dispatcher: Arc<dyn NotificationDispatcher>,
    cache: Arc<EntityCache>,
}

impl RealRelationshipService {
    pub fn new(
        connection_repo: Arc<dyn ConnectionRepo>,
        user_repo: Arc<dyn UserRepo>,
        dispatcher: Arc<dyn NotificationDispatcher>,
        cache: Arc<EntityCache>,
    ) -> Self {
        Self {
            connection_repo,
            user_repo,
            dispatcher,
            cache,
        }
    }

    /// CAS transition. A miss after a passing guard means a concurrent
    /// writer moved the row first; that loss surfaces as a conflict instead
    /// of silently overwriting it.
    async fn transition(
        &self,
        mut connection: Connection,
        new_status: ConnectionStatus,
    ) -> Result<Connection, RelationError> {
        let now = Utc::now();
        let swapped = self
            .connection_repo
            .update_status(connection.connection_id, connection.status, new_status, now)
            .await?;
        if !swapped {
            return Err(RelationError::Conflict(format!(
                "connection {} changed concurrently",
                connection.connection_id
            )));
        }

        connection.status = new_status;
        connection.updated_at = now;
        Ok(connection)
    }

    async fn display_name(&self, user: UserId) -> String {
        match self.user_repo.username(user).await {
            Ok(Some(name)) => name,
            Ok(None) => user.to_string(),
            Err(e) => {
                tracing::warn!("resolve username for {user}: {e}");
                user.to_string()
            }
        }
    }

    /// Durable + live fan-out is a secondary effect: failures are logged
    /// and the enclosing mutation still reports success.
    async fn notify(&self, recipient: UserId, title: &str, message: &str, payload: NotificationPayload) {
        let kind = payload.kind();
        if let Err(e) = self
            .dispatcher
            .dispatch(recipient, title, message, payload)
            .await
        {
            tracing::warn!("{kind} notification for {recipient} dropped: {e}");
        }
    }

    async fn invalidate_participants(&self, a: UserId, b: UserId) {
        self.cache.invalidate_entity(a).await;
        self.cache.invalidate_entity(b).await;
    }
}

#[async_trait::async_trait]
impl RelationshipService for RealRelationshipService {
    async fn create_connection(
        &self,
        requester: UserId,
        receiver: UserId,
        message: Option<String>,
    ) -> Result<CreateOutcome, RelationError> {
        let connection = Connection::new_request(requester, receiver, message, Utc::now());
        if !connection.is_valid() {
            return Err(RelationError::Validation(format!(
                "participants must differ and the message may not exceed {MAX_MESSAGE_LEN} characters"
            )));
        }

        // pre-check is an optimization only; the unique key decides races
        if self.connection_repo.exists_between(requester, receiver).await? {
            if let Some(existing) = self.connection_repo.find_between(requester, receiver).await? {
                return Ok(CreateOutcome::Existing(existing));
            }
        }

        match self.connection_repo.insert(&connection).await? {
            InsertOutcome::Inserted => {
                let requester_name = self.display_name(requester).await;
                self.notify(
                    receiver,
                    "New connection request",
                    &format!("{requester_name} wants to connect with you"),
                    NotificationPayload::ConnectionRequest {
                        connection_id: connection.connection_id,
                        requester_id: requester,
                        requester_name,
                    },
                )
                .await;
                self.invalidate_participants(requester, receiver).await;
                Ok(CreateOutcome::Created(connection))
            }
            InsertOutcome::DuplicatePair => {
                // lost the insert race: the winner's row is the answer
                let existing = self
                    .connection_repo
                    .find_between(requester, receiver)
                    .await?
                    .ok_or_else(|| {
                        RelationError::Store("inconsistent connection state".to_owned())
                    })?;
                Ok(CreateOutcome::Existing(existing))
            }
        }
    }

    async fn accept_connection(
        &self,
        id: ConnectionId,
        caller: UserId,
    ) -> Result<Connection, RelationError> {
        let connection = self
            .connection_repo
            .find_by_id(id)
            .await?
            .ok_or(RelationError::NotFound)?;
        if caller != connection.receiver {
            return Err(RelationError::Forbidden);
        }
        if !connection.can_be_accepted() {
            return Err(RelationError::Conflict(format!(
                "connection is {}, only pending connections can be accepted",
                connection.status
            )));
        }

        let connection = self
            .transition(connection, ConnectionStatus::Accepted)
            .await?;

        let accepter_name = self.display_name(caller).await;
        self.notify(
            connection.requester,
            "Connection accepted",
            &format!("{accepter_name} accepted your connection request"),
            NotificationPayload::ConnectionAccepted {
                connection_id: connection.connection_id,
                accepter_id: caller,
                accepter_name,
            },
        )
        .await;
        self.invalidate_participants(connection.requester, connection.receiver)
            .await;

        Ok(connection)
    }

    async fn reject_connection(
        &self,
        id: ConnectionId,
        caller: UserId,
    ) -> Result<Connection, RelationError> {
        let connection = self
            .connection_repo
            .find_by_id(id)
            .await?
            .ok_or(RelationError::NotFound)?;
        if caller != connection.receiver {
            return Err(RelationError::Forbidden);
        }
        if !connection.can_be_rejected() {
            return Err(RelationError::Conflict(format!(
                "connection is {}, only pending connections can be rejected",
                connection.status
            )));
        }

        let connection = self
            .transition(connection, ConnectionStatus::Rejected)
            .await?;

        self.notify(
            connection.requester,
            "Connection declined",
            "Your connection request was declined",
            NotificationPayload::ConnectionRejected {
                connection_id: connection.connection_id,
                rejecter_id: caller,
            },
        )
        .await;
        self.invalidate_participants(connection.requester, connection.receiver)
            .await;

        Ok(connection)
    }

    async fn block_connection(
        &self,
        id: ConnectionId,
        caller: UserId,
    ) -> Result<Connection, RelationError> {
        let connection = self
            .connection_repo
            .find_by_id(id)
            .await?
            .ok_or(RelationError::NotFound)?;
        if !connection.involves(caller) {
            return Err(RelationError::Forbidden);
        }
        if !connection.can_be_blocked() {
            return Err(RelationError::Conflict(format!(
                "connection is {}, only pending or accepted connections can be blocked",
                connection.status
            )));
        }

        let connection = self.transition(connection, ConnectionStatus::Blocked).await?;

        // a block is silent: the counterpart is not notified
        self.invalidate_participants(connection.requester, connection.receiver)
            .await;

        Ok(connection)
    }

    async fn delete_connection(
        &self,
        id: ConnectionId,
        caller: UserId,
    ) -> Result<(), RelationError> {
        let connection = self
            .connection_repo
            .find_by_id(id)
            .await?
            .ok_or(RelationError::NotFound)?;
        if !connection.involves(caller) {
            return Err(RelationError::Forbidden);
        }

        if !self.connection_repo.delete(id).await? {
            tracing::debug!("connection {id} was deleted concurrently");
        }
        self.invalidate_participants(connection.requester, connection.receiver)
            .await;

        Ok(())
    }

    async fn list_received(
        &self,
        user: UserId,
        status: Option<ConnectionStatus>,
    ) -> Result<Vec<ConnectionSummary>, RelationError> {
        let filter = ListFilter {
            scope: "received",
            status,
        };
        if let Some(hit) = self.cache.get_filtered_list(user, &filter).await {
            return Ok(hit);
        }

        let rows = self.connection_repo.list_received(user, status).await?;
        self.cache.put_filtered_list(user, &filter, &rows).await;
        Ok(rows)
    }

    async fn list_sent(
        &self,
        user: UserId,
        status: Option<ConnectionStatus>,
    ) -> Result<Vec<ConnectionSummary>, RelationError> {
        let filter = ListFilter {
            scope: "sent",
            status,
        };
        if let Some(hit) = self.cache.get_filtered_list(user, &filter).await {
            return Ok(hit);
        }

        let rows = self.connection_repo.list_sent(user, status).await?;
        self.cache.put_filtered_list(user, &filter, &rows).await;
        Ok(rows)
    }

    async fn list_accepted(&self, user: UserId) -> Result<Vec<PeerSummary>, RelationError> {
        if let Some(hit) = self.cache.get_list(user).await {
            return Ok(hit);
        }

        let rows = self.connection_repo.list_accepted(user).await?;
        self.cache.put_list(user, &rows).await;
        Ok(rows)
    }

    async fn connection_stats(&self, user: UserId) -> Result<ConnectionStats, RelationError> {
        if let Some(hit) = self.cache.get_entity(user).await {
            return Ok(hit);
        }

        let received = self.connection_repo.list_received(user, None).await?;
        let sent = self.connection_repo.list_sent(user, None).await?;
        let accepted = self.connection_repo.list_accepted(user).await?;

        let stats = ConnectionStats::reduce(&received, &sent, &accepted);
        self.cache.put_entity(user, &stats).await;
        Ok(stats)
    }

    async fn popular_users(&self, limit: PageSize) -> Result<Vec<PeerRank>, RelationError> {
        if let Some(hit) = self.cache.get_popular(limit.0).await {
            return Ok(hit);
        }

        let ranking = self.connection_repo.rank_by_accepted(limit).await?;
        self.cache.put_popular(limit.0, &ranking).await;
        Ok(ranking)
    }

    async fn recommended_connections(
        &self,
        user: UserId,
        limit: PageSize,
    ) -> Result<Vec<RecommendedPeer>, RelationError> {
        if let Some(hit) = self.cache.get_recommended(user, limit.0).await {
            return Ok(hit);
        }

        let suggestions = self.connection_repo.friends_of_friends(user, limit).await?;
        self.cache.put_recommended(user, limit.0, &suggestions).await;
        Ok(suggestions)
    }
}
