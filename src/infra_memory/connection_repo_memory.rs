use super::MemoryUserRepo;
use crate::application_port::RelationError;
use crate::domain_model::*;
use crate::domain_port::{ConnectionRepo, InsertOutcome};
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

/// In-process connection store. The pair index plays the role of the
/// relational unique key: claiming an entry is atomic, so concurrent
/// inserts for one pair resolve to exactly one winner.
pub struct MemoryConnectionRepo {
    user_repo: Arc<MemoryUserRepo>,
    by_id: DashMap<ConnectionId, Connection>,
    pair_index: DashMap<(UserId, UserId), ConnectionId>,
}

impl MemoryConnectionRepo {
    pub fn new(user_repo: Arc<MemoryUserRepo>) -> Self {
        MemoryConnectionRepo {
            user_repo,
            by_id: DashMap::new(),
            pair_index: DashMap::new(),
        }
    }

    fn pair_key(a: UserId, b: UserId) -> (UserId, UserId) {
        let pair = UserPair::new(a, b);
        (pair.min(), pair.max())
    }

    fn username_or_id(&self, user: UserId) -> String {
        self.user_repo
            .lookup(user)
            .unwrap_or_else(|| user.to_string())
    }

    fn to_summary(&self, connection: &Connection, peer_id: UserId) -> ConnectionSummary {
        ConnectionSummary {
            connection_id: connection.connection_id,
            requester: connection.requester,
            receiver: connection.receiver,
            status: connection.status,
            message: connection.message.clone(),
            created_at: connection.created_at,
            updated_at: connection.updated_at,
            peer: PeerProfile {
                user_id: peer_id,
                username: self.username_or_id(peer_id),
            },
        }
    }

    fn collect_newest_first<F>(&self, keep: F) -> Vec<Connection>
    where
        F: Fn(&Connection) -> bool,
    {
        let mut rows: Vec<Connection> = self
            .by_id
            .iter()
            .filter(|entry| keep(entry.value()))
            .map(|entry| entry.value().clone())
            .collect();
        rows.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then(a.connection_id.cmp(&b.connection_id))
        });
        rows
    }

    /// Accepted counterparts of `user`.
    fn peers_of(&self, user: UserId) -> Vec<(UserId, DateTime<Utc>)> {
        self.by_id
            .iter()
            .filter(|entry| {
                entry.value().status == ConnectionStatus::Accepted && entry.value().involves(user)
            })
            .filter_map(|entry| {
                entry
                    .value()
                    .counterpart(user)
                    .map(|peer| (peer, entry.value().updated_at))
            })
            .collect()
    }
}

#[async_trait::async_trait]
impl ConnectionRepo for MemoryConnectionRepo {
    async fn insert(&self, connection: &Connection) -> Result<InsertOutcome, RelationError> {
        let key = Self::pair_key(connection.requester, connection.receiver);

        // the row must be visible before the pair claim is, so a loser that
        // immediately re-reads the pair finds the winner's row
        self.by_id
            .insert(connection.connection_id, connection.clone());

        match self.pair_index.entry(key) {
            Entry::Vacant(slot) => {
                slot.insert(connection.connection_id);
                Ok(InsertOutcome::Inserted)
            }
            Entry::Occupied(_) => {
                self.by_id.remove(&connection.connection_id);
                Ok(InsertOutcome::DuplicatePair)
            }
        }
    }

    async fn find_by_id(&self, id: ConnectionId) -> Result<Option<Connection>, RelationError> {
        Ok(self.by_id.get(&id).map(|entry| entry.value().clone()))
    }

    async fn find_between(
        &self,
        a: UserId,
        b: UserId,
    ) -> Result<Option<Connection>, RelationError> {
        let id = match self.pair_index.get(&Self::pair_key(a, b)) {
            Some(entry) => *entry.value(),
            None => return Ok(None),
        };
        Ok(self.by_id.get(&id).map(|entry| entry.value().clone()))
    }

    async fn exists_between(&self, a: UserId, b: UserId) -> Result<bool, RelationError> {
        Ok(self.pair_index.contains_key(&Self::pair_key(a, b)))
    }

    async fn list_received(
        &self,
        user: UserId,
        status: Option<ConnectionStatus>,
    ) -> Result<Vec<ConnectionSummary>, RelationError> {
        let rows = self.collect_newest_first(|c| {
            c.receiver == user && status.is_none_or(|s| c.status == s)
        });
        Ok(rows
            .iter()
            .map(|c| self.to_summary(c, c.requester))
            .collect())
    }

    async fn list_sent(
        &self,
        user: UserId,
        status: Option<ConnectionStatus>,
    ) -> Result<Vec<ConnectionSummary>, RelationError> {
        let rows = self.collect_newest_first(|c| {
            c.requester == user && status.is_none_or(|s| c.status == s)
        });
        Ok(rows
            .iter()
            .map(|c| self.to_summary(c, c.receiver))
            .collect())
    }

    async fn list_accepted(&self, user: UserId) -> Result<Vec<PeerSummary>, RelationError> {
        let mut out: Vec<PeerSummary> = self
            .peers_of(user)
            .into_iter()
            .map(|(peer, since)| PeerSummary {
                user_id: peer,
                username: self.username_or_id(peer),
                since,
            })
            .collect();
        out.sort_by(|a, b| b.since.cmp(&a.since).then(a.username.cmp(&b.username)));
        Ok(out)
    }

    async fn update_status(
        &self,
        id: ConnectionId,
        expected: ConnectionStatus,
        new_status: ConnectionStatus,
        at: DateTime<Utc>,
    ) -> Result<bool, RelationError> {
        match self.by_id.get_mut(&id) {
            Some(mut entry) if entry.value().status == expected => {
                entry.value_mut().status = new_status;
                entry.value_mut().updated_at = at;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn delete(&self, id: ConnectionId) -> Result<bool, RelationError> {
        let Some((_, connection)) = self.by_id.remove(&id) else {
            return Ok(false);
        };
        let key = Self::pair_key(connection.requester, connection.receiver);
        self.pair_index.remove_if(&key, |_, held| *held == id);
        Ok(true)
    }

    async fn rank_by_accepted(&self, limit: PageSize) -> Result<Vec<PeerRank>, RelationError> {
        let mut counts: HashMap<UserId, u64> = HashMap::new();
        for entry in self.by_id.iter() {
            if entry.value().status == ConnectionStatus::Accepted {
                *counts.entry(entry.value().requester).or_default() += 1;
                *counts.entry(entry.value().receiver).or_default() += 1;
            }
        }

        let mut out: Vec<PeerRank> = counts
            .into_iter()
            .filter_map(|(user_id, accepted_count)| {
                self.user_repo.lookup(user_id).map(|username| PeerRank {
                    user_id,
                    username,
                    accepted_count,
                })
            })
            .collect();
        out.sort_by(|a, b| {
            b.accepted_count
                .cmp(&a.accepted_count)
                .then(a.username.cmp(&b.username))
        });
        out.truncate(limit.0 as usize);
        Ok(out)
    }

    async fn friends_of_friends(
        &self,
        user: UserId,
        limit: PageSize,
    ) -> Result<Vec<RecommendedPeer>, RelationError> {
        let peers: HashSet<UserId> = self.peers_of(user).into_iter().map(|(p, _)| p).collect();

        let mut mutuals: HashMap<UserId, u64> = HashMap::new();
        for peer in &peers {
            for (candidate, _) in self.peers_of(*peer) {
                if candidate == user {
                    continue;
                }
                if self
                    .pair_index
                    .contains_key(&Self::pair_key(user, candidate))
                {
                    continue;
                }
                *mutuals.entry(candidate).or_default() += 1;
            }
        }

        let mut out: Vec<RecommendedPeer> = mutuals
            .into_iter()
            .filter_map(|(user_id, mutual_count)| {
                self.user_repo
                    .lookup(user_id)
                    .map(|username| RecommendedPeer {
                        user_id,
                        username,
                        mutual_count,
                    })
            })
            .collect();
        out.sort_by(|a, b| {
            b.mutual_count
                .cmp(&a.mutual_count)
                .then(a.username.cmp(&b.username))
        });
        out.truncate(limit.0 as usize);
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn repo() -> (MemoryConnectionRepo, UserId, UserId) {
        let users = Arc::new(MemoryUserRepo::new());
        let a = users.add_user("alice");
        let b = users.add_user("bob");
        (MemoryConnectionRepo::new(users), a, b)
    }

    #[tokio::test]
    async fn duplicate_pair_is_detected_in_either_direction() {
        let (repo, a, b) = repo();

        let first = Connection::new_request(a, b, None, Utc::now());
        assert_eq!(repo.insert(&first).await.unwrap(), InsertOutcome::Inserted);

        let reversed = Connection::new_request(b, a, None, Utc::now());
        assert_eq!(
            repo.insert(&reversed).await.unwrap(),
            InsertOutcome::DuplicatePair
        );

        // the loser's row was not kept
        assert!(repo.find_by_id(reversed.connection_id).await.unwrap().is_none());
        let found = repo.find_between(b, a).await.unwrap().unwrap();
        assert_eq!(found.connection_id, first.connection_id);
    }

    #[tokio::test]
    async fn update_status_is_a_compare_and_swap() {
        let (repo, a, b) = repo();
        let connection = Connection::new_request(a, b, None, Utc::now());
        repo.insert(&connection).await.unwrap();

        let id = connection.connection_id;
        let accepted = repo
            .update_status(
                id,
                ConnectionStatus::Pending,
                ConnectionStatus::Accepted,
                Utc::now(),
            )
            .await
            .unwrap();
        assert!(accepted);

        // stale expectation: the row is no longer pending
        let rejected = repo
            .update_status(
                id,
                ConnectionStatus::Pending,
                ConnectionStatus::Rejected,
                Utc::now(),
            )
            .await
            .unwrap();
        assert!(!rejected);
        assert_eq!(
            repo.find_by_id(id).await.unwrap().unwrap().status,
            ConnectionStatus::Accepted
        );
    }

    #[tokio::test]
    async fn delete_releases_the_pair() {
        let (repo, a, b) = repo();
        let connection = Connection::new_request(a, b, None, Utc::now());
        repo.insert(&connection).await.unwrap();

        assert!(repo.delete(connection.connection_id).await.unwrap());
        assert!(!repo.exists_between(a, b).await.unwrap());

        let again = Connection::new_request(b, a, None, Utc::now());
        assert_eq!(repo.insert(&again).await.unwrap(), InsertOutcome::Inserted);
    }
}
