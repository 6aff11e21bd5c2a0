use crate::application_port::RelationError;
use crate::domain_model::UserId;
use crate::domain_port::UserRepo;
use dashmap::DashMap;

/// In-process user directory for the `memory` backend and for tests.
#[derive(Default)]
pub struct MemoryUserRepo {
    users: DashMap<UserId, String>,
}

impl MemoryUserRepo {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_user(&self, username: &str) -> UserId {
        let user_id = UserId(uuid::Uuid::new_v4());
        self.users.insert(user_id, username.to_owned());
        user_id
    }

    pub fn lookup(&self, user: UserId) -> Option<String> {
        self.users.get(&user).map(|name| name.clone())
    }
}

#[async_trait::async_trait]
impl UserRepo for MemoryUserRepo {
    async fn username(&self, user: UserId) -> Result<Option<String>, RelationError> {
        Ok(self.lookup(user))
    }
}
