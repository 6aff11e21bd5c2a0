use crate::application_port::RelationError;
use crate::domain_model::UserId;

#[async_trait::async_trait]
pub trait UserRepo: Send + Sync {
    async fn username(&self, user: UserId) -> Result<Option<String>, RelationError>;
}
