use crate::application_port::RelationError;
use crate::domain_model::UserId;
use crate::domain_port::UserRepo;
use sqlx::{MySqlPool, Row};

pub struct MySqlUserRepo {
    pool: MySqlPool,
}

impl MySqlUserRepo {
    pub fn new(pool: MySqlPool) -> Self {
        MySqlUserRepo { pool }
    }
}

#[async_trait::async_trait]
impl UserRepo for MySqlUserRepo {
    async fn username(&self, user: UserId) -> Result<Option<String>, RelationError> {
        let row = sqlx::query("SELECT username FROM user WHERE user_id = ? AND is_active = 1")
            .bind(user)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| RelationError::Store(format!("query username: {e}")))?;

        Ok(row.map(|r| r.get::<String, _>("username")))
    }
}
