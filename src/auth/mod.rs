//! Identity resolution for bearer session tokens.
//!
//! Sessions are provisioned by the identity provider; this module only turns
//! a token back into a [`User`].

use std::sync::Arc;

use chrono::{Duration, Utc};
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::{
    domain::User,
    error::Result,
    repository::UserRepository,
};

pub mod session;

use session::{Session, SessionStore};

pub struct AuthService {
    session_store: SessionStore,
    user_repo: Arc<dyn UserRepository>,
}

impl AuthService {
    pub fn new(pool: SqlitePool, user_repo: Arc<dyn UserRepository>) -> Self {
        Self {
            session_store: SessionStore::new(pool),
            user_repo,
        }
    }

    /// Issues a new session and returns it with the plaintext token.
    pub async fn create_session(&self, user_id: Uuid, duration_hours: i64) -> Result<(Session, String)> {
        let token = generate_token();
        let expires_at = Utc::now() + Duration::hours(duration_hours);

        let session = self.session_store
            .create(user_id, &token, expires_at)
            .await?;

        Ok((session, token))
    }

    pub async fn validate_session(&self, token: &str) -> Result<Option<Session>> {
        self.session_store.find_by_token(token).await
    }

    pub async fn invalidate_session(&self, token: &str) -> Result<()> {
        self.session_store.delete_by_token(token).await
    }

    /// The active user behind `token`, if any.
    pub async fn authenticate(&self, token: &str) -> Result<Option<User>> {
        let Some(session) = self.validate_session(token).await? else {
            return Ok(None);
        };

        let user = self.user_repo.find_by_id(session.user_id).await?;
        Ok(user.filter(|u| u.is_active))
    }
}

fn generate_token() -> String {
    use rand::RngCore;
    let mut bytes = [0u8; 32];
    rand::thread_rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}
