//! Membership status lookup.
//!
//! Member records are owned by the user-management collaborator; the
//! circulation engine only asks whether a membership is currently active.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{Pool, Postgres};
use uuid::Uuid;

use crate::error::AppResult;

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MembershipStatusProvider: Send + Sync {
    async fn is_active(&self, user_id: Uuid) -> AppResult<bool>;
}

#[derive(Clone)]
pub struct PgMembershipProvider {
    pool: Pool<Postgres>,
}

impl PgMembershipProvider {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl MembershipStatusProvider for PgMembershipProvider {
    async fn is_active(&self, user_id: Uuid) -> AppResult<bool> {
        let expires_at: Option<Option<DateTime<Utc>>> =
            sqlx::query_scalar("SELECT membership_expires_at FROM members WHERE id = $1")
                .bind(user_id)
                .fetch_optional(&self.pool)
                .await?;

        // Unknown member counts as inactive; a NULL expiry never lapses
        Ok(match expires_at {
            None => false,
            Some(None) => true,
            Some(Some(expiry)) => expiry > Utc::now(),
        })
    }
}
