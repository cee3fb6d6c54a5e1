//! Fees repository for database operations

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{Pool, Postgres};
use uuid::Uuid;

use crate::{
    error::AppResult,
    models::fee::{Fee, FeeStatus},
};

use super::FeeRepository;

#[derive(Clone)]
pub struct FeesRepository {
    pool: Pool<Postgres>,
}

impl FeesRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl FeeRepository for FeesRepository {
    async fn find(&self, id: Uuid) -> AppResult<Option<Fee>> {
        let fee = sqlx::query_as::<_, Fee>("SELECT * FROM fees WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(fee)
    }

    async fn insert(&self, fee: &Fee) -> AppResult<()> {
        sqlx::query(
            r#"
            INSERT INTO fees
                (id, user_id, loan_id, amount, issued_date, paid_date, status, fine_type, description)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(fee.id)
        .bind(fee.user_id)
        .bind(fee.loan_id)
        .bind(fee.amount)
        .bind(fee.issued_date)
        .bind(fee.paid_date)
        .bind(fee.status)
        .bind(fee.fine_type)
        .bind(&fee.description)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn update(&self, fee: &Fee) -> AppResult<()> {
        sqlx::query(
            r#"
            UPDATE fees
            SET paid_date = $2, status = $3
            WHERE id = $1
            "#,
        )
        .bind(fee.id)
        .bind(fee.paid_date)
        .bind(fee.status)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn list_for_user(&self, user_id: Uuid) -> AppResult<Vec<Fee>> {
        let fees = sqlx::query_as::<_, Fee>(
            "SELECT * FROM fees WHERE user_id = $1 ORDER BY issued_date DESC",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(fees)
    }

    async fn list_pending_issued_before(&self, cutoff: DateTime<Utc>) -> AppResult<Vec<Fee>> {
        let fees = sqlx::query_as::<_, Fee>(
            r#"
            SELECT * FROM fees
            WHERE status = $1 AND issued_date <= $2
            ORDER BY issued_date
            "#,
        )
        .bind(FeeStatus::Pending)
        .bind(cutoff)
        .fetch_all(&self.pool)
        .await?;
        Ok(fees)
    }
}
