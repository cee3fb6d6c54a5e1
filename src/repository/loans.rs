//! Loans repository for database operations

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{Pool, Postgres};
use uuid::Uuid;

use crate::{
    error::AppResult,
    models::loan::{Loan, LoanStatus},
};

use super::LoanRepository;

#[derive(Clone)]
pub struct LoansRepository {
    pool: Pool<Postgres>,
}

impl LoansRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl LoanRepository for LoansRepository {
    async fn find(&self, id: Uuid) -> AppResult<Option<Loan>> {
        let loan = sqlx::query_as::<_, Loan>("SELECT * FROM loans WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(loan)
    }

    async fn insert(&self, loan: &Loan) -> AppResult<()> {
        sqlx::query(
            r#"
            INSERT INTO loans (id, book_id, user_id, loan_date, due_date, return_date, status, late_fee)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(loan.id)
        .bind(loan.book_id)
        .bind(loan.user_id)
        .bind(loan.loan_date)
        .bind(loan.due_date)
        .bind(loan.return_date)
        .bind(loan.status)
        .bind(loan.late_fee)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn update(&self, loan: &Loan) -> AppResult<()> {
        sqlx::query(
            r#"
            UPDATE loans
            SET due_date = $2, return_date = $3, status = $4, late_fee = $5
            WHERE id = $1
            "#,
        )
        .bind(loan.id)
        .bind(loan.due_date)
        .bind(loan.return_date)
        .bind(loan.status)
        .bind(loan.late_fee)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn list_unreturned_by_user(&self, user_id: Uuid) -> AppResult<Vec<Loan>> {
        let loans = sqlx::query_as::<_, Loan>(
            r#"
            SELECT * FROM loans
            WHERE user_id = $1 AND return_date IS NULL AND status IN ($2, $3)
            ORDER BY loan_date
            "#,
        )
        .bind(user_id)
        .bind(LoanStatus::Active)
        .bind(LoanStatus::Overdue)
        .fetch_all(&self.pool)
        .await?;
        Ok(loans)
    }

    async fn list_overdue(&self, as_of: DateTime<Utc>) -> AppResult<Vec<Loan>> {
        let loans = sqlx::query_as::<_, Loan>(
            r#"
            SELECT * FROM loans
            WHERE status = $1 AND due_date < $2
            ORDER BY due_date
            "#,
        )
        .bind(LoanStatus::Active)
        .bind(as_of)
        .fetch_all(&self.pool)
        .await?;
        Ok(loans)
    }
}
