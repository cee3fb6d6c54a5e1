//! Loan (borrow) model and related types

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

/// Loan lifecycle states, stored as SMALLINT
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[repr(i16)]
pub enum LoanStatus {
    Pending = 0,
    Active = 1,
    Overdue = 2,
    Returned = 3,
    Renewed = 4,
    Lost = 5,
}

impl LoanStatus {
    /// Active and Overdue loans keep the book out on the shelf
    pub fn blocks_availability(&self) -> bool {
        matches!(self, LoanStatus::Active | LoanStatus::Overdue)
    }
}

impl From<i16> for LoanStatus {
    fn from(v: i16) -> Self {
        match v {
            1 => LoanStatus::Active,
            2 => LoanStatus::Overdue,
            3 => LoanStatus::Returned,
            4 => LoanStatus::Renewed,
            5 => LoanStatus::Lost,
            _ => LoanStatus::Pending,
        }
    }
}

impl From<LoanStatus> for i16 {
    fn from(s: LoanStatus) -> Self {
        s as i16
    }
}

impl std::fmt::Display for LoanStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            LoanStatus::Pending => "Pending",
            LoanStatus::Active => "Active",
            LoanStatus::Overdue => "Overdue",
            LoanStatus::Returned => "Returned",
            LoanStatus::Renewed => "Renewed",
            LoanStatus::Lost => "Lost",
        };
        write!(f, "{}", label)
    }
}

/// Loan record
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Loan {
    pub id: Uuid,
    pub book_id: Uuid,
    pub user_id: Uuid,
    pub loan_date: DateTime<Utc>,
    pub due_date: DateTime<Utc>,
    pub return_date: Option<DateTime<Utc>>,
    pub status: LoanStatus,
    pub late_fee: Option<Decimal>,
}

impl Loan {
    /// A fresh Active loan running from `now` for `period_days`
    pub fn new(book_id: Uuid, user_id: Uuid, now: DateTime<Utc>, period_days: i64) -> Self {
        Self {
            id: Uuid::new_v4(),
            book_id,
            user_id,
            loan_date: now,
            due_date: now + chrono::Duration::days(period_days),
            return_date: None,
            status: LoanStatus::Active,
            late_fee: None,
        }
    }
}
