//! Late-return and lost-item fee model

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

/// What the fee was assessed for, stored as SMALLINT
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[repr(i16)]
pub enum FineType {
    LateReturn = 0,
    LostItem = 1,
}

impl From<i16> for FineType {
    fn from(v: i16) -> Self {
        match v {
            1 => FineType::LostItem,
            _ => FineType::LateReturn,
        }
    }
}

impl From<FineType> for i16 {
    fn from(t: FineType) -> Self {
        t as i16
    }
}

/// Fee settlement states, stored as SMALLINT
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[repr(i16)]
pub enum FeeStatus {
    Pending = 0,
    Notified = 1,
    Paid = 2,
    Waived = 3,
    Cancelled = 4,
}

impl FeeStatus {
    /// Paid, Waived and Cancelled fees accept no further transitions
    pub fn is_settled(&self) -> bool {
        matches!(self, FeeStatus::Paid | FeeStatus::Waived | FeeStatus::Cancelled)
    }
}

impl From<i16> for FeeStatus {
    fn from(v: i16) -> Self {
        match v {
            1 => FeeStatus::Notified,
            2 => FeeStatus::Paid,
            3 => FeeStatus::Waived,
            4 => FeeStatus::Cancelled,
            _ => FeeStatus::Pending,
        }
    }
}

impl From<FeeStatus> for i16 {
    fn from(s: FeeStatus) -> Self {
        s as i16
    }
}

impl std::fmt::Display for FeeStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            FeeStatus::Pending => "Pending",
            FeeStatus::Notified => "Notified",
            FeeStatus::Paid => "Paid",
            FeeStatus::Waived => "Waived",
            FeeStatus::Cancelled => "Cancelled",
        };
        write!(f, "{}", label)
    }
}

/// Monetary assessment attached to a loan
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Fee {
    pub id: Uuid,
    pub user_id: Uuid,
    pub loan_id: Uuid,
    pub amount: Decimal,
    pub issued_date: DateTime<Utc>,
    pub paid_date: Option<DateTime<Utc>>,
    pub status: FeeStatus,
    pub fine_type: FineType,
    pub description: Option<String>,
}

impl Fee {
    pub fn new(
        user_id: Uuid,
        loan_id: Uuid,
        amount: Decimal,
        fine_type: FineType,
        issued_date: DateTime<Utc>,
        description: Option<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id,
            loan_id,
            amount,
            issued_date,
            paid_date: None,
            status: FeeStatus::Pending,
            fine_type,
            description,
        }
    }
}
