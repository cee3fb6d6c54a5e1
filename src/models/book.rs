//! Book model and the fully-loaded circulation aggregate

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

use super::{loan::Loan, reservation::Reservation};

/// Catalog book record.
///
/// Owned by the catalog; the circulation engine reads it and never writes
/// it — a book's availability is implied by its loans and reservations.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Book {
    pub id: Uuid,
    pub title: String,
    pub author: Option<String>,
    pub isbn: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// A book together with all of its loans and reservations, freshly loaded.
///
/// The availability predicates operate on this aggregate so that every
/// check sees the latest persisted state rather than a cached flag.
#[derive(Debug, Clone)]
pub struct BookAggregate {
    pub book: Book,
    pub loans: Vec<Loan>,
    pub reservations: Vec<Reservation>,
}
