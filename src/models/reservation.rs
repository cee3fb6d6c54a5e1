//! Reservation (waitlist entry) model and related types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

/// Reservation states, stored as SMALLINT
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[repr(i16)]
pub enum ReservationStatus {
    Pending = 0,
    Notified = 1,
    Fulfilled = 2,
    Cancelled = 3,
}

impl ReservationStatus {
    /// Pending and Notified reservations keep a book reserved for the queue
    pub fn holds_book(&self) -> bool {
        matches!(self, ReservationStatus::Pending | ReservationStatus::Notified)
    }
}

impl From<i16> for ReservationStatus {
    fn from(v: i16) -> Self {
        match v {
            1 => ReservationStatus::Notified,
            2 => ReservationStatus::Fulfilled,
            3 => ReservationStatus::Cancelled,
            _ => ReservationStatus::Pending,
        }
    }
}

impl From<ReservationStatus> for i16 {
    fn from(s: ReservationStatus) -> Self {
        s as i16
    }
}

impl std::fmt::Display for ReservationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            ReservationStatus::Pending => "Pending",
            ReservationStatus::Notified => "Notified",
            ReservationStatus::Fulfilled => "Fulfilled",
            ReservationStatus::Cancelled => "Cancelled",
        };
        write!(f, "{}", label)
    }
}

/// Waitlist entry for a currently-unavailable book.
///
/// `queue_position` is the 1-based rank among the book's Pending
/// reservations; 0 means the entry is no longer ranked (Notified,
/// Fulfilled or Cancelled).
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Reservation {
    pub id: Uuid,
    pub book_id: Uuid,
    pub user_id: Uuid,
    pub reserved_at: DateTime<Utc>,
    pub pickup_deadline: Option<DateTime<Utc>>,
    pub status: ReservationStatus,
    pub queue_position: i32,
}

impl Reservation {
    /// A fresh Pending reservation at the given queue position
    pub fn new(book_id: Uuid, user_id: Uuid, now: DateTime<Utc>, position: i32) -> Self {
        Self {
            id: Uuid::new_v4(),
            book_id,
            user_id,
            reserved_at: now,
            pickup_deadline: None,
            status: ReservationStatus::Pending,
            queue_position: position,
        }
    }
}
