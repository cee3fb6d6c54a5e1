//! Repository layer for database operations

pub mod books;
pub mod fees;
pub mod loans;
pub mod memory;
pub mod reservations;

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{Pool, Postgres};
use uuid::Uuid;

use crate::{
    error::AppResult,
    models::{
        book::{Book, BookAggregate},
        fee::Fee,
        loan::Loan,
        reservation::Reservation,
    },
};

/// Read access to catalog books and their circulation aggregates
#[async_trait]
pub trait BookRepository: Send + Sync {
    async fn find(&self, id: Uuid) -> AppResult<Option<Book>>;

    /// Load a book together with all of its loans and reservations.
    ///
    /// Availability is always evaluated against this freshly loaded
    /// aggregate, never against a stored flag.
    async fn load_aggregate(&self, id: Uuid) -> AppResult<Option<BookAggregate>>;
}

/// Persistence contract for loans
#[async_trait]
pub trait LoanRepository: Send + Sync {
    async fn find(&self, id: Uuid) -> AppResult<Option<Loan>>;
    async fn insert(&self, loan: &Loan) -> AppResult<()>;
    async fn update(&self, loan: &Loan) -> AppResult<()>;
    /// Unreturned loans of a user, oldest first
    async fn list_unreturned_by_user(&self, user_id: Uuid) -> AppResult<Vec<Loan>>;
    /// Active loans whose due date has passed, ordered by due date
    async fn list_overdue(&self, as_of: DateTime<Utc>) -> AppResult<Vec<Loan>>;
}

/// Persistence contract for reservations
#[async_trait]
pub trait ReservationRepository: Send + Sync {
    async fn find(&self, id: Uuid) -> AppResult<Option<Reservation>>;
    async fn insert(&self, reservation: &Reservation) -> AppResult<()>;
    async fn update(&self, reservation: &Reservation) -> AppResult<()>;
    /// Every reservation of a book, ordered by reserved_at ascending
    async fn list_for_book(&self, book_id: Uuid) -> AppResult<Vec<Reservation>>;
    async fn list_for_user(&self, user_id: Uuid) -> AppResult<Vec<Reservation>>;
    /// Notified reservations whose pickup deadline has passed
    async fn list_notified_expired(&self, as_of: DateTime<Utc>) -> AppResult<Vec<Reservation>>;
}

/// Persistence contract for fees
#[async_trait]
pub trait FeeRepository: Send + Sync {
    async fn find(&self, id: Uuid) -> AppResult<Option<Fee>>;
    async fn insert(&self, fee: &Fee) -> AppResult<()>;
    async fn update(&self, fee: &Fee) -> AppResult<()>;
    async fn list_for_user(&self, user_id: Uuid) -> AppResult<Vec<Fee>>;
    /// Pending fees issued on or before the cutoff, ordered by issue date
    async fn list_pending_issued_before(&self, cutoff: DateTime<Utc>) -> AppResult<Vec<Fee>>;
}

/// Bundle of store handles the services are built from
#[derive(Clone)]
pub struct Stores {
    pub books: Arc<dyn BookRepository>,
    pub loans: Arc<dyn LoanRepository>,
    pub reservations: Arc<dyn ReservationRepository>,
    pub fees: Arc<dyn FeeRepository>,
}

/// Main repository struct holding the database connection pool
#[derive(Clone)]
pub struct Repository {
    pub pool: Pool<Postgres>,
    pub books: books::BooksRepository,
    pub loans: loans::LoansRepository,
    pub reservations: reservations::ReservationsRepository,
    pub fees: fees::FeesRepository,
}

impl Repository {
    /// Create a new repository with the given database pool
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self {
            books: books::BooksRepository::new(pool.clone()),
            loans: loans::LoansRepository::new(pool.clone()),
            reservations: reservations::ReservationsRepository::new(pool.clone()),
            fees: fees::FeesRepository::new(pool.clone()),
            pool,
        }
    }

    /// Store handles backed by this repository's pool
    pub fn stores(&self) -> Stores {
        Stores {
            books: Arc::new(self.books.clone()),
            loans: Arc::new(self.loans.clone()),
            reservations: Arc::new(self.reservations.clone()),
            fees: Arc::new(self.fees.clone()),
        }
    }
}
