//! In-memory store implementing every repository trait.
//!
//! Backs the unit-test suite; no database required. One instance serves
//! all four store handles.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::{
    error::AppResult,
    models::{
        book::{Book, BookAggregate},
        fee::{Fee, FeeStatus},
        loan::{Loan, LoanStatus},
        reservation::{Reservation, ReservationStatus},
    },
};

use super::{BookRepository, FeeRepository, LoanRepository, ReservationRepository, Stores};

#[derive(Default)]
pub struct MemoryRepository {
    books: RwLock<IndexMap<Uuid, Book>>,
    loans: RwLock<IndexMap<Uuid, Loan>>,
    reservations: RwLock<IndexMap<Uuid, Reservation>>,
    fees: RwLock<IndexMap<Uuid, Fee>>,
}

impl MemoryRepository {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Store handles all backed by one instance
    pub fn stores(store: &Arc<Self>) -> Stores {
        Stores {
            books: store.clone(),
            loans: store.clone(),
            reservations: store.clone(),
            fees: store.clone(),
        }
    }

    /// Seed a catalog book
    pub async fn add_book(&self, book: Book) {
        self.books.write().await.insert(book.id, book);
    }
}

#[async_trait]
impl BookRepository for MemoryRepository {
    async fn find(&self, id: Uuid) -> AppResult<Option<Book>> {
        Ok(self.books.read().await.get(&id).cloned())
    }

    async fn load_aggregate(&self, id: Uuid) -> AppResult<Option<BookAggregate>> {
        let Some(book) = self.books.read().await.get(&id).cloned() else {
            return Ok(None);
        };
        let loans = self
            .loans
            .read()
            .await
            .values()
            .filter(|l| l.book_id == id)
            .cloned()
            .collect();
        let mut reservations: Vec<Reservation> = self
            .reservations
            .read()
            .await
            .values()
            .filter(|r| r.book_id == id)
            .cloned()
            .collect();
        reservations.sort_by_key(|r| r.reserved_at);
        Ok(Some(BookAggregate {
            book,
            loans,
            reservations,
        }))
    }
}

#[async_trait]
impl LoanRepository for MemoryRepository {
    async fn find(&self, id: Uuid) -> AppResult<Option<Loan>> {
        Ok(self.loans.read().await.get(&id).cloned())
    }

    async fn insert(&self, loan: &Loan) -> AppResult<()> {
        self.loans.write().await.insert(loan.id, loan.clone());
        Ok(())
    }

    async fn update(&self, loan: &Loan) -> AppResult<()> {
        self.loans.write().await.insert(loan.id, loan.clone());
        Ok(())
    }

    async fn list_unreturned_by_user(&self, user_id: Uuid) -> AppResult<Vec<Loan>> {
        let mut loans: Vec<Loan> = self
            .loans
            .read()
            .await
            .values()
            .filter(|l| {
                l.user_id == user_id && l.return_date.is_none() && l.status.blocks_availability()
            })
            .cloned()
            .collect();
        loans.sort_by_key(|l| l.loan_date);
        Ok(loans)
    }

    async fn list_overdue(&self, as_of: DateTime<Utc>) -> AppResult<Vec<Loan>> {
        let mut loans: Vec<Loan> = self
            .loans
            .read()
            .await
            .values()
            .filter(|l| l.status == LoanStatus::Active && l.due_date < as_of)
            .cloned()
            .collect();
        loans.sort_by_key(|l| l.due_date);
        Ok(loans)
    }
}

#[async_trait]
impl ReservationRepository for MemoryRepository {
    async fn find(&self, id: Uuid) -> AppResult<Option<Reservation>> {
        Ok(self.reservations.read().await.get(&id).cloned())
    }

    async fn insert(&self, reservation: &Reservation) -> AppResult<()> {
        self.reservations
            .write()
            .await
            .insert(reservation.id, reservation.clone());
        Ok(())
    }

    async fn update(&self, reservation: &Reservation) -> AppResult<()> {
        self.reservations
            .write()
            .await
            .insert(reservation.id, reservation.clone());
        Ok(())
    }

    async fn list_for_book(&self, book_id: Uuid) -> AppResult<Vec<Reservation>> {
        let mut reservations: Vec<Reservation> = self
            .reservations
            .read()
            .await
            .values()
            .filter(|r| r.book_id == book_id)
            .cloned()
            .collect();
        reservations.sort_by_key(|r| r.reserved_at);
        Ok(reservations)
    }

    async fn list_for_user(&self, user_id: Uuid) -> AppResult<Vec<Reservation>> {
        let mut reservations: Vec<Reservation> = self
            .reservations
            .read()
            .await
            .values()
            .filter(|r| r.user_id == user_id)
            .cloned()
            .collect();
        reservations.sort_by_key(|r| r.reserved_at);
        Ok(reservations)
    }

    async fn list_notified_expired(&self, as_of: DateTime<Utc>) -> AppResult<Vec<Reservation>> {
        let mut reservations: Vec<Reservation> = self
            .reservations
            .read()
            .await
            .values()
            .filter(|r| {
                r.status == ReservationStatus::Notified
                    && r.pickup_deadline.map(|d| d < as_of).unwrap_or(false)
            })
            .cloned()
            .collect();
        reservations.sort_by_key(|r| r.pickup_deadline);
        Ok(reservations)
    }
}

#[async_trait]
impl FeeRepository for MemoryRepository {
    async fn find(&self, id: Uuid) -> AppResult<Option<Fee>> {
        Ok(self.fees.read().await.get(&id).cloned())
    }

    async fn insert(&self, fee: &Fee) -> AppResult<()> {
        self.fees.write().await.insert(fee.id, fee.clone());
        Ok(())
    }

    async fn update(&self, fee: &Fee) -> AppResult<()> {
        self.fees.write().await.insert(fee.id, fee.clone());
        Ok(())
    }

    async fn list_for_user(&self, user_id: Uuid) -> AppResult<Vec<Fee>> {
        let mut fees: Vec<Fee> = self
            .fees
            .read()
            .await
            .values()
            .filter(|f| f.user_id == user_id)
            .cloned()
            .collect();
        fees.sort_by(|a, b| b.issued_date.cmp(&a.issued_date));
        Ok(fees)
    }

    async fn list_pending_issued_before(&self, cutoff: DateTime<Utc>) -> AppResult<Vec<Fee>> {
        let mut fees: Vec<Fee> = self
            .fees
            .read()
            .await
            .values()
            .filter(|f| f.status == FeeStatus::Pending && f.issued_date <= cutoff)
            .cloned()
            .collect();
        fees.sort_by_key(|f| f.issued_date);
        Ok(fees)
    }
}
