//! Reservation queue management service.
//!
//! Per book, Pending reservations form a strict FIFO ordered by
//! reservation time, materialized as a dense 1..N `queue_position`. Every
//! mutation that removes an entry from the Pending set recompacts the
//! positions of the remainder inside the same per-book critical section.

use std::sync::Arc;

use chrono::{DateTime, Datelike, Duration, Utc, Weekday};
use uuid::Uuid;

use crate::{
    config::CirculationConfig,
    error::{AppError, AppResult, RuleCode},
    models::reservation::{Reservation, ReservationStatus},
    repository::{BookRepository, LoanRepository, ReservationRepository},
    services::{
        availability,
        locks::BookLocks,
        membership::MembershipStatusProvider,
        notifications::NotificationDispatcher,
    },
};

/// `days` business days after `start`, skipping Saturdays and Sundays
pub(crate) fn add_business_days(start: DateTime<Utc>, days: i64) -> DateTime<Utc> {
    let mut date = start;
    let mut remaining = days;
    while remaining > 0 {
        date += Duration::days(1);
        if !matches!(date.weekday(), Weekday::Sat | Weekday::Sun) {
            remaining -= 1;
        }
    }
    date
}

#[derive(Clone)]
pub struct ReservationsService {
    books: Arc<dyn BookRepository>,
    reservations: Arc<dyn ReservationRepository>,
    loans: Arc<dyn LoanRepository>,
    membership: Arc<dyn MembershipStatusProvider>,
    notifier: Arc<dyn NotificationDispatcher>,
    locks: Arc<BookLocks>,
    policy: CirculationConfig,
}

impl ReservationsService {
    pub fn new(
        books: Arc<dyn BookRepository>,
        reservations: Arc<dyn ReservationRepository>,
        loans: Arc<dyn LoanRepository>,
        membership: Arc<dyn MembershipStatusProvider>,
        notifier: Arc<dyn NotificationDispatcher>,
        locks: Arc<BookLocks>,
        policy: CirculationConfig,
    ) -> Self {
        Self {
            books,
            reservations,
            loans,
            membership,
            notifier,
            locks,
            policy,
        }
    }

    /// Queue a reservation for a currently-unavailable book.
    ///
    /// The assigned position is one past the current Pending count,
    /// computed while holding the book's lock so two concurrent calls can
    /// never claim the same slot.
    pub async fn create_reservation(&self, book_id: Uuid, user_id: Uuid) -> AppResult<Reservation> {
        if !self.membership.is_active(user_id).await? {
            return Err(AppError::rule(
                RuleCode::MembershipExpired,
                format!("Membership of {} is not active", user_id),
            ));
        }

        let _guard = self.locks.acquire(book_id).await;

        let aggregate = self
            .books
            .load_aggregate(book_id)
            .await?
            .ok_or_else(|| {
                AppError::rule(RuleCode::BookNotFound, format!("Book {} not found", book_id))
            })?;

        // Reservations are only accepted for books that cannot be borrowed
        // right now
        if availability::is_available(&aggregate) {
            return Err(AppError::rule(
                RuleCode::BookAvailable,
                "Book is available, borrow it directly instead of reserving",
            ));
        }

        if aggregate
            .reservations
            .iter()
            .any(|r| r.user_id == user_id && r.status.holds_book())
        {
            return Err(AppError::rule(
                RuleCode::DuplicateReservation,
                format!("User {} already has a live reservation for this book", user_id),
            ));
        }

        let pending_count = aggregate
            .reservations
            .iter()
            .filter(|r| r.status == ReservationStatus::Pending)
            .count();
        let reservation = Reservation::new(
            book_id,
            user_id,
            Utc::now(),
            (pending_count + 1) as i32,
        );
        self.reservations.insert(&reservation).await?;

        if let Err(e) = self.notifier.send_reservation_created(&reservation).await {
            tracing::warn!(
                "Reservation-created notification for {} failed: {}",
                reservation.id,
                e
            );
        }

        tracing::info!(
            "Reservation {} queued at position {} for book {}",
            reservation.id,
            reservation.queue_position,
            book_id
        );
        Ok(reservation)
    }

    /// Cancel a reservation the caller owns and close the gap it leaves.
    ///
    /// Cancelling an entry that is no longer live is a typed error and
    /// never reorders the queue a second time.
    pub async fn cancel_reservation(
        &self,
        reservation_id: Uuid,
        user_id: Uuid,
    ) -> AppResult<Reservation> {
        let found = self
            .reservations
            .find(reservation_id)
            .await?
            .ok_or_else(|| {
                AppError::NotFound(format!("Reservation {} not found", reservation_id))
            })?;

        if found.user_id != user_id {
            return Err(AppError::rule(
                RuleCode::UnauthorizedCancel,
                "Reservation belongs to another patron",
            ));
        }

        let _guard = self.locks.acquire(found.book_id).await;

        // Re-read under the lock; a racing promotion may have changed it
        let mut reservation = self
            .reservations
            .find(reservation_id)
            .await?
            .ok_or_else(|| {
                AppError::NotFound(format!("Reservation {} not found", reservation_id))
            })?;

        if !reservation.status.holds_book() {
            return Err(AppError::rule(
                RuleCode::InvalidReservationStatus,
                format!("Reservation is already {}", reservation.status),
            ));
        }

        reservation.status = ReservationStatus::Cancelled;
        reservation.queue_position = 0;
        self.reservations.update(&reservation).await?;
        self.recompact_queue(reservation.book_id).await?;

        tracing::info!("Reservation {} cancelled", reservation_id);
        Ok(reservation)
    }

    /// Promote the head of the waitlist after a return.
    ///
    /// The lowest-position Pending reservation (if any) becomes Notified
    /// with a pickup deadline, and the rest of the queue closes ranks.
    pub async fn process_next_after_return(&self, book_id: Uuid) -> AppResult<Option<Reservation>> {
        let _guard = self.locks.acquire(book_id).await;

        let head = self
            .reservations
            .list_for_book(book_id)
            .await?
            .into_iter()
            .filter(|r| r.status == ReservationStatus::Pending)
            .min_by_key(|r| (r.queue_position, r.reserved_at));
        let Some(mut head) = head else {
            return Ok(None);
        };

        head.status = ReservationStatus::Notified;
        head.queue_position = 0;
        head.pickup_deadline = Some(add_business_days(
            Utc::now(),
            self.policy.pickup_window_days,
        ));
        self.reservations.update(&head).await?;
        self.recompact_queue(book_id).await?;

        if let Err(e) = self.notifier.send_reservation_ready(&head).await {
            tracing::warn!(
                "Ready-for-pickup notification for {} failed: {}",
                head.id,
                e
            );
        }

        tracing::info!(
            "Reservation {} notified for pickup of book {}",
            head.id,
            book_id
        );
        Ok(Some(head))
    }

    /// Hand the book over: fulfill the reservation and open the loan
    /// through the same creation path direct borrowing uses. Both writes
    /// happen inside one per-book critical section.
    pub async fn pick_reservation(
        &self,
        reservation_id: Uuid,
        user_id: Uuid,
    ) -> AppResult<(Reservation, crate::models::loan::Loan)> {
        if !self.membership.is_active(user_id).await? {
            return Err(AppError::rule(
                RuleCode::MembershipExpired,
                format!("Membership of {} is not active", user_id),
            ));
        }

        let found = self
            .reservations
            .find(reservation_id)
            .await?
            .ok_or_else(|| {
                AppError::rule(
                    RuleCode::ReservationNotFound,
                    format!("Reservation {} not found", reservation_id),
                )
            })?;

        if found.user_id != user_id {
            return Err(AppError::rule(
                RuleCode::UnauthorizedPickup,
                "Reservation belongs to another patron",
            ));
        }

        let _guard = self.locks.acquire(found.book_id).await;

        let mut reservation = self
            .reservations
            .find(reservation_id)
            .await?
            .ok_or_else(|| {
                AppError::rule(
                    RuleCode::ReservationNotFound,
                    format!("Reservation {} not found", reservation_id),
                )
            })?;

        if !reservation.status.holds_book() {
            return Err(AppError::rule(
                RuleCode::InvalidReservationStatus,
                format!("Reservation is already {}", reservation.status),
            ));
        }

        let aggregate = self
            .books
            .load_aggregate(reservation.book_id)
            .await?
            .ok_or_else(|| {
                AppError::rule(
                    RuleCode::BookNotFound,
                    format!("Book {} not found", reservation.book_id),
                )
            })?;
        if !availability::is_available_for_pickup(&aggregate) {
            return Err(AppError::rule(
                RuleCode::BookNotAvailable,
                "Book is not at the pickup desk",
            ));
        }

        let was_pending = reservation.status == ReservationStatus::Pending;
        reservation.status = ReservationStatus::Fulfilled;
        reservation.queue_position = 0;
        self.reservations.update(&reservation).await?;

        let loan = super::loans::persist_new_loan(
            &*self.loans,
            reservation.book_id,
            user_id,
            self.policy.loan_period_days,
        )
        .await?;

        if was_pending {
            self.recompact_queue(reservation.book_id).await?;
        }

        tracing::info!(
            "Reservation {} fulfilled, loan {} opened for {}",
            reservation.id,
            loan.id,
            user_id
        );
        Ok((reservation, loan))
    }

    /// Scheduler entry point: a notified patron never showed up, so the
    /// reservation is cancelled and the queue advances to the next one.
    pub async fn expire_notified_reservation(&self, reservation_id: Uuid) -> AppResult<()> {
        let found = self
            .reservations
            .find(reservation_id)
            .await?
            .ok_or_else(|| {
                AppError::NotFound(format!("Reservation {} not found", reservation_id))
            })?;

        {
            let _guard = self.locks.acquire(found.book_id).await;

            let mut reservation = self
                .reservations
                .find(reservation_id)
                .await?
                .ok_or_else(|| {
                    AppError::NotFound(format!("Reservation {} not found", reservation_id))
                })?;

            if reservation.status != ReservationStatus::Notified {
                return Err(AppError::rule(
                    RuleCode::InvalidReservationStatus,
                    format!("Reservation is {}, not awaiting pickup", reservation.status),
                ));
            }

            reservation.status = ReservationStatus::Cancelled;
            reservation.queue_position = 0;
            self.reservations.update(&reservation).await?;

            tracing::info!(
                "Reservation {} expired unpicked for book {}",
                reservation_id,
                found.book_id
            );
        }

        // Lock released: promotion takes its own critical section
        self.process_next_after_return(found.book_id).await?;
        Ok(())
    }

    /// Expire every notified reservation whose pickup deadline has passed
    pub async fn sweep_expired_pickups(&self) -> AppResult<usize> {
        let expired = self.reservations.list_notified_expired(Utc::now()).await?;
        let mut count = 0;
        for reservation in expired {
            match self.expire_notified_reservation(reservation.id).await {
                Ok(()) => count += 1,
                // Raced by a pickup or a concurrent sweep; nothing to do
                Err(AppError::Rule {
                    code: RuleCode::InvalidReservationStatus,
                    ..
                }) => {}
                Err(e) => return Err(e),
            }
        }
        Ok(count)
    }

    /// The Pending waitlist of a book in position order
    pub async fn queue_for_book(&self, book_id: Uuid) -> AppResult<Vec<Reservation>> {
        self.books
            .find(book_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Book {} not found", book_id)))?;

        let mut queue: Vec<Reservation> = self
            .reservations
            .list_for_book(book_id)
            .await?
            .into_iter()
            .filter(|r| r.status == ReservationStatus::Pending)
            .collect();
        queue.sort_by_key(|r| r.queue_position);
        Ok(queue)
    }

    pub async fn list_for_user(&self, user_id: Uuid) -> AppResult<Vec<Reservation>> {
        self.reservations.list_for_user(user_id).await
    }

    /// A live (Pending or Notified) reservation pins the book for the
    /// queue, blocking loan extensions
    pub async fn has_live_reservation(&self, book_id: Uuid) -> AppResult<bool> {
        let reservations = self.reservations.list_for_book(book_id).await?;
        Ok(reservations.iter().any(|r| r.status.holds_book()))
    }

    /// Rewrite the Pending positions of a book to the dense range 1..N
    /// ordered by reservation time. Caller holds the book's lock.
    async fn recompact_queue(&self, book_id: Uuid) -> AppResult<()> {
        let mut pending: Vec<Reservation> = self
            .reservations
            .list_for_book(book_id)
            .await?
            .into_iter()
            .filter(|r| r.status == ReservationStatus::Pending)
            .collect();
        pending.sort_by_key(|r| r.reserved_at);

        for (idx, mut reservation) in pending.into_iter().enumerate() {
            let position = (idx + 1) as i32;
            if reservation.queue_position != position {
                reservation.queue_position = position;
                self.reservations.update(&reservation).await?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::testing::{harness, harness_with, inactive_membership, quiet_notifier};
    use chrono::TimeZone;

    #[test]
    fn business_days_skip_weekends() {
        // 2025-01-03 is a Friday
        let friday = Utc.with_ymd_and_hms(2025, 1, 3, 10, 0, 0).unwrap();
        let deadline = add_business_days(friday, 3);
        // Mon 6th, Tue 7th, Wed 8th
        assert_eq!(deadline, Utc.with_ymd_and_hms(2025, 1, 8, 10, 0, 0).unwrap());

        let monday = Utc.with_ymd_and_hms(2025, 1, 6, 9, 0, 0).unwrap();
        assert_eq!(
            add_business_days(monday, 3),
            Utc.with_ymd_and_hms(2025, 1, 9, 9, 0, 0).unwrap()
        );
    }

    #[tokio::test]
    async fn reserving_an_available_book_is_rejected_without_a_row() {
        let h = harness().await;
        let book_id = h.seed_book().await;

        let res = h
            .services
            .reservations
            .create_reservation(book_id, Uuid::new_v4())
            .await;
        assert!(matches!(
            res,
            Err(AppError::Rule {
                code: RuleCode::BookAvailable,
                ..
            })
        ));
        // Nothing was persisted
        let queue = h
            .services
            .reservations
            .queue_for_book(book_id)
            .await
            .unwrap();
        assert!(queue.is_empty());
    }

    #[tokio::test]
    async fn waitlist_positions_assign_in_fifo_order() {
        let h = harness().await;
        let book_id = h.seed_book().await;
        let borrower = Uuid::new_v4();
        let second = Uuid::new_v4();
        let third = Uuid::new_v4();

        h.services.loans.make_loan(book_id, borrower).await.unwrap();

        let r2 = h
            .services
            .reservations
            .create_reservation(book_id, second)
            .await
            .unwrap();
        let r3 = h
            .services
            .reservations
            .create_reservation(book_id, third)
            .await
            .unwrap();

        assert_eq!(r2.queue_position, 1);
        assert_eq!(r3.queue_position, 2);
        assert_eq!(r2.status, ReservationStatus::Pending);
    }

    #[tokio::test]
    async fn duplicate_reservation_by_same_user_is_rejected() {
        let h = harness().await;
        let book_id = h.seed_book().await;
        let patron = Uuid::new_v4();

        h.services
            .loans
            .make_loan(book_id, Uuid::new_v4())
            .await
            .unwrap();
        h.services
            .reservations
            .create_reservation(book_id, patron)
            .await
            .unwrap();

        let res = h
            .services
            .reservations
            .create_reservation(book_id, patron)
            .await;
        assert!(matches!(
            res,
            Err(AppError::Rule {
                code: RuleCode::DuplicateReservation,
                ..
            })
        ));
    }

    #[tokio::test]
    async fn expired_membership_cannot_reserve() {
        let h = harness_with(quiet_notifier(), inactive_membership()).await;
        let book_id = h.seed_book().await;

        let res = h
            .services
            .reservations
            .create_reservation(book_id, Uuid::new_v4())
            .await;
        assert!(matches!(
            res,
            Err(AppError::Rule {
                code: RuleCode::MembershipExpired,
                ..
            })
        ));
    }

    #[tokio::test]
    async fn reserving_a_missing_book_is_a_typed_error() {
        let h = harness().await;
        let res = h
            .services
            .reservations
            .create_reservation(Uuid::new_v4(), Uuid::new_v4())
            .await;
        assert!(matches!(
            res,
            Err(AppError::Rule {
                code: RuleCode::BookNotFound,
                ..
            })
        ));
    }

    #[tokio::test]
    async fn return_promotes_head_and_recompacts() {
        let h = harness().await;
        let book_id = h.seed_book().await;
        let borrower = Uuid::new_v4();
        let second = Uuid::new_v4();
        let third = Uuid::new_v4();

        let loan = h.services.loans.make_loan(book_id, borrower).await.unwrap();
        let r2 = h
            .services
            .reservations
            .create_reservation(book_id, second)
            .await
            .unwrap();
        let r3 = h
            .services
            .reservations
            .create_reservation(book_id, third)
            .await
            .unwrap();

        h.services.loans.return_loan(loan.id).await.unwrap();

        let promoted = h.reservation(r2.id).await;
        assert_eq!(promoted.status, ReservationStatus::Notified);
        assert_eq!(promoted.queue_position, 0);
        assert!(promoted.pickup_deadline.is_some());

        let moved_up = h.reservation(r3.id).await;
        assert_eq!(moved_up.status, ReservationStatus::Pending);
        assert_eq!(moved_up.queue_position, 1);
    }

    #[tokio::test]
    async fn pickup_fulfills_and_opens_an_active_loan() {
        let h = harness().await;
        let book_id = h.seed_book().await;
        let borrower = Uuid::new_v4();
        let patron = Uuid::new_v4();

        let loan = h.services.loans.make_loan(book_id, borrower).await.unwrap();
        let reservation = h
            .services
            .reservations
            .create_reservation(book_id, patron)
            .await
            .unwrap();
        h.services.loans.return_loan(loan.id).await.unwrap();

        let (fulfilled, new_loan) = h
            .services
            .reservations
            .pick_reservation(reservation.id, patron)
            .await
            .unwrap();

        assert_eq!(fulfilled.status, ReservationStatus::Fulfilled);
        assert_eq!(new_loan.book_id, book_id);
        assert_eq!(new_loan.user_id, patron);
        assert_eq!(new_loan.status, crate::models::loan::LoanStatus::Active);

        // The book is out again
        let agg = h.aggregate(book_id).await;
        assert!(!availability::is_available(&agg));
        assert!(!availability::is_available_for_pickup(&agg));
    }

    #[tokio::test]
    async fn pickup_by_the_wrong_patron_is_rejected() {
        let h = harness().await;
        let book_id = h.seed_book().await;
        let patron = Uuid::new_v4();

        let loan = h
            .services
            .loans
            .make_loan(book_id, Uuid::new_v4())
            .await
            .unwrap();
        let reservation = h
            .services
            .reservations
            .create_reservation(book_id, patron)
            .await
            .unwrap();
        h.services.loans.return_loan(loan.id).await.unwrap();

        let res = h
            .services
            .reservations
            .pick_reservation(reservation.id, Uuid::new_v4())
            .await;
        assert!(matches!(
            res,
            Err(AppError::Rule {
                code: RuleCode::UnauthorizedPickup,
                ..
            })
        ));
    }

    #[tokio::test]
    async fn pickup_before_notification_requires_the_book_at_the_desk() {
        let h = harness().await;
        let book_id = h.seed_book().await;
        let patron = Uuid::new_v4();

        // Book still out on loan, reservation still Pending
        h.services
            .loans
            .make_loan(book_id, Uuid::new_v4())
            .await
            .unwrap();
        let reservation = h
            .services
            .reservations
            .create_reservation(book_id, patron)
            .await
            .unwrap();

        let res = h
            .services
            .reservations
            .pick_reservation(reservation.id, patron)
            .await;
        assert!(matches!(
            res,
            Err(AppError::Rule {
                code: RuleCode::BookNotAvailable,
                ..
            })
        ));
    }

    #[tokio::test]
    async fn cancel_recompacts_and_repeat_cancel_is_typed() {
        let h = harness().await;
        let book_id = h.seed_book().await;
        let users: Vec<Uuid> = (0..4).map(|_| Uuid::new_v4()).collect();

        h.services
            .loans
            .make_loan(book_id, Uuid::new_v4())
            .await
            .unwrap();
        let mut reservations = Vec::new();
        for user in &users {
            reservations.push(
                h.services
                    .reservations
                    .create_reservation(book_id, *user)
                    .await
                    .unwrap(),
            );
        }

        // Drop the second in line
        h.services
            .reservations
            .cancel_reservation(reservations[1].id, users[1])
            .await
            .unwrap();

        let queue = h
            .services
            .reservations
            .queue_for_book(book_id)
            .await
            .unwrap();
        let positions: Vec<i32> = queue.iter().map(|r| r.queue_position).collect();
        assert_eq!(positions, vec![1, 2, 3]);
        assert_eq!(queue[0].user_id, users[0]);
        assert_eq!(queue[1].user_id, users[2]);
        assert_eq!(queue[2].user_id, users[3]);

        // Cancelling again neither succeeds nor reorders
        let again = h
            .services
            .reservations
            .cancel_reservation(reservations[1].id, users[1])
            .await;
        assert!(matches!(
            again,
            Err(AppError::Rule {
                code: RuleCode::InvalidReservationStatus,
                ..
            })
        ));
        let queue_after = h
            .services
            .reservations
            .queue_for_book(book_id)
            .await
            .unwrap();
        assert_eq!(
            queue_after.iter().map(|r| r.id).collect::<Vec<_>>(),
            queue.iter().map(|r| r.id).collect::<Vec<_>>()
        );
    }

    #[tokio::test]
    async fn cancel_by_someone_else_is_unauthorized() {
        let h = harness().await;
        let book_id = h.seed_book().await;
        let patron = Uuid::new_v4();

        h.services
            .loans
            .make_loan(book_id, Uuid::new_v4())
            .await
            .unwrap();
        let reservation = h
            .services
            .reservations
            .create_reservation(book_id, patron)
            .await
            .unwrap();

        let res = h
            .services
            .reservations
            .cancel_reservation(reservation.id, Uuid::new_v4())
            .await;
        assert!(matches!(
            res,
            Err(AppError::Rule {
                code: RuleCode::UnauthorizedCancel,
                ..
            })
        ));
    }

    #[tokio::test]
    async fn cancelling_a_missing_reservation_is_not_found() {
        let h = harness().await;
        let res = h
            .services
            .reservations
            .cancel_reservation(Uuid::new_v4(), Uuid::new_v4())
            .await;
        assert!(matches!(res, Err(AppError::NotFound(_))));
    }

    #[tokio::test]
    async fn expiry_cancels_and_advances_to_the_next_candidate() {
        let h = harness().await;
        let book_id = h.seed_book().await;
        let first = Uuid::new_v4();
        let second = Uuid::new_v4();

        let loan = h
            .services
            .loans
            .make_loan(book_id, Uuid::new_v4())
            .await
            .unwrap();
        let r1 = h
            .services
            .reservations
            .create_reservation(book_id, first)
            .await
            .unwrap();
        let r2 = h
            .services
            .reservations
            .create_reservation(book_id, second)
            .await
            .unwrap();
        h.services.loans.return_loan(loan.id).await.unwrap();

        // First patron never shows up
        h.services
            .reservations
            .expire_notified_reservation(r1.id)
            .await
            .unwrap();

        let expired = h.reservation(r1.id).await;
        assert_eq!(expired.status, ReservationStatus::Cancelled);

        let next = h.reservation(r2.id).await;
        assert_eq!(next.status, ReservationStatus::Notified);
        assert_eq!(next.queue_position, 0);
        assert!(next.pickup_deadline.is_some());
    }

    #[tokio::test]
    async fn expiring_a_pending_reservation_is_rejected() {
        let h = harness().await;
        let book_id = h.seed_book().await;
        let patron = Uuid::new_v4();

        h.services
            .loans
            .make_loan(book_id, Uuid::new_v4())
            .await
            .unwrap();
        let reservation = h
            .services
            .reservations
            .create_reservation(book_id, patron)
            .await
            .unwrap();

        let res = h
            .services
            .reservations
            .expire_notified_reservation(reservation.id)
            .await;
        assert!(matches!(
            res,
            Err(AppError::Rule {
                code: RuleCode::InvalidReservationStatus,
                ..
            })
        ));
    }

    #[tokio::test]
    async fn sweep_expires_overdue_pickups() {
        let h = harness().await;
        let book_id = h.seed_book().await;
        let first = Uuid::new_v4();
        let second = Uuid::new_v4();

        let loan = h
            .services
            .loans
            .make_loan(book_id, Uuid::new_v4())
            .await
            .unwrap();
        let r1 = h
            .services
            .reservations
            .create_reservation(book_id, first)
            .await
            .unwrap();
        h.services
            .reservations
            .create_reservation(book_id, second)
            .await
            .unwrap();
        h.services.loans.return_loan(loan.id).await.unwrap();

        // Backdate the pickup deadline past now
        let mut notified = h.reservation(r1.id).await;
        notified.pickup_deadline = Some(Utc::now() - Duration::days(1));
        crate::repository::ReservationRepository::update(&*h.store, &notified)
            .await
            .unwrap();

        let expired = h
            .services
            .reservations
            .sweep_expired_pickups()
            .await
            .unwrap();
        assert_eq!(expired, 1);
        assert_eq!(
            h.reservation(r1.id).await.status,
            ReservationStatus::Cancelled
        );
    }

    /// Positions stay a dense 1..N range through an arbitrary mix of
    /// create / cancel / promote / expire operations
    #[tokio::test]
    async fn queue_positions_stay_dense_through_mixed_operations() {
        let h = harness().await;
        let book_id = h.seed_book().await;
        let users: Vec<Uuid> = (0..5).map(|_| Uuid::new_v4()).collect();

        let loan = h
            .services
            .loans
            .make_loan(book_id, Uuid::new_v4())
            .await
            .unwrap();
        let mut ids = Vec::new();
        for user in &users {
            ids.push(
                h.services
                    .reservations
                    .create_reservation(book_id, *user)
                    .await
                    .unwrap()
                    .id,
            );
        }

        let assert_dense = |queue: Vec<Reservation>| {
            let positions: Vec<i32> = queue.iter().map(|r| r.queue_position).collect();
            let expected: Vec<i32> = (1..=queue.len() as i32).collect();
            assert_eq!(positions, expected, "queue positions must be 1..N");
        };

        // Cancel from the middle
        h.services
            .reservations
            .cancel_reservation(ids[2], users[2])
            .await
            .unwrap();
        assert_dense(h.services.reservations.queue_for_book(book_id).await.unwrap());

        // Return promotes the head
        h.services.loans.return_loan(loan.id).await.unwrap();
        assert_dense(h.services.reservations.queue_for_book(book_id).await.unwrap());

        // The promoted patron never picks up
        h.services
            .reservations
            .expire_notified_reservation(ids[0])
            .await
            .unwrap();
        assert_dense(h.services.reservations.queue_for_book(book_id).await.unwrap());

        // Cancel the current tail
        h.services
            .reservations
            .cancel_reservation(ids[4], users[4])
            .await
            .unwrap();
        let queue = h
            .services
            .reservations
            .queue_for_book(book_id)
            .await
            .unwrap();
        assert_dense(queue.clone());
        assert_eq!(queue.len(), 1);
        assert_eq!(queue[0].user_id, users[3]);
    }
}
