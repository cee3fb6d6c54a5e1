//! Loan lifecycle management service

use std::sync::Arc;

use chrono::{Duration, Utc};
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::{
    config::CirculationConfig,
    error::{AppError, AppResult, RuleCode},
    models::loan::{Loan, LoanStatus},
    repository::{BookRepository, LoanRepository},
    services::{
        availability, fees::FeesService, locks::BookLocks,
        notifications::NotificationDispatcher, reservations::ReservationsService,
    },
};

/// The one loan-creation path, shared by direct borrowing and reservation
/// pickup. Callers have already verified availability under the book's
/// lock.
pub(crate) async fn persist_new_loan(
    loans: &dyn LoanRepository,
    book_id: Uuid,
    user_id: Uuid,
    period_days: i64,
) -> AppResult<Loan> {
    let loan = Loan::new(book_id, user_id, Utc::now(), period_days);
    loans.insert(&loan).await?;
    Ok(loan)
}

#[derive(Clone)]
pub struct LoansService {
    books: Arc<dyn BookRepository>,
    loans: Arc<dyn LoanRepository>,
    reservations: Arc<ReservationsService>,
    fees: FeesService,
    notifier: Arc<dyn NotificationDispatcher>,
    locks: Arc<BookLocks>,
    policy: CirculationConfig,
}

impl LoansService {
    pub fn new(
        books: Arc<dyn BookRepository>,
        loans: Arc<dyn LoanRepository>,
        reservations: Arc<ReservationsService>,
        fees: FeesService,
        notifier: Arc<dyn NotificationDispatcher>,
        locks: Arc<BookLocks>,
        policy: CirculationConfig,
    ) -> Self {
        Self {
            books,
            loans,
            reservations,
            fees,
            notifier,
            locks,
            policy,
        }
    }

    /// Borrow a book directly. The availability check and the insert run
    /// inside the book's critical section, so two concurrent borrowers can
    /// never both see an available book.
    pub async fn make_loan(&self, book_id: Uuid, user_id: Uuid) -> AppResult<Loan> {
        let _guard = self.locks.acquire(book_id).await;

        let aggregate = self
            .books
            .load_aggregate(book_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Book {} not found", book_id)))?;

        if !availability::is_available(&aggregate) {
            return Err(AppError::rule(
                RuleCode::BookUnavailable,
                "Book is on loan or reserved",
            ));
        }

        let loan =
            persist_new_loan(&*self.loans, book_id, user_id, self.policy.loan_period_days).await?;
        tracing::info!(
            "Loan {} opened: book {} to {} until {}",
            loan.id,
            book_id,
            user_id,
            loan.due_date
        );
        Ok(loan)
    }

    /// Take a book back. Records the return, assesses a late fee when past
    /// due, and once the loan is persisted hands the book to the waitlist.
    pub async fn return_loan(&self, loan_id: Uuid) -> AppResult<Loan> {
        let found = self
            .loans
            .find(loan_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Loan {} not found", loan_id)))?;

        let book_id = found.book_id;
        let returned = {
            let _guard = self.locks.acquire(book_id).await;

            let mut loan = self
                .loans
                .find(loan_id)
                .await?
                .ok_or_else(|| AppError::NotFound(format!("Loan {} not found", loan_id)))?;

            if !loan.status.blocks_availability() {
                return Err(AppError::rule(
                    RuleCode::InvalidLoanStatus,
                    format!("Loan is {}, nothing to return", loan.status),
                ));
            }

            let now = Utc::now();
            loan.status = LoanStatus::Returned;
            loan.return_date = Some(now);

            if now > loan.due_date {
                let fee = self.fees.assess_late_return(&loan, now).await?;
                loan.late_fee = Some(fee.amount);
            }

            self.loans.update(&loan).await?;
            tracing::info!("Loan {} returned for book {}", loan_id, book_id);
            loan
        };

        // Loan persisted and lock released: promote the waitlist head.
        // A Pending queue keeps the book unavailable, so no direct borrow
        // can slip in between the two critical sections.
        self.reservations.process_next_after_return(book_id).await?;

        Ok(returned)
    }

    /// Push the due date out, unless the waitlist has a claim on the book
    pub async fn extend_loan(&self, loan_id: Uuid) -> AppResult<Loan> {
        let found = self
            .loans
            .find(loan_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Loan {} not found", loan_id)))?;

        let _guard = self.locks.acquire(found.book_id).await;

        let mut loan = self
            .loans
            .find(loan_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Loan {} not found", loan_id)))?;

        if loan.status != LoanStatus::Active {
            return Err(AppError::rule(
                RuleCode::InvalidLoanStatus,
                format!("Only active loans can be extended, this one is {}", loan.status),
            ));
        }

        if self.reservations.has_live_reservation(loan.book_id).await? {
            return Err(AppError::rule(
                RuleCode::ExtendBlockedByReservation,
                "Someone is waiting for this book",
            ));
        }

        loan.due_date += Duration::days(self.policy.extension_days);
        self.loans.update(&loan).await?;
        tracing::info!("Loan {} extended to {}", loan_id, loan.due_date);
        Ok(loan)
    }

    /// Read-only: active loans past their due date. Status flips happen
    /// only through `mark_overdue`, driven by the sweep.
    pub async fn list_overdue(&self) -> AppResult<Vec<Loan>> {
        self.loans.list_overdue(Utc::now()).await
    }

    /// Flip one overdue loan to Overdue and remind the borrower
    pub async fn mark_overdue(&self, loan_id: Uuid) -> AppResult<Loan> {
        let found = self
            .loans
            .find(loan_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Loan {} not found", loan_id)))?;

        let _guard = self.locks.acquire(found.book_id).await;

        let mut loan = self
            .loans
            .find(loan_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Loan {} not found", loan_id)))?;

        if loan.status != LoanStatus::Active || loan.due_date >= Utc::now() {
            return Err(AppError::rule(
                RuleCode::InvalidLoanStatus,
                "Loan is not overdue",
            ));
        }

        loan.status = LoanStatus::Overdue;
        self.loans.update(&loan).await?;

        if let Err(e) = self.notifier.send_return_reminder(&loan).await {
            tracing::warn!("Return reminder for loan {} failed: {}", loan.id, e);
        }
        Ok(loan)
    }

    /// Scheduler entry point: flag every overdue loan
    pub async fn sweep_overdue(&self) -> AppResult<usize> {
        let overdue = self.loans.list_overdue(Utc::now()).await?;
        let mut flagged = 0;
        for loan in overdue {
            match self.mark_overdue(loan.id).await {
                Ok(_) => flagged += 1,
                // Returned or already flagged since the listing; skip
                Err(AppError::Rule {
                    code: RuleCode::InvalidLoanStatus,
                    ..
                }) => {}
                Err(e) => return Err(e),
            }
        }
        Ok(flagged)
    }

    /// Administrative: write the book off and bill the borrower
    pub async fn report_lost(
        &self,
        loan_id: Uuid,
        amount: Decimal,
        description: Option<String>,
    ) -> AppResult<Loan> {
        let found = self
            .loans
            .find(loan_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Loan {} not found", loan_id)))?;

        let _guard = self.locks.acquire(found.book_id).await;

        let mut loan = self
            .loans
            .find(loan_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Loan {} not found", loan_id)))?;

        if !loan.status.blocks_availability() {
            return Err(AppError::rule(
                RuleCode::InvalidLoanStatus,
                format!("Loan is {}, cannot be reported lost", loan.status),
            ));
        }

        loan.status = LoanStatus::Lost;
        self.loans.update(&loan).await?;

        let fee = self
            .fees
            .create_lost_fine(loan.user_id, loan.id, amount, description)
            .await?;
        tracing::info!(
            "Loan {} reported lost, fine {} of {} issued",
            loan_id,
            fee.id,
            fee.amount
        );
        Ok(loan)
    }

    /// Current loans of a user
    pub async fn list_for_user(&self, user_id: Uuid) -> AppResult<Vec<Loan>> {
        self.loans.list_unreturned_by_user(user_id).await
    }
}
