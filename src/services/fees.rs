//! Fee assessment and settlement service

use std::sync::Arc;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::{
    config::CirculationConfig,
    error::{AppError, AppResult, RuleCode},
    models::{
        fee::{Fee, FeeStatus, FineType},
        loan::Loan,
    },
    repository::FeeRepository,
    services::notifications::NotificationDispatcher,
};

/// Whole days past due, rounded up. A single late second counts as one day.
pub(crate) fn days_late(due_date: DateTime<Utc>, returned_at: DateTime<Utc>) -> i64 {
    let late_secs = (returned_at - due_date).num_seconds();
    if late_secs <= 0 {
        return 0;
    }
    (late_secs + 86_399) / 86_400
}

#[derive(Clone)]
pub struct FeesService {
    fees: Arc<dyn FeeRepository>,
    notifier: Arc<dyn NotificationDispatcher>,
    policy: CirculationConfig,
}

impl FeesService {
    pub fn new(
        fees: Arc<dyn FeeRepository>,
        notifier: Arc<dyn NotificationDispatcher>,
        policy: CirculationConfig,
    ) -> Self {
        Self {
            fees,
            notifier,
            policy,
        }
    }

    /// Record a late-return fee for a loan returned past its due date.
    ///
    /// Amount is whole days late (rounded up) times the daily rate.
    pub async fn assess_late_return(
        &self,
        loan: &Loan,
        returned_at: DateTime<Utc>,
    ) -> AppResult<Fee> {
        let days = days_late(loan.due_date, returned_at);
        let amount = self.policy.daily_late_fee * Decimal::from(days);
        let fee = Fee::new(
            loan.user_id,
            loan.id,
            amount,
            FineType::LateReturn,
            returned_at,
            None,
        );
        self.fees.insert(&fee).await?;
        tracing::info!(
            "Late-return fee of {} issued to {} for loan {} ({} days late)",
            fee.amount,
            fee.user_id,
            loan.id,
            days
        );
        Ok(fee)
    }

    /// Administrative lost-item fine, independent of the return flow
    pub async fn create_lost_fine(
        &self,
        user_id: Uuid,
        loan_id: Uuid,
        amount: Decimal,
        description: Option<String>,
    ) -> AppResult<Fee> {
        if amount <= Decimal::ZERO {
            return Err(AppError::Validation(
                "Fine amount must be positive".to_string(),
            ));
        }
        let fee = Fee::new(
            user_id,
            loan_id,
            amount,
            FineType::LostItem,
            Utc::now(),
            description,
        );
        self.fees.insert(&fee).await?;
        Ok(fee)
    }

    /// Settle a fee. Terminal: an already-settled fee cannot be paid again.
    pub async fn mark_fine_paid(&self, fee_id: Uuid, paid_date: DateTime<Utc>) -> AppResult<Fee> {
        let mut fee = self
            .fees
            .find(fee_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Fee {} not found", fee_id)))?;

        if fee.status.is_settled() {
            return Err(AppError::rule(
                RuleCode::FeeAlreadySettled,
                format!("Fee {} is already {}", fee_id, fee.status),
            ));
        }

        fee.status = FeeStatus::Paid;
        fee.paid_date = Some(paid_date);
        self.fees.update(&fee).await?;
        Ok(fee)
    }

    /// Administrative waive
    pub async fn waive_fine(&self, fee_id: Uuid) -> AppResult<Fee> {
        let mut fee = self
            .fees
            .find(fee_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Fee {} not found", fee_id)))?;

        if fee.status.is_settled() {
            return Err(AppError::rule(
                RuleCode::FeeAlreadySettled,
                format!("Fee {} is already {}", fee_id, fee.status),
            ));
        }

        fee.status = FeeStatus::Waived;
        self.fees.update(&fee).await?;
        Ok(fee)
    }

    pub async fn list_for_user(&self, user_id: Uuid) -> AppResult<Vec<Fee>> {
        self.fees.list_for_user(user_id).await
    }

    /// Remind patrons of fees that have sat unpaid past the grace period.
    /// Reminded fees move Pending -> Notified so they are nagged only once.
    pub async fn sweep_payment_reminders(&self) -> AppResult<usize> {
        let cutoff =
            Utc::now() - chrono::Duration::days(self.policy.payment_reminder_after_days);
        let due = self.fees.list_pending_issued_before(cutoff).await?;
        let mut reminded = 0;
        for mut fee in due {
            if let Err(e) = self.notifier.send_payment_reminder(&fee).await {
                tracing::warn!("Payment reminder for fee {} failed: {}", fee.id, e);
            }
            fee.status = FeeStatus::Notified;
            self.fees.update(&fee).await?;
            reminded += 1;
        }
        Ok(reminded)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::loan::Loan;
    use crate::repository::memory::MemoryRepository;
    use crate::services::notifications::MockNotificationDispatcher;
    use chrono::TimeZone;

    fn service(store: &Arc<MemoryRepository>) -> FeesService {
        let mut notifier = MockNotificationDispatcher::new();
        notifier
            .expect_send_payment_reminder()
            .returning(|_| Ok(()));
        FeesService::new(
            store.clone(),
            Arc::new(notifier),
            CirculationConfig::default(),
        )
    }

    #[test]
    fn late_days_round_up_to_whole_days() {
        let due = Utc.with_ymd_and_hms(2025, 3, 1, 12, 0, 0).unwrap();
        assert_eq!(days_late(due, due), 0);
        assert_eq!(days_late(due, due - chrono::Duration::hours(5)), 0);
        assert_eq!(days_late(due, due + chrono::Duration::seconds(1)), 1);
        assert_eq!(days_late(due, due + chrono::Duration::days(5)), 5);
        assert_eq!(
            days_late(due, due + chrono::Duration::days(5) + chrono::Duration::minutes(1)),
            6
        );
    }

    #[tokio::test]
    async fn five_days_late_costs_five_at_one_per_day() {
        let store = MemoryRepository::new();
        let svc = service(&store);

        let now = Utc::now();
        let mut loan = Loan::new(Uuid::new_v4(), Uuid::new_v4(), now, 30);
        loan.due_date = now - chrono::Duration::days(5);

        let fee = svc.assess_late_return(&loan, now).await.unwrap();
        assert_eq!(fee.amount, Decimal::from(5));
        assert_eq!(fee.fine_type, FineType::LateReturn);
        assert_eq!(fee.status, FeeStatus::Pending);
        assert_eq!(fee.loan_id, loan.id);
    }

    #[tokio::test]
    async fn mark_paid_is_terminal() {
        let store = MemoryRepository::new();
        let svc = service(&store);

        let fee = svc
            .create_lost_fine(
                Uuid::new_v4(),
                Uuid::new_v4(),
                Decimal::from(25),
                Some("Water damage, full replacement".to_string()),
            )
            .await
            .unwrap();

        let paid = svc.mark_fine_paid(fee.id, Utc::now()).await.unwrap();
        assert_eq!(paid.status, FeeStatus::Paid);
        assert!(paid.paid_date.is_some());

        let again = svc.mark_fine_paid(fee.id, Utc::now()).await;
        assert!(matches!(
            again,
            Err(AppError::Rule {
                code: RuleCode::FeeAlreadySettled,
                ..
            })
        ));
    }

    #[tokio::test]
    async fn lost_fine_rejects_non_positive_amounts() {
        let store = MemoryRepository::new();
        let svc = service(&store);
        let res = svc
            .create_lost_fine(Uuid::new_v4(), Uuid::new_v4(), Decimal::ZERO, None)
            .await;
        assert!(matches!(res, Err(AppError::Validation(_))));
    }

    #[tokio::test]
    async fn payment_reminder_sweep_moves_pending_to_notified() {
        let store = MemoryRepository::new();
        let svc = service(&store);

        let fee = svc
            .create_lost_fine(Uuid::new_v4(), Uuid::new_v4(), Decimal::from(10), None)
            .await
            .unwrap();
        // Backdate past the grace period
        let mut stale = fee.clone();
        stale.issued_date = Utc::now() - chrono::Duration::days(30);
        crate::repository::FeeRepository::insert(&*store, &stale)
            .await
            .unwrap();

        let reminded = svc.sweep_payment_reminders().await.unwrap();
        assert_eq!(reminded, 1);
        let after = crate::repository::FeeRepository::find(&*store, fee.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(after.status, FeeStatus::Notified);
    }
}
