//! Periodic circulation sweeps.
//!
//! The engine never self-triggers time-based transitions; this driver
//! invokes the same service operations the API uses, on an interval.

use std::sync::Arc;
use std::time::Duration;

use crate::{
    error::AppResult,
    services::{fees::FeesService, loans::LoansService, reservations::ReservationsService},
};

pub struct CirculationSweeper {
    loans: Arc<LoansService>,
    reservations: Arc<ReservationsService>,
    fees: FeesService,
    interval: Duration,
}

impl CirculationSweeper {
    pub fn new(
        loans: Arc<LoansService>,
        reservations: Arc<ReservationsService>,
        fees: FeesService,
        interval: Duration,
    ) -> Self {
        Self {
            loans,
            reservations,
            fees,
            interval,
        }
    }

    /// Run forever; spawn onto the runtime at startup
    pub async fn run(self) {
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            if let Err(e) = self.sweep_once().await {
                tracing::error!("Circulation sweep failed: {}", e);
            }
        }
    }

    /// One pass: flag overdue loans, expire lapsed pickups, nag unpaid fees
    pub async fn sweep_once(&self) -> AppResult<()> {
        let overdue = self.loans.sweep_overdue().await?;
        let expired = self.reservations.sweep_expired_pickups().await?;
        let reminded = self.fees.sweep_payment_reminders().await?;
        if overdue + expired + reminded > 0 {
            tracing::info!(
                "Sweep: {} loans flagged overdue, {} pickups expired, {} payment reminders",
                overdue,
                expired,
                reminded
            );
        }
        Ok(())
    }
}
