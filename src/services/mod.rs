//! Business logic services

pub mod availability;
pub mod fees;
pub mod loans;
pub mod locks;
pub mod membership;
pub mod notifications;
pub mod reservations;
pub mod scheduler;

use std::sync::Arc;

use crate::{config::CirculationConfig, repository::Stores};

use self::{
    fees::FeesService, locks::BookLocks, membership::MembershipStatusProvider,
    notifications::NotificationDispatcher, reservations::ReservationsService,
};

/// Container for all services
#[derive(Clone)]
pub struct Services {
    pub loans: Arc<loans::LoansService>,
    pub reservations: Arc<ReservationsService>,
    pub fees: FeesService,
}

impl Services {
    /// Wire the circulation engine over the given stores and collaborators
    pub fn new(
        stores: Stores,
        notifier: Arc<dyn NotificationDispatcher>,
        membership: Arc<dyn MembershipStatusProvider>,
        policy: CirculationConfig,
    ) -> Self {
        let locks = BookLocks::new();
        let fees = FeesService::new(stores.fees.clone(), notifier.clone(), policy.clone());
        let reservations = Arc::new(ReservationsService::new(
            stores.books.clone(),
            stores.reservations.clone(),
            stores.loans.clone(),
            membership,
            notifier.clone(),
            locks.clone(),
            policy.clone(),
        ));
        let loans = Arc::new(loans::LoansService::new(
            stores.books,
            stores.loans,
            reservations.clone(),
            fees.clone(),
            notifier,
            locks,
            policy,
        ));
        Self {
            loans,
            reservations,
            fees,
        }
    }
}
