//! Availability predicates over a fully-loaded book aggregate.
//!
//! Both predicates are recomputed from the latest persisted state on every
//! check. Availability is never stored on the book row.

use crate::models::{book::BookAggregate, reservation::ReservationStatus};

/// A book can be borrowed directly: no loan out on it and nobody holding a
/// place in line (Pending) or waiting at the pickup desk (Notified).
pub fn is_available(aggregate: &BookAggregate) -> bool {
    !has_blocking_loan(aggregate)
        && !aggregate
            .reservations
            .iter()
            .any(|r| r.status.holds_book())
}

/// The book sits behind the pickup desk for a notified patron: no loan out
/// on it and at least one Notified reservation.
pub fn is_available_for_pickup(aggregate: &BookAggregate) -> bool {
    !has_blocking_loan(aggregate)
        && aggregate
            .reservations
            .iter()
            .any(|r| r.status == ReservationStatus::Notified)
}

fn has_blocking_loan(aggregate: &BookAggregate) -> bool {
    aggregate.loans.iter().any(|l| l.status.blocks_availability())
}
