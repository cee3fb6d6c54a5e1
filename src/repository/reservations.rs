//! Reservations repository for database operations

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{Pool, Postgres};
use uuid::Uuid;

use crate::{
    error::AppResult,
    models::reservation::{Reservation, ReservationStatus},
};

use super::ReservationRepository;

#[derive(Clone)]
pub struct ReservationsRepository {
    pool: Pool<Postgres>,
}

impl ReservationsRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ReservationRepository for ReservationsRepository {
    async fn find(&self, id: Uuid) -> AppResult<Option<Reservation>> {
        let reservation =
            sqlx::query_as::<_, Reservation>("SELECT * FROM reservations WHERE id = $1")
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;
        Ok(reservation)
    }

    async fn insert(&self, reservation: &Reservation) -> AppResult<()> {
        sqlx::query(
            r#"
            INSERT INTO reservations
                (id, book_id, user_id, reserved_at, pickup_deadline, status, queue_position)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(reservation.id)
        .bind(reservation.book_id)
        .bind(reservation.user_id)
        .bind(reservation.reserved_at)
        .bind(reservation.pickup_deadline)
        .bind(reservation.status)
        .bind(reservation.queue_position)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn update(&self, reservation: &Reservation) -> AppResult<()> {
        sqlx::query(
            r#"
            UPDATE reservations
            SET pickup_deadline = $2, status = $3, queue_position = $4
            WHERE id = $1
            "#,
        )
        .bind(reservation.id)
        .bind(reservation.pickup_deadline)
        .bind(reservation.status)
        .bind(reservation.queue_position)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn list_for_book(&self, book_id: Uuid) -> AppResult<Vec<Reservation>> {
        let reservations = sqlx::query_as::<_, Reservation>(
            "SELECT * FROM reservations WHERE book_id = $1 ORDER BY reserved_at",
        )
        .bind(book_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(reservations)
    }

    async fn list_for_user(&self, user_id: Uuid) -> AppResult<Vec<Reservation>> {
        let reservations = sqlx::query_as::<_, Reservation>(
            "SELECT * FROM reservations WHERE user_id = $1 ORDER BY reserved_at",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(reservations)
    }

    async fn list_notified_expired(&self, as_of: DateTime<Utc>) -> AppResult<Vec<Reservation>> {
        let reservations = sqlx::query_as::<_, Reservation>(
            r#"
            SELECT * FROM reservations
            WHERE status = $1 AND pickup_deadline IS NOT NULL AND pickup_deadline < $2
            ORDER BY pickup_deadline
            "#,
        )
        .bind(ReservationStatus::Notified)
        .bind(as_of)
        .fetch_all(&self.pool)
        .await?;
        Ok(reservations)
    }
}
