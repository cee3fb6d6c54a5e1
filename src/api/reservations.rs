//! Reservation queue endpoints

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{
    error::AppResult,
    models::{loan::Loan, reservation::Reservation},
};

/// Create reservation request
#[derive(Deserialize, ToSchema)]
pub struct CreateReservationRequest {
    /// Book to reserve
    pub book_id: Uuid,
    /// Reserving patron
    pub user_id: Uuid,
}

/// Identifies the acting patron for cancel/pickup
#[derive(Deserialize, ToSchema)]
pub struct PatronRequest {
    pub user_id: Uuid,
}

/// Pickup response: the fulfilled reservation and the opened loan
#[derive(Serialize, ToSchema)]
pub struct PickupResponse {
    pub reservation: Reservation,
    pub loan: Loan,
}

/// Reserve a currently-unavailable book
#[utoipa::path(
    post,
    path = "/reservations",
    tag = "reservations",
    request_body = CreateReservationRequest,
    responses(
        (status = 201, description = "Reservation queued", body = Reservation),
        (status = 404, description = "Book not found"),
        (status = 422, description = "Book available, duplicate reservation, or membership expired")
    )
)]
pub async fn create_reservation(
    State(state): State<crate::AppState>,
    Json(request): Json<CreateReservationRequest>,
) -> AppResult<(StatusCode, Json<Reservation>)> {
    let reservation = state
        .services
        .reservations
        .create_reservation(request.book_id, request.user_id)
        .await?;
    Ok((StatusCode::CREATED, Json(reservation)))
}

/// Cancel a reservation
#[utoipa::path(
    post,
    path = "/reservations/{id}/cancel",
    tag = "reservations",
    params(
        ("id" = Uuid, Path, description = "Reservation ID")
    ),
    request_body = PatronRequest,
    responses(
        (status = 200, description = "Reservation cancelled", body = Reservation),
        (status = 404, description = "Reservation not found"),
        (status = 422, description = "Not the owner or reservation no longer live")
    )
)]
pub async fn cancel_reservation(
    State(state): State<crate::AppState>,
    Path(reservation_id): Path<Uuid>,
    Json(request): Json<PatronRequest>,
) -> AppResult<Json<Reservation>> {
    let reservation = state
        .services
        .reservations
        .cancel_reservation(reservation_id, request.user_id)
        .await?;
    Ok(Json(reservation))
}

/// Pick up a reserved book
#[utoipa::path(
    post,
    path = "/reservations/{id}/pickup",
    tag = "reservations",
    params(
        ("id" = Uuid, Path, description = "Reservation ID")
    ),
    request_body = PatronRequest,
    responses(
        (status = 200, description = "Reservation fulfilled, loan opened", body = PickupResponse),
        (status = 404, description = "Reservation or book not found"),
        (status = 422, description = "Not the owner, wrong status, or book not at the desk")
    )
)]
pub async fn pick_reservation(
    State(state): State<crate::AppState>,
    Path(reservation_id): Path<Uuid>,
    Json(request): Json<PatronRequest>,
) -> AppResult<Json<PickupResponse>> {
    let (reservation, loan) = state
        .services
        .reservations
        .pick_reservation(reservation_id, request.user_id)
        .await?;
    Ok(Json(PickupResponse { reservation, loan }))
}

/// The waitlist of a book in position order
#[utoipa::path(
    get,
    path = "/books/{id}/queue",
    tag = "reservations",
    params(
        ("id" = Uuid, Path, description = "Book ID")
    ),
    responses(
        (status = 200, description = "Pending reservations, first in line first", body = Vec<Reservation>),
        (status = 404, description = "Book not found")
    )
)]
pub async fn get_book_queue(
    State(state): State<crate::AppState>,
    Path(book_id): Path<Uuid>,
) -> AppResult<Json<Vec<Reservation>>> {
    let queue = state.services.reservations.queue_for_book(book_id).await?;
    Ok(Json(queue))
}

/// Get reservations for a user
#[utoipa::path(
    get,
    path = "/users/{id}/reservations",
    tag = "reservations",
    params(
        ("id" = Uuid, Path, description = "User ID")
    ),
    responses(
        (status = 200, description = "User's reservations", body = Vec<Reservation>)
    )
)]
pub async fn get_user_reservations(
    State(state): State<crate::AppState>,
    Path(user_id): Path<Uuid>,
) -> AppResult<Json<Vec<Reservation>>> {
    let reservations = state.services.reservations.list_for_user(user_id).await?;
    Ok(Json(reservations))
}
