//! Fee management endpoints

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Deserialize;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::{error::AppResult, models::fee::Fee};

/// Administrative lost-item fine request
#[derive(Deserialize, Validate, ToSchema)]
pub struct CreateLostFineRequest {
    /// Billed patron
    pub user_id: Uuid,
    /// Loan the lost book belongs to
    pub loan_id: Uuid,
    /// Replacement cost
    pub amount: Decimal,
    /// Free-form note
    #[validate(length(min = 1, max = 500))]
    pub description: Option<String>,
}

/// Mark-paid request
#[derive(Deserialize, ToSchema)]
pub struct MarkPaidRequest {
    /// Settlement date; defaults to now
    pub paid_date: Option<DateTime<Utc>>,
}

/// Create an administrative lost-item fine
#[utoipa::path(
    post,
    path = "/fees",
    tag = "fees",
    request_body = CreateLostFineRequest,
    responses(
        (status = 201, description = "Fine created", body = Fee),
        (status = 400, description = "Invalid amount or description")
    )
)]
pub async fn create_lost_fine(
    State(state): State<crate::AppState>,
    Json(request): Json<CreateLostFineRequest>,
) -> AppResult<(StatusCode, Json<Fee>)> {
    request.validate()?;
    let fee = state
        .services
        .fees
        .create_lost_fine(
            request.user_id,
            request.loan_id,
            request.amount,
            request.description,
        )
        .await?;
    Ok((StatusCode::CREATED, Json(fee)))
}

/// Settle a fee
#[utoipa::path(
    post,
    path = "/fees/{id}/pay",
    tag = "fees",
    params(
        ("id" = Uuid, Path, description = "Fee ID")
    ),
    request_body = MarkPaidRequest,
    responses(
        (status = 200, description = "Fee paid", body = Fee),
        (status = 404, description = "Fee not found"),
        (status = 422, description = "Fee already settled")
    )
)]
pub async fn mark_fine_paid(
    State(state): State<crate::AppState>,
    Path(fee_id): Path<Uuid>,
    Json(request): Json<MarkPaidRequest>,
) -> AppResult<Json<Fee>> {
    let paid_date = request.paid_date.unwrap_or_else(Utc::now);
    let fee = state.services.fees.mark_fine_paid(fee_id, paid_date).await?;
    Ok(Json(fee))
}

/// Waive a fee
#[utoipa::path(
    post,
    path = "/fees/{id}/waive",
    tag = "fees",
    params(
        ("id" = Uuid, Path, description = "Fee ID")
    ),
    responses(
        (status = 200, description = "Fee waived", body = Fee),
        (status = 404, description = "Fee not found"),
        (status = 422, description = "Fee already settled")
    )
)]
pub async fn waive_fine(
    State(state): State<crate::AppState>,
    Path(fee_id): Path<Uuid>,
) -> AppResult<Json<Fee>> {
    let fee = state.services.fees.waive_fine(fee_id).await?;
    Ok(Json(fee))
}

/// Get fees for a user
#[utoipa::path(
    get,
    path = "/users/{id}/fees",
    tag = "fees",
    params(
        ("id" = Uuid, Path, description = "User ID")
    ),
    responses(
        (status = 200, description = "User's fees, newest first", body = Vec<Fee>)
    )
)]
pub async fn get_user_fees(
    State(state): State<crate::AppState>,
    Path(user_id): Path<Uuid>,
) -> AppResult<Json<Vec<Fee>>> {
    let fees = state.services.fees.list_for_user(user_id).await?;
    Ok(Json(fees))
}
