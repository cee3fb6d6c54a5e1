//! Loan management endpoints

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use rust_decimal::Decimal;
use serde::Deserialize;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::{error::AppResult, models::loan::Loan};

/// Create loan request
#[derive(Deserialize, ToSchema)]
pub struct CreateLoanRequest {
    /// Book to borrow
    pub book_id: Uuid,
    /// Borrowing patron
    pub user_id: Uuid,
}

/// Report-lost request
#[derive(Deserialize, Validate, ToSchema)]
pub struct ReportLostRequest {
    /// Replacement cost billed to the borrower
    pub amount: Decimal,
    /// Free-form note for the fine
    #[validate(length(min = 1, max = 500))]
    pub description: Option<String>,
}

/// Borrow a book
#[utoipa::path(
    post,
    path = "/loans",
    tag = "loans",
    request_body = CreateLoanRequest,
    responses(
        (status = 201, description = "Loan created", body = Loan),
        (status = 404, description = "Book not found"),
        (status = 422, description = "Book is on loan or reserved")
    )
)]
pub async fn create_loan(
    State(state): State<crate::AppState>,
    Json(request): Json<CreateLoanRequest>,
) -> AppResult<(StatusCode, Json<Loan>)> {
    let loan = state
        .services
        .loans
        .make_loan(request.book_id, request.user_id)
        .await?;
    Ok((StatusCode::CREATED, Json(loan)))
}

/// Return a borrowed book
#[utoipa::path(
    post,
    path = "/loans/{id}/return",
    tag = "loans",
    params(
        ("id" = Uuid, Path, description = "Loan ID")
    ),
    responses(
        (status = 200, description = "Book returned", body = Loan),
        (status = 404, description = "Loan not found"),
        (status = 422, description = "Loan already settled")
    )
)]
pub async fn return_loan(
    State(state): State<crate::AppState>,
    Path(loan_id): Path<Uuid>,
) -> AppResult<Json<Loan>> {
    let loan = state.services.loans.return_loan(loan_id).await?;
    Ok(Json(loan))
}

/// Extend a loan
#[utoipa::path(
    post,
    path = "/loans/{id}/extend",
    tag = "loans",
    params(
        ("id" = Uuid, Path, description = "Loan ID")
    ),
    responses(
        (status = 200, description = "Due date pushed out", body = Loan),
        (status = 404, description = "Loan not found"),
        (status = 422, description = "Blocked by a reservation or loan state")
    )
)]
pub async fn extend_loan(
    State(state): State<crate::AppState>,
    Path(loan_id): Path<Uuid>,
) -> AppResult<Json<Loan>> {
    let loan = state.services.loans.extend_loan(loan_id).await?;
    Ok(Json(loan))
}

/// Report a borrowed book lost
#[utoipa::path(
    post,
    path = "/loans/{id}/lost",
    tag = "loans",
    params(
        ("id" = Uuid, Path, description = "Loan ID")
    ),
    request_body = ReportLostRequest,
    responses(
        (status = 200, description = "Loan written off, fine issued", body = Loan),
        (status = 404, description = "Loan not found"),
        (status = 422, description = "Loan already settled")
    )
)]
pub async fn report_lost(
    State(state): State<crate::AppState>,
    Path(loan_id): Path<Uuid>,
    Json(request): Json<ReportLostRequest>,
) -> AppResult<Json<Loan>> {
    request.validate()?;
    let loan = state
        .services
        .loans
        .report_lost(loan_id, request.amount, request.description)
        .await?;
    Ok(Json(loan))
}

/// List overdue loans
#[utoipa::path(
    get,
    path = "/loans/overdue",
    tag = "loans",
    responses(
        (status = 200, description = "Active loans past their due date", body = Vec<Loan>)
    )
)]
pub async fn list_overdue(
    State(state): State<crate::AppState>,
) -> AppResult<Json<Vec<Loan>>> {
    let loans = state.services.loans.list_overdue().await?;
    Ok(Json(loans))
}

/// Get current loans for a user
#[utoipa::path(
    get,
    path = "/users/{id}/loans",
    tag = "loans",
    params(
        ("id" = Uuid, Path, description = "User ID")
    ),
    responses(
        (status = 200, description = "User's current loans", body = Vec<Loan>)
    )
)]
pub async fn get_user_loans(
    State(state): State<crate::AppState>,
    Path(user_id): Path<Uuid>,
) -> AppResult<Json<Vec<Loan>>> {
    let loans = state.services.loans.list_for_user(user_id).await?;
    Ok(Json(loans))
}
