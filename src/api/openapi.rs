//! OpenAPI documentation

use axum::Router;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::api::{fees, health, loans, reservations};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Velin API",
        version = "1.0.0",
        description = "Library Circulation Backend REST API",
        license(name = "AGPL-3.0", url = "https://www.gnu.org/licenses/agpl-3.0.html")
    ),
    servers(
        (url = "/api/v1", description = "API v1")
    ),
    paths(
        // Health
        health::health_check,
        health::readiness_check,
        // Loans
        loans::create_loan,
        loans::return_loan,
        loans::extend_loan,
        loans::report_lost,
        loans::list_overdue,
        loans::get_user_loans,
        // Reservations
        reservations::create_reservation,
        reservations::cancel_reservation,
        reservations::pick_reservation,
        reservations::get_book_queue,
        reservations::get_user_reservations,
        // Fees
        fees::create_lost_fine,
        fees::mark_fine_paid,
        fees::waive_fine,
        fees::get_user_fees,
    ),
    components(
        schemas(
            // Models
            crate::models::book::Book,
            crate::models::loan::Loan,
            crate::models::loan::LoanStatus,
            crate::models::reservation::Reservation,
            crate::models::reservation::ReservationStatus,
            crate::models::fee::Fee,
            crate::models::fee::FeeStatus,
            crate::models::fee::FineType,
            // Requests / responses
            loans::CreateLoanRequest,
            loans::ReportLostRequest,
            reservations::CreateReservationRequest,
            reservations::PatronRequest,
            reservations::PickupResponse,
            fees::CreateLostFineRequest,
            fees::MarkPaidRequest,
            // Health
            health::HealthResponse,
            // Errors
            crate::error::ErrorResponse,
        )
    ),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "loans", description = "Loan lifecycle"),
        (name = "reservations", description = "Reservation queue"),
        (name = "fees", description = "Late and lost-item fees")
    )
)]
pub struct ApiDoc;

/// Create the OpenAPI documentation router
pub fn create_openapi_router() -> Router {
    Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
}
