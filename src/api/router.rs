use axum::{
    Router,
    routing::{get, patch, post},
};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use super::handlers::{
    AppState, create_borrowing, create_reservation, expire_reservations_handler,
    get_borrowing_handler, get_reservation_handler, list_borrowings_handler,
    list_member_fines, list_reservations_handler, notify_reservation, renew_borrowing_handler,
    return_borrowing, update_reservation_status_handler,
};

/// Creates the API router with all circulation endpoints
///
/// Borrowings:
/// - POST /borrowings - Borrow a copy
/// - GET /borrowings - List borrowings (filter, sort, paginate)
/// - GET /borrowings/:id - Get a borrowing
/// - POST /borrowings/:id/return - Return a copy
/// - POST /borrowings/:id/renew - Renew a borrowing
/// - GET /members/:id/fines - Fine ledger of a member
///
/// Reservations:
/// - POST /reservations - Reserve a book
/// - GET /reservations - List reservations (filter, sort, paginate)
/// - GET /reservations/:id - Get a reservation
/// - PATCH /reservations/:id/status - Change reservation status
/// - POST /reservations/:id/notify - Send the hold notification
/// - POST /reservations/expire - Expire overdue holds
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        // Health check endpoint
        .route("/health", get(health_check))
        // Borrowings
        .route(
            "/borrowings",
            post(create_borrowing).get(list_borrowings_handler),
        )
        .route("/borrowings/:id", get(get_borrowing_handler))
        .route("/borrowings/:id/return", post(return_borrowing))
        .route("/borrowings/:id/renew", post(renew_borrowing_handler))
        .route("/members/:id/fines", get(list_member_fines))
        // Reservations
        .route(
            "/reservations",
            post(create_reservation).get(list_reservations_handler),
        )
        .route("/reservations/expire", post(expire_reservations_handler))
        .route("/reservations/:id", get(get_reservation_handler))
        .route(
            "/reservations/:id/status",
            patch(update_reservation_status_handler),
        )
        .route("/reservations/:id/notify", post(notify_reservation))
        // Add tracing middleware
        .layer(TraceLayer::new_for_http())
        // Add application state
        .with_state(state)
}

/// Health check endpoint
async fn health_check() -> &'static str {
    "OK"
}
