//! API handlers for LibraryFlow REST endpoints

pub mod books;
pub mod health;
pub mod loans;
pub mod members;
pub mod openapi;
pub mod panels;
pub mod reports;

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::AppState;

/// Create the application router with all routes
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let api_v1 = Router::new()
        // Health check
        .route("/health", get(health::health_check))
        .route("/ready", get(health::readiness_check))
        // Catalog
        .route("/books", get(books::list_books).post(books::create_book))
        .route("/books/search", get(books::search_books))
        .route(
            "/books/:id",
            get(books::get_book)
                .put(books::update_book)
                .delete(books::delete_book),
        )
        // Roster
        .route("/members", get(members::list_members).post(members::create_member))
        .route("/members/search", get(members::search_members))
        .route(
            "/members/:id",
            get(members::get_member)
                .put(members::update_member)
                .delete(members::delete_member),
        )
        .route("/members/:id/fines", get(members::get_member_fines))
        // Ledger
        .route("/loans", get(loans::list_loans).post(loans::issue_book))
        .route("/loans/current", get(loans::current_loans))
        .route("/loans/current/search", get(loans::search_current_loans))
        .route("/loans/overdue", get(loans::overdue_loans))
        .route("/loans/overdue/search", get(loans::search_overdue_loans))
        .route("/loans/due-date", get(loans::suggest_due_date))
        .route("/loans/:id", get(loans::get_loan))
        .route("/loans/:id/return", post(loans::return_book))
        // Reports
        .route("/reports/dashboard", get(reports::dashboard))
        .route("/reports/activity", get(reports::recent_activity))
        .route("/reports/reminders", get(reports::overdue_reminders))
        .route("/panels/:panel", get(panels::render_panel))
        .with_state(state);

    Router::new()
        .nest("/api/v1", api_v1)
        .merge(openapi::create_openapi_router())
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}
