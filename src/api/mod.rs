//! API handlers for the circulation REST endpoints

pub mod books;
pub mod health;
pub mod loans;
pub mod members;
pub mod openapi;

use std::time::Duration;

use axum::{
    routing::{get, post, put},
    Router,
};
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::AppState;

/// Create the application router with all routes
pub fn create_router(state: AppState, request_timeout: Duration) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let api_v1 = Router::new()
        // Health check
        .route("/health", get(health::health_check))
        .route("/ready", get(health::readiness_check))
        // Loans
        .route("/loans", get(loans::list_loans).post(loans::create_loan))
        .route("/loans/search", get(loans::search_loans))
        .route(
            "/loans/:id",
            get(loans::get_loan)
                .put(loans::reassign_loan)
                .delete(loans::delete_loan),
        )
        .route("/loans/:id/return", put(loans::return_loan))
        // Books
        .route("/books", post(books::create_book))
        .route("/books/top", get(books::top_books))
        .route("/books/newest", get(books::newest_books))
        .route("/books/:id", get(books::get_book))
        .route("/books/:id/loans", get(loans::get_book_loans))
        // Members
        .route("/members", post(members::create_member))
        .route("/members/top", get(members::top_members))
        .route("/members/:id", get(members::get_member))
        .route("/members/:id/loans", get(loans::get_member_loans))
        // Authors
        .route("/authors", post(members::create_author))
        .with_state(state);

    Router::new()
        .nest("/api/v1", api_v1)
        .merge(openapi::create_openapi_router())
        .layer(TimeoutLayer::new(request_timeout))
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}
