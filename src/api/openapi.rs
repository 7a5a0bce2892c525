//! OpenAPI documentation

use axum::Router;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::api::{books, health, loans, members};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Circulation API",
        version = "0.1.0",
        description = "Library circulation REST API: loans, returns and popularity rankings"
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
        loans::list_loans,
        loans::search_loans,
        loans::get_loan,
        loans::reassign_loan,
        loans::return_loan,
        loans::delete_loan,
        loans::get_member_loans,
        loans::get_book_loans,
        // Books
        books::top_books,
        books::newest_books,
        books::get_book,
        books::create_book,
        // Members
        members::top_members,
        members::get_member,
        members::create_member,
        members::create_author,
    ),
    components(
        schemas(
            // Loans
            crate::models::loan::LoanDetails,
            crate::models::loan::CreateLoan,
            crate::models::loan::ReassignLoan,
            crate::models::pagination::LoanPage,
            loans::ReturnResponse,
            // Books
            crate::models::book::Book,
            crate::models::book::BookStatus,
            crate::models::book::BookRanking,
            crate::models::book::CreateBook,
            crate::models::pagination::BookPage,
            // Members
            crate::models::member::Member,
            crate::models::member::MemberRanking,
            crate::models::member::CreateMember,
            crate::models::author::Author,
            crate::models::author::CreateAuthor,
            // Health
            health::HealthResponse,
            // Errors
            crate::error::ErrorResponse,
        )
    ),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "loans", description = "Borrowing, returns and loan history"),
        (name = "books", description = "Catalog lookups and book rankings"),
        (name = "members", description = "Members, authors and borrower rankings")
    )
)]
pub struct ApiDoc;

/// Create the OpenAPI documentation router
pub fn create_openapi_router() -> Router {
    Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
}
