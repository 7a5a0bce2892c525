//! Loan (circulation) endpoints

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Serialize;
use utoipa::ToSchema;

use crate::{
    error::AppResult,
    models::{
        loan::{CreateLoan, LoanDetails, LoanSearchQuery, ReassignLoan},
        pagination::{Page, PageQuery},
    },
};

/// Return response with loan details
#[derive(Serialize, ToSchema)]
pub struct ReturnResponse {
    /// Return status
    pub status: String,
    /// Loan details
    pub loan: LoanDetails,
}

/// Borrow a book
#[utoipa::path(
    post,
    path = "/loans",
    tag = "loans",
    request_body = CreateLoan,
    responses(
        (status = 201, description = "Loan created", body = LoanDetails),
        (status = 404, description = "Book or member not found"),
        (status = 409, description = "Book is not available")
    )
)]
pub async fn create_loan(
    State(state): State<crate::AppState>,
    Json(request): Json<CreateLoan>,
) -> AppResult<(StatusCode, Json<LoanDetails>)> {
    let loan = state.services.loans.create_loan(request).await?;
    Ok((StatusCode::CREATED, Json(loan)))
}

/// List all loans
#[utoipa::path(
    get,
    path = "/loans",
    tag = "loans",
    params(PageQuery),
    responses(
        (status = 200, description = "Page of loans", body = crate::models::pagination::LoanPage),
        (status = 400, description = "Invalid paging or sort parameters")
    )
)]
pub async fn list_loans(
    State(state): State<crate::AppState>,
    Query(query): Query<PageQuery>,
) -> AppResult<Json<Page<LoanDetails>>> {
    let page = state.services.loans.list_loans(&query).await?;
    Ok(Json(page))
}

/// Search loans by book title, member name or borrow date
///
/// Supplied filters are OR-combined; blank filters are ignored.
#[utoipa::path(
    get,
    path = "/loans/search",
    tag = "loans",
    params(LoanSearchQuery),
    responses(
        (status = 200, description = "Matching loans", body = crate::models::pagination::LoanPage),
        (status = 400, description = "Unparseable borrow date or sort parameters")
    )
)]
pub async fn search_loans(
    State(state): State<crate::AppState>,
    Query(query): Query<LoanSearchQuery>,
) -> AppResult<Json<Page<LoanDetails>>> {
    let page = state.services.loans.search_loans(&query).await?;
    Ok(Json(page))
}

/// Get a loan
#[utoipa::path(
    get,
    path = "/loans/{id}",
    tag = "loans",
    params(("id" = i64, Path, description = "Loan ID")),
    responses(
        (status = 200, description = "Loan details", body = LoanDetails),
        (status = 404, description = "Loan not found")
    )
)]
pub async fn get_loan(
    State(state): State<crate::AppState>,
    Path(loan_id): Path<i64>,
) -> AppResult<Json<LoanDetails>> {
    let loan = state.services.loans.get_loan(loan_id).await?;
    Ok(Json(loan))
}

/// Reassign a loan to another book or member, or correct its dates
#[utoipa::path(
    put,
    path = "/loans/{id}",
    tag = "loans",
    params(("id" = i64, Path, description = "Loan ID")),
    request_body = ReassignLoan,
    responses(
        (status = 200, description = "Loan updated", body = LoanDetails),
        (status = 404, description = "Loan, book or member not found"),
        (status = 409, description = "New book is not available")
    )
)]
pub async fn reassign_loan(
    State(state): State<crate::AppState>,
    Path(loan_id): Path<i64>,
    Json(change): Json<ReassignLoan>,
) -> AppResult<Json<LoanDetails>> {
    let loan = state.services.loans.reassign_loan(loan_id, change).await?;
    Ok(Json(loan))
}

/// Return a borrowed book
#[utoipa::path(
    put,
    path = "/loans/{id}/return",
    tag = "loans",
    params(("id" = i64, Path, description = "Loan ID")),
    responses(
        (status = 200, description = "Book returned", body = ReturnResponse),
        (status = 404, description = "Loan not found"),
        (status = 409, description = "Already returned")
    )
)]
pub async fn return_loan(
    State(state): State<crate::AppState>,
    Path(loan_id): Path<i64>,
) -> AppResult<Json<ReturnResponse>> {
    let loan = state.services.loans.return_loan(loan_id).await?;

    Ok(Json(ReturnResponse {
        status: "returned".to_string(),
        loan,
    }))
}

/// Delete a loan record (administrative; book status is not reverted)
#[utoipa::path(
    delete,
    path = "/loans/{id}",
    tag = "loans",
    params(("id" = i64, Path, description = "Loan ID")),
    responses(
        (status = 204, description = "Loan deleted"),
        (status = 404, description = "Loan not found")
    )
)]
pub async fn delete_loan(
    State(state): State<crate::AppState>,
    Path(loan_id): Path<i64>,
) -> AppResult<StatusCode> {
    state.services.loans.delete_loan(loan_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Loan history of a member
#[utoipa::path(
    get,
    path = "/members/{id}/loans",
    tag = "loans",
    params(("id" = i64, Path, description = "Member ID"), PageQuery),
    responses(
        (status = 200, description = "Member's loans", body = crate::models::pagination::LoanPage),
        (status = 404, description = "Member not found")
    )
)]
pub async fn get_member_loans(
    State(state): State<crate::AppState>,
    Path(member_id): Path<i64>,
    Query(query): Query<PageQuery>,
) -> AppResult<Json<Page<LoanDetails>>> {
    let page = state.services.loans.loans_for_member(member_id, &query).await?;
    Ok(Json(page))
}

/// Loan history of a book
#[utoipa::path(
    get,
    path = "/books/{id}/loans",
    tag = "loans",
    params(("id" = i64, Path, description = "Book ID"), PageQuery),
    responses(
        (status = 200, description = "Book's loans", body = crate::models::pagination::LoanPage),
        (status = 404, description = "Book not found")
    )
)]
pub async fn get_book_loans(
    State(state): State<crate::AppState>,
    Path(book_id): Path<i64>,
    Query(query): Query<PageQuery>,
) -> AppResult<Json<Page<LoanDetails>>> {
    let page = state.services.loans.loans_for_book(book_id, &query).await?;
    Ok(Json(page))
}
