//! Book endpoints: lookups, rankings and catalog additions

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use utoipa::IntoParams;

use crate::{
    error::AppResult,
    models::{
        book::{Book, BookRanking, CreateBook, NewestBooksQuery},
        pagination::Page,
    },
};

/// Query for top-N rankings
#[derive(Debug, Deserialize, IntoParams)]
pub struct TopQuery {
    /// Maximum number of results (default: 3)
    #[serde(alias = "topN")]
    pub n: Option<i64>,
}

impl TopQuery {
    pub fn n(&self) -> i64 {
        self.n.unwrap_or(3)
    }
}

/// Most borrowed books
#[utoipa::path(
    get,
    path = "/books/top",
    tag = "books",
    params(TopQuery),
    responses(
        (status = 200, description = "Books by descending loan count", body = Vec<BookRanking>)
    )
)]
pub async fn top_books(
    State(state): State<crate::AppState>,
    Query(query): Query<TopQuery>,
) -> AppResult<Json<Vec<BookRanking>>> {
    let books = state.services.rankings.top_books(query.n()).await?;
    Ok(Json(books))
}

/// Newest books by status
#[utoipa::path(
    get,
    path = "/books/newest",
    tag = "books",
    params(NewestBooksQuery),
    responses(
        (status = 200, description = "Books, newest first", body = crate::models::pagination::BookPage),
        (status = 400, description = "Unknown status or invalid paging")
    )
)]
pub async fn newest_books(
    State(state): State<crate::AppState>,
    Query(query): Query<NewestBooksQuery>,
) -> AppResult<Json<Page<Book>>> {
    let page = state.services.catalog.newest_books(&query).await?;
    Ok(Json(page))
}

/// Get a book
#[utoipa::path(
    get,
    path = "/books/{id}",
    tag = "books",
    params(("id" = i64, Path, description = "Book ID")),
    responses(
        (status = 200, description = "Book details", body = Book),
        (status = 404, description = "Book not found")
    )
)]
pub async fn get_book(
    State(state): State<crate::AppState>,
    Path(id): Path<i64>,
) -> AppResult<Json<Book>> {
    let book = state.services.catalog.get_book(id).await?;
    Ok(Json(book))
}

/// Add a book to the catalog
#[utoipa::path(
    post,
    path = "/books",
    tag = "books",
    request_body = CreateBook,
    responses(
        (status = 201, description = "Book created", body = Book),
        (status = 404, description = "Author not found")
    )
)]
pub async fn create_book(
    State(state): State<crate::AppState>,
    Json(data): Json<CreateBook>,
) -> AppResult<(StatusCode, Json<Book>)> {
    let book = state.services.catalog.create_book(&data).await?;
    Ok((StatusCode::CREATED, Json(book)))
}
