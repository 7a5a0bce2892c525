//! Books repository (catalog store)

use sqlx::{Pool, Postgres};

use crate::{
    error::{AppError, AppResult},
    models::{
        book::{Book, BookRanking, BookStatus, CreateBook},
        pagination::PageRequest,
    },
};

#[derive(Clone)]
pub struct BooksRepository {
    pool: Pool<Postgres>,
}

impl BooksRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// Get a book by ID. Soft-deleted books are not found.
    pub async fn get_by_id(&self, id: i64) -> AppResult<Book> {
        sqlx::query_as::<_, Book>("SELECT * FROM books WHERE id = $1 AND deleted_at IS NULL")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Book with id {} not found", id)))
    }

    /// Create a new book. New books are always AVAILABLE.
    pub async fn create(&self, data: &CreateBook) -> AppResult<Book> {
        let author_exists: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM authors WHERE id = $1 AND deleted_at IS NULL)",
        )
        .bind(data.author_id)
        .fetch_one(&self.pool)
        .await?;

        if !author_exists {
            return Err(AppError::NotFound(format!("Author with id {} not found", data.author_id)));
        }

        let book = sqlx::query_as::<_, Book>(
            r#"
            INSERT INTO books (title, description, category, publishing_year, photo_path, author_id, status)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING *
            "#,
        )
        .bind(&data.title)
        .bind(&data.description)
        .bind(&data.category)
        .bind(data.publishing_year)
        .bind(&data.photo_path)
        .bind(data.author_id)
        .bind(BookStatus::Available)
        .fetch_one(&self.pool)
        .await?;

        Ok(book)
    }

    /// Books ordered by total loan count (open and returned), zero-loan books included.
    ///
    /// Equal counts are ordered by id so results are stable.
    pub async fn top_by_loan_count(&self, limit: i64) -> AppResult<Vec<BookRanking>> {
        let rows = sqlx::query_as::<_, BookRanking>(
            r#"
            SELECT b.*, COUNT(l.id) AS loan_count
            FROM books b
            LEFT JOIN borrowed_books l ON l.book_id = b.id
            WHERE b.deleted_at IS NULL
            GROUP BY b.id
            ORDER BY loan_count DESC, b.id ASC
            LIMIT $1
            "#,
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    /// Books with the given status, newest first
    pub async fn list_by_status(
        &self,
        status: BookStatus,
        page: &PageRequest,
    ) -> AppResult<(Vec<Book>, i64)> {
        let total: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM books WHERE status = $1 AND deleted_at IS NULL",
        )
        .bind(status)
        .fetch_one(&self.pool)
        .await?;

        let query = format!(
            "SELECT * FROM books WHERE status = $1 AND deleted_at IS NULL \
             ORDER BY created_at DESC, id DESC {}",
            page.limit_offset()
        );

        let books = sqlx::query_as::<_, Book>(&query)
            .bind(status)
            .fetch_all(&self.pool)
            .await?;

        Ok((books, total))
    }
}
