//! Loans repository (loan ledger) and circulation transactions.
//!
//! Every circulation write runs in a single transaction. Book rows are locked
//! with `SELECT ... FOR UPDATE` (ascending id) before their status is read, so
//! concurrent borrows of one book serialize and the later one observes
//! BORROWED. The partial unique index on open loans backs this up at the
//! storage level.

use chrono::{DateTime, Utc};
use sqlx::{PgConnection, Pool, Postgres};

use crate::{
    error::{AppError, AppResult},
    models::{
        book::BookStatus,
        loan::{CreateLoan, Loan, LoanDetails, LoanFilter, LoanSort, ReassignLoan},
        pagination::PageRequest,
    },
};

const OPEN_LOAN_INDEX: &str = "borrowed_books_one_open_loan_per_book";

const DETAILS_SELECT: &str = r#"
    SELECT l.id, l.book_id, b.title AS book_title, l.member_id, m.name AS member_name,
           l.borrow_date, l.return_date, l.created_at, l.updated_at
    FROM borrowed_books l
    JOIN books b ON b.id = l.book_id
    JOIN members m ON m.id = l.member_id
"#;

const DETAILS_FROM: &str = r#"
    FROM borrowed_books l
    JOIN books b ON b.id = l.book_id
    JOIN members m ON m.id = l.member_id
"#;

#[derive(sqlx::FromRow)]
struct LockedBook {
    id: i64,
    status: BookStatus,
    deleted_at: Option<DateTime<Utc>>,
}

/// Lock the given books for the rest of the transaction
async fn lock_books(conn: &mut PgConnection, ids: &[i64]) -> AppResult<Vec<LockedBook>> {
    if ids.is_empty() {
        return Ok(Vec::new());
    }

    let books = sqlx::query_as::<_, LockedBook>(
        "SELECT id, status, deleted_at FROM books WHERE id = ANY($1) ORDER BY id FOR UPDATE",
    )
    .bind(ids)
    .fetch_all(&mut *conn)
    .await?;

    Ok(books)
}

/// Resolve a locked book that is about to be attached to a loan
fn available_book(locked: &[LockedBook], book_id: i64) -> AppResult<BookStatus> {
    let book = locked
        .iter()
        .find(|b| b.id == book_id && b.deleted_at.is_none())
        .ok_or_else(|| AppError::NotFound(format!("Book with id {} not found", book_id)))?;

    book.status.borrow(book.id)
}

async fn ensure_member(conn: &mut PgConnection, member_id: i64) -> AppResult<()> {
    let exists: bool = sqlx::query_scalar(
        "SELECT EXISTS(SELECT 1 FROM members WHERE id = $1 AND deleted_at IS NULL)",
    )
    .bind(member_id)
    .fetch_one(&mut *conn)
    .await?;

    if exists {
        Ok(())
    } else {
        Err(AppError::NotFound(format!("Member with id {} not found", member_id)))
    }
}

/// AVAILABLE -> BORROWED, guarded on the prior status
async fn borrow_book(conn: &mut PgConnection, book_id: i64) -> AppResult<()> {
    let result = sqlx::query(
        "UPDATE books SET status = $1, updated_at = NOW() WHERE id = $2 AND status = $3",
    )
    .bind(BookStatus::Borrowed)
    .bind(book_id)
    .bind(BookStatus::Available)
    .execute(&mut *conn)
    .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::Conflict(format!(
            "Book with id {} is not available for borrowing",
            book_id
        )));
    }
    Ok(())
}

async fn release_book(conn: &mut PgConnection, book_id: i64) -> AppResult<()> {
    sqlx::query("UPDATE books SET status = $1, updated_at = NOW() WHERE id = $2")
        .bind(BookStatus::Available)
        .bind(book_id)
        .execute(&mut *conn)
        .await?;
    Ok(())
}

async fn lock_loan(conn: &mut PgConnection, loan_id: i64) -> AppResult<Loan> {
    sqlx::query_as::<_, Loan>("SELECT * FROM borrowed_books WHERE id = $1 FOR UPDATE")
        .bind(loan_id)
        .fetch_optional(&mut *conn)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Loan with id {} not found", loan_id)))
}

async fn fetch_details(conn: &mut PgConnection, loan_id: i64) -> AppResult<LoanDetails> {
    let query = format!("{} WHERE l.id = $1", DETAILS_SELECT);
    sqlx::query_as::<_, LoanDetails>(&query)
        .bind(loan_id)
        .fetch_optional(&mut *conn)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Loan with id {} not found", loan_id)))
}

/// Map a violation of the open-loan index to a conflict on `book_id`
fn open_loan_conflict(e: sqlx::Error, book_id: i64) -> AppError {
    let violated = e.as_database_error().and_then(|d| d.constraint()) == Some(OPEN_LOAN_INDEX);
    if violated {
        AppError::Conflict(format!("Book with id {} already has an open loan", book_id))
    } else {
        AppError::from(e)
    }
}

#[derive(Clone)]
pub struct LoansRepository {
    pool: Pool<Postgres>,
}

impl LoansRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    // =========================================================================
    // CIRCULATION
    // =========================================================================

    /// Open a loan on an AVAILABLE book and flip it to BORROWED
    pub async fn create(&self, data: &CreateLoan) -> AppResult<LoanDetails> {
        let mut tx = self.pool.begin().await?;

        let locked = lock_books(&mut tx, &[data.book_id]).await?;
        let book_exists = locked
            .iter()
            .any(|b| b.id == data.book_id && b.deleted_at.is_none());
        if !book_exists {
            return Err(AppError::NotFound(format!("Book with id {} not found", data.book_id)));
        }
        ensure_member(&mut tx, data.member_id).await?;
        available_book(&locked, data.book_id)?;

        borrow_book(&mut tx, data.book_id).await?;

        let borrow_date = Utc::now().date_naive();
        let loan_id: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO borrowed_books (book_id, member_id, borrow_date)
            VALUES ($1, $2, $3)
            RETURNING id
            "#,
        )
        .bind(data.book_id)
        .bind(data.member_id)
        .bind(borrow_date)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| open_loan_conflict(e, data.book_id))?;

        let details = fetch_details(&mut tx, loan_id).await?;
        tx.commit().await?;

        Ok(details)
    }

    /// Change book, member or dates of a loan.
    ///
    /// Moving an open loan releases the old book and borrows the new one; the
    /// whole change is rolled back if the new book is missing or unavailable.
    pub async fn reassign(&self, loan_id: i64, change: &ReassignLoan) -> AppResult<LoanDetails> {
        let mut tx = self.pool.begin().await?;

        let loan = lock_loan(&mut tx, loan_id).await?;

        if let Some(member_id) = change.member_id {
            ensure_member(&mut tx, member_id).await?;
        }

        let plan = loan.plan_reassignment(change);
        let locked = lock_books(&mut tx, &plan.books_to_lock()).await?;

        if let Some(book_id) = plan.release {
            release_book(&mut tx, book_id).await?;
        }
        if let Some(book_id) = plan.attach {
            available_book(&locked, book_id)?;
        }
        if let Some(book_id) = plan.borrow {
            borrow_book(&mut tx, book_id).await?;
        }

        sqlx::query(
            r#"
            UPDATE borrowed_books
            SET book_id = COALESCE($2, book_id),
                member_id = COALESCE($3, member_id),
                borrow_date = COALESCE($4, borrow_date),
                return_date = COALESCE($5, return_date),
                updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(loan_id)
        .bind(plan.attach)
        .bind(change.member_id)
        .bind(change.borrow_date)
        .bind(change.return_date)
        .execute(&mut *tx)
        .await
        .map_err(|e| open_loan_conflict(e, plan.attach.unwrap_or(loan.book_id)))?;

        let details = fetch_details(&mut tx, loan_id).await?;
        tx.commit().await?;

        Ok(details)
    }

    /// Close an open loan today and make its book AVAILABLE again
    pub async fn return_loan(&self, loan_id: i64) -> AppResult<LoanDetails> {
        let mut tx = self.pool.begin().await?;

        let loan = lock_loan(&mut tx, loan_id).await?;

        if !loan.is_open() {
            return Err(AppError::AlreadyReturned(format!(
                "Loan with id {} has already been returned",
                loan_id
            )));
        }

        sqlx::query("UPDATE borrowed_books SET return_date = $2, updated_at = NOW() WHERE id = $1")
            .bind(loan_id)
            .bind(Utc::now().date_naive())
            .execute(&mut *tx)
            .await?;

        release_book(&mut tx, loan.book_id).await?;

        let details = fetch_details(&mut tx, loan_id).await?;
        tx.commit().await?;

        Ok(details)
    }

    /// Remove a loan record. Book status is left as is.
    pub async fn delete(&self, loan_id: i64) -> AppResult<Loan> {
        sqlx::query_as::<_, Loan>("DELETE FROM borrowed_books WHERE id = $1 RETURNING *")
            .bind(loan_id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Loan with id {} not found", loan_id)))
    }

    // =========================================================================
    // READ
    // =========================================================================

    pub async fn get_by_id(&self, loan_id: i64) -> AppResult<LoanDetails> {
        let mut conn = self.pool.acquire().await?;
        fetch_details(&mut conn, loan_id).await
    }

    /// Count loans whose return date is not set
    pub async fn count_open(&self) -> AppResult<i64> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM borrowed_books WHERE return_date IS NULL")
                .fetch_one(&self.pool)
                .await?;
        Ok(count)
    }

    /// Loans of one member or one book
    pub async fn list_by_owner(
        &self,
        owner: LoanOwner,
        sort: &LoanSort,
        page: &PageRequest,
    ) -> AppResult<(Vec<LoanDetails>, i64)> {
        let (column, id) = match owner {
            LoanOwner::Member(id) => ("l.member_id", id),
            LoanOwner::Book(id) => ("l.book_id", id),
        };

        let count_query = format!("SELECT COUNT(*) {} WHERE {} = $1", DETAILS_FROM, column);
        let total: i64 = sqlx::query_scalar(&count_query)
            .bind(id)
            .fetch_one(&self.pool)
            .await?;

        let select_query = format!(
            "{} WHERE {} = $1 {} {}",
            DETAILS_SELECT,
            column,
            sort.order_by(),
            page.limit_offset()
        );
        let loans = sqlx::query_as::<_, LoanDetails>(&select_query)
            .bind(id)
            .fetch_all(&self.pool)
            .await?;

        Ok((loans, total))
    }

    // =========================================================================
    // SEARCH
    // =========================================================================

    /// OR-search over book title, member name and borrow date.
    ///
    /// Only supplied filters become predicates; an empty filter lists every loan.
    pub async fn search(
        &self,
        filter: &LoanFilter,
        sort: &LoanSort,
        page: &PageRequest,
    ) -> AppResult<(Vec<LoanDetails>, i64)> {
        let where_clause = filter.where_clause();
        tracing::debug!("Loan search predicates: {:?}", where_clause);

        let count_query = format!("SELECT COUNT(*) {} {}", DETAILS_FROM, where_clause);
        let mut count = sqlx::query_scalar::<_, i64>(&count_query);
        if let Some(ref title) = filter.book_title {
            count = count.bind(title);
        }
        if let Some(ref name) = filter.member_name {
            count = count.bind(name);
        }
        if let Some(date) = filter.borrow_date {
            count = count.bind(date);
        }
        let total = count.fetch_one(&self.pool).await?;

        let select_query = format!(
            "{} {} {} {}",
            DETAILS_SELECT,
            where_clause,
            sort.order_by(),
            page.limit_offset()
        );
        let mut builder = sqlx::query_as::<_, LoanDetails>(&select_query);
        if let Some(ref title) = filter.book_title {
            builder = builder.bind(title);
        }
        if let Some(ref name) = filter.member_name {
            builder = builder.bind(name);
        }
        if let Some(date) = filter.borrow_date {
            builder = builder.bind(date);
        }
        let loans = builder.fetch_all(&self.pool).await?;

        Ok((loans, total))
    }
}

/// Whose loan history to list
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoanOwner {
    Member(i64),
    Book(i64),
}
