//! Loan (borrowed book) model and related types

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};

use crate::error::{AppError, AppResult};

use super::pagination::SortDirection;

/// Loan row from the ledger
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Loan {
    pub id: i64,
    pub book_id: i64,
    pub member_id: i64,
    pub borrow_date: NaiveDate,
    /// `None` while the loan is open
    pub return_date: Option<NaiveDate>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Loan {
    pub fn is_open(&self) -> bool {
        self.return_date.is_none()
    }

    /// Work out which books change availability when `change` is applied.
    ///
    /// An open loan holds its book; a returned loan holds nothing, so moving a
    /// returned loan to another book only re-points the history record.
    pub fn plan_reassignment(&self, change: &ReassignLoan) -> AvailabilityPlan {
        let was_open = self.is_open();
        let stays_open = was_open && change.return_date.is_none();

        match change.book_id {
            Some(new_book) if new_book != self.book_id => AvailabilityPlan {
                attach: Some(new_book),
                release: was_open.then_some(self.book_id),
                borrow: stays_open.then_some(new_book),
            },
            _ => AvailabilityPlan {
                attach: None,
                release: (was_open && !stays_open).then_some(self.book_id),
                borrow: None,
            },
        }
    }
}

/// Book status changes implied by a reassignment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct AvailabilityPlan {
    /// New book for the loan; must exist and be AVAILABLE
    pub attach: Option<i64>,
    /// Book flipped back to AVAILABLE
    pub release: Option<i64>,
    /// Book flipped to BORROWED
    pub borrow: Option<i64>,
}

impl AvailabilityPlan {
    /// Books to lock, in ascending id order
    pub fn books_to_lock(&self) -> Vec<i64> {
        let mut ids: Vec<i64> = [self.attach, self.release, self.borrow]
            .into_iter()
            .flatten()
            .collect();
        ids.sort_unstable();
        ids.dedup();
        ids
    }
}

/// Loan with the book title and member name, for display
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct LoanDetails {
    pub id: i64,
    pub book_id: i64,
    pub book_title: String,
    pub member_id: i64,
    pub member_name: String,
    pub borrow_date: NaiveDate,
    pub return_date: Option<NaiveDate>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Create loan request
#[derive(Debug, Clone, Copy, Deserialize, ToSchema)]
pub struct CreateLoan {
    pub book_id: i64,
    pub member_id: i64,
}

/// Reassign loan request. Absent fields are left untouched.
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct ReassignLoan {
    pub book_id: Option<i64>,
    pub member_id: Option<i64>,
    pub borrow_date: Option<NaiveDate>,
    pub return_date: Option<NaiveDate>,
}

/// Query parameters for loan search
#[derive(Debug, Default, Deserialize, IntoParams)]
pub struct LoanSearchQuery {
    /// Case-insensitive substring of the book title
    #[serde(alias = "bookTitle")]
    pub book_title: Option<String>,
    /// Case-insensitive substring of the member name
    #[serde(alias = "memberName")]
    pub member_name: Option<String>,
    /// Exact borrow date (YYYY-MM-DD)
    #[serde(alias = "borrowDate")]
    pub borrow_date: Option<String>,
    pub page: Option<i64>,
    pub size: Option<i64>,
    #[serde(alias = "sortBy")]
    pub sort_by: Option<String>,
    #[serde(alias = "sortDir")]
    pub sort_dir: Option<String>,
}

/// OR-combined loan search predicates. Blank inputs are dropped.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoanFilter {
    pub book_title: Option<String>,
    pub member_name: Option<String>,
    pub borrow_date: Option<NaiveDate>,
}

/// Keeps the value as given; whitespace only counts when deciding blankness
fn non_blank(value: Option<&str>) -> Option<String> {
    value
        .filter(|v| !v.trim().is_empty())
        .map(str::to_string)
}

impl LoanFilter {
    pub fn parse(
        book_title: Option<&str>,
        member_name: Option<&str>,
        borrow_date: Option<&str>,
    ) -> AppResult<Self> {
        let borrow_date = match non_blank(borrow_date) {
            Some(raw) => Some(NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d").map_err(|_| {
                AppError::InvalidArgument(format!("Invalid borrow date '{}', expected YYYY-MM-DD", raw))
            })?),
            None => None,
        };

        Ok(Self {
            book_title: non_blank(book_title),
            member_name: non_blank(member_name),
            borrow_date,
        })
    }

    /// `WHERE` clause over `borrowed_books l JOIN books b JOIN members m`.
    ///
    /// Placeholders are numbered in bind order: title, member name, date.
    /// No supplied filter means no constraint.
    pub fn where_clause(&self) -> String {
        let mut predicates = Vec::new();
        let mut idx = 1;

        if self.book_title.is_some() {
            predicates.push(format!("STRPOS(LOWER(b.title), LOWER(${})) > 0", idx));
            idx += 1;
        }
        if self.member_name.is_some() {
            predicates.push(format!("STRPOS(LOWER(m.name), LOWER(${})) > 0", idx));
            idx += 1;
        }
        if self.borrow_date.is_some() {
            predicates.push(format!("l.borrow_date = ${}", idx));
        }

        if predicates.is_empty() {
            String::new()
        } else {
            format!("WHERE ({})", predicates.join(" OR "))
        }
    }
}

/// Sortable loan columns
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoanSortField {
    Id,
    CreatedAt,
    UpdatedAt,
    BorrowDate,
    ReturnDate,
    BookTitle,
    MemberName,
}

impl LoanSortField {
    pub fn column(&self) -> &'static str {
        match self {
            LoanSortField::Id => "l.id",
            LoanSortField::CreatedAt => "l.created_at",
            LoanSortField::UpdatedAt => "l.updated_at",
            LoanSortField::BorrowDate => "l.borrow_date",
            LoanSortField::ReturnDate => "l.return_date",
            LoanSortField::BookTitle => "b.title",
            LoanSortField::MemberName => "m.name",
        }
    }
}

impl std::str::FromStr for LoanSortField {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "id" => Ok(LoanSortField::Id),
            "createdAt" | "created_at" => Ok(LoanSortField::CreatedAt),
            "updatedAt" | "updated_at" => Ok(LoanSortField::UpdatedAt),
            "borrowDate" | "borrow_date" => Ok(LoanSortField::BorrowDate),
            "returnDate" | "return_date" => Ok(LoanSortField::ReturnDate),
            "bookTitle" | "book_title" | "book.title" => Ok(LoanSortField::BookTitle),
            "memberName" | "member_name" | "member.name" => Ok(LoanSortField::MemberName),
            other => Err(AppError::InvalidArgument(format!("Cannot sort loans by '{}'", other))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoanSort {
    pub field: LoanSortField,
    pub direction: SortDirection,
}

impl LoanSort {
    /// Defaults to `createdAt` ascending
    pub fn parse(sort_by: Option<&str>, sort_dir: Option<&str>) -> AppResult<Self> {
        let field = match sort_by.map(str::trim).filter(|s| !s.is_empty()) {
            Some(s) => s.parse()?,
            None => LoanSortField::CreatedAt,
        };

        Ok(Self {
            field,
            direction: SortDirection::parse(sort_dir),
        })
    }

    pub fn order_by(&self) -> String {
        // id keeps paging stable across equal keys
        if self.field == LoanSortField::Id {
            format!("ORDER BY l.id {}", self.direction.as_sql())
        } else {
            format!(
                "ORDER BY {} {}, l.id ASC",
                self.field.column(),
                self.direction.as_sql()
            )
        }
    }
}

impl Default for LoanSort {
    fn default() -> Self {
        Self {
            field: LoanSortField::CreatedAt,
            direction: SortDirection::Asc,
        }
    }
}
