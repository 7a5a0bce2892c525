//! Book model and related types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{
    encode::IsNull,
    error::BoxDynError,
    postgres::{PgArgumentBuffer, PgTypeInfo, PgValueRef},
    Decode, Encode, FromRow, Postgres,
};
use utoipa::{IntoParams, ToSchema};

use crate::error::{AppError, AppResult};

/// Availability of a book, driven by its open loan (if any)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BookStatus {
    Available,
    Borrowed,
}

impl BookStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BookStatus::Available => "AVAILABLE",
            BookStatus::Borrowed => "BORROWED",
        }
    }

    /// Status after a loan is opened on the book.
    ///
    /// Only an available book can be borrowed; a borrowed book is rejected,
    /// never queued.
    pub fn borrow(self, book_id: i64) -> AppResult<BookStatus> {
        match self {
            BookStatus::Available => Ok(BookStatus::Borrowed),
            BookStatus::Borrowed => Err(AppError::Conflict(format!(
                "Book with id {} is not available for borrowing",
                book_id
            ))),
        }
    }
}

impl Default for BookStatus {
    fn default() -> Self {
        BookStatus::Available
    }
}

impl std::fmt::Display for BookStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for BookStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "AVAILABLE" => Ok(BookStatus::Available),
            "BORROWED" => Ok(BookStatus::Borrowed),
            other => Err(format!("Unknown book status: {}", other)),
        }
    }
}

// Stored as TEXT
impl sqlx::Type<Postgres> for BookStatus {
    fn type_info() -> PgTypeInfo {
        <String as sqlx::Type<Postgres>>::type_info()
    }

    fn compatible(ty: &PgTypeInfo) -> bool {
        <String as sqlx::Type<Postgres>>::compatible(ty)
    }
}

impl<'r> Decode<'r, Postgres> for BookStatus {
    fn decode(value: PgValueRef<'r>) -> Result<Self, BoxDynError> {
        let s = <String as Decode<'r, Postgres>>::decode(value)?;
        s.parse().map_err(|e: String| e.into())
    }
}

impl Encode<'_, Postgres> for BookStatus {
    fn encode_by_ref(&self, buf: &mut PgArgumentBuffer) -> IsNull {
        <&str as Encode<Postgres>>::encode_by_ref(&self.as_str(), buf)
    }
}

/// Book record from the catalog
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Book {
    pub id: i64,
    pub title: String,
    pub description: Option<String>,
    pub category: String,
    pub publishing_year: Option<i32>,
    /// Reference to the cover photo in external storage
    pub photo_path: Option<String>,
    pub author_id: i64,
    pub status: BookStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

/// Create book request
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct CreateBook {
    pub title: String,
    pub description: Option<String>,
    pub category: String,
    pub publishing_year: Option<i32>,
    pub photo_path: Option<String>,
    pub author_id: i64,
}

/// Book with its historical loan count
#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
pub struct BookRanking {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub book: Book,
    /// Open and returned loans
    pub loan_count: i64,
}

/// Query parameters for the newest-books listing
#[derive(Debug, Deserialize, IntoParams)]
pub struct NewestBooksQuery {
    /// AVAILABLE (default) or BORROWED
    pub status: Option<String>,
    pub page: Option<i64>,
    pub size: Option<i64>,
}

impl NewestBooksQuery {
    pub fn status(&self) -> AppResult<BookStatus> {
        match self.status.as_deref().map(str::trim) {
            None | Some("") => Ok(BookStatus::Available),
            Some(s) => s.parse().map_err(AppError::InvalidArgument),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_available_book_can_be_borrowed() {
        assert_eq!(BookStatus::Available.borrow(1).unwrap(), BookStatus::Borrowed);
    }

    #[test]
    fn test_borrowed_book_is_rejected() {
        let err = BookStatus::Borrowed.borrow(42).unwrap_err();
        assert!(matches!(err, AppError::Conflict(msg) if msg.contains("42")));
    }

    #[test]
    fn test_status_parsing_is_case_insensitive() {
        assert_eq!("borrowed".parse::<BookStatus>().unwrap(), BookStatus::Borrowed);
        assert_eq!("AVAILABLE".parse::<BookStatus>().unwrap(), BookStatus::Available);
        assert!("LOST".parse::<BookStatus>().is_err());
    }

    #[test]
    fn test_status_serializes_uppercase() {
        let json = serde_json::to_string(&BookStatus::Borrowed).unwrap();
        assert_eq!(json, "\"BORROWED\"");
    }

    #[test]
    fn test_newest_query_defaults_to_available() {
        let query = NewestBooksQuery { status: Some("  ".into()), page: None, size: None };
        assert_eq!(query.status().unwrap(), BookStatus::Available);

        let query = NewestBooksQuery { status: Some("gone".into()), page: None, size: None };
        assert!(matches!(query.status(), Err(AppError::InvalidArgument(_))));
    }
}
