//! Paging and sorting primitives shared by listing endpoints

use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::{
    config::CirculationConfig,
    error::{AppError, AppResult},
    models::{book::Book, loan::LoanDetails},
};

/// Common paging/sorting query parameters.
///
/// `page` is zero-based. `page=-1` or `size=-1` returns every row.
#[derive(Debug, Default, Deserialize, IntoParams)]
pub struct PageQuery {
    pub page: Option<i64>,
    pub size: Option<i64>,
    #[serde(alias = "sortBy")]
    pub sort_by: Option<String>,
    #[serde(alias = "sortDir")]
    pub sort_dir: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Asc,
    Desc,
}

impl SortDirection {
    /// Anything other than `asc` (any case) sorts descending; absent means ascending
    pub fn parse(value: Option<&str>) -> Self {
        match value.map(str::trim) {
            None | Some("") => SortDirection::Asc,
            Some(v) if v.eq_ignore_ascii_case("asc") => SortDirection::Asc,
            Some(_) => SortDirection::Desc,
        }
    }

    pub fn as_sql(&self) -> &'static str {
        match self {
            SortDirection::Asc => "ASC",
            SortDirection::Desc => "DESC",
        }
    }
}

/// Resolved page window
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: i64,
    /// `None` means unpaged
    pub size: Option<i64>,
}

impl PageRequest {
    pub fn new(page: Option<i64>, size: Option<i64>, config: &CirculationConfig) -> AppResult<Self> {
        let page = page.unwrap_or(0);
        let size = size.unwrap_or(config.default_page_size);

        if page == -1 || size == -1 {
            return Ok(Self::unpaged());
        }
        if page < 0 {
            return Err(AppError::InvalidArgument(format!("page must not be negative, got {}", page)));
        }
        if size < 1 {
            return Err(AppError::InvalidArgument(format!("size must be at least 1, got {}", size)));
        }

        Ok(Self {
            page,
            size: Some(size.min(config.max_page_size)),
        })
    }

    pub fn unpaged() -> Self {
        Self { page: 0, size: None }
    }

    pub fn offset(&self) -> i64 {
        self.size.map(|s| self.page.saturating_mul(s)).unwrap_or(0)
    }

    pub fn limit_offset(&self) -> String {
        match self.size {
            Some(size) => format!("LIMIT {} OFFSET {}", size, self.offset()),
            None => String::new(),
        }
    }
}

/// Paginated response wrapper
#[derive(Debug, Serialize, ToSchema)]
#[aliases(LoanPage = Page<LoanDetails>, BookPage = Page<Book>)]
pub struct Page<T>
where
    T: for<'a> ToSchema<'a>,
{
    pub items: Vec<T>,
    /// Total number of matching rows
    pub total: i64,
    /// Zero-based page number
    pub page: i64,
    /// Page size (equals `total` when unpaged)
    pub size: i64,
    pub total_pages: i64,
}

impl<T> Page<T>
where
    T: for<'a> ToSchema<'a>,
{
    pub fn new(items: Vec<T>, total: i64, request: &PageRequest) -> Self {
        let size = request.size.unwrap_or(total);
        let total_pages = if size > 0 { (total + size - 1) / size } else { 0 };

        Self {
            items,
            total,
            page: request.page,
            size,
            total_pages,
        }
    }
}
