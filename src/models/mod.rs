//! Data models for the circulation server

pub mod author;
pub mod book;
pub mod loan;
pub mod member;
pub mod pagination;

// Re-export commonly used types
pub use author::Author;
pub use book::{Book, BookRanking, BookStatus};
pub use loan::{Loan, LoanDetails, LoanFilter};
pub use member::{Member, MemberRanking};
pub use pagination::{Page, PageRequest, SortDirection};
