//! Popularity rankings

use crate::{
    error::AppResult,
    models::{book::BookRanking, member::MemberRanking},
    repository::Repository,
};

#[derive(Clone)]
pub struct RankingsService {
    repository: Repository,
}

impl RankingsService {
    pub fn new(repository: Repository) -> Self {
        Self { repository }
    }

    /// Number of rows to fetch for a top-`n` request, or `None` when nothing can match
    fn limit(n: i64) -> Option<i64> {
        (n > 0).then_some(n)
    }

    /// Up to `n` books, most borrowed first
    pub async fn top_books(&self, n: i64) -> AppResult<Vec<BookRanking>> {
        match Self::limit(n) {
            Some(limit) => self.repository.books.top_by_loan_count(limit).await,
            None => Ok(Vec::new()),
        }
    }

    /// Up to `n` members, most active borrowers first
    pub async fn top_members(&self, n: i64) -> AppResult<Vec<MemberRanking>> {
        match Self::limit(n) {
            Some(limit) => self.repository.members.top_by_loan_count(limit).await,
            None => Ok(Vec::new()),
        }
    }
}
