//! Circulation and loan search service

use crate::{
    config::CirculationConfig,
    error::AppResult,
    models::{
        loan::{CreateLoan, LoanDetails, LoanFilter, LoanSearchQuery, LoanSort, ReassignLoan},
        pagination::{Page, PageQuery, PageRequest},
    },
    repository::{loans::LoanOwner, Repository},
};

#[derive(Clone)]
pub struct LoansService {
    repository: Repository,
    config: CirculationConfig,
}

impl LoansService {
    pub fn new(repository: Repository, config: CirculationConfig) -> Self {
        Self { repository, config }
    }

    /// Borrow a book
    pub async fn create_loan(&self, loan: CreateLoan) -> AppResult<LoanDetails> {
        let created = self.repository.loans.create(&loan).await?;
        tracing::info!(
            loan_id = created.id,
            book_id = created.book_id,
            member_id = created.member_id,
            "Loan created"
        );
        Ok(created)
    }

    /// Move a loan to another book or member, or correct its dates
    pub async fn reassign_loan(&self, loan_id: i64, change: ReassignLoan) -> AppResult<LoanDetails> {
        let updated = self.repository.loans.reassign(loan_id, &change).await?;
        tracing::info!(
            loan_id,
            book_id = updated.book_id,
            member_id = updated.member_id,
            "Loan reassigned"
        );
        Ok(updated)
    }

    /// Return a borrowed book
    pub async fn return_loan(&self, loan_id: i64) -> AppResult<LoanDetails> {
        let returned = self.repository.loans.return_loan(loan_id).await?;
        tracing::info!(loan_id, book_id = returned.book_id, "Loan returned");
        Ok(returned)
    }

    /// Administrative removal of a loan record
    pub async fn delete_loan(&self, loan_id: i64) -> AppResult<()> {
        let deleted = self.repository.loans.delete(loan_id).await?;
        if deleted.is_open() {
            tracing::warn!(
                loan_id,
                book_id = deleted.book_id,
                "Deleted an open loan; book status left unchanged"
            );
        } else {
            tracing::info!(loan_id, "Loan deleted");
        }
        Ok(())
    }

    pub async fn get_loan(&self, loan_id: i64) -> AppResult<LoanDetails> {
        self.repository.loans.get_by_id(loan_id).await
    }

    /// All loans, sorted and paged
    pub async fn list_loans(&self, query: &PageQuery) -> AppResult<Page<LoanDetails>> {
        let sort = LoanSort::parse(query.sort_by.as_deref(), query.sort_dir.as_deref())?;
        let page = PageRequest::new(query.page, query.size, &self.config)?;

        let (loans, total) = self
            .repository
            .loans
            .search(&LoanFilter::default(), &sort, &page)
            .await?;
        Ok(Page::new(loans, total, &page))
    }

    /// Search loans by book title, member name or borrow date (any may match)
    pub async fn search_loans(&self, query: &LoanSearchQuery) -> AppResult<Page<LoanDetails>> {
        let filter = LoanFilter::parse(
            query.book_title.as_deref(),
            query.member_name.as_deref(),
            query.borrow_date.as_deref(),
        )?;
        let sort = LoanSort::parse(query.sort_by.as_deref(), query.sort_dir.as_deref())?;
        let page = PageRequest::new(query.page, query.size, &self.config)?;

        let (loans, total) = self.repository.loans.search(&filter, &sort, &page).await?;
        Ok(Page::new(loans, total, &page))
    }

    /// Loan history of a member
    pub async fn loans_for_member(
        &self,
        member_id: i64,
        query: &PageQuery,
    ) -> AppResult<Page<LoanDetails>> {
        let sort = LoanSort::parse(query.sort_by.as_deref(), query.sort_dir.as_deref())?;
        let page = PageRequest::new(query.page, query.size, &self.config)?;

        // Verify member exists
        self.repository.members.get_by_id(member_id).await?;

        let (loans, total) = self
            .repository
            .loans
            .list_by_owner(LoanOwner::Member(member_id), &sort, &page)
            .await?;
        Ok(Page::new(loans, total, &page))
    }

    /// Loan history of a book
    pub async fn loans_for_book(&self, book_id: i64, query: &PageQuery) -> AppResult<Page<LoanDetails>> {
        let sort = LoanSort::parse(query.sort_by.as_deref(), query.sort_dir.as_deref())?;
        let page = PageRequest::new(query.page, query.size, &self.config)?;

        // Verify book exists
        self.repository.books.get_by_id(book_id).await?;

        let (loans, total) = self
            .repository
            .loans
            .list_by_owner(LoanOwner::Book(book_id), &sort, &page)
            .await?;
        Ok(Page::new(loans, total, &page))
    }
}
