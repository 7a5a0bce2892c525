//! Catalog lookups (books, members, authors)

use crate::{
    config::CirculationConfig,
    error::AppResult,
    models::{
        author::{Author, CreateAuthor},
        book::{Book, CreateBook, NewestBooksQuery},
        member::{CreateMember, Member},
        pagination::{Page, PageRequest},
    },
    repository::Repository,
};

#[derive(Clone)]
pub struct CatalogService {
    repository: Repository,
    config: CirculationConfig,
}

impl CatalogService {
    pub fn new(repository: Repository, config: CirculationConfig) -> Self {
        Self { repository, config }
    }

    pub async fn get_book(&self, id: i64) -> AppResult<Book> {
        self.repository.books.get_by_id(id).await
    }

    pub async fn get_member(&self, id: i64) -> AppResult<Member> {
        self.repository.members.get_by_id(id).await
    }

    /// Newest books with the requested status (AVAILABLE by default)
    pub async fn newest_books(&self, query: &NewestBooksQuery) -> AppResult<Page<Book>> {
        let status = query.status()?;
        let page = PageRequest::new(query.page, query.size, &self.config)?;

        let (books, total) = self.repository.books.list_by_status(status, &page).await?;
        Ok(Page::new(books, total, &page))
    }

    pub async fn create_author(&self, data: &CreateAuthor) -> AppResult<Author> {
        self.repository.authors.create(data).await
    }

    pub async fn create_book(&self, data: &CreateBook) -> AppResult<Book> {
        let book = self.repository.books.create(data).await?;
        tracing::info!(book_id = book.id, "Book added to catalog");
        Ok(book)
    }

    pub async fn create_member(&self, data: &CreateMember) -> AppResult<Member> {
        self.repository.members.create(data).await
    }
}
