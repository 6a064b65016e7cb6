//! Catalog management service

use validator::Validate;

use crate::{
    error::{AppError, AppResult},
    models::book::{Book, BookQuery, CreateBook, UpdateBook},
    repository::Repository,
};

#[derive(Clone)]
pub struct CatalogService {
    repository: Repository,
}

impl CatalogService {
    pub fn new(repository: Repository) -> Self {
        Self { repository }
    }

    /// Paginated, optionally filtered listing ordered by title
    pub async fn list_page(&self, query: &BookQuery) -> AppResult<(Vec<Book>, i64)> {
        let page = query.page.unwrap_or(1).max(1);
        let per_page = query.per_page.unwrap_or(20).clamp(1, 100);
        let q = query.q.as_deref().map(str::trim).filter(|q| !q.is_empty());

        self.repository.books.search_page(q, page, per_page).await
    }

    /// Unpaginated search; empty query returns the whole catalog
    pub async fn search(&self, q: Option<&str>) -> AppResult<Vec<Book>> {
        match q.map(str::trim).filter(|q| !q.is_empty()) {
            Some(q) => self.repository.books.search_all(q).await,
            None => self.repository.books.list_by_title().await,
        }
    }

    /// Full listing ordered by title
    pub async fn list_by_title(&self) -> AppResult<Vec<Book>> {
        self.repository.books.list_by_title().await
    }

    /// Get book by ID
    pub async fn get_book(&self, id: i32) -> AppResult<Book> {
        self.repository.books.get_by_id(id).await
    }

    /// Create a new catalog entry
    pub async fn create_book(&self, book: CreateBook) -> AppResult<Book> {
        book.validate()?;
        self.repository.books.create(&book).await
    }

    /// Update an existing catalog entry
    pub async fn update_book(&self, id: i32, book: UpdateBook) -> AppResult<Book> {
        book.validate()?;
        self.repository.books.update(id, &book).await
    }

    /// Delete a catalog entry. Rejected while the book is on loan;
    /// completed history is preserved with the book reference nulled.
    pub async fn delete_book(&self, id: i32) -> AppResult<()> {
        self.repository.books.get_by_id(id).await?;

        if self.repository.books.has_active_loan(id).await? {
            return Err(AppError::Conflict(
                "Book is currently on loan".to_string(),
            ));
        }

        self.repository.books.delete(id).await
    }
}
