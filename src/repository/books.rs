//! Book rows: CRUD, title/author search, pagination, counts

use sqlx::{Pool, Postgres};

use crate::{
    error::{AppError, AppResult},
    models::book::{Book, CreateBook, UpdateBook},
};

#[derive(Clone)]
pub struct BooksRepository {
    pool: Pool<Postgres>,
}

impl BooksRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// Get book by ID
    pub async fn get_by_id(&self, id: i32) -> AppResult<Book> {
        sqlx::query_as::<_, Book>("SELECT * FROM books WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Book with id {} not found", id)))
    }

    /// Paginated listing ordered by title, with optional case-insensitive
    /// substring search over title and author.
    pub async fn search_page(
        &self,
        q: Option<&str>,
        page: i64,
        per_page: i64,
    ) -> AppResult<(Vec<Book>, i64)> {
        let offset = (page - 1) * per_page;

        match q {
            Some(q) => {
                let pattern = format!("%{}%", q);

                let books = sqlx::query_as::<_, Book>(
                    r#"
                    SELECT * FROM books
                    WHERE title ILIKE $1 OR author ILIKE $1
                    ORDER BY title
                    LIMIT $2 OFFSET $3
                    "#,
                )
                .bind(&pattern)
                .bind(per_page)
                .bind(offset)
                .fetch_all(&self.pool)
                .await?;

                let total: i64 = sqlx::query_scalar(
                    "SELECT COUNT(*) FROM books WHERE title ILIKE $1 OR author ILIKE $1",
                )
                .bind(&pattern)
                .fetch_one(&self.pool)
                .await?;

                Ok((books, total))
            }
            None => {
                let books = sqlx::query_as::<_, Book>(
                    "SELECT * FROM books ORDER BY title LIMIT $1 OFFSET $2",
                )
                .bind(per_page)
                .bind(offset)
                .fetch_all(&self.pool)
                .await?;

                let total = self.count().await?;
                Ok((books, total))
            }
        }
    }

    /// Unpaginated search over title and author
    pub async fn search_all(&self, q: &str) -> AppResult<Vec<Book>> {
        let books = sqlx::query_as::<_, Book>(
            r#"
            SELECT * FROM books
            WHERE title ILIKE $1 OR author ILIKE $1
            ORDER BY title
            "#,
        )
        .bind(format!("%{}%", q))
        .fetch_all(&self.pool)
        .await?;
        Ok(books)
    }

    /// Full listing ordered by title
    pub async fn list_by_title(&self) -> AppResult<Vec<Book>> {
        let books = sqlx::query_as::<_, Book>("SELECT * FROM books ORDER BY title")
            .fetch_all(&self.pool)
            .await?;
        Ok(books)
    }

    /// Create a new book (always available at creation)
    pub async fn create(&self, book: &CreateBook) -> AppResult<Book> {
        let book = sqlx::query_as::<_, Book>(
            r#"
            INSERT INTO books (title, author, year)
            VALUES ($1, $2, $3)
            RETURNING *
            "#,
        )
        .bind(book.title.trim())
        .bind(book.author.trim())
        .bind(book.year)
        .fetch_one(&self.pool)
        .await?;
        Ok(book)
    }

    /// Update title/author/year of an existing book
    pub async fn update(&self, id: i32, book: &UpdateBook) -> AppResult<Book> {
        sqlx::query_as::<_, Book>(
            r#"
            UPDATE books
            SET title = COALESCE($2, title),
                author = COALESCE($3, author),
                year = COALESCE($4, year)
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(book.title.as_deref().map(str::trim))
        .bind(book.author.as_deref().map(str::trim))
        .bind(book.year)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Book with id {} not found", id)))
    }

    /// Whether the book has an outstanding loan
    pub async fn has_active_loan(&self, book_id: i32) -> AppResult<bool> {
        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM transactions WHERE book_id = $1 AND returned_at IS NULL)",
        )
        .bind(book_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(exists)
    }

    /// Delete a book. Completed loan history is preserved; the foreign
    /// key nulls out instead of cascading.
    pub async fn delete(&self, id: i32) -> AppResult<()> {
        let result = sqlx::query("DELETE FROM books WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Book with id {} not found", id)));
        }
        Ok(())
    }

    pub async fn count(&self) -> AppResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM books")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }
}
