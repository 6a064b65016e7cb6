//! Transactions repository: loan records and the atomic borrow/return
//! unit of work.
//!
//! Borrow and return each run inside a single database transaction with
//! the book row locked (`FOR UPDATE`), so two concurrent requests on the
//! same book serialize at the store. A partial unique index on
//! `(book_id) WHERE returned_at IS NULL` backs the one-active-loan
//! invariant even if locking is bypassed.

use chrono::{DateTime, Utc};
use sqlx::{Pool, Postgres, Row};

use crate::{
    error::{AppError, AppResult},
    models::{book::Book, transaction::{Transaction, TransactionDetails}},
};

#[derive(Clone)]
pub struct TransactionsRepository {
    pool: Pool<Postgres>,
}

impl TransactionsRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// Borrow a book: create the loan row and flip the availability flag,
    /// all-or-nothing.
    ///
    /// Rejects with `Conflict` when the book is already on loan; no rows
    /// are touched in that case. An uncommitted unit of work rolls back
    /// on drop, so a failed write leaves state unchanged.
    pub async fn borrow(
        &self,
        user_id: i32,
        book_id: i32,
        borrowed_at: DateTime<Utc>,
        due_date: DateTime<Utc>,
    ) -> AppResult<Transaction> {
        let mut tx = self.pool.begin().await?;

        // Lock the book row; concurrent borrows on the same book wait here.
        let book = sqlx::query_as::<_, Book>("SELECT * FROM books WHERE id = $1 FOR UPDATE")
            .bind(book_id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Book with id {} not found", book_id)))?;

        if !book.available {
            return Err(AppError::Conflict("Book is already borrowed".to_string()));
        }

        let transaction = sqlx::query_as::<_, Transaction>(
            r#"
            INSERT INTO transactions (user_id, book_id, borrowed_at, due_date)
            VALUES ($1, $2, $3, $4)
            RETURNING *
            "#,
        )
        .bind(user_id)
        .bind(book_id)
        .bind(borrowed_at)
        .bind(due_date)
        .fetch_one(&mut *tx)
        .await?;

        sqlx::query("UPDATE books SET available = FALSE WHERE id = $1")
            .bind(book_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        Ok(transaction)
    }

    /// Return a book: close the caller's active loan and flip the
    /// availability flag, all-or-nothing.
    ///
    /// Ownership is strict: only the user holding the active loan may
    /// return it. Someone else's active loan on the same book yields
    /// `Forbidden`, not a return.
    pub async fn return_loan(
        &self,
        user_id: i32,
        book_id: i32,
        returned_at: DateTime<Utc>,
    ) -> AppResult<Transaction> {
        let mut tx = self.pool.begin().await?;

        sqlx::query_as::<_, Book>("SELECT * FROM books WHERE id = $1 FOR UPDATE")
            .bind(book_id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Book with id {} not found", book_id)))?;

        let active = sqlx::query_as::<_, Transaction>(
            r#"
            SELECT * FROM transactions
            WHERE book_id = $1 AND user_id = $2 AND returned_at IS NULL
            "#,
        )
        .bind(book_id)
        .bind(user_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| {
            AppError::Authorization("You cannot return a book you have not borrowed".to_string())
        })?;

        let returned = sqlx::query_as::<_, Transaction>(
            "UPDATE transactions SET returned_at = $2 WHERE id = $1 RETURNING *",
        )
        .bind(active.id)
        .bind(returned_at)
        .fetch_one(&mut *tx)
        .await?;

        sqlx::query("UPDATE books SET available = TRUE WHERE id = $1")
            .bind(book_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        Ok(returned)
    }

    /// All transactions, newest first, capped (librarian view)
    pub async fn list_all(&self, limit: i64) -> AppResult<Vec<TransactionDetails>> {
        let rows = sqlx::query(
            r#"
            SELECT t.id, t.book_id, b.title, b.author, u.username,
                   t.borrowed_at, t.due_date, t.returned_at
            FROM transactions t
            LEFT JOIN books b ON t.book_id = b.id
            LEFT JOIN users u ON t.user_id = u.id
            ORDER BY t.borrowed_at DESC
            LIMIT $1
            "#,
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(Self::details_from_row).collect())
    }

    /// A user's own transactions, newest first
    pub async fn list_for_user(&self, user_id: i32) -> AppResult<Vec<TransactionDetails>> {
        let rows = sqlx::query(
            r#"
            SELECT t.id, t.book_id, b.title, b.author, u.username,
                   t.borrowed_at, t.due_date, t.returned_at
            FROM transactions t
            LEFT JOIN books b ON t.book_id = b.id
            LEFT JOIN users u ON t.user_id = u.id
            WHERE t.user_id = $1
            ORDER BY t.borrowed_at DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(Self::details_from_row).collect())
    }

    fn details_from_row(row: sqlx::postgres::PgRow) -> TransactionDetails {
        let due_date: DateTime<Utc> = row.get("due_date");
        let returned_at: Option<DateTime<Utc>> = row.get("returned_at");

        TransactionDetails {
            id: row.get("id"),
            book_id: row.get("book_id"),
            title: row.get("title"),
            author: row.get("author"),
            username: row.get("username"),
            borrowed_at: row.get("borrowed_at"),
            due_date,
            returned_at,
            is_overdue: returned_at.is_none() && due_date < Utc::now(),
        }
    }

    pub async fn count(&self) -> AppResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM transactions")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    /// Count transactions with no return date (outstanding loans)
    pub async fn count_active(&self) -> AppResult<i64> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM transactions WHERE returned_at IS NULL")
                .fetch_one(&self.pool)
                .await?;
        Ok(count)
    }
}
