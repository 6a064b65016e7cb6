//! Circulation service: the borrow/return lifecycle of a book.
//!
//! A book is either available or borrowed. Borrowing creates the loan
//! transaction and flips the flag in one atomic unit of work; returning
//! closes the caller's own active loan and flips it back. The due date
//! is always computed here from the server clock, never from client
//! input.

use chrono::{DateTime, Duration, Utc};

use crate::{
    config::LoansConfig,
    error::AppResult,
    models::transaction::{Transaction, TransactionDetails},
    repository::Repository,
};

/// Due date for a loan started at `borrowed_at` under the given period.
pub fn due_date_for(borrowed_at: DateTime<Utc>, period_days: i64) -> DateTime<Utc> {
    borrowed_at + Duration::days(period_days)
}

#[derive(Clone)]
pub struct CirculationService {
    repository: Repository,
    loan_period_days: i64,
}

impl CirculationService {
    pub fn new(repository: Repository, config: LoansConfig) -> Self {
        Self {
            repository,
            loan_period_days: config.period_days,
        }
    }

    /// Borrow a book for the given user
    pub async fn borrow_book(&self, user_id: i32, book_id: i32) -> AppResult<Transaction> {
        let borrowed_at = Utc::now();
        let due_date = due_date_for(borrowed_at, self.loan_period_days);

        let transaction = self
            .repository
            .transactions
            .borrow(user_id, book_id, borrowed_at, due_date)
            .await?;

        tracing::info!(
            user_id,
            book_id,
            transaction_id = transaction.id,
            "book borrowed"
        );
        Ok(transaction)
    }

    /// Return a book previously borrowed by the given user
    pub async fn return_book(&self, user_id: i32, book_id: i32) -> AppResult<Transaction> {
        let transaction = self
            .repository
            .transactions
            .return_loan(user_id, book_id, Utc::now())
            .await?;

        tracing::info!(
            user_id,
            book_id,
            transaction_id = transaction.id,
            "book returned"
        );
        Ok(transaction)
    }

    /// A user's own loan history, newest first
    pub async fn user_transactions(&self, user_id: i32) -> AppResult<Vec<TransactionDetails>> {
        self.repository.transactions.list_for_user(user_id).await
    }

    /// All loans, newest first, capped (librarian view)
    pub async fn all_transactions(&self, limit: i64) -> AppResult<Vec<TransactionDetails>> {
        self.repository.transactions.list_all(limit).await
    }
}
