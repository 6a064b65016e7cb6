//! Loan transaction model and related types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;

/// Transaction model from database.
///
/// `user_id` and `book_id` are nullable because history rows outlive
/// deleted accounts and catalog entries; an active loan (null
/// `returned_at`) always has both set.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Transaction {
    pub id: i32,
    pub user_id: Option<i32>,
    pub book_id: Option<i32>,
    pub borrowed_at: DateTime<Utc>,
    pub due_date: DateTime<Utc>,
    pub returned_at: Option<DateTime<Utc>>,
}

impl Transaction {
    /// An active transaction represents a currently outstanding loan.
    pub fn is_active(&self) -> bool {
        self.returned_at.is_none()
    }
}

/// Transaction with book and borrower details for display
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct TransactionDetails {
    pub id: i32,
    pub book_id: Option<i32>,
    pub title: Option<String>,
    pub author: Option<String>,
    pub username: Option<String>,
    pub borrowed_at: DateTime<Utc>,
    pub due_date: DateTime<Utc>,
    pub returned_at: Option<DateTime<Utc>>,
    pub is_overdue: bool,
}
