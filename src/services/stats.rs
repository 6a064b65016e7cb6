//! Dashboard statistics service

use crate::{api::stats::DashboardResponse, error::AppResult, repository::Repository};

#[derive(Clone)]
pub struct StatsService {
    repository: Repository,
}

impl StatsService {
    pub fn new(repository: Repository) -> Self {
        Self { repository }
    }

    /// Cheap round trip used by the readiness probe
    pub async fn ping(&self) -> AppResult<()> {
        sqlx::query("SELECT 1").execute(&self.repository.pool).await?;
        Ok(())
    }

    /// Aggregate counts for the librarian dashboard
    pub async fn dashboard(&self) -> AppResult<DashboardResponse> {
        let total_books = self.repository.books.count().await?;
        let total_users = self.repository.users.count().await?;
        let total_transactions = self.repository.transactions.count().await?;
        let ongoing_transactions = self.repository.transactions.count_active().await?;

        Ok(DashboardResponse {
            total_books,
            total_users,
            total_transactions,
            ongoing_transactions,
        })
    }
}
