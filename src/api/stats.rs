//! Dashboard endpoints

use axum::{extract::State, Json};
use serde::Serialize;
use utoipa::ToSchema;

use crate::error::AppResult;

use super::AuthenticatedUser;

/// Aggregate counts for the librarian dashboard
#[derive(Serialize, ToSchema)]
pub struct DashboardResponse {
    pub total_books: i64,
    pub total_users: i64,
    pub total_transactions: i64,
    /// Transactions with no return date (outstanding loans)
    pub ongoing_transactions: i64,
}

/// Librarian dashboard counts
#[utoipa::path(
    get,
    path = "/dashboard",
    tag = "stats",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Aggregate counts", body = DashboardResponse),
        (status = 401, description = "Not authenticated"),
        (status = 403, description = "Librarian privileges required")
    )
)]
pub async fn dashboard(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
) -> AppResult<Json<DashboardResponse>> {
    claims.require_librarian()?;

    let stats = state.services.stats.dashboard().await?;
    Ok(Json(stats))
}
