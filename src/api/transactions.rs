//! Transaction history endpoints

use axum::{extract::State, Json};

use crate::{error::AppResult, models::transaction::TransactionDetails};

use super::AuthenticatedUser;

/// Librarians see every loan; patrons only their own.
const LIBRARIAN_HISTORY_CAP: i64 = 200;

/// Loan history, newest first
#[utoipa::path(
    get,
    path = "/transactions",
    tag = "circulation",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Own loans (patron) or all loans capped at 200 (librarian)", body = Vec<TransactionDetails>),
        (status = 401, description = "Not authenticated")
    )
)]
pub async fn list_transactions(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
) -> AppResult<Json<Vec<TransactionDetails>>> {
    let transactions = if claims.is_librarian() {
        state
            .services
            .circulation
            .all_transactions(LIBRARIAN_HISTORY_CAP)
            .await?
    } else {
        state
            .services
            .circulation
            .user_transactions(claims.user_id)
            .await?
    };

    Ok(Json(transactions))
}
