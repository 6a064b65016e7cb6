//! Borrow and return endpoints

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use utoipa::ToSchema;

use crate::error::AppResult;

use super::AuthenticatedUser;

/// Borrow response with the computed due date
#[derive(Serialize, ToSchema)]
pub struct BorrowResponse {
    /// Transaction ID
    pub id: i32,
    /// Due date (ISO 8601 format)
    pub due_date: DateTime<Utc>,
    /// Status message
    pub message: String,
}

/// Return response
#[derive(Serialize, ToSchema)]
pub struct ReturnResponse {
    /// Transaction ID
    pub id: i32,
    /// Return timestamp
    pub returned_at: Option<DateTime<Utc>>,
    /// Status message
    pub message: String,
}

/// Borrow a book
#[utoipa::path(
    post,
    path = "/books/{id}/borrow",
    tag = "circulation",
    security(("bearer_auth" = [])),
    params(
        ("id" = i32, Path, description = "Book ID")
    ),
    responses(
        (status = 201, description = "Book borrowed", body = BorrowResponse),
        (status = 401, description = "Not authenticated"),
        (status = 403, description = "Only patrons can borrow"),
        (status = 404, description = "Book not found"),
        (status = 409, description = "Book is already borrowed")
    )
)]
pub async fn borrow_book(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(book_id): Path<i32>,
) -> AppResult<(StatusCode, Json<BorrowResponse>)> {
    claims.require_patron()?;

    let transaction = state
        .services
        .circulation
        .borrow_book(claims.user_id, book_id)
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(BorrowResponse {
            id: transaction.id,
            due_date: transaction.due_date,
            message: "Book borrowed successfully".to_string(),
        }),
    ))
}

/// Return a borrowed book
#[utoipa::path(
    post,
    path = "/books/{id}/return",
    tag = "circulation",
    security(("bearer_auth" = [])),
    params(
        ("id" = i32, Path, description = "Book ID")
    ),
    responses(
        (status = 200, description = "Book returned", body = ReturnResponse),
        (status = 401, description = "Not authenticated"),
        (status = 403, description = "No active loan held by this user"),
        (status = 404, description = "Book not found")
    )
)]
pub async fn return_book(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(book_id): Path<i32>,
) -> AppResult<Json<ReturnResponse>> {
    claims.require_patron()?;

    let transaction = state
        .services
        .circulation
        .return_book(claims.user_id, book_id)
        .await?;

    Ok(Json(ReturnResponse {
        id: transaction.id,
        returned_at: transaction.returned_at,
        message: "Book returned successfully".to_string(),
    }))
}
