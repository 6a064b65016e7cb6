//! OpenAPI documentation

use axum::Router;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::api::{auth, books, circulation, health, stats, transactions};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Libris API",
        version = "1.0.0",
        description = "Library Management System JSON API",
        license(name = "AGPL-3.0", url = "https://www.gnu.org/licenses/agpl-3.0.html")
    ),
    paths(
        // Health
        health::health_check,
        health::readiness_check,
        // Auth
        auth::register,
        auth::login,
        auth::me,
        // Books
        books::index,
        books::list_books,
        books::book_list,
        books::book_detail,
        books::add_book,
        books::edit_book,
        books::delete_book,
        // Circulation
        circulation::borrow_book,
        circulation::return_book,
        transactions::list_transactions,
        // Stats
        stats::dashboard,
    ),
    components(
        schemas(
            // Auth
            auth::LoginRequest,
            auth::LoginResponse,
            auth::UserInfo,
            crate::models::user::Role,
            crate::models::user::RegisterRequest,
            // Books
            crate::models::book::Book,
            crate::models::book::BookQuery,
            crate::models::book::CreateBook,
            crate::models::book::UpdateBook,
            // Circulation
            circulation::BorrowResponse,
            circulation::ReturnResponse,
            crate::models::transaction::TransactionDetails,
            // Stats
            stats::DashboardResponse,
            // Health
            health::HealthResponse,
            // Errors
            crate::error::ErrorResponse,
        )
    ),
    tags(
        (name = "health", description = "Liveness and readiness"),
        (name = "auth", description = "Login and registration"),
        (name = "books", description = "Book catalog management"),
        (name = "circulation", description = "Borrow/return lifecycle"),
        (name = "stats", description = "Dashboard statistics")
    )
)]
pub struct ApiDoc;

/// Swagger UI plus the generated document
pub fn create_openapi_router() -> Router {
    Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
}
