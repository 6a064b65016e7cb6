//! API integration tests
//!
//! These run against a live server with a freshly migrated database.
//! Run with: cargo test -- --ignored

use std::time::{SystemTime, UNIX_EPOCH};

use reqwest::Client;
use serde_json::{json, Value};

const BASE_URL: &str = "http://localhost:8080";

/// Bootstrap librarian credentials from config/default.toml
const ADMIN_USERNAME: &str = "admin";
const ADMIN_PASSWORD: &str = "adminpass";

fn unique_name(prefix: &str) -> String {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("clock before epoch")
        .as_nanos();
    format!("{}-{}", prefix, nanos)
}

async fn login(client: &Client, username: &str, password: &str) -> String {
    let response = client
        .post(format!("{}/auth/login", BASE_URL))
        .json(&json!({
            "username": username,
            "password": password
        }))
        .send()
        .await
        .expect("Failed to send login request");

    assert!(response.status().is_success());
    let body: Value = response.json().await.expect("Failed to parse login response");
    body["token"].as_str().expect("No token in response").to_string()
}

/// Register a fresh patron and return (username, token)
async fn register_patron(client: &Client) -> (String, String) {
    let username = unique_name("patron");
    let response = client
        .post(format!("{}/auth/register", BASE_URL))
        .json(&json!({
            "username": username,
            "email": format!("{}@example.com", username),
            "password": "patronpass"
        }))
        .send()
        .await
        .expect("Failed to send register request");

    assert_eq!(response.status(), 201);
    let token = login(client, &username, "patronpass").await;
    (username, token)
}

/// Create a book as librarian and return its ID
async fn create_book(client: &Client, librarian_token: &str, title: &str) -> i64 {
    let response = client
        .post(format!("{}/books/add", BASE_URL))
        .header("Authorization", format!("Bearer {}", librarian_token))
        .json(&json!({
            "title": title,
            "author": "Test Author",
            "year": 2001
        }))
        .send()
        .await
        .expect("Failed to send create book request");

    assert_eq!(response.status(), 201);
    let body: Value = response.json().await.expect("Failed to parse response");
    body["id"].as_i64().expect("No book ID")
}

async fn book_available(client: &Client, book_id: i64) -> bool {
    let response = client
        .get(format!("{}/book/{}", BASE_URL, book_id))
        .send()
        .await
        .expect("Failed to send request");

    assert!(response.status().is_success());
    let body: Value = response.json().await.expect("Failed to parse response");
    body["available"].as_bool().expect("No available flag")
}

#[tokio::test]
#[ignore]
async fn test_health_check() {
    let client = Client::new();

    let response = client
        .get(format!("{}/health", BASE_URL))
        .send()
        .await
        .expect("Failed to send request");

    assert!(response.status().is_success());

    let body: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body["status"], "healthy");
}

#[tokio::test]
#[ignore]
async fn test_login() {
    let client = Client::new();

    let response = client
        .post(format!("{}/auth/login", BASE_URL))
        .json(&json!({
            "username": ADMIN_USERNAME,
            "password": ADMIN_PASSWORD
        }))
        .send()
        .await
        .expect("Failed to send request");

    assert!(response.status().is_success());

    let body: Value = response.json().await.expect("Failed to parse response");
    assert!(body["token"].is_string());
    assert_eq!(body["token_type"], "Bearer");
    assert_eq!(body["user"]["role"], "librarian");
}

#[tokio::test]
#[ignore]
async fn test_login_invalid_credentials() {
    let client = Client::new();

    let response = client
        .post(format!("{}/auth/login", BASE_URL))
        .json(&json!({
            "username": ADMIN_USERNAME,
            "password": "wrong"
        }))
        .send()
        .await
        .expect("Failed to send request");

    assert_eq!(response.status(), 401);
}

#[tokio::test]
#[ignore]
async fn test_register_and_me() {
    let client = Client::new();
    let (username, token) = register_patron(&client).await;

    let response = client
        .get(format!("{}/auth/me", BASE_URL))
        .header("Authorization", format!("Bearer {}", token))
        .send()
        .await
        .expect("Failed to send request");

    assert!(response.status().is_success());

    let body: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body["username"], username.as_str());
    assert_eq!(body["role"], "patron");
}

#[tokio::test]
#[ignore]
async fn test_public_index_lists_books() {
    let client = Client::new();

    let response = client
        .get(format!("{}/?per_page=5", BASE_URL))
        .send()
        .await
        .expect("Failed to send request");

    assert!(response.status().is_success());

    let body: Value = response.json().await.expect("Failed to parse response");
    assert!(body["items"].is_array());
    assert!(body["total"].is_number());
}

#[tokio::test]
#[ignore]
async fn test_books_listing_requires_authentication() {
    let client = Client::new();

    let response = client
        .get(format!("{}/books", BASE_URL))
        .send()
        .await
        .expect("Failed to send request");

    assert_eq!(response.status(), 401);
}

#[tokio::test]
#[ignore]
async fn test_catalog_crud_as_librarian() {
    let client = Client::new();
    let token = login(&client, ADMIN_USERNAME, ADMIN_PASSWORD).await;

    let book_id = create_book(&client, &token, &unique_name("CRUD Book")).await;

    // Edit
    let response = client
        .post(format!("{}/books/edit/{}", BASE_URL, book_id))
        .header("Authorization", format!("Bearer {}", token))
        .json(&json!({ "author": "Edited Author" }))
        .send()
        .await
        .expect("Failed to send request");

    assert!(response.status().is_success());
    let body: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body["author"], "Edited Author");

    // Delete
    let response = client
        .post(format!("{}/books/delete/{}", BASE_URL, book_id))
        .header("Authorization", format!("Bearer {}", token))
        .send()
        .await
        .expect("Failed to send request");

    assert_eq!(response.status(), 204);

    // Gone
    let response = client
        .get(format!("{}/book/{}", BASE_URL, book_id))
        .send()
        .await
        .expect("Failed to send request");

    assert_eq!(response.status(), 404);
}

#[tokio::test]
#[ignore]
async fn test_catalog_mutation_forbidden_for_patron() {
    let client = Client::new();
    let (_, token) = register_patron(&client).await;

    let response = client
        .post(format!("{}/books/add", BASE_URL))
        .header("Authorization", format!("Bearer {}", token))
        .json(&json!({
            "title": "Sneaky Book",
            "author": "Sneaky Patron"
        }))
        .send()
        .await
        .expect("Failed to send request");

    assert_eq!(response.status(), 403);
}

#[tokio::test]
#[ignore]
async fn test_librarian_cannot_borrow() {
    let client = Client::new();
    let librarian = login(&client, ADMIN_USERNAME, ADMIN_PASSWORD).await;
    let book_id = create_book(&client, &librarian, &unique_name("Staff Book")).await;

    let response = client
        .post(format!("{}/books/{}/borrow", BASE_URL, book_id))
        .header("Authorization", format!("Bearer {}", librarian))
        .send()
        .await
        .expect("Failed to send request");

    assert_eq!(response.status(), 403);
    assert!(book_available(&client, book_id).await);
}

#[tokio::test]
#[ignore]
async fn test_borrow_computes_due_date_server_side() {
    let client = Client::new();
    let librarian = login(&client, ADMIN_USERNAME, ADMIN_PASSWORD).await;
    let (_, patron) = register_patron(&client).await;
    let book_id = create_book(&client, &librarian, &unique_name("Due Date Book")).await;

    // A client-supplied due date must be ignored
    let response = client
        .post(format!("{}/books/{}/borrow", BASE_URL, book_id))
        .header("Authorization", format!("Bearer {}", patron))
        .json(&json!({ "due_date": "1999-01-01T00:00:00Z" }))
        .send()
        .await
        .expect("Failed to send request");

    assert_eq!(response.status(), 201);
    let body: Value = response.json().await.expect("Failed to parse response");
    let due_date: chrono::DateTime<chrono::Utc> = body["due_date"]
        .as_str()
        .expect("No due date")
        .parse()
        .expect("Unparseable due date");

    let delta = due_date - chrono::Utc::now();
    assert!(delta > chrono::Duration::days(13));
    assert!(delta <= chrono::Duration::days(14));
}

/// Full lifecycle: borrow, conflicting borrow, ownership check on
/// return, return, then the second patron borrows successfully.
#[tokio::test]
#[ignore]
async fn test_borrow_return_lifecycle() {
    let client = Client::new();
    let librarian = login(&client, ADMIN_USERNAME, ADMIN_PASSWORD).await;
    let (_, patron_a) = register_patron(&client).await;
    let (_, patron_b) = register_patron(&client).await;
    let book_id = create_book(&client, &librarian, &unique_name("Lifecycle Book")).await;

    assert!(book_available(&client, book_id).await);

    // Patron A borrows
    let response = client
        .post(format!("{}/books/{}/borrow", BASE_URL, book_id))
        .header("Authorization", format!("Bearer {}", patron_a))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), 201);
    assert!(!book_available(&client, book_id).await);

    // Patron B cannot borrow while it is out
    let response = client
        .post(format!("{}/books/{}/borrow", BASE_URL, book_id))
        .header("Authorization", format!("Bearer {}", patron_b))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), 409);

    // Patron B cannot return a loan they do not hold
    let response = client
        .post(format!("{}/books/{}/return", BASE_URL, book_id))
        .header("Authorization", format!("Bearer {}", patron_b))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), 403);
    assert!(!book_available(&client, book_id).await);

    // Patron A returns
    let response = client
        .post(format!("{}/books/{}/return", BASE_URL, book_id))
        .header("Authorization", format!("Bearer {}", patron_a))
        .send()
        .await
        .expect("Failed to send request");
    assert!(response.status().is_success());
    let body: Value = response.json().await.expect("Failed to parse response");
    assert!(body["returned_at"].is_string());
    assert!(book_available(&client, book_id).await);

    // Now patron B can borrow
    let response = client
        .post(format!("{}/books/{}/borrow", BASE_URL, book_id))
        .header("Authorization", format!("Bearer {}", patron_b))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), 201);
}

#[tokio::test]
#[ignore]
async fn test_return_without_any_loan_is_rejected() {
    let client = Client::new();
    let librarian = login(&client, ADMIN_USERNAME, ADMIN_PASSWORD).await;
    let (_, patron) = register_patron(&client).await;
    let book_id = create_book(&client, &librarian, &unique_name("Untouched Book")).await;

    let response = client
        .post(format!("{}/books/{}/return", BASE_URL, book_id))
        .header("Authorization", format!("Bearer {}", patron))
        .send()
        .await
        .expect("Failed to send request");

    assert_eq!(response.status(), 403);
    assert!(book_available(&client, book_id).await);
}

/// Two patrons race for the same book: exactly one wins, the other
/// observes a conflict.
#[tokio::test]
#[ignore]
async fn test_concurrent_borrow_single_winner() {
    let client = Client::new();
    let librarian = login(&client, ADMIN_USERNAME, ADMIN_PASSWORD).await;
    let (_, patron_a) = register_patron(&client).await;
    let (_, patron_b) = register_patron(&client).await;
    let book_id = create_book(&client, &librarian, &unique_name("Contended Book")).await;

    let borrow_a = client
        .post(format!("{}/books/{}/borrow", BASE_URL, book_id))
        .header("Authorization", format!("Bearer {}", patron_a))
        .send();
    let borrow_b = client
        .post(format!("{}/books/{}/borrow", BASE_URL, book_id))
        .header("Authorization", format!("Bearer {}", patron_b))
        .send();

    let (response_a, response_b) = tokio::join!(borrow_a, borrow_b);
    let status_a = response_a.expect("Request A failed").status();
    let status_b = response_b.expect("Request B failed").status();

    let successes = [status_a, status_b]
        .iter()
        .filter(|s| s.is_success())
        .count();
    let conflicts = [status_a, status_b]
        .iter()
        .filter(|s| s.as_u16() == 409)
        .count();

    assert_eq!(successes, 1, "exactly one borrow must win: {:?} {:?}", status_a, status_b);
    assert_eq!(conflicts, 1);
    assert!(!book_available(&client, book_id).await);
}

#[tokio::test]
#[ignore]
async fn test_delete_book_on_loan_conflicts() {
    let client = Client::new();
    let librarian = login(&client, ADMIN_USERNAME, ADMIN_PASSWORD).await;
    let (_, patron) = register_patron(&client).await;
    let book_id = create_book(&client, &librarian, &unique_name("Loaned Book")).await;

    let response = client
        .post(format!("{}/books/{}/borrow", BASE_URL, book_id))
        .header("Authorization", format!("Bearer {}", patron))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), 201);

    let response = client
        .post(format!("{}/books/delete/{}", BASE_URL, book_id))
        .header("Authorization", format!("Bearer {}", librarian))
        .send()
        .await
        .expect("Failed to send request");

    assert_eq!(response.status(), 409);
}

#[tokio::test]
#[ignore]
async fn test_transactions_scoped_by_role() {
    let client = Client::new();
    let librarian = login(&client, ADMIN_USERNAME, ADMIN_PASSWORD).await;
    let (username, patron) = register_patron(&client).await;
    let book_id = create_book(&client, &librarian, &unique_name("History Book")).await;

    let response = client
        .post(format!("{}/books/{}/borrow", BASE_URL, book_id))
        .header("Authorization", format!("Bearer {}", patron))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), 201);

    // Patron sees only their own loans
    let response = client
        .get(format!("{}/transactions", BASE_URL))
        .header("Authorization", format!("Bearer {}", patron))
        .send()
        .await
        .expect("Failed to send request");
    assert!(response.status().is_success());
    let body: Value = response.json().await.expect("Failed to parse response");
    let own = body.as_array().expect("Expected array");
    assert!(!own.is_empty());
    assert!(own
        .iter()
        .all(|tx| tx["username"] == username.as_str()));

    // Librarian sees everything, capped at 200
    let response = client
        .get(format!("{}/transactions", BASE_URL))
        .header("Authorization", format!("Bearer {}", librarian))
        .send()
        .await
        .expect("Failed to send request");
    assert!(response.status().is_success());
    let body: Value = response.json().await.expect("Failed to parse response");
    let all = body.as_array().expect("Expected array");
    assert!(all.len() <= 200);
}

#[tokio::test]
#[ignore]
async fn test_dashboard_librarian_only() {
    let client = Client::new();
    let (_, patron) = register_patron(&client).await;

    let response = client
        .get(format!("{}/dashboard", BASE_URL))
        .header("Authorization", format!("Bearer {}", patron))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), 403);

    let librarian = login(&client, ADMIN_USERNAME, ADMIN_PASSWORD).await;
    let response = client
        .get(format!("{}/dashboard", BASE_URL))
        .header("Authorization", format!("Bearer {}", librarian))
        .send()
        .await
        .expect("Failed to send request");

    assert!(response.status().is_success());
    let body: Value = response.json().await.expect("Failed to parse response");
    assert!(body["total_books"].is_number());
    assert!(body["total_users"].is_number());
    assert!(body["total_transactions"].is_number());
    assert!(body["ongoing_transactions"].is_number());
}
