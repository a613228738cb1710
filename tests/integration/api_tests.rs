//! API integration tests, driving the router in-process over the memory backend

use std::sync::Arc;

use axum::{
    body::{to_bytes, Body},
    http::{Request, StatusCode},
    Router,
};
use chrono::NaiveDate;
use serde_json::{json, Value};
use tower::ServiceExt;

use libraryflow_server::{
    api,
    clock::FixedClock,
    config::AppConfig,
    repository::MemoryStore,
    services::{LendingPolicy, Services},
    AppState,
};

fn start() -> (Router, Arc<FixedClock>) {
    let clock = Arc::new(FixedClock::new(NaiveDate::from_ymd_opt(2024, 3, 1).unwrap()));
    let services = Services::new(
        Arc::new(MemoryStore::new()),
        clock.clone(),
        LendingPolicy::default(),
    );
    let state = AppState {
        config: Arc::new(AppConfig::default()),
        services: Arc::new(services),
    };
    (api::create_router(state), clock)
}

async fn send(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let builder = Request::builder()
        .method(method)
        .uri(format!("/api/v1{}", uri));
    let request = match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}

async fn add_book(app: &Router, title: &str, quantity: i32) -> i64 {
    let (status, body) = send(
        app,
        "POST",
        "/books",
        Some(json!({
            "title": title,
            "author": "Frank Herbert",
            "year": 1965,
            "available_quantity": quantity
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{}", body);
    body["id"].as_i64().unwrap()
}

async fn add_member(app: &Router, name: &str, email: &str) -> i64 {
    let (status, body) = send(
        app,
        "POST",
        "/members",
        Some(json!({
            "name": name,
            "email": email,
            "phone": "555-123-4567",
            "address": "1 Arrakis Way",
            "member_type": "STUDENT"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{}", body);
    body["id"].as_i64().unwrap()
}

#[tokio::test]
async fn test_health_and_readiness() {
    let (app, _) = start();

    let (status, body) = send(&app, "GET", "/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");

    let (status, body) = send(&app, "GET", "/ready", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ready");
}

#[tokio::test]
async fn test_issue_and_late_return() {
    let (app, clock) = start();
    let book = add_book(&app, "Dune", 1).await;
    let paul = add_member(&app, "Paul Atreides", "paul@arrakis.org").await;
    let jessica = add_member(&app, "Jessica", "jessica@arrakis.org").await;

    let (status, receipt) = send(
        &app,
        "POST",
        "/loans",
        Some(json!({ "book_id": book, "member_id": paul })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{}", receipt);
    assert_eq!(receipt["available_quantity"], 0);
    assert_eq!(receipt["loan"]["due_date"], "2024-03-15");
    let loan_id = receipt["loan"]["id"].as_i64().unwrap();

    let (status, error) = send(
        &app,
        "POST",
        "/loans",
        Some(json!({ "book_id": book, "member_id": jessica })),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(error["error"], "BookUnavailable");

    clock.advance_days(20);

    let (_, overdue) = send(&app, "GET", "/loans/overdue", None).await;
    assert_eq!(overdue.as_array().unwrap().len(), 1);
    assert_eq!(overdue[0]["days_overdue"], 6);
    assert_eq!(overdue[0]["accrued_fine"], "60");
    assert_eq!(overdue[0]["member_name"], "Paul Atreides");

    let (status, returned) = send(&app, "POST", &format!("/loans/{}/return", loan_id), None).await;
    assert_eq!(status, StatusCode::OK, "{}", returned);
    assert_eq!(returned["fine_amount"], "60");
    assert_eq!(returned["available_quantity"], 1);
    assert_eq!(returned["loan"]["status"], "RETURNED");

    let (status, error) = send(
        &app,
        "POST",
        &format!("/loans/{}/return", loan_id),
        Some(json!({ "as_of": "2024-04-01" })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(error["error"], "AlreadyReturned");

    let (_, fines) = send(&app, "GET", &format!("/members/{}/fines", paul), None).await;
    assert_eq!(fines["outstanding"], "60");
    assert_eq!(fines["open_loans"], 0);

    let (status, error) = send(&app, "DELETE", &format!("/members/{}", paul), None).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(error["error"], "MemberHasUnpaidFines");
}

#[tokio::test]
async fn test_book_on_loan_cannot_be_deleted() {
    let (app, _) = start();
    let book = add_book(&app, "Dune", 2).await;
    let paul = add_member(&app, "Paul Atreides", "paul@arrakis.org").await;

    let (_, receipt) = send(
        &app,
        "POST",
        "/loans",
        Some(json!({ "book_id": book, "member_id": paul })),
    )
    .await;
    let loan_id = receipt["loan"]["id"].as_i64().unwrap();

    let (status, error) = send(&app, "DELETE", &format!("/books/{}", book), None).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(error["error"], "BookInUse");

    let (status, _) = send(&app, "GET", &format!("/books/{}", book), None).await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = send(
        &app,
        "POST",
        &format!("/loans/{}/return", loan_id),
        Some(json!({ "as_of": "2030-01-01" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    send(&app, "POST", &format!("/loans/{}/return", loan_id), None).await;
    let zeroed = json!({
        "title": "Dune",
        "author": "Frank Herbert",
        "year": 1965,
        "available_quantity": 0
    });
    let (status, _) = send(&app, "PUT", &format!("/books/{}", book), Some(zeroed)).await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = send(&app, "DELETE", &format!("/books/{}", book), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
}

#[tokio::test]
async fn test_outstanding_fines_need_confirmation() {
    let (app, _) = start();
    let first = add_book(&app, "Dune", 1).await;
    let second = add_book(&app, "Children of Dune", 1).await;
    let member = add_member(&app, "Leto", "leto@arrakis.org").await;

    let (_, receipt) = send(
        &app,
        "POST",
        "/loans",
        Some(json!({
            "book_id": first,
            "member_id": member,
            "issue_date": "2024-02-23",
            "due_date": "2024-02-25"
        })),
    )
    .await;
    let loan_id = receipt["loan"]["id"].as_i64().unwrap();
    let (_, returned) = send(&app, "POST", &format!("/loans/{}/return", loan_id), None).await;
    assert_eq!(returned["fine_amount"], "50");

    let request = json!({ "book_id": second, "member_id": member });
    let (status, error) = send(&app, "POST", "/loans", Some(request)).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(error["error"], "NeedsConfirmation");

    let forced = json!({ "book_id": second, "member_id": member, "force": true });
    let (status, receipt) = send(&app, "POST", "/loans", Some(forced)).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(receipt["acknowledged_fines"], "50");
}

#[tokio::test]
async fn test_issue_date_window() {
    let (app, _) = start();
    let book = add_book(&app, "Dune", 2).await;
    let member = add_member(&app, "Paul Atreides", "paul@arrakis.org").await;

    let (status, error) = send(
        &app,
        "POST",
        "/loans",
        Some(json!({ "book_id": book, "member_id": member, "issue_date": "2024-02-01" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(error["error"], "InvalidIssueDate");

    let (_, suggestion) = send(&app, "GET", "/loans/due-date?issue_date=2024-02-20", None).await;
    assert_eq!(suggestion["due_date"], "2024-03-05");

    let uri = "/loans/due-date?issue_date=%2B262142-12-31";
    let (status, error) = send(&app, "GET", uri, None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(error["error"], "InvalidIssueDate");

    let (status, error) = send(
        &app,
        "POST",
        "/loans",
        Some(json!({ "book_id": book, "member_id": member, "issue_date": "+262142-12-31" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(error["error"], "InvalidIssueDate");

    let (_, book_after) = send(&app, "GET", &format!("/books/{}", book), None).await;
    assert_eq!(book_after["available_quantity"], 2);
}

#[tokio::test]
async fn test_roster_validation() {
    let (app, _) = start();
    add_member(&app, "Paul Atreides", "paul@arrakis.org").await;

    let mut member = json!({
        "name": "Impostor",
        "email": "PAUL@arrakis.org",
        "phone": "5551234567",
        "address": "Giedi Prime"
    });
    let (status, error) = send(&app, "POST", "/members", Some(member.clone())).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(error["error"], "Duplicate");

    member["email"] = json!("not-an-email");
    let (status, error) = send(&app, "POST", "/members", Some(member)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(error["message"], "Validation error: Please enter a valid email address");
}

#[tokio::test]
async fn test_search_and_panels() {
    let (app, _) = start();
    add_book(&app, "Dune", 1).await;
    add_book(&app, "Dune Messiah", 0).await;
    add_book(&app, "The Dosadi Experiment", 1).await;
    add_member(&app, "Paul Atreides", "paul@arrakis.org").await;

    let (_, results) = send(&app, "GET", "/books/search?q=DUNE", None).await;
    assert_eq!(results["count"], 2);

    let (_, available) = send(&app, "GET", "/books?available=true", None).await;
    assert_eq!(available.as_array().unwrap().len(), 2);

    let (status, view) = send(&app, "GET", "/panels/issue", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(view["panel"], "issue");
    assert_eq!(view["data"]["available_books"].as_array().unwrap().len(), 2);
    assert_eq!(view["data"]["earliest_issue_date"], "2024-02-23");

    let (_, view) = send(&app, "GET", "/panels/dashboard", None).await;
    assert_eq!(view["data"]["total_books"], 3);
    assert_eq!(view["data"]["issues_last_week"].as_array().unwrap().len(), 7);

    let (status, _) = send(&app, "GET", "/panels/settings", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
