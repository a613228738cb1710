//! Ledger endpoints: issuance, returns and loan views

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};

use crate::{
    error::AppResult,
    models::{
        book::SearchQuery,
        loan::{
            DueDateQuery, DueDateSuggestion, IssueReceipt, IssueRequest, Loan, ReturnReceipt,
            ReturnRequest,
        },
        report::{CurrentLoan, CurrentLoanResults, OverdueLoan, OverdueLoanResults},
    },
    AppState,
};

/// List the whole ledger, newest first
#[utoipa::path(
    get,
    path = "/loans",
    tag = "loans",
    responses(
        (status = 200, description = "Every loan ever recorded", body = Vec<Loan>)
    )
)]
pub async fn list_loans(State(state): State<AppState>) -> AppResult<Json<Vec<Loan>>> {
    let loans = state.services.ledger.all_loans().await?;
    Ok(Json(loans))
}

/// Issue a book to a member
#[utoipa::path(
    post,
    path = "/loans",
    tag = "loans",
    request_body = IssueRequest,
    responses(
        (status = 201, description = "Book issued", body = IssueReceipt),
        (status = 400, description = "Issue or due date outside the permitted window"),
        (status = 404, description = "Member not found"),
        (status = 409, description = "Duplicate loan, or outstanding fines need confirmation"),
        (status = 422, description = "Book unavailable or loan limit reached")
    )
)]
pub async fn issue_book(
    State(state): State<AppState>,
    Json(request): Json<IssueRequest>,
) -> AppResult<(StatusCode, Json<IssueReceipt>)> {
    let receipt = state.services.ledger.issue_book(request).await?;
    Ok((StatusCode::CREATED, Json(receipt)))
}

/// Get loan by ID
#[utoipa::path(
    get,
    path = "/loans/{id}",
    tag = "loans",
    params(
        ("id" = i32, Path, description = "Loan ID")
    ),
    responses(
        (status = 200, description = "Loan details", body = Loan),
        (status = 404, description = "Loan not found")
    )
)]
pub async fn get_loan(State(state): State<AppState>, Path(id): Path<i32>) -> AppResult<Json<Loan>> {
    let loan = state.services.ledger.get_loan(id).await?;
    Ok(Json(loan))
}

/// Return an issued book, settling its fine
#[utoipa::path(
    post,
    path = "/loans/{id}/return",
    tag = "loans",
    params(
        ("id" = i32, Path, description = "Loan ID")
    ),
    request_body(content = ReturnRequest, description = "Return date, today when omitted"),
    responses(
        (status = 200, description = "Book returned", body = ReturnReceipt),
        (status = 400, description = "Return date precedes the issue date or is too far ahead"),
        (status = 404, description = "Loan not found"),
        (status = 409, description = "Already returned")
    )
)]
pub async fn return_book(
    State(state): State<AppState>,
    Path(loan_id): Path<i32>,
    request: Option<Json<ReturnRequest>>,
) -> AppResult<Json<ReturnReceipt>> {
    let as_of = request.and_then(|Json(r)| r.as_of);
    let receipt = state.services.ledger.return_book(loan_id, as_of).await?;
    Ok(Json(receipt))
}

/// Open loans, earliest due first
#[utoipa::path(
    get,
    path = "/loans/current",
    tag = "loans",
    responses(
        (status = 200, description = "Current loans", body = Vec<CurrentLoan>)
    )
)]
pub async fn current_loans(State(state): State<AppState>) -> AppResult<Json<Vec<CurrentLoan>>> {
    let loans = state.services.reports.current_loans().await?;
    Ok(Json(loans))
}

/// Search open loans by book title, member name or loan id
#[utoipa::path(
    get,
    path = "/loans/current/search",
    tag = "loans",
    params(SearchQuery),
    responses(
        (status = 200, description = "Matching current loans", body = CurrentLoanResults)
    )
)]
pub async fn search_current_loans(
    State(state): State<AppState>,
    Query(query): Query<SearchQuery>,
) -> AppResult<Json<CurrentLoanResults>> {
    let results = state
        .services
        .reports
        .search_current_loans(query.q.as_deref().unwrap_or_default())
        .await?;
    Ok(Json(results))
}

/// Overdue loans with the fine accrued so far
#[utoipa::path(
    get,
    path = "/loans/overdue",
    tag = "loans",
    responses(
        (status = 200, description = "Overdue loans", body = Vec<OverdueLoan>)
    )
)]
pub async fn overdue_loans(State(state): State<AppState>) -> AppResult<Json<Vec<OverdueLoan>>> {
    let loans = state.services.reports.overdue_loans().await?;
    Ok(Json(loans))
}

/// Search overdue loans by book title, member name or loan id
#[utoipa::path(
    get,
    path = "/loans/overdue/search",
    tag = "loans",
    params(SearchQuery),
    responses(
        (status = 200, description = "Matching overdue loans", body = OverdueLoanResults)
    )
)]
pub async fn search_overdue_loans(
    State(state): State<AppState>,
    Query(query): Query<SearchQuery>,
) -> AppResult<Json<OverdueLoanResults>> {
    let results = state
        .services
        .reports
        .search_overdue_loans(query.q.as_deref().unwrap_or_default())
        .await?;
    Ok(Json(results))
}

/// Standard due date for an issue date (today when omitted)
#[utoipa::path(
    get,
    path = "/loans/due-date",
    tag = "loans",
    params(DueDateQuery),
    responses(
        (status = 200, description = "Suggested due date", body = DueDateSuggestion),
        (status = 400, description = "Issue date out of range")
    )
)]
pub async fn suggest_due_date(
    State(state): State<AppState>,
    Query(query): Query<DueDateQuery>,
) -> AppResult<Json<DueDateSuggestion>> {
    let suggestion = state.services.ledger.suggest_due_date(query.issue_date)?;
    Ok(Json(suggestion))
}
