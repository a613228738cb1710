//! Error types for the LibraryFlow server

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use rust_decimal::Decimal;
use serde::Serialize;
use thiserror::Error;

/// Stable numeric error codes exposed to API clients
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum ErrorCode {
    Failure = 1,
    StorageFailure = 3,
    NoSuchMember = 4,
    NoSuchItem = 5,
    BookUnavailable = 7,
    Duplicate = 8,
    MaxLoansReached = 11,
    BadValue = 18,
    NoSuchLoan = 20,
    MemberHasOpenLoans = 21,
    InvalidIssueDate = 30,
    InvalidDueDate = 31,
    AlreadyReturned = 32,
    ReturnBeforeIssue = 33,
    BookInUse = 34,
    BookHasCopies = 35,
    MemberHasUnpaidFines = 36,
    NeedsConfirmation = 37,
}

/// Main application error type
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Invalid issue date: {0}")]
    InvalidIssueDate(String),

    #[error("Invalid due date: {0}")]
    InvalidDueDate(String),

    #[error("Book {0} is currently unavailable, all copies are issued")]
    BookUnavailable(i32),

    #[error("Member {member_id} already has book {book_id} issued")]
    DuplicateLoan { book_id: i32, member_id: i32 },

    #[error("Member {member_id} has reached the maximum number of issued books ({limit})")]
    LoanLimitExceeded { member_id: i32, limit: u32 },

    #[error("Loan {0} not found")]
    LoanNotFound(i32),

    #[error("Loan {0} has already been returned")]
    AlreadyReturned(i32),

    #[error("Loan {0} cannot be returned before it was issued")]
    ReturnBeforeIssue(i32),

    #[error("Book {0} is currently issued to a member")]
    BookInUse(i32),

    #[error("Book {0} still has copies in the catalog")]
    BookHasCopies(i32),

    #[error("Member {0} still has unreturned books")]
    MemberHasOpenLoans(i32),

    #[error("Member {member_id} has unpaid fines totaling {total}")]
    MemberHasUnpaidFines { member_id: i32, total: Decimal },

    #[error("A member with email {0} already exists")]
    DuplicateMemberEmail(String),

    #[error("A book titled '{title}' by {author} already exists")]
    DuplicateBook { title: String, author: String },

    #[error("Member {member_id} has unpaid fines of {outstanding}; resend with force=true to issue anyway")]
    OutstandingFinesNeedConfirmation { member_id: i32, outstanding: Decimal },

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Storage error: {0}")]
    Storage(#[from] sqlx::Error),

    #[error("Internal server error: {0}")]
    Internal(String),
}

impl AppError {
    pub fn code(&self) -> ErrorCode {
        match self {
            AppError::InvalidIssueDate(_) => ErrorCode::InvalidIssueDate,
            AppError::InvalidDueDate(_) => ErrorCode::InvalidDueDate,
            AppError::BookUnavailable(_) => ErrorCode::BookUnavailable,
            AppError::DuplicateLoan { .. } => ErrorCode::Duplicate,
            AppError::LoanLimitExceeded { .. } => ErrorCode::MaxLoansReached,
            AppError::LoanNotFound(_) => ErrorCode::NoSuchLoan,
            AppError::AlreadyReturned(_) => ErrorCode::AlreadyReturned,
            AppError::ReturnBeforeIssue(_) => ErrorCode::ReturnBeforeIssue,
            AppError::BookInUse(_) => ErrorCode::BookInUse,
            AppError::BookHasCopies(_) => ErrorCode::BookHasCopies,
            AppError::MemberHasOpenLoans(_) => ErrorCode::MemberHasOpenLoans,
            AppError::MemberHasUnpaidFines { .. } => ErrorCode::MemberHasUnpaidFines,
            AppError::DuplicateMemberEmail(_) => ErrorCode::Duplicate,
            AppError::DuplicateBook { .. } => ErrorCode::Duplicate,
            AppError::OutstandingFinesNeedConfirmation { .. } => ErrorCode::NeedsConfirmation,
            AppError::NotFound(_) => ErrorCode::NoSuchItem,
            AppError::Validation(_) => ErrorCode::BadValue,
            AppError::Storage(_) => ErrorCode::StorageFailure,
            AppError::Internal(_) => ErrorCode::Failure,
        }
    }

    fn status(&self) -> StatusCode {
        match self {
            AppError::InvalidIssueDate(_)
            | AppError::InvalidDueDate(_)
            | AppError::ReturnBeforeIssue(_)
            | AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::LoanNotFound(_) | AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::DuplicateLoan { .. }
            | AppError::AlreadyReturned(_)
            | AppError::DuplicateMemberEmail(_)
            | AppError::DuplicateBook { .. }
            | AppError::OutstandingFinesNeedConfirmation { .. } => StatusCode::CONFLICT,
            AppError::BookUnavailable(_)
            | AppError::LoanLimitExceeded { .. }
            | AppError::BookInUse(_)
            | AppError::BookHasCopies(_)
            | AppError::MemberHasOpenLoans(_)
            | AppError::MemberHasUnpaidFines { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::Storage(_) | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(errors: validator::ValidationErrors) -> Self {
        let mut messages: Vec<String> = errors
            .field_errors()
            .into_iter()
            .flat_map(|(field, errs)| {
                errs.iter().map(move |e| match &e.message {
                    Some(msg) => msg.to_string(),
                    None => format!("Invalid value for {}", field),
                })
            })
            .collect();
        messages.sort();
        AppError::Validation(messages.join("; "))
    }
}

/// Error response body
#[derive(Serialize, utoipa::ToSchema)]
pub struct ErrorResponse {
    pub code: u32,
    pub error: String,
    pub message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let code = self.code();

        let message = match &self {
            AppError::Storage(e) => {
                tracing::error!("Storage error: {:?}", e);
                "Storage error".to_string()
            }
            AppError::Internal(msg) => {
                tracing::error!("Internal error: {}", msg);
                "Internal server error".to_string()
            }
            other => other.to_string(),
        };

        let body = Json(ErrorResponse {
            code: code as u32,
            error: format!("{:?}", code),
            message,
        });

        (status, body).into_response()
    }
}

/// Result type alias for application operations
pub type AppResult<T> = Result<T, AppError>;
