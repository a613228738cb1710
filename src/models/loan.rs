//! Loan (ledger entry) model and related types

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};

use super::enums::LoanStatus;

/// One book copy lent to one member
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Loan {
    pub id: i32,
    pub book_id: i32,
    pub member_id: i32,
    pub issue_date: NaiveDate,
    pub due_date: NaiveDate,
    pub return_date: Option<NaiveDate>,
    pub status: LoanStatus,
    /// Frozen at return time; zero while the loan is open
    #[schema(value_type = String)]
    pub fine_amount: Decimal,
}

impl Loan {
    pub fn is_open(&self) -> bool {
        self.status == LoanStatus::Issued
    }
}

/// A loan row ready for insertion
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewLoan {
    pub book_id: i32,
    pub member_id: i32,
    pub issue_date: NaiveDate,
    pub due_date: NaiveDate,
}

/// Issue request
#[derive(Debug, Clone, Deserialize, Serialize, ToSchema)]
pub struct IssueRequest {
    pub book_id: i32,
    pub member_id: i32,
    /// Defaults to today
    pub issue_date: Option<NaiveDate>,
    /// Defaults to the standard loan term after the issue date
    pub due_date: Option<NaiveDate>,
    /// Proceed even though the member has unpaid fines
    #[serde(default)]
    pub force: bool,
}

/// Return request
#[derive(Debug, Clone, Default, Deserialize, Serialize, ToSchema)]
pub struct ReturnRequest {
    /// Defaults to today
    pub as_of: Option<NaiveDate>,
}

/// Outcome of a successful return
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ReturnReceipt {
    pub loan: Loan,
    pub days_overdue: i64,
    #[schema(value_type = String)]
    pub fine_amount: Decimal,
    /// Copies on the shelf after the return, absent when the title is gone
    pub available_quantity: Option<i32>,
}

/// Outcome of a successful issuance
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct IssueReceipt {
    pub loan: Loan,
    /// Copies on the shelf after the issuance
    pub available_quantity: i32,
    /// Fines the caller confirmed past, if any
    #[schema(value_type = Option<String>)]
    pub acknowledged_fines: Option<Decimal>,
}

/// Suggested due date query
#[derive(Debug, Deserialize, IntoParams)]
pub struct DueDateQuery {
    pub issue_date: Option<NaiveDate>,
}

/// Suggested due date response
#[derive(Debug, Serialize, ToSchema)]
pub struct DueDateSuggestion {
    pub issue_date: NaiveDate,
    pub due_date: NaiveDate,
}
