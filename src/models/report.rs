//! Read models derived from the ledger

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use super::{book::Book, loan::Loan, member::Member};

/// Open loan annotated for display
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CurrentLoan {
    #[serde(flatten)]
    pub loan: Loan,
    pub book_title: String,
    pub member_name: String,
    pub days_on_loan: i64,
    pub is_overdue: bool,
}

/// Overdue loan with the fine it would settle at today
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct OverdueLoan {
    #[serde(flatten)]
    pub loan: Loan,
    pub book_title: String,
    pub member_name: String,
    pub days_overdue: i64,
    #[schema(value_type = String)]
    pub accrued_fine: Decimal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum ActivityKind {
    Issued,
    Returned,
}

/// One issuance or return event
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ActivityEntry {
    pub loan_id: i32,
    pub kind: ActivityKind,
    pub date: NaiveDate,
    pub book_title: String,
    pub member_name: String,
    /// e.g. "Book 'Dune' issued to Ada Lovelace"
    pub description: String,
    /// e.g. "Yesterday", "2 weeks ago"
    pub when: String,
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct ActivityQuery {
    /// Number of events to return (default 5)
    pub limit: Option<usize>,
}

/// Filtered subset plus its size for caller display
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[aliases(
    BookResults = SearchResults<Book>,
    MemberResults = SearchResults<Member>,
    CurrentLoanResults = SearchResults<CurrentLoan>,
    OverdueLoanResults = SearchResults<OverdueLoan>
)]
pub struct SearchResults<T>
where
    T: for<'a> ToSchema<'a>,
{
    pub items: Vec<T>,
    pub count: usize,
}

impl<T> SearchResults<T>
where
    T: for<'a> ToSchema<'a>,
{
    pub fn new(items: Vec<T>) -> Self {
        let count = items.len();
        Self { items, count }
    }
}

/// Catalog era by publication year
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
pub enum Era {
    Modern,
    Classic,
    Vintage,
    Antique,
}

impl Era {
    pub fn of_year(year: i32) -> Self {
        match year {
            y if y >= 2000 => Era::Modern,
            y if y >= 1950 => Era::Classic,
            y if y >= 1900 => Era::Vintage,
            _ => Era::Antique,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct EraCount {
    pub era: Era,
    /// Copies on the shelf for books of this era
    pub copies: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct DailyIssues {
    pub date: NaiveDate,
    pub count: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct DashboardStats {
    pub today: NaiveDate,
    pub total_books: usize,
    pub total_members: usize,
    pub current_loans: usize,
    pub overdue_loans: usize,
    pub copies_by_era: Vec<EraCount>,
    /// Last seven days, oldest first
    pub issues_last_week: Vec<DailyIssues>,
    pub recent_activity: Vec<ActivityEntry>,
}

/// Overdue notice for one loan
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct OverdueReminder {
    pub loan_id: i32,
    pub member_id: i32,
    pub member_name: String,
    pub email: String,
    pub phone: String,
    pub book_title: String,
    pub due_date: NaiveDate,
    pub days_overdue: i64,
    #[schema(value_type = String)]
    pub accrued_fine: Decimal,
    pub message: String,
}

/// Fine summary for a member
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct MemberFines {
    pub member_id: i32,
    /// Sum of fines frozen on returned loans
    #[schema(value_type = String)]
    pub outstanding: Decimal,
    /// Fines currently accruing on open overdue loans
    #[schema(value_type = String)]
    pub accruing: Decimal,
    pub open_loans: usize,
}

/// Issue form context: who can borrow what, and the permitted date windows
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct IssueForm {
    pub members: Vec<Member>,
    pub available_books: Vec<Book>,
    pub issue_date: NaiveDate,
    pub suggested_due_date: NaiveDate,
    pub earliest_issue_date: NaiveDate,
    pub latest_due_date: NaiveDate,
}
