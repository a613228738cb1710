//! Lending policy: due dates, fines and date eligibility. Pure functions.

use chrono::{Duration, NaiveDate};
use rust_decimal::Decimal;

use crate::{
    config::LendingConfig,
    error::{AppError, AppResult},
    models::Loan,
};

#[derive(Debug, Clone)]
pub struct LendingPolicy {
    config: LendingConfig,
}

impl Default for LendingPolicy {
    fn default() -> Self {
        Self::new(LendingConfig::default())
    }
}

impl LendingPolicy {
    pub fn new(config: LendingConfig) -> Self {
        Self { config }
    }

    pub fn fine_per_day(&self) -> Decimal {
        self.config.fine_per_day
    }

    pub fn max_open_loans(&self) -> u32 {
        self.config.max_open_loans
    }

    /// Standard loan term after `issue_date`
    pub fn compute_default_due_date(&self, issue_date: NaiveDate) -> AppResult<NaiveDate> {
        issue_date
            .checked_add_signed(Duration::days(self.config.loan_term_days))
            .ok_or_else(|| out_of_range(issue_date))
    }

    /// Earliest issue date accepted today
    pub fn earliest_issue_date(&self, today: NaiveDate) -> AppResult<NaiveDate> {
        today
            .checked_sub_signed(Duration::days(self.config.max_backdate_days))
            .ok_or_else(|| out_of_range(today))
    }

    /// Latest due date accepted for a loan issued on `issue_date`
    pub fn latest_due_date(&self, issue_date: NaiveDate) -> AppResult<NaiveDate> {
        issue_date
            .checked_add_signed(Duration::days(self.config.max_loan_days))
            .ok_or_else(|| out_of_range(issue_date))
    }

    /// Latest return date that may be recorded today
    pub fn latest_return_date(&self, today: NaiveDate) -> AppResult<NaiveDate> {
        today
            .checked_add_signed(Duration::days(self.config.max_loan_days))
            .ok_or_else(|| AppError::Validation(format!("Date {} is out of range", today)))
    }

    pub fn is_fine_accruing(&self, loan: &Loan, as_of: NaiveDate) -> bool {
        loan.is_open() && as_of > loan.due_date
    }

    /// Whole days past the due date, zero when not overdue
    pub fn days_overdue(&self, loan: &Loan, as_of: NaiveDate) -> i64 {
        (as_of - loan.due_date).num_days().max(0)
    }

    /// Fine owed if the loan were settled on `as_of`
    pub fn compute_fine(&self, loan: &Loan, as_of: NaiveDate) -> Decimal {
        if !self.is_fine_accruing(loan, as_of) {
            return Decimal::ZERO;
        }
        Decimal::from(self.days_overdue(loan, as_of)) * self.config.fine_per_day
    }

    /// Issue date window alone: not in the future, not too far back
    pub fn validate_issue_date(&self, issue_date: NaiveDate, today: NaiveDate) -> AppResult<()> {
        if issue_date > today {
            return Err(AppError::InvalidIssueDate(
                "Issue date cannot be in the future".to_string(),
            ));
        }
        if issue_date < self.earliest_issue_date(today)? {
            return Err(AppError::InvalidIssueDate(format!(
                "Issue date cannot be more than {} days in the past",
                self.config.max_backdate_days
            )));
        }
        Ok(())
    }

    pub fn validate_issue_dates(
        &self,
        issue_date: NaiveDate,
        due_date: NaiveDate,
        today: NaiveDate,
    ) -> AppResult<()> {
        self.validate_issue_date(issue_date, today)?;
        if due_date <= issue_date {
            return Err(AppError::InvalidDueDate(
                "Due date must be after issue date".to_string(),
            ));
        }
        if due_date > self.latest_due_date(issue_date)? {
            return Err(AppError::InvalidDueDate(format!(
                "Maximum loan period is {} days",
                self.config.max_loan_days
            )));
        }
        Ok(())
    }
}

fn out_of_range(date: NaiveDate) -> AppError {
    AppError::InvalidIssueDate(format!("Date {} is out of range", date))
}

/// Sum of frozen fines across a member's loans
pub fn outstanding_fines(loans: &[Loan]) -> Decimal {
    loans
        .iter()
        .map(|l| l.fine_amount)
        .filter(|fine| *fine > Decimal::ZERO)
        .sum()
}

/// Human-relative label for how long ago `date` was
pub fn relative_label(date: NaiveDate, today: NaiveDate) -> String {
    let days = (today - date).num_days();
    match days {
        d if d < 1 => "Today".to_string(),
        1 => "Yesterday".to_string(),
        d if d < 7 => format!("{} days ago", d),
        d if d < 30 => plural(d / 7, "week"),
        d => plural(d / 30, "month"),
    }
}

fn plural(n: i64, unit: &str) -> String {
    if n == 1 {
        format!("1 {} ago", unit)
    } else {
        format!("{} {}s ago", n, unit)
    }
}
