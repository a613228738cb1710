//! Loans table access

use async_trait::async_trait;
use chrono::NaiveDate;
use rust_decimal::Decimal;

use crate::{
    error::{AppError, AppResult},
    models::{Book, Loan, LoanStatus, NewLoan},
};

use super::{is_unique_violation, LoanStore, PgStore};

const LOAN_COLUMNS: &str =
    "id, book_id, member_id, issue_date, due_date, return_date, status, fine_amount";

#[async_trait]
impl LoanStore for PgStore {
    async fn list_loans(&self) -> AppResult<Vec<Loan>> {
        let loans = sqlx::query_as::<_, Loan>(&format!(
            "SELECT {} FROM loans ORDER BY id DESC",
            LOAN_COLUMNS
        ))
        .fetch_all(&self.pool)
        .await?;

        Ok(loans)
    }

    async fn open_loans(&self) -> AppResult<Vec<Loan>> {
        let loans = sqlx::query_as::<_, Loan>(&format!(
            "SELECT {} FROM loans WHERE status = $1 ORDER BY due_date ASC, id ASC",
            LOAN_COLUMNS
        ))
        .bind(LoanStatus::Issued)
        .fetch_all(&self.pool)
        .await?;

        Ok(loans)
    }

    async fn get_loan(&self, id: i32) -> AppResult<Option<Loan>> {
        let loan = sqlx::query_as::<_, Loan>(&format!(
            "SELECT {} FROM loans WHERE id = $1",
            LOAN_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(loan)
    }

    async fn loans_for_member(&self, member_id: i32) -> AppResult<Vec<Loan>> {
        let loans = sqlx::query_as::<_, Loan>(&format!(
            "SELECT {} FROM loans WHERE member_id = $1 ORDER BY id",
            LOAN_COLUMNS
        ))
        .bind(member_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(loans)
    }

    async fn count_open_loans_for_book(&self, book_id: i32) -> AppResult<i64> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM loans WHERE book_id = $1 AND status = $2")
                .bind(book_id)
                .bind(LoanStatus::Issued)
                .fetch_one(&self.pool)
                .await?;

        Ok(count)
    }

    async fn open_loan(&self, loan: &NewLoan) -> AppResult<(Loan, Book)> {
        let mut tx = self.pool.begin().await?;

        // Guarded decrement: the row is locked until commit
        let book = sqlx::query_as::<_, Book>(
            r#"
            UPDATE books SET quantity = quantity - 1
            WHERE id = $1 AND quantity > 0
            RETURNING id, title, author, year, quantity
            "#,
        )
        .bind(loan.book_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(AppError::BookUnavailable(loan.book_id))?;

        let created = sqlx::query_as::<_, Loan>(&format!(
            r#"
            INSERT INTO loans (book_id, member_id, issue_date, due_date, status, fine_amount)
            VALUES ($1, $2, $3, $4, $5, 0)
            RETURNING {}
            "#,
            LOAN_COLUMNS
        ))
        .bind(loan.book_id)
        .bind(loan.member_id)
        .bind(loan.issue_date)
        .bind(loan.due_date)
        .bind(LoanStatus::Issued)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                AppError::DuplicateLoan {
                    book_id: loan.book_id,
                    member_id: loan.member_id,
                }
            } else {
                AppError::Storage(e)
            }
        })?;

        tx.commit().await?;

        Ok((created, book))
    }

    async fn close_loan(
        &self,
        id: i32,
        return_date: NaiveDate,
        fine: Decimal,
    ) -> AppResult<(Loan, Option<Book>)> {
        let mut tx = self.pool.begin().await?;

        let settled = sqlx::query_as::<_, Loan>(&format!(
            r#"
            UPDATE loans SET return_date = $2, status = $3, fine_amount = $4
            WHERE id = $1 AND status = $5
            RETURNING {}
            "#,
            LOAN_COLUMNS
        ))
        .bind(id)
        .bind(return_date)
        .bind(LoanStatus::Returned)
        .bind(fine)
        .bind(LoanStatus::Issued)
        .fetch_optional(&mut *tx)
        .await?;

        let loan = match settled {
            Some(loan) => loan,
            None => {
                let exists: Option<i32> = sqlx::query_scalar("SELECT id FROM loans WHERE id = $1")
                    .bind(id)
                    .fetch_optional(&mut *tx)
                    .await?;
                return Err(match exists {
                    Some(_) => AppError::AlreadyReturned(id),
                    None => AppError::LoanNotFound(id),
                });
            }
        };

        let book = sqlx::query_as::<_, Book>(
            r#"
            UPDATE books SET quantity = quantity + 1
            WHERE id = $1
            RETURNING id, title, author, year, quantity
            "#,
        )
        .bind(loan.book_id)
        .fetch_optional(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok((loan, book))
    }
}
