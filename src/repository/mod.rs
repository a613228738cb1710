//! Persistence layer: storage traits and their backends

pub mod books;
pub mod loans;
pub mod members;
pub mod memory;

use std::sync::Arc;

use async_trait::async_trait;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use sqlx::{Pool, Postgres};

use crate::{
    error::AppResult,
    models::{Book, BookData, Loan, Member, MemberData, NewLoan, NewMember},
};

pub use memory::MemoryStore;

/// Catalog storage
#[async_trait]
pub trait BookStore: Send + Sync {
    /// All books, newest first
    async fn list_books(&self) -> AppResult<Vec<Book>>;
    async fn get_book(&self, id: i32) -> AppResult<Option<Book>>;
    /// Case-insensitive lookup used to reject duplicate titles
    async fn find_book_by_title_author(&self, title: &str, author: &str) -> AppResult<Option<Book>>;
    async fn insert_book(&self, book: &BookData) -> AppResult<Book>;
    async fn update_book(&self, id: i32, book: &BookData) -> AppResult<Option<Book>>;
    async fn delete_book(&self, id: i32) -> AppResult<bool>;
}

/// Roster storage
#[async_trait]
pub trait MemberStore: Send + Sync {
    /// All members, by id
    async fn list_members(&self) -> AppResult<Vec<Member>>;
    async fn get_member(&self, id: i32) -> AppResult<Option<Member>>;
    /// Lookup by normalized (lower-case) email
    async fn find_member_by_email(&self, email: &str) -> AppResult<Option<Member>>;
    async fn insert_member(&self, member: &NewMember) -> AppResult<Member>;
    /// Updates contact data; status is kept when `member.status` is `None`
    async fn update_member(&self, id: i32, member: &MemberData) -> AppResult<Option<Member>>;
    async fn delete_member(&self, id: i32) -> AppResult<bool>;
}

/// Ledger storage. Loans are never deleted.
#[async_trait]
pub trait LoanStore: Send + Sync {
    /// Every loan, newest id first
    async fn list_loans(&self) -> AppResult<Vec<Loan>>;
    /// ISSUED loans, earliest due first
    async fn open_loans(&self) -> AppResult<Vec<Loan>>;
    async fn get_loan(&self, id: i32) -> AppResult<Option<Loan>>;
    async fn loans_for_member(&self, member_id: i32) -> AppResult<Vec<Loan>>;
    async fn count_open_loans_for_book(&self, book_id: i32) -> AppResult<i64>;

    /// Inserts an ISSUED loan and takes one copy off the shelf, all or nothing.
    /// Fails with `BookUnavailable` when the book is missing or has no copies.
    async fn open_loan(&self, loan: &NewLoan) -> AppResult<(Loan, Book)>;

    /// Marks a loan RETURNED with its frozen fine and puts the copy back, all
    /// or nothing. Fails with `LoanNotFound` or `AlreadyReturned`.
    async fn close_loan(
        &self,
        id: i32,
        return_date: NaiveDate,
        fine: Decimal,
    ) -> AppResult<(Loan, Option<Book>)>;
}

/// Complete persistence backend
#[async_trait]
pub trait Store: BookStore + MemberStore + LoanStore {
    /// Checks the backend is reachable
    async fn ping(&self) -> AppResult<()>;
}

/// Shared handle to the configured backend
pub type Repository = Arc<dyn Store>;

/// Postgres backend
#[derive(Clone)]
pub struct PgStore {
    pub pool: Pool<Postgres>,
}

impl PgStore {
    /// Create a new store with the given database pool
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl Store for PgStore {
    async fn ping(&self) -> AppResult<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}

pub(crate) fn is_unique_violation(err: &sqlx::Error) -> bool {
    err.as_database_error()
        .map(|e| e.is_unique_violation())
        .unwrap_or(false)
}
