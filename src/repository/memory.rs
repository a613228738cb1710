//! In-memory backend with the same semantics as the Postgres tables

use std::{
    collections::BTreeMap,
    sync::{Mutex, MutexGuard},
};

use async_trait::async_trait;
use chrono::NaiveDate;
use rust_decimal::Decimal;

use crate::{
    error::{AppError, AppResult},
    models::{Book, BookData, Loan, LoanStatus, Member, MemberData, NewLoan, NewMember},
};

use super::{BookStore, LoanStore, MemberStore, Store};

#[derive(Debug, Default)]
struct Tables {
    books: BTreeMap<i32, Book>,
    members: BTreeMap<i32, Member>,
    loans: BTreeMap<i32, Loan>,
    next_book_id: i32,
    next_member_id: i32,
    next_loan_id: i32,
}

impl Tables {
    fn next_id(counter: &mut i32) -> i32 {
        *counter += 1;
        *counter
    }

    fn email_taken(&self, email: &str, except: Option<i32>) -> bool {
        self.members
            .values()
            .any(|m| m.email == email && Some(m.id) != except)
    }
}

/// Mutex-guarded tables; every trait call is one critical section
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> AppResult<MutexGuard<'_, Tables>> {
        self.tables
            .lock()
            .map_err(|_| AppError::Internal("memory store lock poisoned".to_string()))
    }
}

#[async_trait]
impl BookStore for MemoryStore {
    async fn list_books(&self) -> AppResult<Vec<Book>> {
        Ok(self.lock()?.books.values().rev().cloned().collect())
    }

    async fn get_book(&self, id: i32) -> AppResult<Option<Book>> {
        Ok(self.lock()?.books.get(&id).cloned())
    }

    async fn find_book_by_title_author(&self, title: &str, author: &str) -> AppResult<Option<Book>> {
        let (title, author) = (title.to_lowercase(), author.to_lowercase());
        Ok(self
            .lock()?
            .books
            .values()
            .find(|b| b.title.to_lowercase() == title && b.author.to_lowercase() == author)
            .cloned())
    }

    async fn insert_book(&self, book: &BookData) -> AppResult<Book> {
        let mut tables = self.lock()?;
        let id = Tables::next_id(&mut tables.next_book_id);
        let created = Book {
            id,
            title: book.title.clone(),
            author: book.author.clone(),
            year: book.year,
            available_quantity: book.available_quantity,
        };
        tables.books.insert(id, created.clone());
        Ok(created)
    }

    async fn update_book(&self, id: i32, book: &BookData) -> AppResult<Option<Book>> {
        let mut tables = self.lock()?;
        Ok(tables.books.get_mut(&id).map(|existing| {
            existing.title = book.title.clone();
            existing.author = book.author.clone();
            existing.year = book.year;
            existing.available_quantity = book.available_quantity;
            existing.clone()
        }))
    }

    async fn delete_book(&self, id: i32) -> AppResult<bool> {
        Ok(self.lock()?.books.remove(&id).is_some())
    }
}

#[async_trait]
impl MemberStore for MemoryStore {
    async fn list_members(&self) -> AppResult<Vec<Member>> {
        Ok(self.lock()?.members.values().cloned().collect())
    }

    async fn get_member(&self, id: i32) -> AppResult<Option<Member>> {
        Ok(self.lock()?.members.get(&id).cloned())
    }

    async fn find_member_by_email(&self, email: &str) -> AppResult<Option<Member>> {
        Ok(self
            .lock()?
            .members
            .values()
            .find(|m| m.email == email)
            .cloned())
    }

    async fn insert_member(&self, member: &NewMember) -> AppResult<Member> {
        let mut tables = self.lock()?;
        if tables.email_taken(&member.data.email, None) {
            return Err(AppError::DuplicateMemberEmail(member.data.email.clone()));
        }
        let id = Tables::next_id(&mut tables.next_member_id);
        let data = &member.data;
        let created = Member {
            id,
            name: data.name.clone(),
            email: data.email.clone(),
            phone: data.phone.clone(),
            address: data.address.clone(),
            member_type: data.member_type,
            join_date: member.join_date,
            status: member.status,
        };
        tables.members.insert(id, created.clone());
        Ok(created)
    }

    async fn update_member(&self, id: i32, member: &MemberData) -> AppResult<Option<Member>> {
        let mut tables = self.lock()?;
        if !tables.members.contains_key(&id) {
            return Ok(None);
        }
        if tables.email_taken(&member.email, Some(id)) {
            return Err(AppError::DuplicateMemberEmail(member.email.clone()));
        }
        Ok(tables.members.get_mut(&id).map(|existing| {
            existing.name = member.name.clone();
            existing.email = member.email.clone();
            existing.phone = member.phone.clone();
            existing.address = member.address.clone();
            existing.member_type = member.member_type;
            if let Some(status) = member.status {
                existing.status = status;
            }
            existing.clone()
        }))
    }

    async fn delete_member(&self, id: i32) -> AppResult<bool> {
        Ok(self.lock()?.members.remove(&id).is_some())
    }
}

#[async_trait]
impl LoanStore for MemoryStore {
    async fn list_loans(&self) -> AppResult<Vec<Loan>> {
        Ok(self.lock()?.loans.values().rev().cloned().collect())
    }

    async fn open_loans(&self) -> AppResult<Vec<Loan>> {
        let mut open: Vec<Loan> = self
            .lock()?
            .loans
            .values()
            .filter(|l| l.is_open())
            .cloned()
            .collect();
        open.sort_by_key(|l| (l.due_date, l.id));
        Ok(open)
    }

    async fn get_loan(&self, id: i32) -> AppResult<Option<Loan>> {
        Ok(self.lock()?.loans.get(&id).cloned())
    }

    async fn loans_for_member(&self, member_id: i32) -> AppResult<Vec<Loan>> {
        Ok(self
            .lock()?
            .loans
            .values()
            .filter(|l| l.member_id == member_id)
            .cloned()
            .collect())
    }

    async fn count_open_loans_for_book(&self, book_id: i32) -> AppResult<i64> {
        let count = self
            .lock()?
            .loans
            .values()
            .filter(|l| l.book_id == book_id && l.is_open())
            .count();
        Ok(count as i64)
    }

    async fn open_loan(&self, loan: &NewLoan) -> AppResult<(Loan, Book)> {
        let mut tables = self.lock()?;

        let duplicate = tables.loans.values().any(|l| {
            l.is_open() && l.book_id == loan.book_id && l.member_id == loan.member_id
        });
        if duplicate {
            return Err(AppError::DuplicateLoan {
                book_id: loan.book_id,
                member_id: loan.member_id,
            });
        }

        let book = match tables.books.get_mut(&loan.book_id) {
            Some(book) if book.available_quantity > 0 => {
                book.available_quantity -= 1;
                book.clone()
            }
            _ => return Err(AppError::BookUnavailable(loan.book_id)),
        };

        let id = Tables::next_id(&mut tables.next_loan_id);
        let created = Loan {
            id,
            book_id: loan.book_id,
            member_id: loan.member_id,
            issue_date: loan.issue_date,
            due_date: loan.due_date,
            return_date: None,
            status: LoanStatus::Issued,
            fine_amount: Decimal::ZERO,
        };
        tables.loans.insert(id, created.clone());

        Ok((created, book))
    }

    async fn close_loan(
        &self,
        id: i32,
        return_date: NaiveDate,
        fine: Decimal,
    ) -> AppResult<(Loan, Option<Book>)> {
        let mut tables = self.lock()?;

        let loan = tables.loans.get_mut(&id).ok_or(AppError::LoanNotFound(id))?;
        if !loan.is_open() {
            return Err(AppError::AlreadyReturned(id));
        }
        loan.return_date = Some(return_date);
        loan.status = LoanStatus::Returned;
        loan.fine_amount = fine;
        let loan = loan.clone();

        let book = tables.books.get_mut(&loan.book_id).map(|book| {
            book.available_quantity += 1;
            book.clone()
        });

        Ok((loan, book))
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn ping(&self) -> AppResult<()> {
        self.lock().map(|_| ())
    }
}
