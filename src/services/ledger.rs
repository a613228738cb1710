//! Lending ledger: issuance and return of book copies

use std::sync::Arc;

use chrono::NaiveDate;
use rust_decimal::Decimal;

use crate::{
    clock::Clock,
    error::{AppError, AppResult},
    models::{
        loan::{DueDateSuggestion, IssueReceipt, IssueRequest, ReturnReceipt},
        Book, Loan, NewLoan,
    },
    repository::Repository,
};

use super::{policy::outstanding_fines, LedgerLock, LendingPolicy};

#[derive(Clone)]
pub struct LedgerService {
    repository: Repository,
    clock: Arc<dyn Clock>,
    policy: LendingPolicy,
    lock: LedgerLock,
}

impl LedgerService {
    pub fn new(
        repository: Repository,
        clock: Arc<dyn Clock>,
        policy: LendingPolicy,
        lock: LedgerLock,
    ) -> Self {
        Self {
            repository,
            clock,
            policy,
            lock,
        }
    }

    pub fn today(&self) -> NaiveDate {
        self.clock.today()
    }

    /// Lend one copy of a book to a member.
    ///
    /// Checks run in order and the first failure wins: date windows, book
    /// availability, member existence, duplicate open loan, loan limit, then
    /// outstanding fines (skipped when `force` is set). Nothing is written
    /// unless every check passes.
    pub async fn issue_book(&self, request: IssueRequest) -> AppResult<IssueReceipt> {
        let today = self.clock.today();
        let issue_date = request.issue_date.unwrap_or(today);
        self.policy.validate_issue_date(issue_date, today)?;
        let due_date = match request.due_date {
            Some(due_date) => due_date,
            None => self.policy.compute_default_due_date(issue_date)?,
        };
        self.policy.validate_issue_dates(issue_date, due_date, today)?;

        let _write = self.lock.write().await;

        let book = self
            .repository
            .get_book(request.book_id)
            .await?
            .filter(Book::is_available)
            .ok_or(AppError::BookUnavailable(request.book_id))?;

        self.repository
            .get_member(request.member_id)
            .await?
            .ok_or_else(|| {
                AppError::NotFound(format!("Member with id {} not found", request.member_id))
            })?;

        let loans = self.repository.loans_for_member(request.member_id).await?;
        let open: Vec<&Loan> = loans.iter().filter(|l| l.is_open()).collect();

        if open.iter().any(|l| l.book_id == request.book_id) {
            return Err(AppError::DuplicateLoan {
                book_id: request.book_id,
                member_id: request.member_id,
            });
        }

        let limit = self.policy.max_open_loans();
        if open.len() >= limit as usize {
            tracing::debug!(member_id = request.member_id, limit, "Loan limit reached");
            return Err(AppError::LoanLimitExceeded {
                member_id: request.member_id,
                limit,
            });
        }

        let outstanding = outstanding_fines(&loans);
        let acknowledged_fines = if outstanding > Decimal::ZERO {
            if !request.force {
                return Err(AppError::OutstandingFinesNeedConfirmation {
                    member_id: request.member_id,
                    outstanding,
                });
            }
            tracing::warn!(
                member_id = request.member_id,
                %outstanding,
                "Issuing despite outstanding fines"
            );
            Some(outstanding)
        } else {
            None
        };

        let (loan, book_after) = self
            .repository
            .open_loan(&NewLoan {
                book_id: request.book_id,
                member_id: request.member_id,
                issue_date,
                due_date,
            })
            .await?;

        tracing::info!(
            loan_id = loan.id,
            book_id = loan.book_id,
            member_id = loan.member_id,
            title = %book.title,
            due_date = %loan.due_date,
            "Book issued"
        );

        Ok(IssueReceipt {
            loan,
            available_quantity: book_after.available_quantity,
            acknowledged_fines,
        })
    }

    /// Settle an open loan on `as_of` (today when omitted), freezing its fine.
    /// A return may be recorded ahead of time, up to the longest loan period.
    pub async fn return_book(
        &self,
        loan_id: i32,
        as_of: Option<NaiveDate>,
    ) -> AppResult<ReturnReceipt> {
        let today = self.clock.today();
        let as_of = as_of.unwrap_or(today);

        let _write = self.lock.write().await;

        let loan = self
            .repository
            .get_loan(loan_id)
            .await?
            .ok_or(AppError::LoanNotFound(loan_id))?;
        if !loan.is_open() {
            return Err(AppError::AlreadyReturned(loan_id));
        }
        if as_of < loan.issue_date {
            return Err(AppError::ReturnBeforeIssue(loan_id));
        }
        let latest = self.policy.latest_return_date(today)?;
        if as_of > latest {
            return Err(AppError::Validation(format!(
                "Return date cannot be later than {}",
                latest
            )));
        }

        let days_overdue = self.policy.days_overdue(&loan, as_of);
        let fine = self.policy.compute_fine(&loan, as_of);
        let (loan, book) = self.repository.close_loan(loan_id, as_of, fine).await?;

        tracing::info!(
            loan_id,
            book_id = loan.book_id,
            member_id = loan.member_id,
            days_overdue,
            fine = %fine,
            "Book returned"
        );

        Ok(ReturnReceipt {
            loan,
            days_overdue,
            fine_amount: fine,
            available_quantity: book.map(|b| b.available_quantity),
        })
    }

    /// Open loans, earliest due first
    pub async fn current_loans(&self) -> AppResult<Vec<Loan>> {
        let _read = self.lock.read().await;
        self.repository.open_loans().await
    }

    /// Open loans past their due date as of `today`
    pub async fn overdue_loans(&self, today: NaiveDate) -> AppResult<Vec<Loan>> {
        let _read = self.lock.read().await;
        let loans = self.repository.open_loans().await?;
        Ok(loans.into_iter().filter(|l| l.due_date < today).collect())
    }

    /// The whole ledger, newest first
    pub async fn all_loans(&self) -> AppResult<Vec<Loan>> {
        let _read = self.lock.read().await;
        self.repository.list_loans().await
    }

    pub async fn get_loan(&self, id: i32) -> AppResult<Loan> {
        let _read = self.lock.read().await;
        self.repository
            .get_loan(id)
            .await?
            .ok_or(AppError::LoanNotFound(id))
    }

    pub fn suggest_due_date(
        &self,
        issue_date: Option<NaiveDate>,
    ) -> AppResult<DueDateSuggestion> {
        let issue_date = issue_date.unwrap_or_else(|| self.clock.today());
        Ok(DueDateSuggestion {
            issue_date,
            due_date: self.policy.compute_default_due_date(issue_date)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        clock::{FixedClock, MockClock},
        models::{BookData, LoanStatus, MemberData, MemberStatus, MemberType, NewMember},
        repository::MemoryStore,
    };
    use chrono::Duration;
    use tokio::sync::RwLock;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    struct Fixture {
        store: Arc<MemoryStore>,
        clock: Arc<FixedClock>,
        ledger: LedgerService,
    }

    fn fixture() -> Fixture {
        let store = Arc::new(MemoryStore::new());
        let clock = Arc::new(FixedClock::new(d(2024, 3, 1)));
        let ledger = LedgerService::new(
            store.clone(),
            clock.clone(),
            LendingPolicy::default(),
            Arc::new(RwLock::new(())),
        );
        Fixture {
            store,
            clock,
            ledger,
        }
    }

    impl Fixture {
        async fn book(&self, title: &str, quantity: i32) -> Book {
            use crate::repository::BookStore;
            self.store
                .insert_book(&BookData {
                    title: title.into(),
                    author: "Octavia E. Butler".into(),
                    year: 1979,
                    available_quantity: quantity,
                })
                .await
                .unwrap()
        }

        async fn member(&self, email: &str) -> i32 {
            use crate::repository::MemberStore;
            self.store
                .insert_member(&NewMember {
                    data: MemberData {
                        name: "Ada Lovelace".into(),
                        email: email.into(),
                        phone: "5550100199".into(),
                        address: "12 St James's Square".into(),
                        member_type: MemberType::Public,
                        status: None,
                    },
                    join_date: d(2024, 1, 1),
                    status: MemberStatus::Active,
                })
                .await
                .unwrap()
                .id
        }

        async fn quantity(&self, book_id: i32) -> i32 {
            use crate::repository::BookStore;
            self.store
                .get_book(book_id)
                .await
                .unwrap()
                .unwrap()
                .available_quantity
        }
    }

    fn request(book_id: i32, member_id: i32) -> IssueRequest {
        IssueRequest {
            book_id,
            member_id,
            issue_date: None,
            due_date: None,
            force: false,
        }
    }

    #[tokio::test]
    async fn issue_defaults_dates_and_takes_a_copy() {
        let fx = fixture();
        let book = fx.book("Kindred", 2).await;
        let member = fx.member("ada@example.org").await;

        let receipt = fx.ledger.issue_book(request(book.id, member)).await.unwrap();
        assert_eq!(receipt.loan.issue_date, d(2024, 3, 1));
        assert_eq!(receipt.loan.due_date, d(2024, 3, 15));
        assert_eq!(receipt.loan.status, LoanStatus::Issued);
        assert_eq!(receipt.loan.fine_amount, Decimal::ZERO);
        assert_eq!(receipt.available_quantity, 1);
        assert_eq!(fx.quantity(book.id).await, 1);
    }

    #[tokio::test]
    async fn invalid_dates_are_rejected_first() {
        let fx = fixture();
        let mut req = request(999, 999);
        req.issue_date = Some(d(2024, 3, 2));
        assert!(matches!(
            fx.ledger.issue_book(req).await,
            Err(AppError::InvalidIssueDate(_))
        ));

        let mut req = request(999, 999);
        req.due_date = Some(d(2024, 3, 1));
        assert!(matches!(
            fx.ledger.issue_book(req).await,
            Err(AppError::InvalidDueDate(_))
        ));
    }

    #[tokio::test]
    async fn unavailable_book_leaves_state_unchanged() {
        let fx = fixture();
        let book = fx.book("Dawn", 0).await;
        let member = fx.member("ada@example.org").await;

        assert!(matches!(
            fx.ledger.issue_book(request(book.id, member)).await,
            Err(AppError::BookUnavailable(_))
        ));
        assert!(matches!(
            fx.ledger.issue_book(request(404, member)).await,
            Err(AppError::BookUnavailable(404))
        ));
        assert_eq!(fx.quantity(book.id).await, 0);
        assert!(fx.ledger.all_loans().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn unknown_member_is_not_found() {
        let fx = fixture();
        let book = fx.book("Dawn", 1).await;
        assert!(matches!(
            fx.ledger.issue_book(request(book.id, 77)).await,
            Err(AppError::NotFound(_))
        ));
        assert_eq!(fx.quantity(book.id).await, 1);
    }

    #[tokio::test]
    async fn same_book_twice_is_a_duplicate_loan() {
        let fx = fixture();
        let book = fx.book("Wild Seed", 3).await;
        let member = fx.member("ada@example.org").await;

        fx.ledger.issue_book(request(book.id, member)).await.unwrap();
        assert!(matches!(
            fx.ledger.issue_book(request(book.id, member)).await,
            Err(AppError::DuplicateLoan { .. })
        ));
        assert_eq!(fx.quantity(book.id).await, 2);
    }

    #[tokio::test]
    async fn fourth_open_loan_exceeds_the_limit() {
        let fx = fixture();
        let member = fx.member("ada@example.org").await;
        for title in ["Kindred", "Dawn", "Imago"] {
            let book = fx.book(title, 1).await;
            fx.ledger.issue_book(request(book.id, member)).await.unwrap();
        }
        let fourth = fx.book("Adulthood Rites", 1).await;

        assert!(matches!(
            fx.ledger.issue_book(request(fourth.id, member)).await,
            Err(AppError::LoanLimitExceeded { limit: 3, .. })
        ));
        let open = fx.ledger.current_loans().await.unwrap();
        assert_eq!(open.iter().filter(|l| l.member_id == member).count(), 3);
    }

    #[tokio::test]
    async fn return_on_due_date_is_free() {
        let fx = fixture();
        let book = fx.book("Kindred", 1).await;
        let member = fx.member("ada@example.org").await;
        let issued = fx.ledger.issue_book(request(book.id, member)).await.unwrap();

        let receipt = fx
            .ledger
            .return_book(issued.loan.id, Some(issued.loan.due_date))
            .await
            .unwrap();
        assert_eq!(receipt.fine_amount, Decimal::ZERO);
        assert_eq!(receipt.days_overdue, 0);
        assert_eq!(receipt.loan.status, LoanStatus::Returned);
        assert_eq!(receipt.loan.return_date, Some(issued.loan.due_date));
        assert_eq!(receipt.available_quantity, Some(1));
    }

    #[tokio::test]
    async fn late_return_freezes_the_fine() {
        let fx = fixture();
        let book = fx.book("Kindred", 1).await;
        let member = fx.member("ada@example.org").await;
        let issued = fx.ledger.issue_book(request(book.id, member)).await.unwrap();

        fx.clock.advance_days(20);
        let receipt = fx.ledger.return_book(issued.loan.id, None).await.unwrap();
        assert_eq!(receipt.days_overdue, 6);
        assert_eq!(receipt.fine_amount, Decimal::from(60));

        fx.clock.advance_days(30);
        let stored = fx.ledger.get_loan(issued.loan.id).await.unwrap();
        assert_eq!(stored.fine_amount, Decimal::from(60));
    }

    #[tokio::test]
    async fn second_return_fails_without_side_effects() {
        let fx = fixture();
        let book = fx.book("Kindred", 1).await;
        let member = fx.member("ada@example.org").await;
        let issued = fx.ledger.issue_book(request(book.id, member)).await.unwrap();
        fx.ledger
            .return_book(issued.loan.id, Some(d(2024, 3, 20)))
            .await
            .unwrap();

        assert!(matches!(
            fx.ledger.return_book(issued.loan.id, Some(d(2024, 4, 20))).await,
            Err(AppError::AlreadyReturned(_))
        ));
        let stored = fx.ledger.get_loan(issued.loan.id).await.unwrap();
        assert_eq!(stored.fine_amount, Decimal::from(50));
        assert_eq!(stored.return_date, Some(d(2024, 3, 20)));
        assert_eq!(fx.quantity(book.id).await, 1);
    }

    #[tokio::test]
    async fn return_before_issue_and_unknown_loan() {
        let fx = fixture();
        let book = fx.book("Kindred", 1).await;
        let member = fx.member("ada@example.org").await;
        let issued = fx.ledger.issue_book(request(book.id, member)).await.unwrap();

        assert!(matches!(
            fx.ledger.return_book(issued.loan.id, Some(d(2024, 2, 28))).await,
            Err(AppError::ReturnBeforeIssue(_))
        ));
        assert!(matches!(
            fx.ledger.return_book(999, None).await,
            Err(AppError::LoanNotFound(999))
        ));
        assert!(fx.ledger.get_loan(issued.loan.id).await.unwrap().is_open());
    }

    #[tokio::test]
    async fn fines_need_confirmation_unless_forced() {
        let fx = fixture();
        let first = fx.book("Kindred", 1).await;
        let second = fx.book("Dawn", 1).await;
        let member = fx.member("ada@example.org").await;
        let issued = fx.ledger.issue_book(request(first.id, member)).await.unwrap();
        fx.ledger
            .return_book(issued.loan.id, Some(d(2024, 3, 18)))
            .await
            .unwrap();

        match fx.ledger.issue_book(request(second.id, member)).await {
            Err(AppError::OutstandingFinesNeedConfirmation { outstanding, .. }) => {
                assert_eq!(outstanding, Decimal::from(30))
            }
            other => panic!("expected confirmation request, got {:?}", other.map(|r| r.loan)),
        }
        assert_eq!(fx.quantity(second.id).await, 1);

        let mut forced = request(second.id, member);
        forced.force = true;
        let receipt = fx.ledger.issue_book(forced).await.unwrap();
        assert_eq!(receipt.acknowledged_fines, Some(Decimal::from(30)));
    }

    #[tokio::test]
    async fn overdue_is_a_subset_of_current() {
        let fx = fixture();
        let member = fx.member("ada@example.org").await;
        let early = fx.book("Kindred", 1).await;
        let late = fx.book("Dawn", 1).await;

        let mut req = request(early.id, member);
        req.issue_date = Some(d(2024, 2, 25));
        req.due_date = Some(d(2024, 3, 3));
        fx.ledger.issue_book(req).await.unwrap();
        fx.ledger.issue_book(request(late.id, member)).await.unwrap();

        let today = fx.ledger.today() + Duration::days(5);
        let current = fx.ledger.current_loans().await.unwrap();
        let overdue = fx.ledger.overdue_loans(today).await.unwrap();

        assert_eq!(current.len(), 2);
        assert_eq!(current[0].book_id, early.id);
        assert_eq!(overdue.len(), 1);
        assert!(overdue.iter().all(|o| current.contains(o) && o.due_date < today));
    }

    #[tokio::test]
    async fn suggested_due_date_follows_the_clock() {
        let mut clock = MockClock::new();
        clock.expect_today().return_const(d(2024, 12, 25));
        let ledger = LedgerService::new(
            Arc::new(MemoryStore::new()),
            Arc::new(clock),
            LendingPolicy::default(),
            Arc::new(RwLock::new(())),
        );

        let suggestion = ledger.suggest_due_date(None).unwrap();
        assert_eq!(suggestion.issue_date, d(2024, 12, 25));
        assert_eq!(suggestion.due_date, d(2025, 1, 8));
        assert_eq!(
            ledger.suggest_due_date(Some(d(2024, 2, 20))).unwrap().due_date,
            d(2024, 3, 5)
        );
        assert!(matches!(
            ledger.suggest_due_date(Some(NaiveDate::MAX)),
            Err(AppError::InvalidIssueDate(_))
        ));
    }

    #[tokio::test]
    async fn issue_date_at_the_calendar_edge_is_rejected() {
        let fx = fixture();
        let book = fx.book("Kindred", 1).await;
        let member = fx.member("ada@example.org").await;

        let mut req = request(book.id, member);
        req.issue_date = Some(NaiveDate::MAX);
        assert!(matches!(
            fx.ledger.issue_book(req).await,
            Err(AppError::InvalidIssueDate(_))
        ));

        let parsed: IssueRequest = serde_json::from_str(&format!(
            r#"{{"book_id":{},"member_id":{},"issue_date":"+262142-12-31"}}"#,
            book.id, member
        ))
        .unwrap();
        assert!(matches!(
            fx.ledger.issue_book(parsed).await,
            Err(AppError::InvalidIssueDate(_))
        ));
        assert_eq!(fx.quantity(book.id).await, 1);
    }

    #[tokio::test]
    async fn return_date_is_capped_at_the_longest_loan_period() {
        let fx = fixture();
        let book = fx.book("Kindred", 1).await;
        let member = fx.member("ada@example.org").await;
        let issued = fx.ledger.issue_book(request(book.id, member)).await.unwrap();

        for far in [d(2024, 5, 31), NaiveDate::MAX] {
            assert!(matches!(
                fx.ledger.return_book(issued.loan.id, Some(far)).await,
                Err(AppError::Validation(_))
            ));
        }
        assert!(fx.ledger.get_loan(issued.loan.id).await.unwrap().is_open());

        let receipt = fx
            .ledger
            .return_book(issued.loan.id, Some(d(2024, 5, 30)))
            .await
            .unwrap();
        assert_eq!(receipt.days_overdue, 76);
        assert_eq!(receipt.fine_amount, Decimal::from(760));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn last_copy_goes_to_exactly_one_caller() {
        let fx = fixture();
        let book_id = fx.book("Parable of the Sower", 1).await.id;
        let mut handles = Vec::new();
        for i in 0..8 {
            let member = fx.member(&format!("reader{}@example.org", i)).await;
            let ledger = fx.ledger.clone();
            handles.push(tokio::spawn(async move {
                ledger.issue_book(request(book_id, member)).await
            }));
        }

        let mut issued = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Ok(_) => issued += 1,
                Err(AppError::BookUnavailable(_)) => {}
                Err(other) => panic!("unexpected error: {}", other),
            }
        }
        assert_eq!(issued, 1);
        assert_eq!(fx.quantity(book_id).await, 0);
    }
}
