//! Read-only projections over the ledger, joined against catalog and roster

use std::{collections::HashMap, sync::Arc};

use chrono::{Duration, NaiveDate};

use crate::{
    clock::Clock,
    error::AppResult,
    models::{
        report::{
            ActivityEntry, ActivityKind, CurrentLoan, DailyIssues, DashboardStats, Era, EraCount,
            IssueForm, OverdueLoan, OverdueReminder, SearchResults,
        },
        Book, Loan, Member, MemberStatus, Panel, PanelView,
    },
    repository::Repository,
};

use super::{policy::relative_label, LedgerLock, LendingPolicy};

const DASHBOARD_ACTIVITY: usize = 5;
const DASHBOARD_DAYS: i64 = 7;

/// Consistent copy of the three tables taken under one read lock
struct Snapshot {
    books: Vec<Book>,
    members: Vec<Member>,
    loans: Vec<Loan>,
    titles: HashMap<i32, String>,
    names: HashMap<i32, String>,
}

impl Snapshot {
    fn new(books: Vec<Book>, members: Vec<Member>, loans: Vec<Loan>) -> Self {
        let titles = books.iter().map(|b| (b.id, b.title.clone())).collect();
        let names = members.iter().map(|m| (m.id, m.name.clone())).collect();
        Self {
            books,
            members,
            loans,
            titles,
            names,
        }
    }

    // Loans outlive catalog and roster entries
    fn title(&self, book_id: i32) -> String {
        self.titles
            .get(&book_id)
            .cloned()
            .unwrap_or_else(|| format!("Book #{}", book_id))
    }

    fn name(&self, member_id: i32) -> String {
        self.names
            .get(&member_id)
            .cloned()
            .unwrap_or_else(|| format!("Member #{}", member_id))
    }

    fn open_loans(&self) -> Vec<&Loan> {
        let mut open: Vec<&Loan> = self.loans.iter().filter(|l| l.is_open()).collect();
        open.sort_by_key(|l| (l.due_date, l.id));
        open
    }

    fn current(&self, today: NaiveDate) -> Vec<CurrentLoan> {
        self.open_loans()
            .into_iter()
            .map(|loan| CurrentLoan {
                book_title: self.title(loan.book_id),
                member_name: self.name(loan.member_id),
                days_on_loan: (today - loan.issue_date).num_days(),
                is_overdue: loan.due_date < today,
                loan: loan.clone(),
            })
            .collect()
    }

    fn overdue(&self, today: NaiveDate, policy: &LendingPolicy) -> Vec<OverdueLoan> {
        self.open_loans()
            .into_iter()
            .filter(|l| l.due_date < today)
            .map(|loan| OverdueLoan {
                book_title: self.title(loan.book_id),
                member_name: self.name(loan.member_id),
                days_overdue: policy.days_overdue(loan, today),
                accrued_fine: policy.compute_fine(loan, today),
                loan: loan.clone(),
            })
            .collect()
    }

    fn activity(&self, limit: usize, today: NaiveDate) -> Vec<ActivityEntry> {
        let mut events: Vec<(ActivityKind, NaiveDate, &Loan)> = Vec::new();
        for loan in &self.loans {
            events.push((ActivityKind::Issued, loan.issue_date, loan));
            if let Some(returned) = loan.return_date {
                events.push((ActivityKind::Returned, returned, loan));
            }
        }
        // Newest first; on the same loan and day the return comes before the issue
        events.sort_by(|a, b| {
            b.1.cmp(&a.1)
                .then(b.2.id.cmp(&a.2.id))
                .then((a.0 == ActivityKind::Issued).cmp(&(b.0 == ActivityKind::Issued)))
        });

        events
            .into_iter()
            .take(limit)
            .map(|(kind, date, loan)| {
                let book_title = self.title(loan.book_id);
                let member_name = self.name(loan.member_id);
                let description = match kind {
                    ActivityKind::Issued => {
                        format!("Book '{}' issued to {}", book_title, member_name)
                    }
                    ActivityKind::Returned => {
                        format!("Book '{}' returned by {}", book_title, member_name)
                    }
                };
                ActivityEntry {
                    loan_id: loan.id,
                    kind,
                    date,
                    book_title,
                    member_name,
                    description,
                    when: relative_label(date, today),
                }
            })
            .collect()
    }

    fn copies_by_era(&self) -> Vec<EraCount> {
        [Era::Modern, Era::Classic, Era::Vintage, Era::Antique]
            .into_iter()
            .map(|era| EraCount {
                era,
                copies: self
                    .books
                    .iter()
                    .filter(|b| Era::of_year(b.year) == era)
                    .map(|b| i64::from(b.available_quantity))
                    .sum(),
            })
            .collect()
    }

    fn issues_per_day(&self, today: NaiveDate) -> Vec<DailyIssues> {
        (0..DASHBOARD_DAYS)
            .rev()
            .map(|offset| {
                let date = today - Duration::days(offset);
                DailyIssues {
                    date,
                    count: self.loans.iter().filter(|l| l.issue_date == date).count(),
                }
            })
            .collect()
    }
}

fn loan_matches(needle: &str, loan_id: i32, book_title: &str, member_name: &str) -> bool {
    let lower = needle.to_lowercase();
    book_title.to_lowercase().contains(&lower)
        || member_name.to_lowercase().contains(&lower)
        || loan_id.to_string().contains(needle)
}

fn normalize_query(q: &str) -> &str {
    q.trim()
}

#[derive(Clone)]
pub struct ReportsService {
    repository: Repository,
    clock: Arc<dyn Clock>,
    policy: LendingPolicy,
    lock: LedgerLock,
}

impl ReportsService {
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

    async fn snapshot(&self) -> AppResult<Snapshot> {
        let _read = self.lock.read().await;
        let books = self.repository.list_books().await?;
        let members = self.repository.list_members().await?;
        let loans = self.repository.list_loans().await?;
        Ok(Snapshot::new(books, members, loans))
    }

    /// Open loans, earliest due first, with days on loan
    pub async fn current_loans(&self) -> AppResult<Vec<CurrentLoan>> {
        let snapshot = self.snapshot().await?;
        Ok(snapshot.current(self.clock.today()))
    }

    /// Open loans past due, earliest due first, with the fine as of today
    pub async fn overdue_loans(&self) -> AppResult<Vec<OverdueLoan>> {
        let snapshot = self.snapshot().await?;
        Ok(snapshot.overdue(self.clock.today(), &self.policy))
    }

    /// Last `limit` issuances and returns, newest first
    pub async fn recent_activity(&self, limit: usize) -> AppResult<Vec<ActivityEntry>> {
        let snapshot = self.snapshot().await?;
        Ok(snapshot.activity(limit, self.clock.today()))
    }

    pub async fn search_books(&self, q: &str) -> AppResult<SearchResults<Book>> {
        let q = normalize_query(q);
        let snapshot = self.snapshot().await?;
        let items = snapshot.books.into_iter().filter(|b| b.matches(q)).collect();
        Ok(SearchResults::new(items))
    }

    pub async fn search_members(&self, q: &str) -> AppResult<SearchResults<Member>> {
        let q = normalize_query(q);
        let snapshot = self.snapshot().await?;
        let items = snapshot
            .members
            .into_iter()
            .filter(|m| m.matches(q))
            .collect();
        Ok(SearchResults::new(items))
    }

    pub async fn search_current_loans(&self, q: &str) -> AppResult<SearchResults<CurrentLoan>> {
        let q = normalize_query(q);
        let items = self
            .current_loans()
            .await?
            .into_iter()
            .filter(|c| loan_matches(q, c.loan.id, &c.book_title, &c.member_name))
            .collect();
        Ok(SearchResults::new(items))
    }

    pub async fn search_overdue_loans(&self, q: &str) -> AppResult<SearchResults<OverdueLoan>> {
        let q = normalize_query(q);
        let items = self
            .overdue_loans()
            .await?
            .into_iter()
            .filter(|o| loan_matches(q, o.loan.id, &o.book_title, &o.member_name))
            .collect();
        Ok(SearchResults::new(items))
    }

    pub async fn dashboard(&self) -> AppResult<DashboardStats> {
        let snapshot = self.snapshot().await?;
        let today = self.clock.today();
        let open = snapshot.open_loans();

        Ok(DashboardStats {
            today,
            total_books: snapshot.books.len(),
            total_members: snapshot.members.len(),
            current_loans: open.len(),
            overdue_loans: open.iter().filter(|l| l.due_date < today).count(),
            copies_by_era: snapshot.copies_by_era(),
            issues_last_week: snapshot.issues_per_day(today),
            recent_activity: snapshot.activity(DASHBOARD_ACTIVITY, today),
        })
    }

    /// Build one notice per overdue loan. Notices are logged, not delivered.
    pub async fn overdue_reminders(&self) -> AppResult<Vec<OverdueReminder>> {
        let snapshot = self.snapshot().await?;
        let today = self.clock.today();
        let contacts: HashMap<i32, &Member> =
            snapshot.members.iter().map(|m| (m.id, m)).collect();

        let reminders: Vec<OverdueReminder> = snapshot
            .overdue(today, &self.policy)
            .into_iter()
            .map(|o| {
                let (email, phone) = contacts
                    .get(&o.loan.member_id)
                    .map(|m| (m.email.clone(), m.phone.clone()))
                    .unwrap_or_default();
                let message = format!(
                    "Dear {}, '{}' was due on {} and is {} day{} overdue. Current fine: {}.",
                    o.member_name,
                    o.book_title,
                    o.loan.due_date,
                    o.days_overdue,
                    if o.days_overdue == 1 { "" } else { "s" },
                    o.accrued_fine
                );
                OverdueReminder {
                    loan_id: o.loan.id,
                    member_id: o.loan.member_id,
                    member_name: o.member_name,
                    email,
                    phone,
                    book_title: o.book_title,
                    due_date: o.loan.due_date,
                    days_overdue: o.days_overdue,
                    accrued_fine: o.accrued_fine,
                    message,
                }
            })
            .collect();

        for reminder in &reminders {
            tracing::info!(
                loan_id = reminder.loan_id,
                member_id = reminder.member_id,
                email = %reminder.email,
                "{}",
                reminder.message
            );
        }
        tracing::info!(count = reminders.len(), "Overdue reminders prepared");
        Ok(reminders)
    }

    /// Everything an issue form needs: who may borrow, what is on the shelf,
    /// and the permitted date windows
    pub async fn issue_form(&self) -> AppResult<IssueForm> {
        let snapshot = self.snapshot().await?;
        self.build_issue_form(snapshot)
    }

    fn build_issue_form(&self, snapshot: Snapshot) -> AppResult<IssueForm> {
        let today = self.clock.today();
        let mut members: Vec<Member> = snapshot
            .members
            .into_iter()
            .filter(|m| m.status == MemberStatus::Active)
            .collect();
        members.sort_by(|a, b| a.name.to_lowercase().cmp(&b.name.to_lowercase()));

        Ok(IssueForm {
            members,
            available_books: snapshot
                .books
                .into_iter()
                .filter(Book::is_available)
                .collect(),
            issue_date: today,
            suggested_due_date: self.policy.compute_default_due_date(today)?,
            earliest_issue_date: self.policy.earliest_issue_date(today)?,
            latest_due_date: self.policy.latest_due_date(today)?,
        })
    }

    /// Data behind one panel
    pub async fn render(&self, panel: Panel) -> AppResult<PanelView> {
        let view = match panel {
            Panel::Dashboard => PanelView::Dashboard(self.dashboard().await?),
            Panel::Books => PanelView::Books(self.snapshot().await?.books),
            Panel::Members => PanelView::Members(self.snapshot().await?.members),
            Panel::Issue => PanelView::Issue(self.issue_form().await?),
            Panel::Current => PanelView::Current(self.current_loans().await?),
            Panel::Overdue => PanelView::Overdue(self.overdue_loans().await?),
        };
        tracing::debug!(panel = ?view.panel(), "Panel rendered");
        Ok(view)
    }
}
