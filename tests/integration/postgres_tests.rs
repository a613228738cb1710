//! Postgres backend tests
//!
//! Need a reachable database: DATABASE_URL=postgres://... cargo test -- --ignored

use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;

use libraryflow_server::{
    error::AppError,
    models::{BookData, LoanStatus, MemberData, MemberStatus, MemberType, NewLoan, NewMember},
    repository::{BookStore, LoanStore, MemberStore, PgStore, Store},
};

async fn store() -> PgStore {
    let url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set");
    let pool = PgPool::connect(&url).await.expect("Failed to connect to database");
    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .expect("Failed to run migrations");
    PgStore::new(pool)
}

fn unique(prefix: &str) -> String {
    format!("{}-{}", prefix, Utc::now().timestamp_nanos_opt().unwrap_or_default())
}

fn date(day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 5, day).unwrap()
}

async fn member(store: &PgStore) -> i32 {
    store
        .insert_member(&NewMember {
            data: MemberData {
                name: "Test Reader".into(),
                email: format!("{}@example.org", unique("reader")),
                phone: "5550100199".into(),
                address: "Test Street".into(),
                member_type: MemberType::Staff,
                status: None,
            },
            join_date: date(1),
            status: MemberStatus::Active,
        })
        .await
        .unwrap()
        .id
}

#[tokio::test]
#[ignore]
async fn test_ping() {
    store().await.ping().await.unwrap();
}

#[tokio::test]
#[ignore]
async fn test_loan_lifecycle_is_transactional() {
    let store = store().await;
    let book = store
        .insert_book(&BookData {
            title: unique("Foundation"),
            author: "Isaac Asimov".into(),
            year: 1951,
            available_quantity: 1,
        })
        .await
        .unwrap();
    let first = member(&store).await;
    let second = member(&store).await;

    let new_loan = NewLoan {
        book_id: book.id,
        member_id: first,
        issue_date: date(1),
        due_date: date(15),
    };
    let (loan, after) = store.open_loan(&new_loan).await.unwrap();
    assert_eq!(after.available_quantity, 0);
    assert_eq!(loan.status, LoanStatus::Issued);

    let refused = store
        .open_loan(&NewLoan {
            member_id: second,
            ..new_loan.clone()
        })
        .await;
    assert!(matches!(refused, Err(AppError::BookUnavailable(_))));
    assert_eq!(store.count_open_loans_for_book(book.id).await.unwrap(), 1);

    let (closed, book_after) = store
        .close_loan(loan.id, date(20), Decimal::from(50))
        .await
        .unwrap();
    assert_eq!(closed.status, LoanStatus::Returned);
    assert_eq!(closed.fine_amount, Decimal::from(50));
    assert_eq!(book_after.map(|b| b.available_quantity), Some(1));

    assert!(matches!(
        store.close_loan(loan.id, date(21), Decimal::ZERO).await,
        Err(AppError::AlreadyReturned(_))
    ));
    let stored = store.get_loan(loan.id).await.unwrap().unwrap();
    assert_eq!(stored.return_date, Some(date(20)));
}

#[tokio::test]
#[ignore]
async fn test_duplicate_email_is_rejected() {
    let store = store().await;
    let email = format!("{}@example.org", unique("dup"));
    let data = MemberData {
        name: "Someone".into(),
        email: email.clone(),
        phone: "5550100199".into(),
        address: "Somewhere".into(),
        member_type: MemberType::Public,
        status: None,
    };
    let new_member = NewMember {
        data,
        join_date: date(1),
        status: MemberStatus::Active,
    };
    store.insert_member(&new_member).await.unwrap();
    assert!(matches!(
        store.insert_member(&new_member).await,
        Err(AppError::DuplicateMemberEmail(_))
    ));
    assert!(store.find_member_by_email(&email).await.unwrap().is_some());
}
