//! PostgreSQL-backed tests
//!
//! Need a disposable database: `DATABASE_URL=postgres://... cargo test -- --ignored`

use chrono::Utc;
use sqlx::postgres::PgPoolOptions;

use medinventory_server::{
    error::AppError,
    models::{loan::calendar_date, LoanStatus, UserRole},
    repository::{PgStore, Repository},
    services::reconciliation::OverdueReconciler,
};

use crate::common::{jakarta, loan_for, Fixture};

async fn pg_fixture() -> Fixture {
    let url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set");
    let pool = PgPoolOptions::new()
        .max_connections(8)
        .connect(&url)
        .await
        .expect("Failed to connect to database");

    let store = PgStore::new(pool);
    store.migrate().await.expect("Failed to run migrations");
    Fixture::new(Repository::new(store))
}

#[tokio::test]
#[ignore]
async fn test_pg_loan_lifecycle() {
    let fx = pg_fixture().await;
    let user = fx.user("PgSari", UserRole::Regular).await;
    let item = fx.item(10).await;

    let loan = fx.loans.create_loan(loan_for(&user, &item, 10, 1)).await.unwrap();
    assert_eq!(loan.status, LoanStatus::Borrowed);
    assert_eq!(fx.stock(item.id).await, 0);

    let result = fx.loans.create_loan(loan_for(&user, &item, 1, 1)).await;
    assert!(matches!(result, Err(AppError::InsufficientStock(_))));

    fx.loans
        .update_loan_status(loan.id, "Sudah Dikembalikan", None)
        .await
        .unwrap();
    fx.loans
        .update_loan_status(loan.id, "Sudah Dikembalikan", None)
        .await
        .unwrap();
    assert_eq!(fx.stock(item.id).await, 10);
}

#[tokio::test]
#[ignore]
async fn test_pg_concurrent_creates_never_oversell() {
    let fx = pg_fixture().await;
    let user = fx.user("PgBudi", UserRole::Regular).await;
    let item = fx.item(5).await;

    let mut handles = Vec::new();
    for _ in 0..6 {
        let loans = fx.loans.clone();
        let request = loan_for(&user, &item, 2, 1);
        handles.push(tokio::spawn(async move { loans.create_loan(request).await }));
    }

    let mut succeeded = 0;
    for handle in handles {
        if handle.await.unwrap().is_ok() {
            succeeded += 1;
        }
    }

    assert_eq!(succeeded, 2);
    assert_eq!(fx.stock(item.id).await, 1);
}

#[tokio::test]
#[ignore]
async fn test_pg_reconciliation() {
    let fx = pg_fixture().await;
    let user = fx.user("PgDewi", UserRole::Regular).await;
    let item = fx.item(3).await;
    let loan = fx.loans.create_loan(loan_for(&user, &item, 1, 0)).await.unwrap();

    let reconciler = OverdueReconciler::new(
        fx.repository.clone(),
        jakarta(),
        std::time::Duration::from_secs(5),
    );
    let tomorrow = calendar_date(Utc::now(), &jakarta()).succ_opt().unwrap();
    let report = reconciler.run_once(tomorrow).await.unwrap();
    assert!(report.marked_overdue >= 1);

    let stored = fx.repository.loan_details(loan.id).await.unwrap().unwrap();
    assert_eq!(stored.loan.status, LoanStatus::Overdue);
}
