//! Overdue reconciliation against the in-memory store

use std::time::Duration;

use chrono::Utc;

use medinventory_server::{
    models::{loan::calendar_date, CallerIdentity, LoanStatus, UserRole},
    repository::{MemoryStore, Repository},
    services::reconciliation::{OverdueReconciler, ReconciliationReport},
};

use crate::common::{jakarta, loan_for, Fixture};

fn reconciler(repository: Repository) -> OverdueReconciler {
    OverdueReconciler::new(repository, jakarta(), Duration::from_secs(5))
}

async fn status_of(fx: &Fixture, loan_id: i32) -> LoanStatus {
    let admin = CallerIdentity::new(0, UserRole::Admin);
    fx.loans
        .get_loan_detail(&admin, loan_id)
        .await
        .expect("loan vanished")
        .loan
        .status
}

#[tokio::test]
async fn test_marks_expired_loans_overdue() {
    let fx = Fixture::memory();
    let user = fx.user("Sari", UserRole::Regular).await;
    let item = fx.item(10).await;

    let due_today = fx.loans.create_loan(loan_for(&user, &item, 1, 0)).await.unwrap();
    let due_later = fx.loans.create_loan(loan_for(&user, &item, 1, 7)).await.unwrap();
    let returned = fx.loans.create_loan(loan_for(&user, &item, 1, 0)).await.unwrap();
    fx.loans
        .update_loan_status(returned.id, "Sudah Dikembalikan", None)
        .await
        .unwrap();
    let deleted = fx.loans.create_loan(loan_for(&user, &item, 1, 0)).await.unwrap();
    fx.loans.delete_loan(deleted.id).await.unwrap();

    // Run as if it were tomorrow
    let tomorrow = calendar_date(Utc::now(), &jakarta()).succ_opt().unwrap();
    let job = reconciler(fx.repository.clone());

    let report = job.run_once(tomorrow).await.unwrap();
    assert_eq!(
        report,
        ReconciliationReport {
            scanned: 3,
            marked_overdue: 1,
            failed: 0,
        }
    );

    assert_eq!(status_of(&fx, due_today.id).await, LoanStatus::Overdue);
    assert_eq!(status_of(&fx, due_later.id).await, LoanStatus::Borrowed);
    assert_eq!(status_of(&fx, returned.id).await, LoanStatus::Returned);

    // Overdue loans are left alone on the next run
    let report = job.run_once(tomorrow).await.unwrap();
    assert_eq!(report.marked_overdue, 0);
    assert_eq!(status_of(&fx, due_today.id).await, LoanStatus::Overdue);
}

#[tokio::test]
async fn test_due_today_is_not_overdue_yet() {
    let fx = Fixture::memory();
    let user = fx.user("Sari", UserRole::Regular).await;
    let item = fx.item(1).await;
    let loan = fx.loans.create_loan(loan_for(&user, &item, 1, 0)).await.unwrap();

    let today = calendar_date(Utc::now(), &jakarta());
    let report = reconciler(fx.repository.clone()).run_once(today).await.unwrap();

    assert_eq!(report.marked_overdue, 0);
    assert_eq!(status_of(&fx, loan.id).await, LoanStatus::Borrowed);
}

#[tokio::test]
async fn test_one_failure_does_not_stop_the_rest() {
    let store = MemoryStore::new();
    let fx = Fixture::new(Repository::new(store.clone()));
    let user = fx.user("Sari", UserRole::Regular).await;
    let item = fx.item(10).await;

    let mut loans = Vec::new();
    for _ in 0..3 {
        loans.push(fx.loans.create_loan(loan_for(&user, &item, 1, 0)).await.unwrap());
    }
    store.fail_updates_for(loans[1].id).await;

    let tomorrow = calendar_date(Utc::now(), &jakarta()).succ_opt().unwrap();
    let report = reconciler(fx.repository.clone()).run_once(tomorrow).await.unwrap();

    assert_eq!(report.scanned, 3);
    assert_eq!(report.marked_overdue, 2);
    assert_eq!(report.failed, 1);

    assert_eq!(status_of(&fx, loans[0].id).await, LoanStatus::Overdue);
    assert_eq!(status_of(&fx, loans[1].id).await, LoanStatus::Borrowed);
    assert_eq!(status_of(&fx, loans[2].id).await, LoanStatus::Overdue);
}

#[tokio::test]
async fn test_empty_ledger() {
    let report = reconciler(Repository::memory())
        .run_once(calendar_date(Utc::now(), &jakarta()))
        .await
        .unwrap();
    assert_eq!(report, ReconciliationReport::default());
}
