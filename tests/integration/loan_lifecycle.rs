//! Loan lifecycle against the in-memory store

use chrono::{Duration, Utc};
use tokio_test::{assert_err, assert_ok};

use medinventory_server::{
    error::AppError,
    models::{CallerIdentity, LoanQuery, LoanStatus, UpdateInventoryItem, UserRole},
};

use crate::common::{loan_between, loan_for, Fixture};

const RETURNED: &str = "Sudah Dikembalikan";
const OVERDUE: &str = "Belum Dikembalikan";

#[tokio::test]
async fn test_create_loan_takes_stock() {
    let fx = Fixture::memory();
    let user = fx.user("Sari", UserRole::Regular).await;
    let item = fx.item(5).await;

    let loan = assert_ok!(fx.loans.create_loan(loan_for(&user, &item, 2, 3)).await);

    assert_eq!(loan.status, LoanStatus::Borrowed);
    assert_eq!(loan.quantity, 2);
    assert_eq!(fx.stock(item.id).await, 3);
}

#[tokio::test]
async fn test_return_restocks_exactly_once() {
    let fx = Fixture::memory();
    let user = fx.user("Sari", UserRole::Regular).await;
    let item = fx.item(5).await;
    let loan = fx.loans.create_loan(loan_for(&user, &item, 2, 3)).await.unwrap();

    let returned = assert_ok!(fx.loans.update_loan_status(loan.id, RETURNED, None).await);
    assert_eq!(returned.status, LoanStatus::Returned);
    assert_eq!(fx.stock(item.id).await, 5);

    // A second return is a no-op
    let again = assert_ok!(fx.loans.update_loan_status(loan.id, RETURNED, None).await);
    assert_eq!(again.status, LoanStatus::Returned);
    assert_eq!(fx.stock(item.id).await, 5);
}

#[tokio::test]
async fn test_returned_is_terminal() {
    let fx = Fixture::memory();
    let user = fx.user("Sari", UserRole::Regular).await;
    let item = fx.item(1).await;
    let loan = fx.loans.create_loan(loan_for(&user, &item, 1, 1)).await.unwrap();
    fx.loans.update_loan_status(loan.id, RETURNED, None).await.unwrap();

    let result = fx.loans.update_loan_status(loan.id, OVERDUE, None).await;
    assert!(matches!(result, Err(AppError::Conflict(_))));
    assert_eq!(fx.stock(item.id).await, 1);
}

#[tokio::test]
async fn test_overdue_loan_can_be_returned() {
    let fx = Fixture::memory();
    let user = fx.user("Sari", UserRole::Regular).await;
    let item = fx.item(4).await;
    let loan = fx.loans.create_loan(loan_for(&user, &item, 4, 1)).await.unwrap();

    let overdue = fx.loans.update_loan_status(loan.id, OVERDUE, None).await.unwrap();
    assert_eq!(overdue.status, LoanStatus::Overdue);
    assert_eq!(fx.stock(item.id).await, 0);

    fx.loans.update_loan_status(loan.id, RETURNED, None).await.unwrap();
    assert_eq!(fx.stock(item.id).await, 4);
}

#[tokio::test]
async fn test_return_to_override_item() {
    let fx = Fixture::memory();
    let user = fx.user("Sari", UserRole::Regular).await;
    let lent = fx.item(3).await;
    let other = fx.item(0).await;
    let loan = fx.loans.create_loan(loan_for(&user, &lent, 2, 1)).await.unwrap();

    fx.loans
        .update_loan_status(loan.id, RETURNED, Some(other.id))
        .await
        .unwrap();

    assert_eq!(fx.stock(lent.id).await, 1);
    assert_eq!(fx.stock(other.id).await, 2);
}

#[tokio::test]
async fn test_update_status_rejects_unknown_and_missing() {
    let fx = Fixture::memory();
    let user = fx.user("Sari", UserRole::Regular).await;
    let item = fx.item(3).await;
    let loan = fx.loans.create_loan(loan_for(&user, &item, 1, 1)).await.unwrap();

    let result = fx.loans.update_loan_status(loan.id, "Hilang", None).await;
    assert!(matches!(result, Err(AppError::InvalidValue(_))));

    let result = fx.loans.update_loan_status(loan.id, "", None).await;
    assert!(matches!(result, Err(AppError::InvalidValue(_))));

    let result = fx.loans.update_loan_status(9999, RETURNED, None).await;
    assert!(matches!(result, Err(AppError::NotFound(_))));

    let result = fx.loans.update_loan_status(loan.id, RETURNED, Some(9999)).await;
    assert!(matches!(result, Err(AppError::NotFound(_))));

    // Nothing was applied by the failed attempts
    assert_eq!(fx.stock(item.id).await, 2);
    let caller = CallerIdentity::new(user.id, UserRole::Regular);
    let details = fx.loans.get_loan_detail(&caller, loan.id).await.unwrap();
    assert_eq!(details.loan.status, LoanStatus::Borrowed);
}

#[tokio::test]
async fn test_insufficient_stock_leaves_stock_unchanged() {
    let fx = Fixture::memory();
    let user = fx.user("Sari", UserRole::Regular).await;
    let item = fx.item(2).await;

    let result = fx.loans.create_loan(loan_for(&user, &item, 3, 1)).await;
    assert!(matches!(result, Err(AppError::InsufficientStock(_))));
    assert_eq!(fx.stock(item.id).await, 2);
}

#[tokio::test]
async fn test_create_loan_validation() {
    let fx = Fixture::memory();
    let user = fx.user("Sari", UserRole::Regular).await;
    let item = fx.item(2).await;
    let now = Utc::now();

    let yesterday = loan_between(&user, &item, 1, now - Duration::days(1), now + Duration::days(1));
    let result = fx.loans.create_loan(yesterday).await;
    assert!(matches!(result, Err(AppError::InvalidRange(_))));

    let backwards = loan_between(&user, &item, 1, now + Duration::days(3), now + Duration::days(1));
    let result = fx.loans.create_loan(backwards).await;
    assert!(matches!(result, Err(AppError::InvalidRange(_))));

    let result = fx.loans.create_loan(loan_for(&user, &item, 0, 1)).await;
    assert!(matches!(result, Err(AppError::InvalidValue(_))));

    let result = fx.loans.create_loan(loan_for(&user, &item, -2, 1)).await;
    assert!(matches!(result, Err(AppError::InvalidValue(_))));

    let mut ghost_user = loan_for(&user, &item, 1, 1);
    ghost_user.id_user = 9999;
    assert!(matches!(fx.loans.create_loan(ghost_user).await, Err(AppError::NotFound(_))));

    let mut ghost_item = loan_for(&user, &item, 1, 1);
    ghost_item.id_item = 9999;
    assert!(matches!(fx.loans.create_loan(ghost_item).await, Err(AppError::NotFound(_))));

    assert_eq!(fx.stock(item.id).await, 2);
}

#[tokio::test]
async fn test_same_day_return_is_allowed() {
    let fx = Fixture::memory();
    let user = fx.user("Sari", UserRole::Regular).await;
    let item = fx.item(1).await;

    assert_ok!(fx.loans.create_loan(loan_for(&user, &item, 1, 0)).await);
}

#[tokio::test]
async fn test_deleted_item_cannot_be_borrowed() {
    let fx = Fixture::memory();
    let user = fx.user("Sari", UserRole::Regular).await;
    let item = fx.item(3).await;
    fx.inventory.delete(item.id).await.unwrap();

    let result = fx.loans.create_loan(loan_for(&user, &item, 1, 1)).await;
    assert!(matches!(result, Err(AppError::NotFound(_))));
}

#[tokio::test]
async fn test_delete_loan_does_not_restock() {
    let fx = Fixture::memory();
    let user = fx.user("Sari", UserRole::Regular).await;
    let item = fx.item(3).await;
    let loan = fx.loans.create_loan(loan_for(&user, &item, 2, 1)).await.unwrap();

    assert_ok!(fx.loans.delete_loan(loan.id).await);
    assert_eq!(fx.stock(item.id).await, 1);

    let admin = CallerIdentity::new(user.id, UserRole::Admin);
    assert_err!(fx.loans.get_loan_detail(&admin, loan.id).await);
    assert!(matches!(fx.loans.delete_loan(loan.id).await, Err(AppError::NotFound(_))));
    assert!(matches!(
        fx.loans.update_loan_status(loan.id, RETURNED, None).await,
        Err(AppError::NotFound(_))
    ));
}

#[tokio::test]
async fn test_concurrent_creates_never_oversell() {
    let fx = Fixture::memory();
    let user = fx.user("Sari", UserRole::Regular).await;
    let item = fx.item(5).await;

    let mut handles = Vec::new();
    for _ in 0..4 {
        let loans = fx.loans.clone();
        let request = loan_for(&user, &item, 3, 1);
        handles.push(tokio::spawn(async move { loans.create_loan(request).await }));
    }

    let mut succeeded = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) => succeeded += 1,
            Err(AppError::InsufficientStock(_)) | Err(AppError::Conflict(_)) => {}
            Err(other) => panic!("unexpected error: {other}"),
        }
    }

    assert_eq!(succeeded, 1);
    assert_eq!(fx.stock(item.id).await, 2);
}

#[tokio::test]
async fn test_list_loans_scoping() {
    let fx = Fixture::memory();
    let sari = fx.user("Sari", UserRole::Regular).await;
    let budi = fx.user("Budi", UserRole::Regular).await;
    let admin = fx.user("Admin", UserRole::Admin).await;
    let item = fx.item(10).await;

    let a = fx.loans.create_loan(loan_for(&sari, &item, 1, 1)).await.unwrap();
    let b = fx.loans.create_loan(loan_for(&budi, &item, 1, 1)).await.unwrap();
    let c = fx.loans.create_loan(loan_for(&sari, &item, 1, 1)).await.unwrap();
    fx.loans.delete_loan(c.id).await.unwrap();

    let as_sari = CallerIdentity::new(sari.id, UserRole::Regular);
    let seen = fx.loans.list_loans(&as_sari, &LoanQuery::default()).await.unwrap();
    assert_eq!(seen.iter().map(|d| d.loan.id).collect::<Vec<_>>(), vec![a.id]);
    assert_eq!(seen[0].item.item_name, "Wheelchair");
    assert_eq!(seen[0].user.user_name, "Sari");

    let as_admin = CallerIdentity::new(admin.id, UserRole::Admin);
    let seen = fx.loans.list_loans(&as_admin, &LoanQuery::default()).await.unwrap();
    assert_eq!(seen.iter().map(|d| d.loan.id).collect::<Vec<_>>(), vec![a.id, b.id]);

    // Regular users can't see other borrowers' loans one by one either
    let result = fx.loans.get_loan_detail(&as_sari, b.id).await;
    assert!(matches!(result, Err(AppError::NotFound(_))));
}

#[tokio::test]
async fn test_list_loans_search_and_pages() {
    let fx = Fixture::memory();
    let admin = fx.user("Admin", UserRole::Admin).await;
    let caller = CallerIdentity::new(admin.id, UserRole::Admin);

    let wheelchair = fx.item(10).await;
    let oximeter = fx
        .inventory
        .create(&crate::common::new_item("Pulse Oximeter", 10))
        .await
        .unwrap();

    for _ in 0..3 {
        fx.loans.create_loan(loan_for(&admin, &wheelchair, 1, 1)).await.unwrap();
    }
    fx.loans.create_loan(loan_for(&admin, &oximeter, 1, 1)).await.unwrap();

    let query = LoanQuery {
        search: Some("OXI".to_string()),
        ..Default::default()
    };
    let found = fx.loans.list_loans(&caller, &query).await.unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].item.id, oximeter.id);

    let page = LoanQuery {
        limit: Some(3),
        page: Some(2),
        search: None,
    };
    let second = fx.loans.list_loans(&caller, &page).await.unwrap();
    assert_eq!(second.len(), 1);

    let bad = LoanQuery {
        page: Some(0),
        ..Default::default()
    };
    assert!(matches!(
        fx.loans.list_loans(&caller, &bad).await,
        Err(AppError::InvalidValue(_))
    ));
}

#[tokio::test]
async fn test_full_stock_scenario() {
    let fx = Fixture::memory();
    let user = fx.user("Sari", UserRole::Regular).await;
    let item = fx.item(10).await;

    let first = fx.loans.create_loan(loan_for(&user, &item, 10, 2)).await.unwrap();
    assert_eq!(fx.stock(item.id).await, 0);

    let result = fx.loans.create_loan(loan_for(&user, &item, 1, 2)).await;
    assert!(matches!(result, Err(AppError::InsufficientStock(_))));

    fx.loans.update_loan_status(first.id, RETURNED, None).await.unwrap();
    assert_eq!(fx.stock(item.id).await, 10);
}

#[tokio::test]
async fn test_item_edit_keeps_lent_stock() {
    let fx = Fixture::memory();
    let user = fx.user("Sari", UserRole::Regular).await;
    let item = fx.item(10).await;

    let loan = fx.loans.create_loan(loan_for(&user, &item, 3, 1)).await.unwrap();
    assert_eq!(fx.stock(item.id).await, 7);

    // An edit made from a stale view of the item leaves stock alone
    let edit = UpdateInventoryItem {
        location: Some("Ward C".to_string()),
        ..Default::default()
    };
    let edited = fx.inventory.update(item.id, &edit).await.unwrap();
    assert_eq!(edited.location, "Ward C");
    assert_eq!(edited.quantity, 7);

    fx.loans.update_loan_status(loan.id, RETURNED, None).await.unwrap();
    assert_eq!(fx.stock(item.id).await, 10);
}
