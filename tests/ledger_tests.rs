//! PostgreSQL loan ledger tests.
//!
//! Each test gets a fresh migrated database from `#[sqlx::test]`, which
//! needs DATABASE_URL. Run with: cargo test -- --ignored

use chrono::{Duration, NaiveDate};
use sqlx::PgPool;

use mediatheque_server::{
    error::AppError,
    lending::LendingError,
    models::{
        catalog::{CreateCatalogItem, ItemDetails},
        member::CreateMember,
    },
    repository::{LoanLedger, NewLoan, Repository},
};

fn day(d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 10, d).unwrap()
}

async fn member(repository: &Repository, name: &str) -> i32 {
    repository
        .members
        .create(
            &CreateMember {
                family_name: name.to_string(),
                given_name: "Test".to_string(),
                email: format!("{}@test.com", name),
            },
            day(1),
        )
        .await
        .unwrap()
        .id
}

async fn item(repository: &Repository, copies: i32, details: ItemDetails) -> i32 {
    repository
        .items
        .create(
            &CreateCatalogItem {
                title: "Atlas".to_string(),
                creator: String::new(),
                total_copies: copies,
                details,
            },
            day(1),
        )
        .await
        .unwrap()
        .id
}

fn loan(member_id: i32, item_id: i32, checkout: NaiveDate) -> NewLoan {
    NewLoan {
        member_id,
        item_id,
        checkout_date: checkout,
        due_date: checkout + Duration::days(7),
    }
}

fn rejection<T: std::fmt::Debug>(result: Result<T, AppError>) -> LendingError {
    match result {
        Err(AppError::Lending(e)) => e,
        other => panic!("expected a lending rejection, got {:?}", other),
    }
}

#[sqlx::test]
#[ignore]
async fn test_checkout_tracks_availability(pool: PgPool) {
    let repository = Repository::new(pool, 3);
    let first = member(&repository, "first").await;
    let second = member(&repository, "second").await;
    let third = member(&repository, "third").await;
    let atlas = item(&repository, 2, ItemDetails::Book).await;

    assert_eq!(repository.loans.item_availability(atlas).await.unwrap().available_copies(), 2);

    repository.loans.checkout(loan(first, atlas, day(2))).await.unwrap();
    repository.loans.checkout(loan(second, atlas, day(2))).await.unwrap();
    assert_eq!(repository.loans.item_availability(atlas).await.unwrap().available_copies(), 0);

    let refused = repository.loans.checkout(loan(third, atlas, day(2))).await;
    assert_eq!(rejection(refused), LendingError::ItemUnavailable);
    assert_eq!(repository.loans.item_availability(atlas).await.unwrap().open_loans, 2);
}

#[sqlx::test]
#[ignore]
async fn test_cap_and_overdue_in_the_database(pool: PgPool) {
    let repository = Repository::new(pool, 3);
    let reader = member(&repository, "reader").await;
    let mut items = Vec::new();
    for _ in 0..4 {
        items.push(item(&repository, 1, ItemDetails::Book).await);
    }

    for item_id in &items[..3] {
        repository.loans.checkout(loan(reader, *item_id, day(1))).await.unwrap();
    }
    let refused = repository.loans.checkout(loan(reader, items[3], day(2))).await;
    assert_eq!(rejection(refused), LendingError::CapExceeded);

    // Loans were due on the 8th
    let standing = repository.loans.member_standing(reader, day(9)).await.unwrap();
    assert_eq!(standing.open_loans, 3);
    assert_eq!(standing.overdue_loans, 3);

    let refused = repository.loans.checkout(loan(reader, items[3], day(9))).await;
    assert_eq!(rejection(refused), LendingError::MemberOverdue);
}

#[sqlx::test]
#[ignore]
async fn test_return_once(pool: PgPool) {
    let repository = Repository::new(pool, 3);
    let reader = member(&repository, "reader").await;
    let book = item(&repository, 1, ItemDetails::Book).await;

    let created = repository.loans.checkout(loan(reader, book, day(3))).await.unwrap();

    let refused = repository.loans.mark_returned(created.id, day(2)).await;
    assert_eq!(rejection(refused), LendingError::InvalidReturnDate);

    let returned = repository.loans.mark_returned(created.id, day(5)).await.unwrap();
    assert_eq!(returned.return_date, Some(day(5)));

    let again = repository.loans.mark_returned(created.id, day(6)).await;
    assert_eq!(rejection(again), LendingError::AlreadyReturned);

    let details = repository.loans.get_details(created.id, day(20)).await.unwrap();
    assert_eq!(details.return_date, Some(day(5)));
    assert!(!details.is_overdue);
}

#[sqlx::test]
#[ignore]
async fn test_loan_due_yesterday_is_stored_and_overdue(pool: PgPool) {
    let repository = Repository::new(pool, 3);
    let reader = member(&repository, "late").await;
    let book = item(&repository, 1, ItemDetails::Book).await;
    let other = item(&repository, 1, ItemDetails::Book).await;

    let late = NewLoan { member_id: reader, item_id: book, checkout_date: day(5), due_date: day(4) };
    let created = repository.loans.checkout(late).await.unwrap();
    assert_eq!(created.due_date, day(4));

    let details = repository.loans.get_details(created.id, day(5)).await.unwrap();
    assert!(details.is_overdue);
    let refused = repository.loans.checkout(loan(reader, other, day(5))).await;
    assert_eq!(rejection(refused), LendingError::MemberOverdue);

    repository.loans.mark_returned(created.id, day(5)).await.unwrap();
    let details = repository.loans.get_details(created.id, day(5)).await.unwrap();
    assert!(!details.is_overdue);
}

#[sqlx::test]
#[ignore]
async fn test_board_game_is_never_lent(pool: PgPool) {
    let repository = Repository::new(pool, 3);
    let reader = member(&repository, "reader").await;
    let game = item(
        &repository,
        2,
        ItemDetails::BoardGame { publisher: "Kosmos".to_string(), min_players: 3, max_players: 4 },
    )
    .await;

    let refused = repository.loans.checkout(loan(reader, game, day(2))).await;
    assert_eq!(rejection(refused), LendingError::ItemUnavailable);
}

#[sqlx::test]
#[ignore]
async fn test_concurrent_checkouts_do_not_overbook(pool: PgPool) {
    let repository = Repository::new(pool, 5);
    let single = item(&repository, 1, ItemDetails::Book).await;
    let mut members = Vec::new();
    for i in 0..6 {
        members.push(member(&repository, &format!("racer{}", i)).await);
    }

    let attempts = members.into_iter().map(|member_id| {
        let repository = repository.clone();
        tokio::spawn(async move { repository.loans.checkout(loan(member_id, single, day(2))).await })
    });

    let mut granted = 0;
    for handle in attempts.collect::<Vec<_>>() {
        match handle.await.unwrap() {
            Ok(_) => granted += 1,
            Err(AppError::Lending(LendingError::ItemUnavailable)) | Err(AppError::Conflict(_)) => {}
            Err(e) => panic!("unexpected error: {:?}", e),
        }
    }

    assert_eq!(granted, 1);
    assert_eq!(repository.loans.item_availability(single).await.unwrap().open_loans, 1);
}

#[sqlx::test]
#[ignore]
async fn test_item_with_open_loans_cannot_be_deleted(pool: PgPool) {
    let repository = Repository::new(pool, 3);
    let reader = member(&repository, "reader").await;
    let book = item(&repository, 1, ItemDetails::Book).await;
    let created = repository.loans.checkout(loan(reader, book, day(2))).await.unwrap();

    assert!(matches!(repository.items.delete(book).await, Err(AppError::BusinessRule(_))));
    assert!(matches!(repository.members.delete(reader).await, Err(AppError::BusinessRule(_))));

    repository.loans.mark_returned(created.id, day(4)).await.unwrap();
    repository.items.delete(book).await.unwrap();
    repository.members.delete(reader).await.unwrap();
}

#[sqlx::test]
#[ignore]
async fn test_duplicate_email_is_a_conflict(pool: PgPool) {
    let repository = Repository::new(pool, 3);
    member(&repository, "twin").await;

    let duplicate = CreateMember {
        family_name: "Other".to_string(),
        given_name: "Test".to_string(),
        email: "TWIN@test.com".to_string(),
    };
    assert!(matches!(repository.members.create(&duplicate, day(1)).await, Err(AppError::Conflict(_))));
}
