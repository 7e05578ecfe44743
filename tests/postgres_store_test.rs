//! PostgreSQLアダプターの統合テスト
//!
//! 実際のデータベースが必要なため既定では実行しない。
//! `DATABASE_URL=... cargo test -- --ignored` で実行する。

use chrono::{Duration, Utc};
use library_circulation::adapters::memory::LoggingNotificationService;
use library_circulation::adapters::postgres::{PostgresLibrary, postgres_dependencies};
use library_circulation::application::{
    ServiceDependencies, borrow_book, fines_for_member, list_borrowings, renew_borrowing,
    reserve_book, return_book,
};
use library_circulation::domain::*;
use library_circulation::ports::{
    BorrowingFilter, BorrowingSortField, ChangeSet, PageRequest, UnitOfWork,
};
use serial_test::serial;
use sqlx::PgPool;
use std::sync::Arc;

mod common;

struct PgFixture {
    pool: PgPool,
    store: Arc<PostgresLibrary>,
    deps: ServiceDependencies,
    staff: Staff,
    member: Member,
    book: Book,
}

/// テストデータをクリーンアップ
async fn cleanup(fx: &PgFixture, members: &[MemberId]) {
    let member_ids: Vec<uuid::Uuid> = members.iter().map(|m| m.value()).collect();
    for table in ["fines", "reservations", "borrowings", "members"] {
        sqlx::query(&format!("DELETE FROM {} WHERE member_id = ANY($1)", table))
            .bind(&member_ids)
            .execute(&fx.pool)
            .await
            .expect("Failed to cleanup test data");
    }
    sqlx::query("DELETE FROM books WHERE book_id = $1")
        .bind(fx.book.book_id.value())
        .execute(&fx.pool)
        .await
        .expect("Failed to cleanup test book");
    sqlx::query("DELETE FROM staff WHERE staff_id = $1")
        .bind(fx.staff.staff_id.value())
        .execute(&fx.pool)
        .await
        .expect("Failed to cleanup test staff");
}

async fn setup() -> PgFixture {
    let pool = common::create_test_pool().await;

    let store = Arc::new(PostgresLibrary::new(pool.clone()));
    let deps = postgres_dependencies(store.clone(), Arc::new(LoggingNotificationService::new()));

    let staff = Staff {
        staff_id: StaffId::new(),
        name: "Circulation Desk".to_string(),
        role: "librarian".to_string(),
    };
    let member = Member::new(MemberId::new(), "Aiko", Utc::now() + Duration::days(365));
    let book = Book {
        book_id: BookId::new(),
        title: "Refactoring".to_string(),
        author: "Martin Fowler".to_string(),
        isbn: Some("9780134757599".to_string()),
        copies: vec![BookCopy::new(CopyId::new("C1")), BookCopy::new(CopyId::new("C2"))],
    };
    store.save_staff(&staff).await.unwrap();
    store.save_member(&member).await.unwrap();
    store.save_book(&book).await.unwrap();

    PgFixture {
        pool,
        store,
        deps,
        staff,
        member,
        book,
    }
}

fn borrow_cmd(fx: &PgFixture, copy: &str, at: chrono::DateTime<Utc>) -> BorrowBook {
    BorrowBook {
        member_id: fx.member.member_id,
        book_id: fx.book.book_id,
        copy_id: CopyId::new(copy),
        staff_id: fx.staff.staff_id,
        borrowed_at: at,
        due_date: None,
    }
}

#[tokio::test]
#[ignore]
#[serial]
async fn test_documents_round_trip_through_store() {
    let fx = setup().await;

    let member = fx.deps.members.find_by_id(fx.member.member_id).await.unwrap();
    assert_eq!(member, Some(fx.member.clone()));
    let book = fx.deps.books.find_by_id(fx.book.book_id).await.unwrap();
    assert_eq!(book, Some(fx.book.clone()));
    let staff = fx.deps.staff.find_by_id(fx.staff.staff_id).await.unwrap();
    assert_eq!(staff, Some(fx.staff.clone()));

    cleanup(&fx, &[fx.member.member_id]).await;
}

#[tokio::test]
#[ignore]
#[serial]
async fn test_late_return_is_committed_atomically() {
    let fx = setup().await;
    let borrowed_at = Utc::now() - Duration::days(40);

    let borrowing = borrow_book(&fx.deps, borrow_cmd(&fx, "C1", borrowed_at))
        .await
        .unwrap();
    assert_eq!(
        fx.deps.borrowings.last_id().await.unwrap(),
        Some(borrowing.borrowing_id.clone())
    );

    let renewed = renew_borrowing(
        &fx.deps,
        RenewBorrowing {
            borrowing_id: borrowing.borrowing_id.clone(),
            renewed_at: borrowed_at + Duration::days(7),
            due_date: None,
        },
    )
    .await
    .unwrap();
    assert_eq!(renewed.due_date, borrowed_at + Duration::days(28));

    let receipt = return_book(
        &fx.deps,
        ReturnBook {
            borrowing_id: borrowing.borrowing_id.clone(),
            staff_id: fx.staff.staff_id,
            returned_at: renewed.due_date + Duration::days(5),
            condition: None,
            manual_fine: None,
        },
    )
    .await
    .unwrap();
    assert_eq!(receipt.fine.as_ref().map(|f| f.amount), Some(Money::new(25000)));

    let fines = fines_for_member(&fx.deps, fx.member.member_id).await.unwrap();
    assert_eq!(fines.len(), 1);
    assert_eq!(fines[0].amount, Money::new(25000));

    let member = fx
        .deps
        .members
        .find_by_id(fx.member.member_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(member.fines.unpaid, Money::new(25000));
    assert!(member.current_borrowings.is_empty());

    let stored = fx
        .deps
        .borrowings
        .find_by_id(&borrowing.borrowing_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored.status, BorrowingStatus::Returned);

    cleanup(&fx, &[fx.member.member_id]).await;
}

#[tokio::test]
#[ignore]
#[serial]
async fn test_find_page_filters_and_sorts_in_sql() {
    let fx = setup().await;
    let now = Utc::now();

    borrow_book(&fx.deps, borrow_cmd(&fx, "C1", now))
        .await
        .unwrap();
    borrow_book(&fx.deps, borrow_cmd(&fx, "C2", now + Duration::minutes(1)))
        .await
        .unwrap();

    let filter = BorrowingFilter {
        member_id: Some(fx.member.member_id),
        status: Some(BorrowingStatus::Borrowed),
        ..Default::default()
    };
    let request = PageRequest::<BorrowingSortField>::new(Some(1), Some(1), None).unwrap();
    let page = list_borrowings(&fx.deps, &filter, &request).await.unwrap();

    assert_eq!(page.total, 2);
    assert_eq!(page.total_pages, 2);
    assert_eq!(page.items.len(), 1);
    assert_eq!(page.items[0].copy.copy_id, CopyId::new("C2"));

    let overdue = BorrowingFilter {
        member_id: Some(fx.member.member_id),
        due_before: Some(now),
        ..Default::default()
    };
    let page = list_borrowings(&fx.deps, &overdue, &PageRequest::default())
        .await
        .unwrap();
    assert_eq!(page.total, 0);

    cleanup(&fx, &[fx.member.member_id]).await;
}

#[tokio::test]
#[ignore]
#[serial]
async fn test_open_reservation_queries() {
    let fx = setup().await;
    let now = Utc::now();

    // 両方のコピーを貸し出してから、別の会員が予約する
    borrow_book(&fx.deps, borrow_cmd(&fx, "C1", now))
        .await
        .unwrap();
    borrow_book(&fx.deps, borrow_cmd(&fx, "C2", now))
        .await
        .unwrap();
    let reserver = Member::new(MemberId::new(), "Kenji", now + Duration::days(30));
    fx.store.save_member(&reserver).await.unwrap();

    let reservation = reserve_book(
        &fx.deps,
        ReserveBook {
            member_id: reserver.member_id,
            book_id: fx.book.book_id,
            reserved_at: now - Duration::days(8),
        },
    )
    .await
    .unwrap();

    assert!(fx.deps.reservations.has_waiting(fx.book.book_id).await.unwrap());
    let open = fx
        .deps
        .reservations
        .find_open(reserver.member_id, fx.book.book_id)
        .await
        .unwrap();
    assert_eq!(open, vec![reservation.clone()]);

    let expired = fx.deps.reservations.find_expired_waiting(now).await.unwrap();
    assert!(
        expired
            .iter()
            .any(|r| r.reservation_id == reservation.reservation_id)
    );

    cleanup(&fx, &[fx.member.member_id, reserver.member_id]).await;
}

#[tokio::test]
#[ignore]
#[serial]
async fn test_stale_documents_are_rejected_by_commit() {
    let fx = setup().await;

    // 読み込み後に別の操作が書籍を更新した
    let mut lent = fx.book.clone();
    lent.copies[0].status = CopyStatus::Borrowed;
    fx.store
        .commit(ChangeSet::new().update_book(&fx.book, lent.clone()))
        .await
        .unwrap();

    let mut stale = fx.book.clone();
    stale.copies[1].status = CopyStatus::Borrowed;
    let err = fx
        .store
        .commit(ChangeSet::new().update_book(&fx.book, stale))
        .await
        .unwrap_err();
    assert!(err.is_conflict());
    let stored = fx.deps.books.find_by_id(fx.book.book_id).await.unwrap();
    assert_eq!(stored, Some(lent));

    // 同じ貸出IDの2回目のINSERTは一意制約で競合になる
    let borrowing = borrow_book(&fx.deps, borrow_cmd(&fx, "C2", Utc::now()))
        .await
        .unwrap();
    let err = fx
        .store
        .commit(ChangeSet::new().insert_borrowing(borrowing.clone()))
        .await
        .unwrap_err();
    assert!(err.is_conflict());

    cleanup(&fx, &[fx.member.member_id]).await;
}
