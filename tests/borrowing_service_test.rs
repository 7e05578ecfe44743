use chrono::{Duration, Utc};
use library_circulation::application::{
    CirculationError, ErrorKind, borrow_book, fines_for_member, get_borrowing, list_borrowings,
    renew_borrowing, reserve_book, return_book,
};
use library_circulation::adapters::memory::InMemoryLibrary;
use library_circulation::domain::*;
use library_circulation::ports::{
    BorrowingFilter, BorrowingSortField, ChangeSet, CommitError, PageRequest, UnitOfWork,
};
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};

mod common;
use common::Fixture;

/// コミット直前に他のタスクへ実行を譲る
///
/// 2つの操作の読み込みがどちらもコミットより先に行われる状況を作る。
struct YieldingUnitOfWork {
    library: Arc<InMemoryLibrary>,
}

#[async_trait::async_trait]
impl UnitOfWork for YieldingUnitOfWork {
    async fn commit(&self, changes: ChangeSet) -> Result<(), CommitError> {
        tokio::task::yield_now().await;
        self.library.commit(changes).await
    }
}

/// 常に競合を返す
struct AlwaysConflicting {
    attempts: AtomicU32,
}

#[async_trait::async_trait]
impl UnitOfWork for AlwaysConflicting {
    async fn commit(&self, _changes: ChangeSet) -> Result<(), CommitError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        Err(CommitError::Conflict {
            kind: "Book",
            id: "contended".to_string(),
        })
    }
}

fn renew_cmd(borrowing_id: &BorrowingId, at: chrono::DateTime<Utc>) -> RenewBorrowing {
    RenewBorrowing {
        borrowing_id: borrowing_id.clone(),
        renewed_at: at,
        due_date: None,
    }
}

// ============================================================================
// 貸出
// ============================================================================

#[tokio::test]
async fn test_borrow_book_success() {
    // Arrange
    let fx = Fixture::new();
    let member = fx.add_member("Aiko");
    let book = fx.add_book("Designing Data-Intensive Applications", 2);
    let now = Utc::now();

    // Act
    let borrowing = borrow_book(&fx.deps, fx.borrow_cmd(&member, &book, "C1", now))
        .await
        .unwrap();

    // Assert: 貸出記録
    assert_eq!(borrowing.borrowing_id.to_string(), "BR000001");
    assert_eq!(borrowing.status, BorrowingStatus::Borrowed);
    assert_eq!(borrowing.due_date, now + Duration::days(14));
    assert_eq!(borrowing.member.name, "Aiko");
    assert_eq!(borrowing.copy.book.title, book.title);
    assert_eq!(borrowing.issued_by.staff_id, fx.staff.staff_id);

    // コピーが貸出中になったことを確認
    let stored_book = fx.deps.books.find_by_id(book.book_id).await.unwrap().unwrap();
    assert_eq!(
        stored_book.copy(&CopyId::new("C1")).unwrap().status,
        CopyStatus::Borrowed
    );
    assert_eq!(stored_book.available_copies(), 1);

    // 会員の貸出中リストと統計が更新されたことを確認
    let stored_member = fx
        .deps
        .members
        .find_by_id(member.member_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored_member.current_borrowings.len(), 1);
    assert_eq!(
        stored_member.current_borrowings[0].borrowing_id,
        borrowing.borrowing_id
    );
    assert_eq!(stored_member.stats.total_borrowings, 1);
}

#[tokio::test]
async fn test_borrowing_ids_are_sequential() {
    let fx = Fixture::new();
    let member = fx.add_member("Aiko");
    let book = fx.add_book("Clean Architecture", 2);
    let now = Utc::now();

    let first = borrow_book(&fx.deps, fx.borrow_cmd(&member, &book, "C1", now))
        .await
        .unwrap();
    let second = borrow_book(&fx.deps, fx.borrow_cmd(&member, &book, "C2", now))
        .await
        .unwrap();

    assert_eq!(first.borrowing_id.to_string(), "BR000001");
    assert_eq!(second.borrowing_id.to_string(), "BR000002");
}

#[tokio::test]
async fn test_borrow_book_limit_reached() {
    // Arrange: 既に5冊借りている会員
    let fx = Fixture::new();
    let member = fx.add_member("Kenji");
    let now = Utc::now();

    for n in 0..5 {
        let book = fx.add_book(&format!("Volume {}", n + 1), 1);
        borrow_book(&fx.deps, fx.borrow_cmd(&member, &book, "C1", now))
            .await
            .unwrap();
    }

    // Act: 6冊目
    let sixth = fx.add_book("Volume 6", 1);
    let result = borrow_book(&fx.deps, fx.borrow_cmd(&member, &sixth, "C1", now)).await;

    // Assert
    let err = result.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidState);
    assert!(matches!(
        err,
        CirculationError::Borrow(BorrowError::BorrowingLimitReached)
    ));

    // 6冊目のコピーは貸出可能のまま
    let stored = fx.deps.books.find_by_id(sixth.book_id).await.unwrap().unwrap();
    assert!(stored.has_available_copy());
}

#[tokio::test]
async fn test_borrow_book_copy_not_available() {
    let fx = Fixture::new();
    let first = fx.add_member("Aiko");
    let second = fx.add_member("Kenji");
    let book = fx.add_book("Working Effectively with Legacy Code", 1);
    let now = Utc::now();

    borrow_book(&fx.deps, fx.borrow_cmd(&first, &book, "C1", now))
        .await
        .unwrap();
    let result = borrow_book(&fx.deps, fx.borrow_cmd(&second, &book, "C1", now)).await;

    let err = result.unwrap_err();
    assert!(err.is_invalid_state());
    assert!(matches!(
        err,
        CirculationError::Borrow(BorrowError::CopyNotAvailable {
            status: CopyStatus::Borrowed,
            ..
        })
    ));
}

#[tokio::test]
async fn test_borrow_book_not_found_cases() {
    let fx = Fixture::new();
    let member = fx.add_member("Aiko");
    let book = fx.add_book("Release It!", 1);
    let now = Utc::now();

    // 存在しない会員
    let stranger = Member::new(MemberId::new(), "Nobody", now + Duration::days(10));
    let err = borrow_book(&fx.deps, fx.borrow_cmd(&stranger, &book, "C1", now))
        .await
        .unwrap_err();
    assert!(matches!(err, CirculationError::MemberNotFound(_)));

    // 存在しないコピー
    let err = borrow_book(&fx.deps, fx.borrow_cmd(&member, &book, "C9", now))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);

    // 存在しない職員
    let mut cmd = fx.borrow_cmd(&member, &book, "C1", now);
    cmd.staff_id = StaffId::new();
    let err = borrow_book(&fx.deps, cmd).await.unwrap_err();
    assert!(matches!(err, CirculationError::StaffNotFound(_)));
}

#[tokio::test]
async fn test_borrow_book_rejects_past_due_date() {
    let fx = Fixture::new();
    let member = fx.add_member("Aiko");
    let book = fx.add_book("Release It!", 1);
    let now = Utc::now();

    let mut cmd = fx.borrow_cmd(&member, &book, "C1", now);
    cmd.due_date = Some(now - Duration::days(1));

    let err = borrow_book(&fx.deps, cmd).await.unwrap_err();
    assert!(matches!(
        err,
        CirculationError::Borrow(BorrowError::InvalidDueDate)
    ));
}

// ============================================================================
// 返却
// ============================================================================

#[tokio::test]
async fn test_return_book_three_days_late_charges_fine() {
    // Arrange
    let fx = Fixture::new();
    let member = fx.add_member("Aiko");
    let book = fx.add_book("Refactoring", 1);
    let borrowed_at = Utc::now() - Duration::days(17);
    let borrowing = borrow_book(&fx.deps, fx.borrow_cmd(&member, &book, "C1", borrowed_at))
        .await
        .unwrap();

    // Act: 返却期限の3日後に返却
    let returned_at = borrowing.due_date + Duration::days(3);
    let receipt = return_book(&fx.deps, fx.return_cmd(&borrowing.borrowing_id, returned_at))
        .await
        .unwrap();

    // Assert: 3日 × 5000
    assert_eq!(receipt.days_late, 3);
    assert_eq!(receipt.borrowing.status, BorrowingStatus::Returned);
    assert_eq!(receipt.borrowing.return_date, Some(returned_at));
    assert_eq!(receipt.borrowing.fine.amount, Money::new(15000));
    assert_eq!(receipt.borrowing.fine.status, FineStatus::Unpaid);

    let fine = receipt.fine.expect("fine should be recorded");
    assert_eq!(fine.amount, Money::new(15000));
    assert_eq!(fine.member_id, member.member_id);
    assert_eq!(fine.borrowing_id, borrowing.borrowing_id);

    // 会員の延滞金と延滞回数
    let stored = fx
        .deps
        .members
        .find_by_id(member.member_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored.fines.unpaid, Money::new(15000));
    assert_eq!(stored.fines.total, Money::new(15000));
    assert_eq!(stored.stats.overdue_returns, 1);
    assert!(stored.current_borrowings.is_empty());
}

#[tokio::test]
async fn test_return_book_on_time_has_no_fine() {
    let fx = Fixture::new();
    let member = fx.add_member("Aiko");
    let book = fx.add_book("Refactoring", 1);
    let now = Utc::now();
    let borrowing = borrow_book(&fx.deps, fx.borrow_cmd(&member, &book, "C1", now))
        .await
        .unwrap();

    let receipt = return_book(
        &fx.deps,
        fx.return_cmd(&borrowing.borrowing_id, now + Duration::days(3)),
    )
    .await
    .unwrap();

    assert_eq!(receipt.days_late, 0);
    assert!(receipt.fine.is_none());
    assert_eq!(receipt.borrowing.fine.status, FineStatus::NotCharged);
    assert!(
        fines_for_member(&fx.deps, member.member_id)
            .await
            .unwrap()
            .is_empty()
    );

    let stored = fx.deps.books.find_by_id(book.book_id).await.unwrap().unwrap();
    assert!(stored.has_available_copy());
}

#[tokio::test]
async fn test_return_book_twice_fails() {
    let fx = Fixture::new();
    let member = fx.add_member("Aiko");
    let book = fx.add_book("Refactoring", 1);
    let now = Utc::now();
    let borrowing = borrow_book(&fx.deps, fx.borrow_cmd(&member, &book, "C1", now))
        .await
        .unwrap();

    return_book(&fx.deps, fx.return_cmd(&borrowing.borrowing_id, now))
        .await
        .unwrap();
    let err = return_book(&fx.deps, fx.return_cmd(&borrowing.borrowing_id, now))
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::InvalidState);
    assert!(matches!(
        err,
        CirculationError::Return(ReturnError::AlreadyReturned)
    ));
}

#[tokio::test]
async fn test_return_damaged_copy_goes_to_maintenance_with_manual_fine() {
    let fx = Fixture::new();
    let member = fx.add_member("Aiko");
    let book = fx.add_book("Refactoring", 1);
    let now = Utc::now();
    let borrowing = borrow_book(&fx.deps, fx.borrow_cmd(&member, &book, "C1", now))
        .await
        .unwrap();

    let mut cmd = fx.return_cmd(&borrowing.borrowing_id, now + Duration::days(1));
    cmd.condition = Some(CopyCondition::Damaged);
    cmd.manual_fine = Some(ManualFine {
        amount: Money::new(20000),
        reason: "Water damage".to_string(),
    });
    let receipt = return_book(&fx.deps, cmd).await.unwrap();

    assert_eq!(receipt.borrowing.return_condition, Some(CopyCondition::Damaged));
    assert_eq!(receipt.fine.unwrap().amount, Money::new(20000));

    let stored = fx.deps.books.find_by_id(book.book_id).await.unwrap().unwrap();
    let copy = stored.copy(&CopyId::new("C1")).unwrap();
    assert_eq!(copy.status, CopyStatus::Maintenance);
    assert_eq!(copy.condition, CopyCondition::Damaged);
}

#[tokio::test]
async fn test_return_unknown_borrowing_is_not_found() {
    let fx = Fixture::new();
    let id: BorrowingId = "BR000042".parse().unwrap();

    let err = return_book(&fx.deps, fx.return_cmd(&id, Utc::now()))
        .await
        .unwrap_err();

    assert!(err.is_not_found());
    assert_eq!(err.to_string(), "Borrowing BR000042 not found");
}

// ============================================================================
// 更新
// ============================================================================

#[tokio::test]
async fn test_renew_twice_then_limit_reached() {
    let fx = Fixture::new();
    let member = fx.add_member("Aiko");
    let book = fx.add_book("Refactoring", 1);
    let now = Utc::now();
    let borrowing = borrow_book(&fx.deps, fx.borrow_cmd(&member, &book, "C1", now))
        .await
        .unwrap();

    let first = renew_borrowing(&fx.deps, renew_cmd(&borrowing.borrowing_id, now))
        .await
        .unwrap();
    assert_eq!(first.renewal_count.value(), 1);
    assert_eq!(first.due_date, now + Duration::days(28));

    let second = renew_borrowing(&fx.deps, renew_cmd(&borrowing.borrowing_id, now))
        .await
        .unwrap();
    assert_eq!(second.renewal_count.value(), 2);
    assert_eq!(second.due_date, now + Duration::days(42));

    let err = renew_borrowing(&fx.deps, renew_cmd(&borrowing.borrowing_id, now))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidState);
    assert!(matches!(
        err,
        CirculationError::Renew(RenewError::RenewalLimitReached)
    ));

    // 会員の貸出中リストの返却期限も更新されている
    let stored = fx
        .deps
        .members
        .find_by_id(member.member_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored.current_borrowings[0].due_date, second.due_date);
}

#[tokio::test]
async fn test_renew_blocked_by_waiting_reservation() {
    // Arrange: 唯一のコピーを貸出中に、別の会員が予約
    let fx = Fixture::new();
    let borrower = fx.add_member("Aiko");
    let waiting = fx.add_member("Kenji");
    let book = fx.add_book("Refactoring", 1);
    let now = Utc::now();
    let borrowing = borrow_book(&fx.deps, fx.borrow_cmd(&borrower, &book, "C1", now))
        .await
        .unwrap();
    reserve_book(
        &fx.deps,
        ReserveBook {
            member_id: waiting.member_id,
            book_id: book.book_id,
            reserved_at: now,
        },
    )
    .await
    .unwrap();

    // Act
    let err = renew_borrowing(&fx.deps, renew_cmd(&borrowing.borrowing_id, now))
        .await
        .unwrap_err();

    // Assert
    assert!(matches!(
        err,
        CirculationError::Renew(RenewError::ReservedByAnotherMember)
    ));
}

#[tokio::test]
async fn test_renew_returned_borrowing_fails() {
    let fx = Fixture::new();
    let member = fx.add_member("Aiko");
    let book = fx.add_book("Refactoring", 1);
    let now = Utc::now();
    let borrowing = borrow_book(&fx.deps, fx.borrow_cmd(&member, &book, "C1", now))
        .await
        .unwrap();
    return_book(&fx.deps, fx.return_cmd(&borrowing.borrowing_id, now))
        .await
        .unwrap();

    let err = renew_borrowing(&fx.deps, renew_cmd(&borrowing.borrowing_id, now))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        CirculationError::Renew(RenewError::AlreadyReturned)
    ));
}

// ============================================================================
// 一連の流れ
// ============================================================================

#[tokio::test]
async fn test_borrow_renew_and_return_late() {
    // 貸出（期限 +14日）
    let fx = Fixture::new();
    let member = fx.add_member("Aiko");
    let book = fx.add_book("Structure and Interpretation of Computer Programs", 1);
    let borrowed_at = Utc::now() - Duration::days(40);
    let borrowing = borrow_book(&fx.deps, fx.borrow_cmd(&member, &book, "C1", borrowed_at))
        .await
        .unwrap();
    assert_eq!(borrowing.due_date, borrowed_at + Duration::days(14));

    // 更新（期限は貸出日 +28日）
    let renewed = renew_borrowing(
        &fx.deps,
        renew_cmd(&borrowing.borrowing_id, borrowed_at + Duration::days(10)),
    )
    .await
    .unwrap();
    assert_eq!(renewed.due_date, borrowed_at + Duration::days(28));

    // 期限の5日後に返却
    let returned_at = renewed.due_date + Duration::days(5);
    let receipt = return_book(&fx.deps, fx.return_cmd(&borrowing.borrowing_id, returned_at))
        .await
        .unwrap();
    assert_eq!(receipt.days_late, 5);

    // 延滞金台帳に 25000 のレコード
    let fines = fines_for_member(&fx.deps, member.member_id).await.unwrap();
    assert_eq!(fines.len(), 1);
    assert_eq!(fines[0].amount, Money::new(25000));
    assert_eq!(fines[0].status, FineStatus::Unpaid);
    assert_eq!(fines[0].reason, "Overdue by 5 day(s)");

    // 会員の未払い残高が 25000 増えた
    let stored_member = fx
        .deps
        .members
        .find_by_id(member.member_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored_member.fines.unpaid, Money::new(25000));

    // コピーは貸出可能に戻った
    let stored_book = fx.deps.books.find_by_id(book.book_id).await.unwrap().unwrap();
    assert_eq!(
        stored_book.copy(&CopyId::new("C1")).unwrap().status,
        CopyStatus::Available
    );

    // 記録は返却済み
    let stored = get_borrowing(&fx.deps, &borrowing.borrowing_id).await.unwrap();
    assert_eq!(stored.status, BorrowingStatus::Returned);
    assert_eq!(stored.renewal_count.value(), 1);
}

#[tokio::test]
async fn test_unpaid_fine_blocks_next_borrowing() {
    let fx = Fixture::new();
    let member = fx.add_member("Aiko");
    let book = fx.add_book("Refactoring", 1);
    let borrowed_at = Utc::now() - Duration::days(20);
    let borrowing = borrow_book(&fx.deps, fx.borrow_cmd(&member, &book, "C1", borrowed_at))
        .await
        .unwrap();
    return_book(&fx.deps, fx.return_cmd(&borrowing.borrowing_id, Utc::now()))
        .await
        .unwrap();

    let err = borrow_book(&fx.deps, fx.borrow_cmd(&member, &book, "C1", Utc::now()))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        CirculationError::Borrow(BorrowError::UnpaidFines(_))
    ));
}

#[tokio::test]
async fn test_borrowing_claims_own_waiting_reservation() {
    // Arrange: 唯一のコピーが貸出中の間に予約し、返却後に借りる
    let fx = Fixture::new();
    let holder = fx.add_member("Aiko");
    let reserver = fx.add_member("Kenji");
    let book = fx.add_book("Refactoring", 1);
    let now = Utc::now();

    let first = borrow_book(&fx.deps, fx.borrow_cmd(&holder, &book, "C1", now))
        .await
        .unwrap();
    let reservation = reserve_book(
        &fx.deps,
        ReserveBook {
            member_id: reserver.member_id,
            book_id: book.book_id,
            reserved_at: now,
        },
    )
    .await
    .unwrap();
    return_book(&fx.deps, fx.return_cmd(&first.borrowing_id, now))
        .await
        .unwrap();

    // Act
    let second = borrow_book(&fx.deps, fx.borrow_cmd(&reserver, &book, "C1", now))
        .await
        .unwrap();

    // Assert: 予約が受取済みになり、メモが追記されている
    let stored = fx
        .deps
        .reservations
        .find_by_id(reservation.reservation_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored.status, ReservationStatus::Claimed);
    assert_eq!(
        stored.notes.last().map(|n| n.text.clone()),
        Some(format!("Claimed by borrowing {}", second.borrowing_id))
    );
}

// ============================================================================
// 一覧
// ============================================================================

#[tokio::test]
async fn test_list_borrowings_filters_and_paginates() {
    let fx = Fixture::new();
    let aiko = fx.add_member("Aiko");
    let kenji = fx.add_member("Kenji");
    let book = fx.add_book("Refactoring", 4);
    let now = Utc::now();

    for (n, copy) in ["C1", "C2", "C3"].into_iter().enumerate() {
        let at = now + Duration::minutes(n as i64);
        borrow_book(&fx.deps, fx.borrow_cmd(&aiko, &book, copy, at))
            .await
            .unwrap();
    }
    borrow_book(&fx.deps, fx.borrow_cmd(&kenji, &book, "C4", now))
        .await
        .unwrap();

    // 会員で絞り込み、既定（貸出日の降順）で2件ずつ
    let filter = BorrowingFilter {
        member_id: Some(aiko.member_id),
        ..Default::default()
    };
    let request = PageRequest::<BorrowingSortField>::new(Some(1), Some(2), None).unwrap();
    let page = list_borrowings(&fx.deps, &filter, &request).await.unwrap();

    assert_eq!(page.total, 3);
    assert_eq!(page.total_pages, 2);
    assert!(page.has_next);
    let copies: Vec<&str> = page.items.iter().map(|b| b.copy.copy_id.as_str()).collect();
    assert_eq!(copies, vec!["C3", "C2"]);

    // 貸出IDの昇順
    let request =
        PageRequest::<BorrowingSortField>::new(None, None, Some("borrowing_id")).unwrap();
    let page = list_borrowings(&fx.deps, &BorrowingFilter::default(), &request)
        .await
        .unwrap();
    assert_eq!(page.total, 4);
    assert_eq!(page.items[0].borrowing_id.to_string(), "BR000001");
    assert_eq!(page.items[3].borrowing_id.to_string(), "BR000004");
}

// ============================================================================
// 同時実行
// ============================================================================

#[tokio::test]
async fn test_overlapping_borrows_of_different_copies_both_succeed() {
    // Arrange: 2人の会員が同じ書籍の別々のコピーをほぼ同時に借りる
    let fx = Fixture::new();
    let aiko = fx.add_member("Aiko");
    let kenji = fx.add_member("Kenji");
    let book = fx.add_book("Database Internals", 2);
    let now = Utc::now();

    let mut deps = fx.deps.clone();
    deps.unit_of_work = Arc::new(YieldingUnitOfWork {
        library: fx.library.clone(),
    });

    // Act
    let (first, second) = tokio::join!(
        borrow_book(&deps, fx.borrow_cmd(&aiko, &book, "C1", now)),
        borrow_book(&deps, fx.borrow_cmd(&kenji, &book, "C2", now)),
    );
    let first = first.unwrap();
    let second = second.unwrap();

    // Assert: IDは重複せず、どちらの貸出記録も残っている
    assert_ne!(first.borrowing_id, second.borrowing_id);
    for borrowing in [&first, &second] {
        let stored = get_borrowing(&fx.deps, &borrowing.borrowing_id)
            .await
            .unwrap();
        assert_eq!(&stored, borrowing);
    }
    assert_eq!(first.member.member_id, aiko.member_id);
    assert_eq!(second.member.member_id, kenji.member_id);

    // 両方のコピーが貸出中のまま
    let stored_book = fx.deps.books.find_by_id(book.book_id).await.unwrap().unwrap();
    assert_eq!(stored_book.available_copies(), 0);

    // 各会員の貸出中リストは自分の貸出を指している
    for (member, borrowing) in [(&aiko, &first), (&kenji, &second)] {
        let stored = fx
            .deps
            .members
            .find_by_id(member.member_id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.current_borrowings.len(), 1);
        assert_eq!(
            stored.current_borrowings[0].borrowing_id,
            borrowing.borrowing_id
        );
    }
}

#[tokio::test]
async fn test_overlapping_borrows_of_same_copy_lend_it_once() {
    let fx = Fixture::new();
    let aiko = fx.add_member("Aiko");
    let kenji = fx.add_member("Kenji");
    let book = fx.add_book("Database Internals", 1);
    let now = Utc::now();

    let mut deps = fx.deps.clone();
    deps.unit_of_work = Arc::new(YieldingUnitOfWork {
        library: fx.library.clone(),
    });

    let (first, second) = tokio::join!(
        borrow_book(&deps, fx.borrow_cmd(&aiko, &book, "C1", now)),
        borrow_book(&deps, fx.borrow_cmd(&kenji, &book, "C1", now)),
    );

    let (lent, rejected) = match (first, second) {
        (Ok(lent), Err(err)) | (Err(err), Ok(lent)) => (lent, err),
        other => panic!("expected exactly one borrowing, got {:?}", other),
    };
    assert_eq!(rejected.kind(), ErrorKind::InvalidState);
    assert!(matches!(
        rejected,
        CirculationError::Borrow(BorrowError::CopyNotAvailable { .. })
    ));

    let page = list_borrowings(&fx.deps, &BorrowingFilter::default(), &PageRequest::default())
        .await
        .unwrap();
    assert_eq!(page.total, 1);
    assert_eq!(page.items[0], lent);
}

#[tokio::test]
async fn test_persistent_conflict_gives_up_after_three_attempts() {
    let fx = Fixture::new();
    let member = fx.add_member("Aiko");
    let book = fx.add_book("Database Internals", 1);

    let uow = Arc::new(AlwaysConflicting {
        attempts: AtomicU32::new(0),
    });
    let mut deps = fx.deps.clone();
    deps.unit_of_work = uow.clone();

    let err = borrow_book(&deps, fx.borrow_cmd(&member, &book, "C1", Utc::now()))
        .await
        .unwrap_err();

    assert!(err.is_conflict());
    assert_eq!(err.kind(), ErrorKind::InvalidState);
    assert_eq!(uow.attempts.load(Ordering::SeqCst), 3);
}
