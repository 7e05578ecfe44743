use crate::domain::{
    self, BorrowBook, Borrowing, BorrowingId, Fine, FineId, RenewBorrowing, ReturnBook,
};
use crate::ports::ChangeSet;

use crate::application::dependencies::ServiceDependencies;
use crate::application::errors::{CirculationError, Result};
use crate::application::lookups::{load_book, load_borrowing, load_member, load_staff};
use crate::application::retry::retry_on_conflict;

/// 返却処理の結果
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReturnReceipt {
    pub borrowing: Borrowing,
    /// 延滞金を課した場合の台帳レコード
    pub fine: Option<Fine>,
    pub days_late: u32,
}

/// コピーを貸し出す
///
/// ビジネスルール：
/// - 会員・書籍・職員が存在すること
/// - 会員が有効で、会員証が期限内、未払いの延滞金がなく、貸出中が5冊未満であること
/// - コピーがAvailableであること
///
/// 会員自身の予約待ちがあれば受取済みにする。
/// 貸出・会員・書籍・予約の更新は1つの ChangeSet としてまとめてコミットする。
/// 他の貸出と競合した場合は、読み込みからやり直す。
pub async fn borrow_book(deps: &ServiceDependencies, cmd: BorrowBook) -> Result<Borrowing> {
    retry_on_conflict("borrow_book", || try_borrow_book(deps, &cmd)).await
}

async fn try_borrow_book(deps: &ServiceDependencies, cmd: &BorrowBook) -> Result<Borrowing> {
    // 1. 関係するドキュメントを取得
    let (member, book, staff, open_reservations, last_id) = futures::try_join!(
        load_member(deps, cmd.member_id),
        load_book(deps, cmd.book_id),
        load_staff(deps, cmd.staff_id),
        async {
            deps.reservations
                .find_open(cmd.member_id, cmd.book_id)
                .await
                .map_err(CirculationError::StoreError)
        },
        async {
            deps.borrowings
                .last_id()
                .await
                .map_err(CirculationError::StoreError)
        },
    )?;

    // 2. 採番
    let borrowing_id = BorrowingId::next_after(last_id.as_ref());

    // 3. ドメイン層の純粋関数を呼び出し
    let checkout = domain::borrowing::borrow_copy(
        borrowing_id,
        &member,
        &book,
        &staff,
        &open_reservations,
        cmd,
    )?;

    // 4. まとめてコミット（読み込んだ状態から変わっていれば競合）
    let changes = ChangeSet::new()
        .insert_borrowing(checkout.borrowing.clone())
        .update_member(&member, checkout.member)
        .update_book(&book, checkout.book)
        .update_reservations(&open_reservations, checkout.claimed_reservations);
    deps.unit_of_work.commit(changes).await?;

    tracing::info!(
        borrowing_id = %checkout.event.borrowing_id,
        member_id = %checkout.event.member_id,
        copy_id = %checkout.event.copy_id,
        due_date = %checkout.event.due_date,
        claimed = checkout.event.claimed_reservations.len(),
        "Book borrowed"
    );

    Ok(checkout.borrowing)
}

/// 貸出中のコピーを返却する
///
/// 延滞していれば1日あたり5000の延滞金を課し、台帳に記録する。
/// 手動の延滞金が指定されていれば加算する。
pub async fn return_book(deps: &ServiceDependencies, cmd: ReturnBook) -> Result<ReturnReceipt> {
    retry_on_conflict("return_book", || try_return_book(deps, &cmd)).await
}

async fn try_return_book(deps: &ServiceDependencies, cmd: &ReturnBook) -> Result<ReturnReceipt> {
    let borrowing = load_borrowing(deps, &cmd.borrowing_id).await?;

    let (member, book, staff) = futures::try_join!(
        load_member(deps, borrowing.member.member_id),
        load_book(deps, borrowing.copy.book.book_id),
        load_staff(deps, cmd.staff_id),
    )?;

    let checkin = domain::borrowing::return_copy(
        &borrowing,
        &member,
        &book,
        &staff,
        FineId::new(),
        cmd,
    )?;

    let changes = ChangeSet::new()
        .update_borrowing(&borrowing, checkin.borrowing.clone())
        .update_member(&member, checkin.member)
        .update_book(&book, checkin.book)
        .insert_fines(checkin.fine.clone());
    deps.unit_of_work.commit(changes).await?;

    let event = checkin.event;
    if event.was_overdue() {
        tracing::warn!(
            borrowing_id = %event.borrowing_id,
            member_id = %event.member_id,
            days_late = event.days_late,
            fine = %event.fine_amount,
            "Book returned late"
        );
    } else {
        tracing::info!(
            borrowing_id = %event.borrowing_id,
            member_id = %event.member_id,
            fine = %event.fine_amount,
            copy_status = ?event.copy_status,
            "Book returned"
        );
    }

    Ok(ReturnReceipt {
        borrowing: checkin.borrowing,
        fine: checkin.fine,
        days_late: event.days_late,
    })
}

/// 貸出を更新する
///
/// その書籍に予約待ちがある場合は更新できない。
pub async fn renew_borrowing(deps: &ServiceDependencies, cmd: RenewBorrowing) -> Result<Borrowing> {
    retry_on_conflict("renew_borrowing", || try_renew_borrowing(deps, &cmd)).await
}

async fn try_renew_borrowing(deps: &ServiceDependencies, cmd: &RenewBorrowing) -> Result<Borrowing> {
    let borrowing = load_borrowing(deps, &cmd.borrowing_id).await?;
    let book_id = borrowing.copy.book.book_id;

    let (member, has_waiting) = futures::try_join!(
        load_member(deps, borrowing.member.member_id),
        async {
            deps.reservations
                .has_waiting(book_id)
                .await
                .map_err(CirculationError::StoreError)
        },
    )?;

    let renewal = domain::borrowing::renew_borrowing(&borrowing, &member, has_waiting, cmd)?;

    let changes = ChangeSet::new()
        .update_borrowing(&borrowing, renewal.borrowing.clone())
        .update_member(&member, renewal.member);
    deps.unit_of_work.commit(changes).await?;

    tracing::info!(
        borrowing_id = %renewal.event.borrowing_id,
        new_due_date = %renewal.event.new_due_date,
        renewal_count = renewal.event.renewal_count,
        "Borrowing renewed"
    );

    Ok(renewal.borrowing)
}
