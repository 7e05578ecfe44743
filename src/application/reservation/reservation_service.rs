use crate::domain::{
    self, Reservation, ReservationId, ReserveBook, SendReservationNotification,
    UpdateReservationStatus,
};
use crate::ports::ChangeSet;

use crate::application::dependencies::ServiceDependencies;
use crate::application::errors::{CirculationError, Result};
use crate::application::lookups::{load_book, load_member, load_reservation};
use crate::application::retry::retry_on_conflict;

/// 書籍を予約する
///
/// ビジネスルール：
/// - 会員が有効で、会員証が期限内であること
/// - 同じ書籍に有効な予約（Waiting / Claimed）がないこと
/// - 同じタイトルを借りていないこと
/// - 貸出可能なコピーが1冊もないこと
pub async fn reserve_book(deps: &ServiceDependencies, cmd: ReserveBook) -> Result<Reservation> {
    let (member, book, open) = futures::try_join!(
        load_member(deps, cmd.member_id),
        load_book(deps, cmd.book_id),
        async {
            deps.reservations
                .find_open(cmd.member_id, cmd.book_id)
                .await
                .map_err(CirculationError::StoreError)
        },
    )?;

    let (reservation, event) = domain::reservation::reserve_book(
        ReservationId::new(),
        &member,
        &book,
        !open.is_empty(),
        cmd.reserved_at,
    )?;

    deps.unit_of_work
        .commit(ChangeSet::new().insert_reservation(reservation.clone()))
        .await?;

    tracing::info!(
        reservation_id = %event.reservation_id,
        member_id = %event.member_id,
        book_id = %event.book_id,
        expiry_date = %event.expiry_date,
        "Book reserved"
    );

    Ok(reservation)
}

/// 予約ステータスを変更する
///
/// 遷移の制約はない。メモが指定されていれば追記する。
///
/// 終了した予約を Waiting / Claimed に戻したとき、同じ会員・書籍に別の
/// 有効な予約があれば警告を記録する（変更自体は行う）。
pub async fn update_reservation_status(
    deps: &ServiceDependencies,
    cmd: UpdateReservationStatus,
) -> Result<Reservation> {
    retry_on_conflict("update_reservation_status", || {
        try_update_reservation_status(deps, &cmd)
    })
    .await
}

async fn try_update_reservation_status(
    deps: &ServiceDependencies,
    cmd: &UpdateReservationStatus,
) -> Result<Reservation> {
    let reservation = load_reservation(deps, cmd.reservation_id).await?;

    if cmd.status.is_open() && !reservation.status.is_open() {
        warn_if_reopening_duplicate(deps, &reservation).await?;
    }

    let (updated, event) = domain::reservation::change_status(
        &reservation,
        cmd.status,
        cmd.note.clone(),
        cmd.updated_at,
    );

    deps.unit_of_work
        .commit(ChangeSet::new().update_reservation(&reservation, updated.clone()))
        .await?;

    tracing::info!(
        reservation_id = %event.reservation_id,
        old_status = event.old_status.as_str(),
        new_status = event.new_status.as_str(),
        "Reservation status changed"
    );

    Ok(updated)
}

/// 再開する予約と同じ会員・書籍に、別の有効な予約があるか確認する
async fn warn_if_reopening_duplicate(
    deps: &ServiceDependencies,
    reservation: &Reservation,
) -> Result<()> {
    let open = deps
        .reservations
        .find_open(reservation.member.member_id, reservation.book.book_id)
        .await
        .map_err(CirculationError::StoreError)?;

    let others: Vec<String> = open
        .iter()
        .filter(|r| r.reservation_id != reservation.reservation_id)
        .map(|r| r.reservation_id.to_string())
        .collect();
    if !others.is_empty() {
        tracing::warn!(
            reservation_id = %reservation.reservation_id,
            member_id = %reservation.member.member_id,
            book_id = %reservation.book.book_id,
            open_reservations = ?others,
            "Reopened reservation duplicates an open reservation"
        );
    }
    Ok(())
}

/// 予約者に取り置き通知を送る
///
/// 予約待ち（Waiting）の予約にのみ送れる。
/// 通知の送信に失敗した場合は予約を更新しない。
pub async fn send_reservation_notification(
    deps: &ServiceDependencies,
    cmd: SendReservationNotification,
) -> Result<Reservation> {
    let reservation = load_reservation(deps, cmd.reservation_id).await?;

    let (notified, event) = domain::reservation::mark_notified(&reservation, cmd.sent_at)?;

    deps.notifications
        .send_reservation_ready(
            event.member_id,
            &reservation.book.title,
            reservation.expiry_date,
        )
        .await
        .map_err(CirculationError::NotificationError)?;

    deps.unit_of_work
        .commit(ChangeSet::new().update_reservation(&reservation, notified.clone()))
        .await?;

    tracing::info!(
        reservation_id = %event.reservation_id,
        member_id = %event.member_id,
        "Reservation notification sent"
    );

    Ok(notified)
}
