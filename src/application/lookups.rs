//! サービス間で共通利用するドキュメント取得ヘルパー
//!
//! 存在しない場合はそれぞれの NotFound エラーに変換する。

use crate::domain::{
    Book, BookId, Borrowing, BorrowingId, Member, MemberId, Reservation, ReservationId, Staff,
    StaffId,
};

use super::dependencies::ServiceDependencies;
use super::errors::{CirculationError, Result};

pub(crate) async fn load_member(deps: &ServiceDependencies, member_id: MemberId) -> Result<Member> {
    deps.members
        .find_by_id(member_id)
        .await
        .map_err(CirculationError::StoreError)?
        .ok_or(CirculationError::MemberNotFound(member_id))
}

pub(crate) async fn load_book(deps: &ServiceDependencies, book_id: BookId) -> Result<Book> {
    deps.books
        .find_by_id(book_id)
        .await
        .map_err(CirculationError::StoreError)?
        .ok_or(CirculationError::BookNotFound(book_id))
}

pub(crate) async fn load_staff(deps: &ServiceDependencies, staff_id: StaffId) -> Result<Staff> {
    deps.staff
        .find_by_id(staff_id)
        .await
        .map_err(CirculationError::StoreError)?
        .ok_or(CirculationError::StaffNotFound(staff_id))
}

pub(crate) async fn load_borrowing(
    deps: &ServiceDependencies,
    borrowing_id: &BorrowingId,
) -> Result<Borrowing> {
    deps.borrowings
        .find_by_id(borrowing_id)
        .await
        .map_err(CirculationError::StoreError)?
        .ok_or_else(|| CirculationError::BorrowingNotFound(borrowing_id.clone()))
}

pub(crate) async fn load_reservation(
    deps: &ServiceDependencies,
    reservation_id: ReservationId,
) -> Result<Reservation> {
    deps.reservations
        .find_by_id(reservation_id)
        .await
        .map_err(CirculationError::StoreError)?
        .ok_or(CirculationError::ReservationNotFound(reservation_id))
}
